//! Upload-time checks: a template is persisted only once it opens as a
//! `.docx`, every tag is well-formed, loops are balanced and every tag name
//! is one the placeholder map can fill.

use thiserror::Error;

use super::models::{SystemTemplate, SystemTemplateType, UserTemplate, UserTemplateInfo};
use super::store::{StoreError, TemplateStore};
use crate::documents::ooxml::DOCX_MIME;
use crate::documents::{validate_template, TemplateError};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("the uploaded template is empty")]
    Empty,
    #[error("the uploaded template exceeds {max} bytes")]
    TooLarge { max: usize },
    #[error("{0} is not a Word .docx file")]
    NotDocx(String),
    #[error("template validation failed: {}", describe(.0))]
    Invalid(Vec<TemplateError>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn describe(errors: &[TemplateError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Structural checks on an uploaded file, without persisting it.
pub fn check_template(filename: &str, data: &[u8], max_bytes: usize) -> Result<(), UploadError> {
    if data.is_empty() {
        return Err(UploadError::Empty);
    }
    if data.len() > max_bytes {
        return Err(UploadError::TooLarge { max: max_bytes });
    }
    let is_docx = mime_guess::from_path(filename)
        .iter_raw()
        .any(|mime| mime == DOCX_MIME);
    if !is_docx {
        return Err(UploadError::NotDocx(filename.to_string()));
    }
    validate_template(data).map_err(|errors| {
        for error in &errors {
            log::warn!("Rejected template {}: {}", filename, error);
        }
        UploadError::Invalid(errors)
    })
}

pub async fn upload_user_template(
    store: &dyn TemplateStore,
    name: &str,
    category: &str,
    filename: &str,
    data: Vec<u8>,
    max_bytes: usize,
) -> Result<UserTemplateInfo, UploadError> {
    check_template(filename, &data, max_bytes)?;
    let display_name = if name.trim().is_empty() {
        filename.trim_end_matches(".docx").to_string()
    } else {
        name.trim().to_string()
    };
    let template = UserTemplate::new(display_name, category.trim(), filename, data);
    let info = template.info.clone();
    store.save_user_template(template).await?;
    Ok(info)
}

pub async fn upload_system_template(
    store: &dyn TemplateStore,
    file_type: SystemTemplateType,
    filename: &str,
    data: Vec<u8>,
    max_bytes: usize,
) -> Result<(), UploadError> {
    check_template(filename, &data, max_bytes)?;
    store
        .put_system_template(SystemTemplate::new(file_type, data))
        .await?;
    Ok(())
}
