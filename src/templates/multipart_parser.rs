use actix_multipart::Multipart;
use actix_web::HttpResponse;
use futures_util::StreamExt;
use sanitize_filename::sanitize;

use crate::ErrorResponse;

/// Fields of a template upload form.
#[derive(Debug, Default)]
pub struct TemplateUploadForm {
    pub filename: String,
    pub data: Vec<u8>,
    pub name: String,
    pub category: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MultipartParseError {
    #[error("Multipart field error: {0}")]
    FieldError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid UTF-8 data: {0}")]
    Utf8Error(String),
    #[error("No file was uploaded")]
    MissingFile,
    #[error("File exceeds the maximum upload size of {0} bytes")]
    TooLarge(usize),
}

impl From<MultipartParseError> for HttpResponse {
    fn from(error: MultipartParseError) -> Self {
        match error {
            MultipartParseError::IoError(_) => HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&error.to_string())),
            MultipartParseError::TooLarge(_) => HttpResponse::PayloadTooLarge()
                .json(ErrorResponse::bad_request(&error.to_string())),
            _ => HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string())),
        }
    }
}

pub struct MultipartParser;

impl MultipartParser {
    /// Read `file`, `name` and `category`; the file is capped at `max_bytes`.
    pub async fn parse_template_upload(
        mut multipart: Multipart,
        max_bytes: usize,
    ) -> Result<TemplateUploadForm, MultipartParseError> {
        let mut form = TemplateUploadForm::default();
        let mut has_file = false;

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let content_disposition = field.content_disposition().ok_or_else(|| {
                MultipartParseError::FieldError("Content disposition not found".to_string())
            })?;
            let field_name = content_disposition
                .get_name()
                .ok_or_else(|| MultipartParseError::FieldError("Field name not found".to_string()))?
                .to_string();

            match field_name.as_str() {
                "file" => {
                    let filename = content_disposition.get_filename().ok_or_else(|| {
                        MultipartParseError::FieldError("No filename in file field".to_string())
                    })?;
                    form.filename = sanitize(filename);

                    while let Some(chunk) = field.next().await {
                        let chunk = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
                        if form.data.len() + chunk.len() > max_bytes {
                            return Err(MultipartParseError::TooLarge(max_bytes));
                        }
                        form.data.extend_from_slice(&chunk);
                    }
                    has_file = true;
                }
                "name" => form.name = read_text(&mut field).await?,
                "category" => form.category = read_text(&mut field).await?,
                other => {
                    log::debug!("Ignoring multipart field {}", other);
                }
            }
        }

        if !has_file {
            return Err(MultipartParseError::MissingFile);
        }
        Ok(form)
    }
}

async fn read_text(field: &mut actix_multipart::Field) -> Result<String, MultipartParseError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes)
        .map(|s| s.trim().to_string())
        .map_err(|e| MultipartParseError::Utf8Error(e.to_string()))
}
