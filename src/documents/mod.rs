//! Document generation: calendar utilities, the placeholder map, the
//! template renderer, programmatic Word builders and Excel workbooks.
//!
//! - `template` - `{TAG}` substitution and loop expansion on `.docx` templates
//! - `builders` - fixed-layout FAD registries, minutes and beneficiary notices
//! - `workbook` - attendance, participant list, calendar and full report

pub mod assets;
pub mod builders;
pub mod common;
pub mod ooxml;
pub mod placeholders;
pub mod template;
pub mod workbook;

pub use placeholders::{map_to_placeholders, validate_placeholders, PlaceholderMap};
pub use template::{render_template, validate_template, TemplateError};

use thiserror::Error;

/// Errors that can occur while rendering or building a single document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("template is not a valid docx archive: {0}")]
    TemplateArchive(#[source] zip::result::ZipError),
    #[error("template is missing part {0}")]
    MissingPart(String),
    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("failed to write document archive: {0}")]
    Write(#[source] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid image: {0}")]
    Image(String),
    #[error("cannot build document: {0}")]
    Build(String),
}

/// Result of a successful document generation.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub filename: String,
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

impl GeneratedDocument {
    pub fn docx(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
            mime_type: ooxml::DOCX_MIME,
        }
    }

    pub fn xlsx(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
            mime_type: ooxml::XLSX_MIME,
        }
    }
}
