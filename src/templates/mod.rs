//! Template persistence and upload.
//!
//! The packaging run only reads from a [`TemplateStore`]; uploads are
//! validated against the placeholder schema before anything is stored.

pub mod handlers;
pub mod models;
pub mod multipart_parser;
pub mod service;
pub mod store;


pub use models::{SystemTemplate, SystemTemplateType, TemplateCatalog, UserTemplate, UserTemplateInfo};
pub use service::{check_template, upload_system_template, upload_user_template, UploadError};
pub use store::{seed_system_templates, FsTemplateStore, InMemoryTemplateStore, StoreError, TemplateStore};
