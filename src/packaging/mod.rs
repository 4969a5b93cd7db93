//! Course packaging: gathers every enabled document category into one ZIP
//! archive (per-module folders for multi-module courses), an Excel-only
//! archive, or a single rendered document.

pub mod bundle;
pub mod config;
pub mod engine;
pub mod handlers;
pub mod naming;
pub mod orchestrator;
pub mod report;

#[cfg(test)]
mod tests;

pub use bundle::ArchiveBundle;
pub use config::{FolderNames, ZipConfig};
pub use engine::{DocumentEngine, EngineError, EngineInput, ProgrammaticEngine, TemplateEngine};
pub use orchestrator::{DocumentRequest, PackageOutput, PackageRequest, Packager, TemplateRef};
pub use report::{DocumentFailure, PackageReport, ReportSummary, SkippedCategory, REPORT_HEADER_LIMIT};

use thiserror::Error;
use uuid::Uuid;

/// Failures that abort a packaging run. Everything else is recorded in the
/// [`PackageReport`] and the run goes on.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("packaging run cancelled")]
    Cancelled,
    #[error("failed to write archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("I/O error while writing archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize package report: {0}")]
    Report(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("user template {0} not found")]
    TemplateNotFound(Uuid),
    #[error("module {0} not found")]
    ModuleNotFound(usize),
}
