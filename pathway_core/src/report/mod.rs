//! Rendering of figures into report documents
use thiserror::Error;

pub mod pdf;

pub use pdf::PdfReport;

/// Errors from writing a report
#[derive(Error, Debug)]
pub enum ReportError {
    /// The report file could not be written
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    /// The PDF document could not be built
    #[error("failed to build PDF document: {0}")]
    Pdf(#[from] printpdf::Error),
}
