use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Template file not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF processing failed: {0}")]
    Processing(String),

    #[error("Drawing overlay failed: {0}")]
    Overlay(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
