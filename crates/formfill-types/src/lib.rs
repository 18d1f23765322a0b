//! Shared data model for the Formfill services
//!
//! Wire-facing types exchanged between the upload/draft collaborators and
//! the export engine. Field names follow the camelCase JSON produced by the
//! web client.

pub mod annotation;
pub mod types;

pub use annotation::TextAnnotation;
pub use types::{Draft, DraftStatus, Template};
