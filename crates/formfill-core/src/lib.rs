//! PDF export engine for Formfill
//!
//! Takes an uploaded template plus a draft's form data, free-form text
//! annotations, and optional drawing capture, and produces a flattened PDF
//! on disk. Three staged operations run per export:
//!
//! - form-field filling and flattening for templates with an AcroForm
//! - annotation rendering onto page content for everything else
//! - best-effort compositing of the drawing overlay
//!
//! The whole pipeline is wrapped in a never-fail policy: processing
//! trouble degrades the output to a verbatim template copy instead of
//! erroring, and transient file contention on the output path is retried.

pub mod color;
pub mod config;
pub mod coords;
pub mod error;
pub mod exporter;
pub mod fill;
pub mod fonts;
pub mod overlay;
pub mod page;
pub mod render;
pub mod storage;

pub use config::ExportConfig;
pub use error::ExportError;
pub use exporter::{ExportEngine, ExportKind, ExportOutcome, ExportRequest};
pub use fill::{coerce_value, field_names, has_form_fields};
pub use fonts::{FontFamily, StandardFont};
pub use render::RenderOutcome;
pub use storage::StoragePaths;

// Re-exported so engine callers don't need a direct formfill-types
// dependency for the common case.
pub use formfill_types::TextAnnotation;
