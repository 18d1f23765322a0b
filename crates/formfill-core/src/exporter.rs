//! Export orchestration: fill, annotate, composite, with retry and fallback
//!
//! The engine never fails an export over processing trouble. The pipeline
//! runs in memory against the template; if any stage errors, the output is
//! replaced by a verbatim copy of the template so callers always find a
//! valid PDF at the expected path. Only a missing template or the final
//! retry attempt's I/O failure surface as errors.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use formfill_types::TextAnnotation;
use lopdf::Document;
use serde::{Deserialize, Serialize};

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::storage::StoragePaths;
use crate::{fill, overlay, render};

/// Everything the engine needs to export one draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub template_path: PathBuf,
    pub draft_id: String,
    pub user_id: String,
    /// Field-name -> value object; non-objects are treated as empty.
    pub form_data: serde_json::Value,
    /// Raw annotation JSON as stored on the draft.
    pub annotations_json: Option<String>,
    pub drawing_path: Option<PathBuf>,
}

/// How the export completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportKind {
    /// The processed document with fills/annotations/overlay applied.
    Full,
    /// Processing failed; the output is a verbatim template copy.
    Degraded { reason: String },
}

impl ExportKind {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ExportKind::Degraded { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    /// Absolute path of the generated PDF.
    pub path: PathBuf,
    pub kind: ExportKind,
    pub exported_at: DateTime<Utc>,
}

/// The PDF export engine. Cheap to clone; holds no open resources.
#[derive(Debug, Clone)]
pub struct ExportEngine {
    paths: StoragePaths,
    config: ExportConfig,
}

impl ExportEngine {
    pub fn new(storage_root: impl Into<PathBuf>, config: ExportConfig) -> Self {
        Self {
            paths: StoragePaths::new(storage_root),
            config,
        }
    }

    pub fn with_defaults(storage_root: impl Into<PathBuf>) -> Self {
        Self::new(storage_root, ExportConfig::default())
    }

    pub fn storage(&self) -> &StoragePaths {
        &self.paths
    }

    /// Export a draft synchronously. Idempotent per draft id: the output
    /// file is deleted and rewritten on every call.
    pub fn export_draft(&self, request: &ExportRequest) -> Result<ExportOutcome, ExportError> {
        if !request.template_path.exists() {
            return Err(ExportError::TemplateNotFound(request.template_path.clone()));
        }

        let exports_dir = self.paths.user_exports_dir(&request.user_id);
        fs::create_dir_all(&exports_dir)?;
        // Callers get an absolute path regardless of how the storage root
        // was configured.
        let exports_dir = fs::canonicalize(&exports_dir)?;
        let output_path = exports_dir.join(format!("{}.pdf", request.draft_id));

        tracing::info!(draft = %request.draft_id, "exporting draft");
        let kind = self.with_retry(|| self.write_output(request, &output_path))?;
        if let ExportKind::Degraded { reason } = &kind {
            tracing::warn!(draft = %request.draft_id, %reason, "export degraded to template copy");
        }

        Ok(ExportOutcome {
            path: output_path,
            kind,
            exported_at: Utc::now(),
        })
    }

    /// Offload an export to the blocking pool. There is no cancellation:
    /// once started, the export runs to completion even if the caller
    /// goes away.
    pub async fn export_draft_async(
        &self,
        request: ExportRequest,
    ) -> Result<ExportOutcome, ExportError> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.export_draft(&request))
            .await
            .map_err(|e| ExportError::Processing(format!("export task failed: {e}")))?
    }

    /// One delete+process+write cycle against the output path. Processing
    /// failures degrade to a template copy inside the cycle; only I/O
    /// failures escape to the retry loop.
    fn write_output(
        &self,
        request: &ExportRequest,
        output_path: &Path,
    ) -> Result<ExportKind, ExportError> {
        match fs::remove_file(output_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        match self.process(request) {
            Ok(bytes) => {
                fs::write(output_path, bytes)?;
                Ok(ExportKind::Full)
            }
            Err(e) => {
                let template = fs::read(&request.template_path)?;
                fs::write(output_path, template)?;
                Ok(ExportKind::Degraded {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Run fill -> annotate -> composite in memory and serialize.
    fn process(&self, request: &ExportRequest) -> Result<Vec<u8>, ExportError> {
        let mut doc = Document::load(&request.template_path)
            .map_err(|e| ExportError::Parse(e.to_string()))?;

        let filled = fill::fill_and_flatten(&mut doc, &request.form_data)?;
        if filled.field_count > 0 {
            tracing::debug!(
                fields = filled.field_count,
                filled = filled.filled,
                "form fields flattened"
            );
        }

        let annotations_json = request
            .annotations_json
            .as_deref()
            .filter(|s| !s.trim().is_empty());
        if let Some(json) = annotations_json {
            match TextAnnotation::parse_list(json) {
                Ok(annotations) => {
                    let outcome = render::render_annotations(&mut doc, &annotations);
                    tracing::debug!(
                        rendered = outcome.rendered,
                        skipped = outcome.skipped,
                        "annotations rendered"
                    );
                }
                // A malformed batch drops the whole annotation stage, not
                // the export.
                Err(e) => tracing::warn!("ignoring malformed annotation payload: {e}"),
            }
        }

        if let Some(drawing) = &request.drawing_path {
            overlay::composite_drawing(&mut doc, drawing, &self.config)?;
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ExportError::Processing(e.to_string()))?;
        Ok(bytes)
    }

    /// Fixed-delay retry for transient I/O contention on the output path.
    /// The final attempt runs outside the catch so its error surfaces.
    fn with_retry<T>(
        &self,
        mut op: impl FnMut() -> Result<T, ExportError>,
    ) -> Result<T, ExportError> {
        let attempts = self.config.retry_attempts.max(1);
        for _ in 1..attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(ExportError::Io(e)) => {
                    tracing::debug!("transient I/O failure, retrying: {e}");
                    std::thread::sleep(self.config.retry_delay);
                }
                Err(e) => return Err(e),
            }
        }
        op()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;
    use std::time::Duration;

    fn engine() -> ExportEngine {
        ExportEngine::new(
            "/tmp/unused",
            ExportConfig {
                retry_attempts: 3,
                retry_delay: Duration::from_millis(1),
                ..ExportConfig::default()
            },
        )
    }

    fn io_err() -> ExportError {
        ExportError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
    }

    #[test]
    fn retry_returns_first_success() {
        let calls = Cell::new(0);
        let result: Result<u32, _> = engine().with_retry(|| {
            calls.set(calls.get() + 1);
            Ok(7)
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retry_absorbs_transient_io_then_succeeds() {
        let calls = Cell::new(0);
        let result: Result<u32, _> = engine().with_retry(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(io_err())
            } else {
                Ok(9)
            }
        });
        assert_eq!(result.unwrap(), 9);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retry_surfaces_final_io_failure() {
        let calls = Cell::new(0);
        let result: Result<u32, _> = engine().with_retry(|| {
            calls.set(calls.get() + 1);
            Err(io_err())
        });
        assert!(matches!(result, Err(ExportError::Io(_))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retry_does_not_retry_processing_errors() {
        let calls = Cell::new(0);
        let result: Result<u32, _> = engine().with_retry(|| {
            calls.set(calls.get() + 1);
            Err(ExportError::Processing("boom".into()))
        });
        assert!(matches!(result, Err(ExportError::Processing(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn missing_template_is_fatal() {
        let request = ExportRequest {
            template_path: PathBuf::from("/nonexistent/template.pdf"),
            draft_id: "d1".into(),
            user_id: "u1".into(),
            form_data: serde_json::json!({}),
            annotations_json: None,
            drawing_path: None,
        };
        let err = engine().export_draft(&request).unwrap_err();
        assert!(matches!(err, ExportError::TemplateNotFound(_)));
    }

    #[test]
    fn export_kind_reports_degradation() {
        assert!(!ExportKind::Full.is_degraded());
        assert!(ExportKind::Degraded {
            reason: "x".into()
        }
        .is_degraded());
    }
}
