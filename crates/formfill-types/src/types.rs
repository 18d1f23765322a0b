use chrono::{DateTime, Utc};
use uuid::Uuid;

/// An uploaded PDF template. Immutable once stored; drafts reference it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub title: String,
    pub original_file_name: String,
    /// Absolute path of the stored template file.
    pub stored_path: String,
    /// Whether the template's AcroForm carries at least one fillable field,
    /// detected at upload time.
    pub has_form_fields: bool,
    pub created_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DraftStatus {
    Draft,
    Exported,
}

impl Default for DraftStatus {
    fn default() -> Self {
        DraftStatus::Draft
    }
}

/// A saved fill-in of a template. Drafts are versioned per user+template;
/// saving creates a new version rather than mutating an old one.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: Uuid,
    pub template_id: Uuid,
    pub user_id: Uuid,
    pub version: u32,
    /// Field-name -> value object for AcroForm filling.
    pub form_data: serde_json::Value,
    /// JSON array of [`crate::TextAnnotation`], kept as raw JSON the way
    /// the persistence layer stores it.
    pub annotations_json: Option<String>,
    /// Path to a PNG drawing captured on the client canvas.
    pub drawing_image_path: Option<String>,
    #[serde(default)]
    pub status: DraftStatus,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}
