//! Free-form text annotations placed on templates without fillable fields
//!
//! Annotations live embedded in a draft's JSON and are never queried on
//! their own. Positions are normalized to the page (0-1, top-left origin);
//! the export engine converts them to page coordinates at render time.

use serde::{Deserialize, Serialize};

fn default_font_size() -> f32 {
    12.0
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

fn default_color() -> String {
    "#000000".to_string()
}

fn default_page_number() -> i32 {
    1
}

/// A single styled text annotation.
///
/// Every styling field carries a default so partially-specified client
/// payloads deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    /// Horizontal position as a fraction of page width (0-1).
    pub x: f64,
    /// Vertical position as a fraction of page height (0-1, measured from
    /// the top edge).
    pub y: f64,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Hex RGB color string, e.g. `#1a2b3c`.
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    /// 1-indexed page. Non-positive values are treated as page 1.
    #[serde(default = "default_page_number")]
    pub page_number: i32,
}

impl TextAnnotation {
    /// Parse a draft's annotation list from its stored JSON.
    pub fn parse_list(json: &str) -> Result<Vec<TextAnnotation>, serde_json::Error> {
        serde_json::from_str(json)
    }
}
