//! Storage path layout
//!
//! All generated and uploaded files live under a single storage root:
//! `templates/` for uploaded templates, `images/<user>/` for drawing
//! captures, `exports/<user>/` for generated PDFs keyed by draft id.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    pub fn user_images_dir(&self, user_id: &str) -> PathBuf {
        self.root.join("images").join(user_id)
    }

    pub fn user_exports_dir(&self, user_id: &str) -> PathBuf {
        self.root.join("exports").join(user_id)
    }

    /// Output path for a draft's export, overwritten on every export call.
    pub fn export_file(&self, user_id: &str, draft_id: &str) -> PathBuf {
        self.user_exports_dir(user_id).join(format!("{draft_id}.pdf"))
    }
}
