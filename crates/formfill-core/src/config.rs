//! Export engine configuration
//!
//! Everything the engine used to bury as a constant lives here so tests can
//! pin retry behavior and overlay geometry deterministically.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Total attempts for the delete+write cycle on the output path. The
    /// final attempt surfaces its error instead of retrying.
    pub retry_attempts: u32,
    /// Fixed delay between retry attempts.
    pub retry_delay: Duration,
    /// Rendered size of the drawing overlay in points.
    pub overlay_width: f64,
    pub overlay_height: f64,
    /// Inset of the overlay from the page's top-right corner.
    pub overlay_margin: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_delay: Duration::from_millis(100),
            overlay_width: 150.0,
            overlay_height: 150.0,
            overlay_margin: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_retry_policy() {
        let config = ExportConfig::default();
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(100));
    }
}
