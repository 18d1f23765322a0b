//! Coordinate transformation between client and PDF coordinate systems
//!
//! The editor reports annotation positions normalized to the page (0-1)
//! with a top-left origin; PDF page space has a bottom-left origin in
//! points. The Y axis flips during conversion.

/// Convert a normalized (0-1, top-left origin) position to absolute page
/// coordinates (points, bottom-left origin).
pub fn normalized_to_page(x: f64, y: f64, page_width: f64, page_height: f64) -> (f64, f64) {
    let abs_x = x * page_width;
    let abs_y = page_height - (y * page_height);
    (abs_x, abs_y)
}
