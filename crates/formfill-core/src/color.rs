//! Hex color parsing for annotation styling

/// An RGB color with components normalized to 0-1, as used by PDF `rg`
/// operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

pub const BLACK: Rgb = Rgb {
    r: 0.0,
    g: 0.0,
    b: 0.0,
};

/// Parse a `#RRGGBB` color string into normalized RGB.
///
/// Anything that is not exactly a `#` followed by six hex digits falls back
/// to black. Malformed client payloads must never fail an export over a
/// color.
pub fn parse_hex_color(color: &str) -> Rgb {
    let Some(hex) = color.strip_prefix('#') else {
        return BLACK;
    };
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return BLACK;
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).unwrap_or(0) as f32 / 255.0
    };

    Rgb {
        r: channel(0..2),
        g: channel(2..4),
        b: channel(4..6),
    }
}
