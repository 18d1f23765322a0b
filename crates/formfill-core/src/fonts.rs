//! Standard-14 font selection and text metrics
//!
//! Annotations pick from a small family set; bold/italic flags select the
//! style variant. Width metrics for the proportional families cover the
//! printable ASCII range in 1/1000 em units; everything outside that range
//! measures at the 500-unit fallback.

/// Base font families offered by the annotation editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Case-insensitive family lookup. Unknown names fall back to
    /// Helvetica.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "times" => FontFamily::Times,
            "courier" => FontFamily::Courier,
            _ => FontFamily::Helvetica,
        }
    }

    /// Select the standard font for this family crossed with the style
    /// flags.
    pub fn variant(self, bold: bool, italic: bool) -> StandardFont {
        use StandardFont::*;
        match (self, bold, italic) {
            (FontFamily::Helvetica, false, false) => Helvetica,
            (FontFamily::Helvetica, true, false) => HelveticaBold,
            (FontFamily::Helvetica, false, true) => HelveticaOblique,
            (FontFamily::Helvetica, true, true) => HelveticaBoldOblique,
            (FontFamily::Times, false, false) => TimesRoman,
            (FontFamily::Times, true, false) => TimesBold,
            (FontFamily::Times, false, true) => TimesItalic,
            (FontFamily::Times, true, true) => TimesBoldItalic,
            (FontFamily::Courier, false, false) => Courier,
            (FontFamily::Courier, true, false) => CourierBold,
            (FontFamily::Courier, false, true) => CourierOblique,
            (FontFamily::Courier, true, true) => CourierBoldOblique,
        }
    }
}

/// The twelve text variants of the PDF standard fonts used for annotation
/// rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// PDF BaseFont name.
    pub fn base_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Name used for the font entry in a page's `/Resources` dictionary.
    /// Stable across pages so repeated registration is idempotent.
    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "FfHelv",
            StandardFont::HelveticaBold => "FfHelvB",
            StandardFont::HelveticaOblique => "FfHelvO",
            StandardFont::HelveticaBoldOblique => "FfHelvBO",
            StandardFont::TimesRoman => "FfTimes",
            StandardFont::TimesBold => "FfTimesB",
            StandardFont::TimesItalic => "FfTimesI",
            StandardFont::TimesBoldItalic => "FfTimesBI",
            StandardFont::Courier => "FfCour",
            StandardFont::CourierBold => "FfCourB",
            StandardFont::CourierOblique => "FfCourO",
            StandardFont::CourierBoldOblique => "FfCourBO",
        }
    }

    /// Width of `text` in points at `font_size`.
    pub fn text_width(self, text: &str, font_size: f32) -> f32 {
        let units: f32 = text.chars().map(|c| self.char_width(c)).sum();
        units * font_size / 1000.0
    }

    /// Width of one character in 1/1000 em.
    fn char_width(self, c: char) -> f32 {
        let table = match self {
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => return 600.0,
            StandardFont::Helvetica | StandardFont::HelveticaOblique => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => {
                &HELVETICA_BOLD_WIDTHS
            }
            StandardFont::TimesRoman | StandardFont::TimesItalic => &TIMES_ROMAN_WIDTHS,
            StandardFont::TimesBold | StandardFont::TimesBoldItalic => &TIMES_BOLD_WIDTHS,
        };
        let code = c as u32;
        if (0x20..=0x7e).contains(&code) {
            table[(code - 0x20) as usize]
        } else {
            DEFAULT_WIDTH
        }
    }
}

const DEFAULT_WIDTH: f32 = 500.0;

// AFM widths for the printable ASCII range (0x20..=0x7E), 1/1000 em.

#[rustfmt::skip]
static HELVETICA_WIDTHS: [f32; 95] = [
    278.0, 278.0, 355.0, 556.0, 556.0, 889.0, 667.0, 191.0, // space ! " # $ % & '
    333.0, 333.0, 389.0, 584.0, 278.0, 333.0, 278.0, 278.0, // ( ) * + , - . /
    556.0, 556.0, 556.0, 556.0, 556.0, 556.0, 556.0, 556.0, // 0-7
    556.0, 556.0, 278.0, 278.0, 584.0, 584.0, 584.0, 556.0, // 8 9 : ; < = > ?
    1015.0, 667.0, 667.0, 722.0, 722.0, 667.0, 611.0, 778.0, // @ A-G
    722.0, 278.0, 500.0, 667.0, 556.0, 833.0, 722.0, 778.0, // H-O
    667.0, 778.0, 722.0, 667.0, 611.0, 722.0, 667.0, 944.0, // P-W
    667.0, 667.0, 611.0, 278.0, 278.0, 278.0, 469.0, 556.0, // X Y Z [ \ ] ^ _
    333.0, 556.0, 556.0, 500.0, 556.0, 556.0, 278.0, 556.0, // ` a-g
    556.0, 222.0, 222.0, 500.0, 222.0, 833.0, 556.0, 556.0, // h-o
    556.0, 556.0, 333.0, 500.0, 278.0, 556.0, 500.0, 722.0, // p-w
    500.0, 500.0, 500.0, 334.0, 260.0, 334.0, 584.0,        // x y z { | } ~
];

#[rustfmt::skip]
static HELVETICA_BOLD_WIDTHS: [f32; 95] = [
    278.0, 333.0, 474.0, 556.0, 556.0, 889.0, 722.0, 238.0,
    333.0, 333.0, 389.0, 584.0, 278.0, 333.0, 278.0, 278.0,
    556.0, 556.0, 556.0, 556.0, 556.0, 556.0, 556.0, 556.0,
    556.0, 556.0, 333.0, 333.0, 584.0, 584.0, 584.0, 611.0,
    975.0, 722.0, 722.0, 722.0, 722.0, 667.0, 611.0, 778.0,
    722.0, 278.0, 556.0, 722.0, 611.0, 833.0, 722.0, 778.0,
    667.0, 778.0, 722.0, 667.0, 611.0, 722.0, 667.0, 944.0,
    667.0, 667.0, 611.0, 333.0, 278.0, 333.0, 584.0, 556.0,
    333.0, 556.0, 611.0, 556.0, 611.0, 556.0, 333.0, 611.0,
    611.0, 278.0, 278.0, 556.0, 278.0, 889.0, 611.0, 611.0,
    611.0, 611.0, 389.0, 556.0, 333.0, 611.0, 556.0, 778.0,
    556.0, 556.0, 500.0, 389.0, 280.0, 389.0, 584.0,
];

#[rustfmt::skip]
static TIMES_ROMAN_WIDTHS: [f32; 95] = [
    250.0, 333.0, 408.0, 500.0, 500.0, 833.0, 778.0, 180.0,
    333.0, 333.0, 500.0, 564.0, 250.0, 333.0, 250.0, 278.0,
    500.0, 500.0, 500.0, 500.0, 500.0, 500.0, 500.0, 500.0,
    500.0, 500.0, 278.0, 278.0, 564.0, 564.0, 564.0, 444.0,
    921.0, 722.0, 667.0, 667.0, 722.0, 611.0, 556.0, 722.0,
    722.0, 333.0, 389.0, 722.0, 611.0, 889.0, 722.0, 722.0,
    556.0, 722.0, 667.0, 556.0, 611.0, 722.0, 722.0, 944.0,
    722.0, 722.0, 611.0, 333.0, 278.0, 333.0, 469.0, 500.0,
    333.0, 444.0, 500.0, 444.0, 500.0, 444.0, 333.0, 500.0,
    500.0, 278.0, 278.0, 500.0, 278.0, 778.0, 500.0, 500.0,
    500.0, 500.0, 333.0, 389.0, 278.0, 500.0, 500.0, 722.0,
    500.0, 500.0, 444.0, 480.0, 200.0, 480.0, 541.0,
];

#[rustfmt::skip]
static TIMES_BOLD_WIDTHS: [f32; 95] = [
    250.0, 333.0, 555.0, 500.0, 500.0, 1000.0, 833.0, 278.0,
    333.0, 333.0, 500.0, 570.0, 250.0, 333.0, 250.0, 278.0,
    500.0, 500.0, 500.0, 500.0, 500.0, 500.0, 500.0, 500.0,
    500.0, 500.0, 333.0, 333.0, 570.0, 570.0, 570.0, 500.0,
    930.0, 722.0, 667.0, 722.0, 722.0, 667.0, 611.0, 778.0,
    778.0, 389.0, 500.0, 778.0, 667.0, 944.0, 722.0, 778.0,
    611.0, 778.0, 722.0, 556.0, 667.0, 722.0, 722.0, 1000.0,
    722.0, 722.0, 667.0, 333.0, 278.0, 333.0, 581.0, 500.0,
    333.0, 500.0, 556.0, 444.0, 556.0, 444.0, 333.0, 500.0,
    556.0, 278.0, 333.0, 556.0, 278.0, 833.0, 556.0, 500.0,
    556.0, 556.0, 444.0, 389.0, 333.0, 556.0, 500.0, 722.0,
    500.0, 500.0, 444.0, 394.0, 220.0, 394.0, 520.0,
];
