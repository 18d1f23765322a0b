//! Free-form text annotation rendering
//!
//! Paints styled annotation text straight into page content streams.
//! Each annotation is isolated: a bad page reference, color, or font in
//! one entry never suppresses the rest of the batch. Failures downgrade
//! to log lines, mirroring the silent-skip policy for unmapped fields.

use std::collections::{BTreeMap, BTreeSet};

use formfill_types::TextAnnotation;
use lopdf::{Document, ObjectId};

use crate::color::parse_hex_color;
use crate::coords::normalized_to_page;
use crate::fonts::{FontFamily, StandardFont};
use crate::page::{
    add_standard_font, append_content, escape_pdf_string, page_size, set_resource_entry,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Annotations painted onto a page.
    pub rendered: usize,
    /// Annotations dropped (out-of-range page, or a page that refused the
    /// content append).
    pub skipped: usize,
}

/// Render annotations onto their target pages, in input order.
pub fn render_annotations(doc: &mut Document, annotations: &[TextAnnotation]) -> RenderOutcome {
    let mut outcome = RenderOutcome::default();
    if annotations.is_empty() {
        return outcome;
    }

    let pages: BTreeMap<u32, ObjectId> = doc.get_pages();
    let page_count = pages.len() as u32;

    // Group the paint operations per page so each page gets a single
    // appended stream.
    let mut page_ops: BTreeMap<ObjectId, (String, usize)> = BTreeMap::new();
    let mut page_fonts: BTreeMap<ObjectId, BTreeSet<StandardFont>> = BTreeMap::new();

    for annotation in annotations {
        // 1-indexed pages; non-positive clamps to the first page.
        let page_number = if annotation.page_number > 0 {
            annotation.page_number as u32
        } else {
            1
        };
        if page_number > page_count {
            tracing::debug!(
                page = annotation.page_number,
                pages = page_count,
                "annotation page out of range, skipping"
            );
            outcome.skipped += 1;
            continue;
        }
        let Some(&page_id) = pages.get(&page_number) else {
            outcome.skipped += 1;
            continue;
        };

        let (page_width, page_height) = page_size(doc, page_id);
        let ops = paint_annotation(annotation, page_width, page_height);

        let entry = page_ops.entry(page_id).or_default();
        entry.0.push_str(&ops.text_ops);
        entry.1 += 1;
        page_fonts.entry(page_id).or_default().insert(ops.font);
    }

    // Register the fonts each page needs, then append its stream. A page
    // that fails here drops its annotations but not the other pages'.
    for (page_id, (content, count)) in page_ops {
        let fonts = page_fonts.remove(&page_id).unwrap_or_default();
        let mut result = register_fonts(doc, page_id, &fonts);
        if result.is_ok() {
            result = append_content(doc, page_id, &content);
        }
        match result {
            Ok(()) => outcome.rendered += count,
            Err(e) => {
                tracing::warn!("failed to paint {count} annotation(s) on a page: {e}");
                outcome.skipped += count;
            }
        }
    }

    outcome
}

struct PaintedAnnotation {
    text_ops: String,
    font: StandardFont,
}

fn paint_annotation(
    annotation: &TextAnnotation,
    page_width: f64,
    page_height: f64,
) -> PaintedAnnotation {
    let (absolute_x, absolute_y) =
        normalized_to_page(annotation.x, annotation.y, page_width, page_height);

    let font = FontFamily::parse(&annotation.font_family)
        .variant(annotation.bold, annotation.italic);
    let color = parse_hex_color(&annotation.color);

    // Center the text on the click point; Y stays on the baseline.
    let text_width = font.text_width(&annotation.text, annotation.font_size) as f64;
    let x = absolute_x - text_width / 2.0;
    let y = absolute_y;

    let text_ops = format!(
        "q\nBT\n/{res} {size} Tf\n{r} {g} {b} rg\n{x} {y} Td\n({text}) Tj\nET\nQ\n",
        res = font.resource_name(),
        size = annotation.font_size,
        r = color.r,
        g = color.g,
        b = color.b,
        text = escape_pdf_string(&annotation.text),
    );

    PaintedAnnotation { text_ops, font }
}

fn register_fonts(
    doc: &mut Document,
    page_id: ObjectId,
    fonts: &BTreeSet<StandardFont>,
) -> Result<(), crate::error::ExportError> {
    for font in fonts {
        let font_id = add_standard_font(doc, font.base_name());
        set_resource_entry(doc, page_id, "Font", font.resource_name(), font_id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Object};
    use pretty_assertions::assert_eq;

    fn annotation(text: &str, x: f64, y: f64, page: i32) -> TextAnnotation {
        TextAnnotation {
            id: None,
            text: text.to_string(),
            x,
            y,
            font_size: 12.0,
            font_family: "Helvetica".to_string(),
            color: "#000000".to_string(),
            bold: false,
            italic: false,
            page_number: page,
        }
    }

    /// Document with `n` empty pages of 612x792.
    fn doc_with_pages(n: usize) -> (Document, Vec<ObjectId>) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut page_ids = Vec::new();
        for _ in 0..n {
            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
                ),
            ]));
            page_ids.push(page_id);
        }
        let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(n as i64)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        (doc, page_ids)
    }

    fn page_content(doc: &Document, page_id: ObjectId) -> String {
        String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap_or_default()).into_owned()
    }

    #[test]
    fn renders_text_onto_target_page() {
        let (mut doc, pages) = doc_with_pages(2);
        let outcome = render_annotations(&mut doc, &[annotation("Hello", 0.5, 0.5, 2)]);
        assert_eq!(outcome, RenderOutcome { rendered: 1, skipped: 0 });

        assert!(!page_content(&doc, pages[0]).contains("Hello"));
        assert!(page_content(&doc, pages[1]).contains("(Hello) Tj"));
    }

    #[test]
    fn registers_font_resource() {
        let (mut doc, pages) = doc_with_pages(1);
        render_annotations(&mut doc, &[annotation("x", 0.5, 0.5, 1)]);

        let page = doc.get_object(pages[0]).unwrap().as_dict().unwrap();
        let res = page.get(b"Resources").unwrap().as_dict().unwrap();
        let fonts = res.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.get(b"FfHelv").is_ok());
    }

    #[test]
    fn out_of_range_page_is_skipped_silently() {
        let (mut doc, pages) = doc_with_pages(1);
        let outcome = render_annotations(&mut doc, &[annotation("ghost", 0.5, 0.5, 7)]);
        assert_eq!(outcome, RenderOutcome { rendered: 0, skipped: 1 });
        assert_eq!(page_content(&doc, pages[0]), "");
    }

    #[test]
    fn non_positive_page_clamps_to_first() {
        let (mut doc, pages) = doc_with_pages(2);
        let outcome = render_annotations(&mut doc, &[annotation("top", 0.5, 0.5, 0)]);
        assert_eq!(outcome.rendered, 1);
        assert!(page_content(&doc, pages[0]).contains("(top) Tj"));
    }

    #[test]
    fn one_bad_annotation_does_not_block_the_rest() {
        let (mut doc, pages) = doc_with_pages(1);
        let outcome = render_annotations(
            &mut doc,
            &[
                annotation("before", 0.2, 0.2, 1),
                annotation("ghost", 0.5, 0.5, 99),
                annotation("after", 0.8, 0.8, 1),
            ],
        );
        assert_eq!(outcome, RenderOutcome { rendered: 2, skipped: 1 });
        let content = page_content(&doc, pages[0]);
        assert!(content.contains("(before) Tj"));
        assert!(content.contains("(after) Tj"));
    }

    #[test]
    fn text_is_centered_on_x() {
        let (mut doc, pages) = doc_with_pages(1);
        let mut ann = annotation("Hello", 0.5, 0.0, 1);
        ann.font_size = 10.0;
        render_annotations(&mut doc, &[ann]);

        let width = StandardFont::Helvetica.text_width("Hello", 10.0) as f64;
        let expected_x = 0.5 * 612.0 - width / 2.0;
        let content = page_content(&doc, pages[0]);
        assert!(content.contains(&format!("{expected_x} 792 Td")));
    }

    #[test]
    fn color_and_style_reach_the_content_stream() {
        let (mut doc, pages) = doc_with_pages(1);
        let mut ann = annotation("Red", 0.5, 0.5, 1);
        ann.color = "#ff0000".to_string();
        ann.font_family = "Times".to_string();
        ann.bold = true;
        ann.italic = true;
        render_annotations(&mut doc, &[ann]);

        let content = page_content(&doc, pages[0]);
        assert!(content.contains("1 0 0 rg"));
        assert!(content.contains("/FfTimesBI"));
    }

    #[test]
    fn malformed_color_falls_back_to_black() {
        let (mut doc, pages) = doc_with_pages(1);
        let mut ann = annotation("ink", 0.5, 0.5, 1);
        ann.color = "not-a-color".to_string();
        render_annotations(&mut doc, &[ann]);
        assert!(page_content(&doc, pages[0]).contains("0 0 0 rg"));
    }

    #[test]
    fn empty_list_is_a_noop() {
        let (mut doc, pages) = doc_with_pages(1);
        let outcome = render_annotations(&mut doc, &[]);
        assert_eq!(outcome, RenderOutcome::default());
        assert_eq!(page_content(&doc, pages[0]), "");
    }

    #[test]
    fn parenthesized_text_is_escaped() {
        let (mut doc, pages) = doc_with_pages(1);
        render_annotations(&mut doc, &[annotation("a(b)c", 0.5, 0.5, 1)]);
        assert!(page_content(&doc, pages[0]).contains("(a\\(b\\)c) Tj"));
    }
}
