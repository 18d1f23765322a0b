//! AcroForm filling and flattening
//!
//! Payload keys are matched against fully-qualified field names. Matched
//! fields get their `/V` set per the coercion table; the whole form is then
//! flattened: widget appearances are painted into page content, widget
//! annotations are removed, and the AcroForm is dropped from the catalog.
//! Flattening runs whenever the document has any fields at all, even if
//! nothing in the payload matched.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use crate::error::ExportError;
use crate::fonts::StandardFont;
use crate::page::{
    self, append_content, escape_pdf_string, page_annotation_ids, pdf_err,
    remove_page_annotations, set_resource_entry,
};

/// Bound on `/Parent` and `/Kids` recursion for malformed field trees.
const FIELD_TREE_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    /// Terminal fields present in the document's AcroForm.
    pub field_count: usize,
    /// Fields whose value was set from the payload.
    pub filled: usize,
}

#[derive(Debug, Clone)]
struct TerminalField {
    name: String,
    id: ObjectId,
}

/// Coerce a JSON payload value into the text written to a form field.
pub fn coerce_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Bool(true) => "Yes".to_string(),
        serde_json::Value::Bool(false) => "Off".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fill matching fields from `form_data` and flatten the form. A document
/// without fields is left untouched.
pub fn fill_and_flatten(
    doc: &mut Document,
    form_data: &serde_json::Value,
) -> Result<FillOutcome, ExportError> {
    let fields = collect_terminal_fields(doc)?;
    if fields.is_empty() {
        return Ok(FillOutcome {
            field_count: 0,
            filled: 0,
        });
    }

    let empty = serde_json::Map::new();
    let entries = form_data.as_object().unwrap_or(&empty);

    let mut filled = 0;
    for field in &fields {
        let Some(value) = entries.get(&field.name) else {
            continue;
        };
        let raw = coerce_value(value);
        match apply_value(doc, field, &raw) {
            Ok(()) => filled += 1,
            Err(e) => {
                tracing::debug!(field = %field.name, "skipping unfillable field: {e}");
            }
        }
    }

    flatten(doc, &fields)?;

    Ok(FillOutcome {
        field_count: fields.len(),
        filled,
    })
}

/// Whether the document's AcroForm carries at least one terminal field.
pub fn document_has_fields(doc: &Document) -> bool {
    collect_terminal_fields(doc)
        .map(|f| !f.is_empty())
        .unwrap_or(false)
}

/// Upload-time detection: does the template at `path` have fillable
/// fields? Any load or parse failure reads as "no".
pub fn has_form_fields(path: &Path) -> bool {
    match Document::load(path) {
        Ok(doc) => document_has_fields(&doc),
        Err(_) => false,
    }
}

/// Fully-qualified names of all terminal fields.
pub fn field_names(doc: &Document) -> Vec<String> {
    collect_terminal_fields(doc)
        .map(|fields| fields.into_iter().map(|f| f.name).collect())
        .unwrap_or_default()
}

fn acroform_field_roots(doc: &Document) -> Result<Vec<ObjectId>, ExportError> {
    let catalog = doc.catalog().map_err(pdf_err)?;
    let acro = match catalog.get(b"AcroForm") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };
    let acro_dict = match acro {
        Object::Dictionary(d) => d,
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Dictionary(d)) => d,
            _ => return Ok(Vec::new()),
        },
        _ => return Ok(Vec::new()),
    };
    let fields = match acro_dict.get(b"Fields") {
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Ok(fields.iter().filter_map(|o| o.as_reference().ok()).collect())
}

fn collect_terminal_fields(doc: &Document) -> Result<Vec<TerminalField>, ExportError> {
    let mut out = Vec::new();
    for root in acroform_field_roots(doc)? {
        walk_field(doc, root, None, &mut out, 0);
    }
    Ok(out)
}

fn walk_field(
    doc: &Document,
    id: ObjectId,
    prefix: Option<&str>,
    out: &mut Vec<TerminalField>,
    depth: usize,
) {
    if depth > FIELD_TREE_LIMIT {
        return;
    }
    let Ok(dict) = doc.get_object(id).and_then(Object::as_dict) else {
        return;
    };

    let partial = match dict.get(b"T") {
        Ok(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    };
    let name = match (prefix, partial.as_deref()) {
        (Some(p), Some(t)) => Some(format!("{p}.{t}")),
        (None, Some(t)) => Some(t.to_string()),
        (Some(p), None) => Some(p.to_string()),
        (None, None) => None,
    };

    let kid_ids = kids_of(doc, dict);
    let has_field_kids = kid_ids.iter().any(|kid| {
        doc.get_object(*kid)
            .and_then(Object::as_dict)
            .map(|d| d.get(b"T").is_ok())
            .unwrap_or(false)
    });

    if has_field_kids {
        for kid in kid_ids {
            walk_field(doc, kid, name.as_deref(), out, depth + 1);
        }
    } else if let Some(name) = name {
        out.push(TerminalField { name, id });
    }
}

fn kids_of(doc: &Document, dict: &Dictionary) -> Vec<ObjectId> {
    let arr = match dict.get(b"Kids") {
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    arr.iter().filter_map(|o| o.as_reference().ok()).collect()
}

/// `/FT`, possibly inherited through the field's parents.
fn field_type(doc: &Document, id: ObjectId) -> Option<Vec<u8>> {
    let mut current = id;
    for _ in 0..FIELD_TREE_LIMIT {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(Object::Name(ft)) = dict.get(b"FT") {
            return Some(ft.clone());
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// Current field value as text, inherited through parents.
fn current_value(doc: &Document, id: ObjectId) -> String {
    let mut current = id;
    for _ in 0..FIELD_TREE_LIMIT {
        let Ok(dict) = doc.get_object(current).and_then(Object::as_dict) else {
            return String::new();
        };
        match dict.get(b"V") {
            Ok(Object::String(bytes, _)) => return String::from_utf8_lossy(bytes).into_owned(),
            Ok(Object::Name(bytes)) => return String::from_utf8_lossy(bytes).into_owned(),
            _ => {}
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return String::new(),
        }
    }
    String::new()
}

fn apply_value(
    doc: &mut Document,
    field: &TerminalField,
    raw: &str,
) -> Result<(), ExportError> {
    let ft = field_type(doc, field.id);
    match ft.as_deref() {
        // Signature fields cannot take a text value.
        Some(b"Sig") => Ok(()),
        Some(b"Btn") => {
            let state = if raw.is_empty() { "Off" } else { raw };
            let dict = doc
                .get_object_mut(field.id)
                .map_err(pdf_err)?
                .as_dict_mut()
                .map_err(pdf_err)?;
            dict.set("V", Object::Name(state.as_bytes().to_vec()));
            dict.set("AS", Object::Name(state.as_bytes().to_vec()));
            Ok(())
        }
        _ => {
            let dict = doc
                .get_object_mut(field.id)
                .map_err(pdf_err)?
                .as_dict_mut()
                .map_err(pdf_err)?;
            dict.set(
                "V",
                Object::String(raw.as_bytes().to_vec(), StringFormat::Literal),
            );
            Ok(())
        }
    }
}

/// Widgets belonging to a terminal field: the field itself when it doubles
/// as its own widget, otherwise its `/Kids` that carry a `/Rect`.
fn widget_ids_of(doc: &Document, field_id: ObjectId) -> Vec<ObjectId> {
    let Ok(dict) = doc.get_object(field_id).and_then(Object::as_dict) else {
        return Vec::new();
    };
    if dict.get(b"Rect").is_ok() {
        return vec![field_id];
    }
    kids_of(doc, dict)
        .into_iter()
        .filter(|kid| {
            doc.get_object(*kid)
                .and_then(Object::as_dict)
                .map(|d| d.get(b"Rect").is_ok())
                .unwrap_or(false)
        })
        .collect()
}

fn widget_rect(doc: &Document, widget: &Dictionary) -> Option<[f64; 4]> {
    let arr = match widget.get(b"Rect") {
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => return None,
        },
        _ => return None,
    };
    let [x1, y1, x2, y2] = page::numbers4(&arr)?;
    Some([x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs()])
}

/// For button widgets with an appearance dictionary, only paint the mark
/// when the widget actually has an appearance state for the value
/// (keeps radio groups from marking every kid).
fn widget_accepts_state(doc: &Document, widget: &Dictionary, state: &str) -> bool {
    let ap = match widget.get(b"AP") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Dictionary(d)) => d.clone(),
            _ => return true,
        },
        _ => return true,
    };
    let normal = match ap.get(b"N") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Dictionary(d)) => d.clone(),
            _ => return true,
        },
        _ => return true,
    };
    normal.iter().any(|(key, _)| key.as_slice() == state.as_bytes())
}

/// Content-stream operations that bake one widget's value into the page.
/// Returns `None` for widgets with nothing to paint.
fn paint_widget(doc: &Document, widget_id: ObjectId, field_id: ObjectId) -> Option<String> {
    let widget = doc.get_object(widget_id).and_then(Object::as_dict).ok()?;
    let [x, y, w, h] = widget_rect(doc, widget)?;
    let value = current_value(doc, field_id);
    if value.is_empty() {
        return None;
    }

    match field_type(doc, field_id).as_deref() {
        Some(b"Btn") => {
            if value == "Off" || !widget_accepts_state(doc, widget, &value) {
                return None;
            }
            let s = w.min(h);
            Some(format!(
                "q\n0 G\n2 w\n{x1:.2} {y1:.2} m\n{x2:.2} {y2:.2} l\n{x3:.2} {y3:.2} l\nS\nQ\n",
                x1 = x + s * 0.2,
                y1 = y + s * 0.5,
                x2 = x + s * 0.4,
                y2 = y + s * 0.3,
                x3 = x + s * 0.8,
                y3 = y + s * 0.8,
            ))
        }
        Some(b"Sig") => None,
        _ => {
            let font_size = (h * 0.6).clamp(8.0, 14.0);
            let text_y = y + (h - font_size) / 2.0;
            Some(format!(
                "q\nBT\n/{res} {fs:.2} Tf\n0 0 0 rg\n{tx:.2} {ty:.2} Td\n({text}) Tj\nET\nQ\n",
                res = StandardFont::Helvetica.resource_name(),
                fs = font_size,
                tx = x + 4.0,
                ty = text_y,
                text = escape_pdf_string(&value),
            ))
        }
    }
}

/// Bake all widget values into page content, then strip the interactive
/// layer: widget annotations, field objects, and the catalog's AcroForm.
fn flatten(doc: &mut Document, fields: &[TerminalField]) -> Result<(), ExportError> {
    let mut widgets: Vec<(ObjectId, ObjectId)> = Vec::new();
    for field in fields {
        for widget in widget_ids_of(doc, field.id) {
            widgets.push((widget, field.id));
        }
    }
    let widget_set: BTreeSet<ObjectId> = widgets.iter().map(|(w, _)| *w).collect();

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let mut page_content: BTreeMap<ObjectId, String> = BTreeMap::new();
    let mut text_pages: BTreeSet<ObjectId> = BTreeSet::new();

    for page_id in &pages {
        for annot_id in page_annotation_ids(doc, *page_id) {
            let Some(&(_, field_id)) = widgets.iter().find(|(w, _)| *w == annot_id) else {
                continue;
            };
            if let Some(ops) = paint_widget(doc, annot_id, field_id) {
                if ops.contains("Tj") {
                    text_pages.insert(*page_id);
                }
                page_content.entry(*page_id).or_default().push_str(&ops);
            }
        }
        remove_page_annotations(doc, *page_id, &widget_set)?;
    }

    for page_id in &text_pages {
        let font_id = page::add_standard_font(doc, StandardFont::Helvetica.base_name());
        set_resource_entry(
            doc,
            *page_id,
            "Font",
            StandardFont::Helvetica.resource_name(),
            font_id,
        )?;
    }
    for (page_id, content) in page_content {
        append_content(doc, page_id, &content)?;
    }

    let catalog = doc.catalog_mut().map_err(pdf_err)?;
    catalog.remove(b"AcroForm");

    for (widget, _) in &widgets {
        doc.delete_object(*widget);
    }
    for field in fields {
        doc.delete_object(field.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Single page document with a text field and a checkbox.
    fn doc_with_form() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let text_field_id = doc.add_object(Dictionary::from_iter([
            ("FT", Object::Name(b"Tx".to_vec())),
            (
                "T",
                Object::String(b"applicant_name".to_vec(), StringFormat::Literal),
            ),
            (
                "Rect",
                Object::Array(vec![100.into(), 600.into(), 300.into(), 620.into()]),
            ),
            ("Type", Object::Name(b"Annot".to_vec())),
            ("Subtype", Object::Name(b"Widget".to_vec())),
        ]));

        let checkbox_id = doc.add_object(Dictionary::from_iter([
            ("FT", Object::Name(b"Btn".to_vec())),
            (
                "T",
                Object::String(b"agreed".to_vec(), StringFormat::Literal),
            ),
            (
                "Rect",
                Object::Array(vec![100.into(), 560.into(), 115.into(), 575.into()]),
            ),
            ("Type", Object::Name(b"Annot".to_vec())),
            ("Subtype", Object::Name(b"Widget".to_vec())),
        ]));

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
            (
                "Annots",
                Object::Array(vec![
                    Object::Reference(text_field_id),
                    Object::Reference(checkbox_id),
                ]),
            ),
        ]));

        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let acroform_id = doc.add_object(Dictionary::from_iter([(
            "Fields",
            Object::Array(vec![
                Object::Reference(text_field_id),
                Object::Reference(checkbox_id),
            ]),
        )]));

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
            ("AcroForm", Object::Reference(acroform_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        (doc, page_id)
    }

    fn fieldless_doc() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]));
        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        (doc, page_id)
    }

    #[test]
    fn coercion_table() {
        assert_eq!(coerce_value(&json!(true)), "Yes");
        assert_eq!(coerce_value(&json!(false)), "Off");
        assert_eq!(coerce_value(&json!("text")), "text");
        assert_eq!(coerce_value(&json!(42)), "42");
        assert_eq!(coerce_value(&json!(3.5)), "3.5");
        assert_eq!(coerce_value(&json!(null)), "null");
        assert_eq!(coerce_value(&json!(["a", 1])), r#"["a",1]"#);
    }

    #[test]
    fn collects_field_names() {
        let (doc, _) = doc_with_form();
        let names = field_names(&doc);
        assert_eq!(names, vec!["applicant_name", "agreed"]);
        assert!(document_has_fields(&doc));
    }

    #[test]
    fn fieldless_document_reports_none() {
        let (doc, _) = fieldless_doc();
        assert!(!document_has_fields(&doc));
        assert!(field_names(&doc).is_empty());
    }

    #[test]
    fn fill_sets_values_and_flattens() {
        let (mut doc, page_id) = doc_with_form();
        let outcome = fill_and_flatten(
            &mut doc,
            &json!({"applicant_name": "Ada Lovelace", "agreed": true}),
        )
        .unwrap();
        assert_eq!(
            outcome,
            FillOutcome {
                field_count: 2,
                filled: 2
            }
        );

        // Form is gone.
        assert!(doc.catalog().unwrap().get(b"AcroForm").is_err());
        assert!(page_annotation_ids(&doc, page_id).is_empty());
        assert!(!document_has_fields(&doc));

        // Value text was painted into page content.
        let content = doc.get_page_content(page_id).unwrap();
        let content = String::from_utf8_lossy(&content);
        assert!(content.contains("Ada Lovelace"));
    }

    #[test]
    fn unmatched_fields_are_left_alone_but_still_flattened() {
        let (mut doc, page_id) = doc_with_form();
        let outcome = fill_and_flatten(&mut doc, &json!({"unrelated_key": "x"})).unwrap();
        assert_eq!(outcome.field_count, 2);
        assert_eq!(outcome.filled, 0);

        // Flattening still removed the interactive layer.
        assert!(doc.catalog().unwrap().get(b"AcroForm").is_err());
        assert!(page_annotation_ids(&doc, page_id).is_empty());
    }

    #[test]
    fn fieldless_document_is_a_noop() {
        let (mut doc, page_id) = fieldless_doc();
        let before = format!("{:?}", doc.get_object(page_id));
        let outcome = fill_and_flatten(&mut doc, &json!({"anything": 1})).unwrap();
        assert_eq!(outcome.field_count, 0);
        let after = format!("{:?}", doc.get_object(page_id));
        assert_eq!(before, after);
    }

    #[test]
    fn checkbox_true_paints_checkmark() {
        let (mut doc, page_id) = doc_with_form();
        fill_and_flatten(&mut doc, &json!({"agreed": true})).unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        let content = String::from_utf8_lossy(&content);
        // Checkmark strokes end in a stroke operator.
        assert!(content.contains("S\nQ"));
    }

    #[test]
    fn checkbox_false_paints_nothing() {
        let (mut doc, page_id) = doc_with_form();
        fill_and_flatten(&mut doc, &json!({"agreed": false})).unwrap();
        let content = doc.get_page_content(page_id).unwrap_or_default();
        let content = String::from_utf8_lossy(&content);
        assert!(!content.contains("S\nQ"));
    }

    #[test]
    fn number_payload_is_written_literally() {
        let (mut doc, page_id) = doc_with_form();
        fill_and_flatten(&mut doc, &json!({"applicant_name": 1234})).unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        let content = String::from_utf8_lossy(&content);
        assert!(content.contains("(1234) Tj"));
    }
}
