//! Page-level lopdf plumbing shared by the filler, renderer, and overlay
//!
//! Covers the awkward parts of the PDF object graph: media boxes that hide
//! behind references or parent nodes, `/Contents` that may be a single
//! stream or an array, and `/Resources` dictionaries that can be inline,
//! referenced, or inherited.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::ExportError;

/// Maximum `Parent` hops when resolving inherited page attributes.
const PARENT_WALK_LIMIT: usize = 10;

/// US Letter, the fallback when a page tree carries no usable MediaBox.
const LETTER_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

pub(crate) fn pdf_err(e: lopdf::Error) -> ExportError {
    ExportError::Processing(e.to_string())
}

/// Escape special characters for a PDF literal string. Non-ASCII input is
/// replaced, matching the WinAnsi reach of the standard fonts.
pub fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            _ if c.is_ascii() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

/// Resolve a page's MediaBox corners `[x1, y1, x2, y2]`, following
/// indirect references and walking up the page tree. Defaults to US
/// Letter.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let mut current = page_id;
    for _ in 0..PARENT_WALK_LIMIT {
        let Ok(dict) = doc.get_object(current).and_then(Object::as_dict) else {
            return LETTER_MEDIA_BOX;
        };

        if let Ok(obj) = dict.get(b"MediaBox") {
            let arr = match obj {
                Object::Array(arr) => Some(arr),
                Object::Reference(id) => match doc.get_object(*id) {
                    Ok(Object::Array(arr)) => Some(arr),
                    _ => None,
                },
                _ => None,
            };
            if let Some(arr) = arr {
                if let Some(mb) = numbers4(arr) {
                    return mb;
                }
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => break,
        }
    }
    LETTER_MEDIA_BOX
}

/// Page width and height from the media box.
pub fn page_size(doc: &Document, page_id: ObjectId) -> (f64, f64) {
    let [x1, y1, x2, y2] = media_box(doc, page_id);
    ((x2 - x1).abs(), (y2 - y1).abs())
}

pub(crate) fn numbers4(arr: &[Object]) -> Option<[f64; 4]> {
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, obj) in out.iter_mut().zip(arr) {
        *slot = match obj {
            Object::Integer(i) => *i as f64,
            Object::Real(r) => *r as f64,
            _ => return None,
        };
    }
    Some(out)
}

/// Append a content stream to a page, preserving whatever `/Contents`
/// shape the page already uses.
pub fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: &str,
) -> Result<(), ExportError> {
    let stream = Stream::new(Dictionary::new(), content.as_bytes().to_vec());
    let content_id = doc.add_object(Object::Stream(stream));

    let page = doc
        .get_object_mut(page_id)
        .map_err(pdf_err)?
        .as_dict_mut()
        .map_err(pdf_err)?;

    let existing = page.get(b"Contents").ok().cloned();
    match existing {
        Some(Object::Reference(existing_id)) => {
            page.set(
                "Contents",
                Object::Array(vec![
                    Object::Reference(existing_id),
                    Object::Reference(content_id),
                ]),
            );
        }
        Some(Object::Array(mut arr)) => {
            arr.push(Object::Reference(content_id));
            page.set("Contents", Object::Array(arr));
        }
        _ => {
            page.set("Contents", Object::Reference(content_id));
        }
    }
    Ok(())
}

/// Register `name -> target` under a `/Resources` category (`Font`,
/// `XObject`) of a page. Inherited resources are copied down onto the page
/// first so existing content keeps resolving.
pub fn set_resource_entry(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    target: ObjectId,
) -> Result<(), ExportError> {
    ensure_own_resources(doc, page_id)?;

    // Locate the resources dictionary (inline in the page or referenced).
    let res_ref = {
        let page = doc
            .get_object(page_id)
            .map_err(pdf_err)?
            .as_dict()
            .map_err(pdf_err)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    // If the category itself is an indirect dictionary, mutate it in place.
    let cat_ref = {
        let res_dict = match res_ref {
            Some(rid) => doc
                .get_object(rid)
                .map_err(pdf_err)?
                .as_dict()
                .map_err(pdf_err)?,
            None => {
                let page = doc
                    .get_object(page_id)
                    .map_err(pdf_err)?
                    .as_dict()
                    .map_err(pdf_err)?;
                match page.get(b"Resources") {
                    Ok(Object::Dictionary(d)) => d,
                    _ => return Err(ExportError::Processing("page has no resources".into())),
                }
            }
        };
        match res_dict.get(category.as_bytes()) {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    if let Some(cid) = cat_ref {
        let cat = doc
            .get_object_mut(cid)
            .map_err(pdf_err)?
            .as_dict_mut()
            .map_err(pdf_err)?;
        cat.set(name, Object::Reference(target));
        return Ok(());
    }

    match res_ref {
        Some(rid) => {
            let res = doc
                .get_object_mut(rid)
                .map_err(pdf_err)?
                .as_dict_mut()
                .map_err(pdf_err)?;
            let mut cat = match res.get(category.as_bytes()) {
                Ok(Object::Dictionary(d)) => d.clone(),
                _ => Dictionary::new(),
            };
            cat.set(name, Object::Reference(target));
            res.set(category, Object::Dictionary(cat));
        }
        None => {
            let page = doc
                .get_object_mut(page_id)
                .map_err(pdf_err)?
                .as_dict_mut()
                .map_err(pdf_err)?;
            let mut res = match page.get(b"Resources") {
                Ok(Object::Dictionary(d)) => d.clone(),
                _ => Dictionary::new(),
            };
            let mut cat = match res.get(category.as_bytes()) {
                Ok(Object::Dictionary(d)) => d.clone(),
                _ => Dictionary::new(),
            };
            cat.set(name, Object::Reference(target));
            res.set(category, Object::Dictionary(cat));
            page.set("Resources", Object::Dictionary(res));
        }
    }
    Ok(())
}

/// Give the page its own `/Resources` entry, cloning an inherited
/// dictionary from the page tree when the page itself has none.
fn ensure_own_resources(doc: &mut Document, page_id: ObjectId) -> Result<(), ExportError> {
    let has_own = {
        let page = doc
            .get_object(page_id)
            .map_err(pdf_err)?
            .as_dict()
            .map_err(pdf_err)?;
        page.get(b"Resources").is_ok()
    };
    if has_own {
        return Ok(());
    }

    let inherited = inherited_resources(doc, page_id).unwrap_or_default();
    let page = doc
        .get_object_mut(page_id)
        .map_err(pdf_err)?
        .as_dict_mut()
        .map_err(pdf_err)?;
    page.set("Resources", Object::Dictionary(inherited));
    Ok(())
}

fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut current = page_id;
    for _ in 0..PARENT_WALK_LIMIT {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(obj) = dict.get(b"Resources") {
            return match obj {
                Object::Dictionary(d) => Some(d.clone()),
                Object::Reference(id) => match doc.get_object(*id) {
                    Ok(Object::Dictionary(d)) => Some(d.clone()),
                    _ => None,
                },
                _ => None,
            };
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// Resolve a page's `/Annots` into widget object ids, following an
/// indirect array if present. Missing annotations resolve to empty.
pub fn page_annotation_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) else {
        return Vec::new();
    };
    let arr = match page.get(b"Annots") {
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    arr.iter()
        .filter_map(|o| o.as_reference().ok())
        .collect()
}

/// Drop the given annotation ids from a page's `/Annots`, preserving the
/// array's inline-vs-referenced shape.
pub fn remove_page_annotations(
    doc: &mut Document,
    page_id: ObjectId,
    remove: &std::collections::BTreeSet<ObjectId>,
) -> Result<(), ExportError> {
    let annots_ref = {
        let page = doc
            .get_object(page_id)
            .map_err(pdf_err)?
            .as_dict()
            .map_err(pdf_err)?;
        match page.get(b"Annots") {
            Ok(Object::Reference(id)) => Some(*id),
            Ok(Object::Array(_)) => None,
            _ => return Ok(()),
        }
    };

    let retain = |arr: &[Object]| -> Vec<Object> {
        arr.iter()
            .filter(|o| match o.as_reference() {
                Ok(id) => !remove.contains(&id),
                Err(_) => true,
            })
            .cloned()
            .collect()
    };

    match annots_ref {
        Some(aid) => {
            let obj = doc.get_object_mut(aid).map_err(pdf_err)?;
            if let Object::Array(arr) = obj {
                let kept = retain(arr);
                *arr = kept;
            }
        }
        None => {
            let page = doc
                .get_object_mut(page_id)
                .map_err(pdf_err)?
                .as_dict_mut()
                .map_err(pdf_err)?;
            let existing = page.get(b"Annots").ok().cloned();
            if let Some(Object::Array(arr)) = existing {
                let kept = retain(&arr);
                page.set("Annots", Object::Array(kept));
            }
        }
    }
    Ok(())
}

/// Create a Type1 standard-font dictionary and return its object id.
pub fn add_standard_font(doc: &mut Document, base_font: &str) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
    doc.add_object(Object::Dictionary(font))
}
