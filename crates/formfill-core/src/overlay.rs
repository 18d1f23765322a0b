//! Drawing overlay compositing
//!
//! Drafts can carry a PNG captured from the client's drawing canvas. The
//! compositor embeds it as an image XObject and paints it onto the first
//! page at a fixed size in the top-right corner. Transparency survives via
//! an `/SMask` so the drawing does not blank out the content underneath.
//!
//! Unlike annotation rendering, a failure here (missing or unreadable
//! file) propagates: the export wrapper turns it into a degraded
//! template-copy export.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, Stream};

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::page::{append_content, media_box, set_resource_entry};

/// Resource name of the embedded drawing image.
const DRAWING_RESOURCE: &str = "FfDraw";

struct DecodedPng {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

/// Composite the PNG at `path` onto page 1.
pub fn composite_drawing(
    doc: &mut Document,
    path: &Path,
    config: &ExportConfig,
) -> Result<(), ExportError> {
    let image = decode_png(path)?;

    let pages = doc.get_pages();
    let Some(&page_id) = pages.get(&1) else {
        return Err(ExportError::Overlay("document has no pages".into()));
    };

    let image_id = {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(image.width as i64));
        dict.set("Height", Object::Integer(image.height as i64));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));

        if let Some(alpha) = &image.alpha {
            let mut mask_dict = Dictionary::new();
            mask_dict.set("Type", Object::Name(b"XObject".to_vec()));
            mask_dict.set("Subtype", Object::Name(b"Image".to_vec()));
            mask_dict.set("Width", Object::Integer(image.width as i64));
            mask_dict.set("Height", Object::Integer(image.height as i64));
            mask_dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
            mask_dict.set("BitsPerComponent", Object::Integer(8));
            mask_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            let mask_id = doc.add_object(Object::Stream(Stream::new(mask_dict, flate(alpha)?)));
            dict.set("SMask", Object::Reference(mask_id));
        }

        doc.add_object(Object::Stream(Stream::new(dict, flate(&image.rgb)?)))
    };

    set_resource_entry(doc, page_id, "XObject", DRAWING_RESOURCE, image_id)?;

    let [mb_x1, mb_y1, mb_x2, mb_y2] = media_box(doc, page_id);
    let page_width = (mb_x2 - mb_x1).abs();
    let page_height = (mb_y2 - mb_y1).abs();
    let x = mb_x1 + page_width - config.overlay_width - config.overlay_margin;
    let y = mb_y1 + page_height - config.overlay_height - config.overlay_margin;

    let content = format!(
        "q\n{w} 0 0 {h} {x} {y} cm\n/{name} Do\nQ\n",
        w = config.overlay_width,
        h = config.overlay_height,
        name = DRAWING_RESOURCE,
    );
    append_content(doc, page_id, &content)
}

fn decode_png(path: &Path) -> Result<DecodedPng, ExportError> {
    let file = File::open(path)?;
    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

    let mut reader = decoder
        .read_info()
        .map_err(|e| ExportError::Overlay(e.to_string()))?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| ExportError::Overlay(e.to_string()))?;
    let data = &buf[..info.buffer_size()];

    let (rgb, alpha) = match info.color_type {
        png::ColorType::Rgb => (data.to_vec(), None),
        png::ColorType::Rgba => {
            let mut rgb = Vec::with_capacity(data.len() / 4 * 3);
            let mut alpha = Vec::with_capacity(data.len() / 4);
            for px in data.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
                alpha.push(px[3]);
            }
            (rgb, Some(alpha))
        }
        png::ColorType::Grayscale => {
            (data.iter().flat_map(|&g| [g, g, g]).collect(), None)
        }
        png::ColorType::GrayscaleAlpha => {
            let mut rgb = Vec::with_capacity(data.len() / 2 * 3);
            let mut alpha = Vec::with_capacity(data.len() / 2);
            for px in data.chunks_exact(2) {
                rgb.extend_from_slice(&[px[0], px[0], px[0]]);
                alpha.push(px[1]);
            }
            (rgb, Some(alpha))
        }
        other => {
            return Err(ExportError::Overlay(format!(
                "unsupported PNG color type {other:?}"
            )))
        }
    };

    Ok(DecodedPng {
        width: info.width,
        height: info.height,
        rgb,
        alpha,
    })
}

fn flate(data: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
