//! PDF page loader: per-page text and decoded raster images

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Content of a single page, in document order
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page number (1-indexed)
    pub number: u32,
    /// Text of the page
    pub text: String,
    /// Embedded raster images; a decode failure is kept in place so that
    /// encounter order is preserved
    pub images: Vec<ImageSlot>,
}

/// Multi-strategy PDF reader
pub struct PdfReader;

impl PdfReader {
    /// Load every page of a PDF held in memory
    pub fn read(data: &[u8]) -> Result<Vec<PdfPage>> {
        let doc = Document::load_mem(data)
            .map_err(|e| Error::Document(format!("Failed to load PDF: {}", e)))?;
        let pages = doc.get_pages();

        let texts = match Self::extract_texts_with_timeout(data, pages.len()) {
            Some(texts) => texts,
            None => pages
                .keys()
                .map(|&number| {
                    doc.extract_text(&[number]).unwrap_or_else(|e| {
                        tracing::debug!("Could not extract text of page {}: {}", number, e);
                        String::new()
                    })
                })
                .collect(),
        };

        Ok(pages
            .iter()
            .zip(texts)
            .map(|((&number, &page_id), text)| PdfPage {
                number,
                text: normalize_page_text(&text),
                images: Self::page_images(&doc, page_id, number),
            })
            .collect())
    }

    /// Per-page text through pdf-extract, bounded in time
    ///
    /// Returns `None` when pdf-extract fails, hangs, panics, or disagrees
    /// with lopdf about the page count.
    fn extract_texts_with_timeout(data: &[u8], page_count: usize) -> Option<Vec<String>> {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem_by_pages(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(Duration::from_secs(60)) {
            Ok(Ok(texts)) if texts.len() == page_count => Some(texts),
            Ok(Ok(texts)) => {
                tracing::warn!(
                    "pdf-extract returned {} pages, expected {}; using fallback",
                    texts.len(),
                    page_count
                );
                None
            }
            Ok(Err(e)) => {
                tracing::warn!("pdf-extract failed: {}, using fallback", e);
                None
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!("PDF text extraction timeout after 60s, using fallback");
                None
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF text extraction thread crashed, using fallback");
                None
            }
        }
    }

    /// Images drawn on a page, in drawing order
    ///
    /// Every image XObject yields exactly one slot. A slot that cannot be
    /// decoded holds the reason instead of the image.
    fn page_images(doc: &Document, page_id: ObjectId, number: u32) -> Vec<ImageSlot> {
        let Some(resources) = doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|page| inherited_resources(doc, page))
        else {
            tracing::debug!("Page {} has no resources", number);
            return Vec::new();
        };

        let content = match doc.get_and_decode_page_content(page_id) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(
                    "Content of page {} undecodable ({}), taking XObjects in declared order",
                    number,
                    e
                );
                None
            }
        };

        let mut images = Vec::new();
        collect_images(
            doc,
            resources,
            content.as_ref().map(|c| c.operations.as_slice()),
            0,
            &mut images,
        );
        images
    }
}

/// One embedded image, or why it could not be decoded
pub type ImageSlot = std::result::Result<DynamicImage, String>;

const MAX_TREE_DEPTH: usize = 32;
const MAX_FORM_DEPTH: usize = 8;

/// Nearest /Resources on the page or any ancestor in the page tree
fn inherited_resources<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Dictionary> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = doc.get_dict_in_dict(node, b"Resources") {
            return Some(resources);
        }
        node = node
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|parent| doc.get_dictionary(parent))
            .ok()?;
    }
    None
}

/// XObject names invoked by `Do`, first use only
fn drawn_names(operations: &[Operation]) -> Vec<&[u8]> {
    let mut names: Vec<&[u8]> = Vec::new();
    for op in operations.iter().filter(|op| op.operator == "Do") {
        if let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Walk the XObjects of one content stream, descending into forms
///
/// Without decoded operations every declared XObject is taken in
/// dictionary order.
fn collect_images(
    doc: &Document,
    resources: &Dictionary,
    operations: Option<&[Operation]>,
    depth: usize,
    images: &mut Vec<ImageSlot>,
) {
    let Ok(xobjects) = doc.get_dict_in_dict(resources, b"XObject") else {
        return;
    };
    let names = match operations {
        Some(operations) => drawn_names(operations),
        None => xobjects.iter().map(|(name, _)| name.as_slice()).collect(),
    };

    for name in names {
        let label = String::from_utf8_lossy(name);
        let stream = match xobjects
            .get(name)
            .and_then(|object| doc.dereference(object))
            .and_then(|(_, object)| object.as_stream())
        {
            Ok(stream) => stream,
            Err(e) => {
                images.push(Err(format!("XObject {} unreadable: {}", label, e)));
                continue;
            }
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name_str) {
            Ok("Image") => {
                let decoded = decode_image(stream)
                    .map(|image| DynamicImage::ImageRgb8(image.to_rgb8()))
                    .map_err(|e| format!("Image {}: {}", label, e));
                images.push(decoded);
            }
            Ok("Form") if depth < MAX_FORM_DEPTH => {
                let form_resources = doc
                    .get_dict_in_dict(&stream.dict, b"Resources")
                    .unwrap_or(resources);
                match stream
                    .get_plain_content()
                    .and_then(|data| Content::decode(&data))
                {
                    Ok(content) => collect_images(
                        doc,
                        form_resources,
                        Some(content.operations.as_slice()),
                        depth + 1,
                        images,
                    ),
                    Err(e) => tracing::debug!("Form {} undecodable: {}", label, e),
                }
            }
            _ => {}
        }
    }
}

/// Decode one image XObject stream
fn decode_image(stream: &Stream) -> std::result::Result<DynamicImage, String> {
    let dict = &stream.dict;
    let filters = if dict.has(b"Filter") {
        stream
            .filters()
            .map_err(|e| format!("unreadable /Filter: {}", e))?
    } else {
        Vec::new()
    };

    if filters.iter().any(|f| f == "DCTDecode") {
        return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|e| format!("JPEG decode failed: {}", e));
    }
    if !filters.iter().all(|f| f == "FlateDecode") {
        return Err(format!("unsupported filters {:?}", filters));
    }

    let width = required_integer(dict, b"Width")?;
    let height = required_integer(dict, b"Height")?;
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);

    // lopdf refuses to inflate streams typed as images
    let mut plain = stream.clone();
    plain.dict.remove(b"Subtype");
    let raw = plain
        .get_plain_content()
        .map_err(|e| format!("inflate failed: {}", e))?;

    decode_raw_pixels(&raw, width, height, bits)
}

fn required_integer(dict: &Dictionary, key: &[u8]) -> std::result::Result<i64, String> {
    dict.get(key)
        .and_then(Object::as_i64)
        .map_err(|_| format!("missing /{}", String::from_utf8_lossy(key)))
}

/// Decode uncompressed 8-bit Gray, RGB or CMYK samples into an image
pub fn decode_raw_pixels(
    raw: &[u8],
    width: i64,
    height: i64,
    bits_per_component: i64,
) -> std::result::Result<DynamicImage, String> {
    if bits_per_component != 8 {
        return Err(format!("Unsupported bits per component: {}", bits_per_component));
    }
    let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(format!("Invalid image size {}x{}", width, height)),
    };
    let pixels = w as usize * h as usize;
    if raw.len() < pixels || raw.len() % pixels != 0 {
        return Err(format!(
            "Sample data ({} bytes) does not match {}x{} image",
            raw.len(),
            w,
            h
        ));
    }

    let image = match raw.len() / pixels {
        1 => GrayImage::from_raw(w, h, raw.to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(w, h, raw.to_vec()).map(DynamicImage::ImageRgb8),
        4 => {
            let rgb = raw
                .chunks_exact(4)
                .flat_map(|cmyk| {
                    let k = 255 - cmyk[3] as u16;
                    let channel = |v: u8| ((255 - v as u16) * k / 255) as u8;
                    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
                })
                .collect();
            RgbImage::from_raw(w, h, rgb).map(DynamicImage::ImageRgb8)
        }
        n => return Err(format!("Unsupported sample layout: {} channels", n)),
    };
    image.ok_or_else(|| "Sample buffer too small".to_string())
}

/// Strip NULs and expand common ligatures
fn normalize_page_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

#[cfg(test)]
#[path = "../../tests/common/pdf.rs"]
pub(crate) mod test_pdf;
