//! Minimal PDFs built in memory
//!
//! Shared by the crate's unit tests and the integration tests.

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;

/// One image XObject drawn on a page
#[derive(Debug, Clone, Copy)]
pub enum TestImage {
    /// Baseline JPEG behind DCTDecode
    Jpeg { width: u32, height: u32 },
    /// 8-bit RGB samples behind FlateDecode
    FlateRgb { width: u32, height: u32 },
    /// 8-bit gray samples with no filter at all
    RawGray { width: u32, height: u32 },
    /// Image dictionary that lacks /Width
    MissingWidth,
    /// Samples behind a filter the reader does not decode
    Jbig2,
}

/// Where image XObjects are declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePlacement {
    /// Each page carries its own /Resources
    OnPage,
    /// Pages carry nothing and inherit from the /Pages node
    Inherited,
}

/// Build a PDF with one page per entry of `pages`, each showing its text
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let pages: Vec<(&str, Vec<TestImage>)> = pages.iter().map(|text| (*text, Vec::new())).collect();
    illustrated_pdf(&pages, ResourcePlacement::Inherited)
}

/// Build a PDF whose pages show text and then draw their images in order
///
/// XObject dictionaries list images in reverse drawing order, so only a
/// reader that follows the content stream sees them in the order given.
pub fn illustrated_pdf(pages: &[(&str, Vec<TestImage>)], placement: ResourcePlacement) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut shared_xobjects: Vec<(String, ObjectId)> = Vec::new();
    let mut kids: Vec<Object> = Vec::new();
    for (page_index, (text, images)) in pages.iter().enumerate() {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(*text)]),
            Operation::new("ET", vec![]),
        ];

        let mut page_xobjects: Vec<(String, ObjectId)> = Vec::new();
        for (image_index, image) in images.iter().enumerate() {
            let name = format!("Im{}x{}", page_index + 1, image_index + 1);
            let image_id = doc.add_object(image_stream(*image));
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![100.into(), 0.into(), 0.into(), 100.into(), 72.into(), 500.into()],
                ),
                Operation::new("Do", vec![name.as_str().into()]),
                Operation::new("Q", vec![]),
            ]);
            page_xobjects.push((name, image_id));
        }

        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            Content { operations }.encode().unwrap(),
        ));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        match placement {
            ResourcePlacement::OnPage => {
                page.set("Resources", resources(font_id, &page_xobjects));
            }
            ResourcePlacement::Inherited => shared_xobjects.extend(page_xobjects),
        }
        kids.push(doc.add_object(page).into());
    }

    let resources_id = doc.add_object(resources(font_id, &shared_xobjects));
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn resources(font_id: ObjectId, xobjects: &[(String, ObjectId)]) -> Dictionary {
    let mut xobject = Dictionary::new();
    for (name, id) in xobjects.iter().rev() {
        xobject.set(name.as_bytes().to_vec(), *id);
    }
    dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => xobject,
    }
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}

fn image_stream(image: TestImage) -> Stream {
    match image {
        TestImage::Jpeg { width, height } => {
            let pixels = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
            let mut jpeg = Vec::new();
            DynamicImage::ImageRgb8(pixels)
                .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
                .unwrap();
            let mut dict = image_dict(width, height, "DeviceRGB");
            dict.set("Filter", "DCTDecode");
            Stream::new(dict, jpeg)
        }
        TestImage::FlateRgb { width, height } => {
            let samples = vec![90u8; (width * height * 3) as usize];
            let mut stream = Stream::new(dictionary! {}, samples);
            stream.compress().unwrap();
            assert!(stream.dict.has(b"Filter"), "samples too small to deflate");
            for (key, value) in image_dict(width, height, "DeviceRGB").iter() {
                stream.dict.set(key.clone(), value.clone());
            }
            stream
        }
        TestImage::RawGray { width, height } => Stream::new(
            image_dict(width, height, "DeviceGray"),
            vec![128u8; (width * height) as usize],
        ),
        TestImage::MissingWidth => {
            let mut dict = image_dict(4, 4, "DeviceGray");
            dict.remove(b"Width");
            Stream::new(dict, vec![0u8; 16])
        }
        TestImage::Jbig2 => {
            let mut dict = image_dict(4, 4, "DeviceGray");
            dict.set("Filter", "JBIG2Decode");
            Stream::new(dict, vec![0x97, 0x4a, 0x42, 0x32])
        }
    }
}
