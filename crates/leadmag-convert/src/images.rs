//! Image XObject extraction
//!
//! DCTDecode streams already contain a complete JPEG and pass through
//! unchanged. Flate-compressed (or unfiltered) raw samples are re-encoded as
//! PNG via the `image` crate. Unsupported encodings are skipped with a
//! warning rather than failing the document.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};

use crate::document::PdfDocument;

/// Output encoding of an extracted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Jpeg,
    Png,
}

impl ImageEncoding {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "jpg",
            ImageEncoding::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Png => "image/png",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub data: Vec<u8>,
    pub encoding: ImageEncoding,
}

/// Extract an image XObject by resource name from the page's `/XObject`
/// dictionary. Returns `None` for non-image XObjects (forms) and for
/// encodings we can't decode.
pub fn extract_image(
    doc: &PdfDocument,
    resources: &lopdf::Dictionary,
    name: &[u8],
) -> Option<ExtractedImage> {
    let stream = lookup_xobject_stream(doc, resources, name)?;

    let subtype = stream.dict.get(b"Subtype").ok()?.as_name().ok()?;
    if subtype != b"Image" {
        return None;
    }

    let filters = stream_filters(&stream.dict);

    if filters.iter().any(|f| f == "DCTDecode") {
        // The stream body is a complete JPEG
        return Some(ExtractedImage {
            data: stream.content.clone(),
            encoding: ImageEncoding::Jpeg,
        });
    }

    let raw = if filters.is_empty() {
        stream.content.clone()
    } else if filters.iter().all(|f| f == "FlateDecode") {
        match stream.decompressed_content() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decompress image stream, skipping");
                return None;
            }
        }
    } else {
        tracing::warn!(filters = ?filters, "unsupported image filters, skipping");
        return None;
    };

    let width = dict_u32(&stream.dict, b"Width")?;
    let height = dict_u32(&stream.dict, b"Height")?;
    let bpc = dict_u32(&stream.dict, b"BitsPerComponent").unwrap_or(8);
    if bpc != 8 {
        tracing::warn!(bits_per_component = bpc, "unsupported bit depth, skipping");
        return None;
    }

    let components = color_components(doc, &stream.dict);
    encode_raw_as_png(&raw, width, height, components).map(|data| ExtractedImage {
        data,
        encoding: ImageEncoding::Png,
    })
}

fn lookup_xobject_stream<'a>(
    doc: &'a PdfDocument,
    resources: &'a lopdf::Dictionary,
    name: &[u8],
) -> Option<&'a lopdf::Stream> {
    let xobjects = resources.get(b"XObject").ok()?;
    let xobjects = match xobjects {
        lopdf::Object::Reference(id) => doc.inner().get_object(*id).ok()?,
        other => other,
    };
    let entry = xobjects.as_dict().ok()?.get(name).ok()?;
    let entry = match entry {
        lopdf::Object::Reference(id) => doc.inner().get_object(*id).ok()?,
        other => other,
    };
    entry.as_stream().ok()
}

fn stream_filters(dict: &lopdf::Dictionary) -> Vec<String> {
    match dict.get(b"Filter") {
        Ok(lopdf::Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Ok(lopdf::Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

fn dict_u32(dict: &lopdf::Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key).ok()?.as_i64().ok().map(|v| v as u32)
}

/// Number of samples per pixel for the image's color space. ICCBased spaces
/// report their component count in /N; anything unrecognized defaults to RGB.
fn color_components(doc: &PdfDocument, dict: &lopdf::Dictionary) -> u32 {
    let cs = match dict.get(b"ColorSpace") {
        Ok(obj) => obj,
        Err(_) => return 3,
    };
    let cs = match cs {
        lopdf::Object::Reference(id) => match doc.inner().get_object(*id) {
            Ok(obj) => obj,
            Err(_) => return 3,
        },
        other => other,
    };
    match cs {
        lopdf::Object::Name(name) => match name.as_slice() {
            b"DeviceGray" => 1,
            b"DeviceRGB" => 3,
            _ => 3,
        },
        lopdf::Object::Array(arr) => {
            // [/ICCBased <stream ref>]: read /N from the stream dict
            if arr.first().and_then(|o| o.as_name().ok()) == Some(b"ICCBased") {
                if let Some(lopdf::Object::Reference(id)) = arr.get(1) {
                    if let Ok(stream) = doc.inner().get_object(*id).and_then(|o| o.as_stream()) {
                        if let Some(n) = dict_u32(&stream.dict, b"N") {
                            return n;
                        }
                    }
                }
            }
            3
        }
        _ => 3,
    }
}

fn encode_raw_as_png(raw: &[u8], width: u32, height: u32, components: u32) -> Option<Vec<u8>> {
    let expected = (width as usize) * (height as usize) * (components as usize);
    if raw.len() < expected {
        tracing::warn!(
            expected_bytes = expected,
            actual_bytes = raw.len(),
            "image sample data shorter than expected, skipping"
        );
        return None;
    }

    let img: DynamicImage = match components {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, raw[..expected].to_vec())?),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, raw[..expected].to_vec())?),
        other => {
            tracing::warn!(components = other, "unsupported component count, skipping");
            return None;
        }
    };

    let mut out = Cursor::new(Vec::new());
    if let Err(e) = img.write_to(&mut out, ImageFormat::Png) {
        tracing::warn!(error = %e, "failed to encode image as PNG, skipping");
        return None;
    }
    Some(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_pdfs;

    #[test]
    fn test_extract_raw_rgb_image_as_png() {
        let bytes = test_pdfs::single_page_with_image(4, 2);
        let doc = PdfDocument::open(&bytes).unwrap();
        let page_id = doc.page_id(0).unwrap();
        let resources = doc.page_resources(page_id).unwrap();

        let extracted = extract_image(&doc, resources, b"Im1").expect("image extracted");
        assert_eq!(extracted.encoding, ImageEncoding::Png);
        // PNG signature
        assert_eq!(&extracted.data[..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);

        let decoded = image::load_from_memory(&extracted.data).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 2);
    }

    #[test]
    fn test_unknown_xobject_name_is_none() {
        let bytes = test_pdfs::single_page_with_image(4, 2);
        let doc = PdfDocument::open(&bytes).unwrap();
        let page_id = doc.page_id(0).unwrap();
        let resources = doc.page_resources(page_id).unwrap();

        assert!(extract_image(&doc, resources, b"Im9").is_none());
    }
}
