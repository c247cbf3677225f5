//! Per-font text decoding
//!
//! Builds a table of the fonts referenced by a page's resources and decodes
//! string operands from text-showing operators. Fonts with a ToUnicode CMap
//! are decoded through it; simple fonts without one fall back to Latin-1,
//! which is exact for the standard encodings of unaccented Latin text.

use std::collections::HashMap;

use crate::document::PdfDocument;

/// Decoding info for one font resource.
pub struct Font {
    /// Character code -> Unicode string, from the ToUnicode CMap.
    to_unicode: Option<HashMap<u32, String>>,
    /// Type0 (composite) fonts consume two-byte codes.
    two_byte: bool,
}

impl Font {
    /// Decode the bytes of a string operand into text.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if self.two_byte {
            self.decode_two_byte(bytes)
        } else {
            self.decode_single_byte(bytes)
        }
    }

    fn decode_single_byte(&self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len());
        for &b in bytes {
            if let Some(map) = &self.to_unicode {
                if let Some(s) = map.get(&(b as u32)) {
                    out.push_str(s);
                    continue;
                }
            }
            // Latin-1 maps 1:1 onto the first 256 Unicode scalars
            out.push(b as char);
        }
        out
    }

    fn decode_two_byte(&self, bytes: &[u8]) -> String {
        let mut out = String::new();
        for pair in bytes.chunks_exact(2) {
            let code = u32::from(u16::from_be_bytes([pair[0], pair[1]]));
            if let Some(map) = &self.to_unicode {
                if let Some(s) = map.get(&code) {
                    out.push_str(s);
                    continue;
                }
            }
            // Without a ToUnicode map the code is an opaque glyph id; there
            // is nothing meaningful to emit.
        }
        out
    }
}

/// The fonts available to one page, keyed by resource name (e.g. `F1`).
pub struct FontTable {
    fonts: HashMap<Vec<u8>, Font>,
}

impl FontTable {
    /// A table with no fonts; every lookup falls back to Latin-1.
    pub fn empty() -> Self {
        FontTable {
            fonts: HashMap::new(),
        }
    }

    /// Build the table from a page's `/Font` resource dictionary.
    /// Unparseable font entries degrade to Latin-1 fallback rather than
    /// failing the page.
    pub fn from_resources(doc: &PdfDocument, resources: &lopdf::Dictionary) -> Self {
        let mut fonts = HashMap::new();

        let font_dict = match resources
            .get(b"Font")
            .ok()
            .and_then(|o| deref(doc, o))
            .and_then(|o| o.as_dict().ok())
        {
            Some(d) => d,
            None => return FontTable { fonts },
        };

        for (name, obj) in font_dict.iter() {
            let font = match deref(doc, obj).and_then(|o| o.as_dict().ok()) {
                Some(dict) => build_font(doc, dict),
                None => Font {
                    to_unicode: None,
                    two_byte: false,
                },
            };
            fonts.insert(name.clone(), font);
        }

        FontTable { fonts }
    }

    pub fn get(&self, name: &[u8]) -> Option<&Font> {
        self.fonts.get(name)
    }
}

fn build_font(doc: &PdfDocument, dict: &lopdf::Dictionary) -> Font {
    let two_byte = dict
        .get(b"Subtype")
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(|n| n == b"Type0")
        .unwrap_or(false);

    let to_unicode = parse_to_unicode(doc, dict);

    Font {
        to_unicode,
        two_byte,
    }
}

/// Parse a font's ToUnicode CMap stream, if present.
fn parse_to_unicode(doc: &PdfDocument, dict: &lopdf::Dictionary) -> Option<HashMap<u32, String>> {
    let stream = dict
        .get(b"ToUnicode")
        .ok()
        .and_then(|o| deref(doc, o))
        .and_then(|o| o.as_stream().ok())?;

    let contents = if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content().ok()?
    } else {
        stream.content.clone()
    };

    let cmap = match adobe_cmap_parser::get_unicode_map(&contents) {
        Ok(cmap) => cmap,
        Err(e) => {
            tracing::warn!(error = ?e, "failed to parse ToUnicode CMap, using fallback decoding");
            return None;
        }
    };

    // CMap values are UTF-16BE sequences
    let mut unicode = HashMap::new();
    for (&code, value) in cmap.iter() {
        if value.len() % 2 != 0 {
            continue;
        }
        let units: Vec<u16> = value
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        if units.iter().any(|u| (0xd800..=0xdfff).contains(u)) && units.len() == 1 {
            continue; // lone surrogate
        }
        if let Ok(s) = String::from_utf16(&units) {
            unicode.insert(code, s);
        }
    }

    Some(unicode)
}

/// Follow an indirect reference, if the object is one.
fn deref<'a>(doc: &'a PdfDocument, obj: &'a lopdf::Object) -> Option<&'a lopdf::Object> {
    match obj {
        lopdf::Object::Reference(id) => doc.inner().get_object(*id).ok(),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_fallback() {
        let font = Font {
            to_unicode: None,
            two_byte: false,
        };
        assert_eq!(font.decode(b"Hello"), "Hello");
        // 0xE9 is é in Latin-1
        assert_eq!(font.decode(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn test_to_unicode_single_byte() {
        let mut map = HashMap::new();
        map.insert(0x41, "X".to_string());
        let font = Font {
            to_unicode: Some(map),
            two_byte: false,
        };
        // mapped code uses the CMap, unmapped falls back to Latin-1
        assert_eq!(font.decode(b"AB"), "XB");
    }

    #[test]
    fn test_two_byte_without_map_is_empty() {
        let font = Font {
            to_unicode: None,
            two_byte: true,
        };
        assert_eq!(font.decode(&[0x00, 0x41, 0x00, 0x42]), "");
    }

    #[test]
    fn test_two_byte_with_map() {
        let mut map = HashMap::new();
        map.insert(0x0041, "A".to_string());
        map.insert(0x0042, "B".to_string());
        let font = Font {
            to_unicode: Some(map),
            two_byte: true,
        };
        assert_eq!(font.decode(&[0x00, 0x41, 0x00, 0x42]), "AB");
    }
}
