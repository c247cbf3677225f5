//! Conversion pipeline
//!
//! Orchestrates a single PDF→HTML conversion: fetch the source object,
//! interpret every page, arrange the items into reading order, extract
//! images, and assemble the HTML document. The pipeline performs no storage
//! writes; the caller uploads the returned HTML and images.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use leadmag_storage::Storage;

use crate::content::{self, PageItem};
use crate::document::PdfDocument;
use crate::fonts::FontTable;
use crate::html;
use crate::images::{self, ExtractedImage};
use crate::layout::{self, Block, ItemKind, Positioned};

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("source object unreadable: {0}")]
    SourceUnreadable(String),

    #[error("malformed PDF: {0}")]
    Malformed(String),

    #[error("document has no extractable content")]
    NoContent,

    #[error("conversion timed out")]
    Timeout,
}

/// The result of a successful conversion: the HTML document plus the image
/// objects it references, keyed by the name used in their `src` attributes.
#[derive(Debug)]
pub struct ConversionOutput {
    pub html: String,
    pub images: BTreeMap<String, Vec<u8>>,
}

/// PDF→HTML conversion against an injected storage backend.
pub struct ConversionPipeline {
    storage: Arc<dyn Storage>,
    timeout: Duration,
}

impl ConversionPipeline {
    pub fn new(storage: Arc<dyn Storage>, timeout: Duration) -> Self {
        ConversionPipeline { storage, timeout }
    }

    /// Convert the PDF stored at `source_key`.
    ///
    /// Parsing runs on the blocking pool under a timeout; adversarial inputs
    /// can otherwise parse unboundedly.
    pub async fn convert(
        &self,
        source_key: &str,
        document_id: Uuid,
    ) -> Result<ConversionOutput, ConvertError> {
        let started = Instant::now();

        let bytes = self
            .storage
            .download(source_key)
            .await
            .map_err(|e| ConvertError::SourceUnreadable(e.to_string()))?;

        let parse = tokio::task::spawn_blocking(move || convert_bytes(&bytes));
        let output = match tokio::time::timeout(self.timeout, parse).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                return Err(ConvertError::Malformed(format!(
                    "conversion task failed: {}",
                    join_err
                )))
            }
            Err(_) => return Err(ConvertError::Timeout),
        };

        tracing::info!(
            document_id = %document_id,
            source_key = %source_key,
            html_bytes = output.html.len(),
            image_count = output.images.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "converted document"
        );

        Ok(output)
    }
}

/// Pure conversion of PDF bytes into HTML and images.
fn convert_bytes(bytes: &[u8]) -> Result<ConversionOutput, ConvertError> {
    let doc = PdfDocument::open(bytes)?;
    if doc.page_count() == 0 {
        return Err(ConvertError::NoContent);
    }

    let mut items: Vec<Positioned> = Vec::new();
    let mut extracted: Vec<ExtractedImage> = Vec::new();

    for page_index in 0..doc.page_count() {
        let page_id = match doc.page_id(page_index) {
            Some(id) => id,
            None => continue,
        };

        let content_bytes = doc.page_content_bytes(page_id)?;
        if content_bytes.is_empty() {
            continue;
        }

        let resources = doc.page_resources(page_id)?;
        let fonts = FontTable::from_resources(&doc, resources);

        for item in content::interpret_page(&content_bytes, &fonts)? {
            match item {
                PageItem::Text(run) => items.push(Positioned {
                    page: page_index,
                    x: run.x,
                    y: run.y,
                    seq: run.seq,
                    kind: ItemKind::Text {
                        text: run.text,
                        size: run.size,
                    },
                }),
                PageItem::Image(img) => {
                    // Forms and undecodable encodings are skipped here
                    if let Some(image) = images::extract_image(&doc, resources, &img.name) {
                        let index = extracted.len();
                        extracted.push(image);
                        items.push(Positioned {
                            page: page_index,
                            x: img.x,
                            y: img.y,
                            seq: img.seq,
                            kind: ItemKind::Image { index },
                        });
                    }
                }
            }
        }
    }

    let blocks = layout::arrange(items);
    if blocks.is_empty() {
        return Err(ConvertError::NoContent);
    }

    // Name images in block (reading) order so numbering matches the document
    let mut names: Vec<String> = vec![String::new(); extracted.len()];
    let mut next = 1;
    for block in &blocks {
        if let Block::Image { index } = block {
            if names[*index].is_empty() {
                names[*index] =
                    format!("image_{}.{}", next, extracted[*index].encoding.extension());
                next += 1;
            }
        }
    }

    let html = html::render(&blocks, &names);

    let mut image_map = BTreeMap::new();
    for (index, image) in extracted.into_iter().enumerate() {
        if !names[index].is_empty() {
            image_map.insert(names[index].clone(), image.data);
        }
    }

    Ok(ConversionOutput {
        html,
        images: image_map,
    })
}

/// Minimal in-memory PDF builders for tests across this crate.
#[cfg(test)]
pub(crate) mod test_pdfs {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// A one-page PDF showing each `(text, size, x, y)` run in Helvetica.
    pub(crate) fn single_page_text(runs: &[(&str, f64, f64, f64)]) -> Vec<u8> {
        build(text_operations(runs), None)
    }

    fn text_operations(runs: &[(&str, f64, f64, f64)]) -> Vec<Operation> {
        let mut operations = Vec::new();
        for (text, size, x, y) in runs {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![
                    Object::Name(b"F1".to_vec()),
                    Object::Real(*size as f32),
                ],
            ));
            operations.push(Operation::new(
                "Td",
                vec![Object::Real(*x as f32), Object::Real(*y as f32)],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        operations
    }

    /// A one-page PDF placing a single unfiltered DeviceRGB image XObject
    /// named `Im1`, drawn at 100,300 scaled to 200x100.
    pub(crate) fn single_page_with_image(width: u32, height: u32) -> Vec<u8> {
        build(draw_image_operations(300.0), Some(gradient_image(width, height)))
    }

    /// A one-page PDF with the given text runs plus an image XObject drawn
    /// at the given y, so reading-order tests can interleave text and images.
    pub(crate) fn single_page_text_and_image(
        runs: &[(&str, f64, f64, f64)],
        image_y: f64,
    ) -> Vec<u8> {
        let mut operations = text_operations(runs);
        operations.extend(draw_image_operations(image_y));
        build(operations, Some(gradient_image(4, 2)))
    }

    fn draw_image_operations(y: f64) -> Vec<Operation> {
        vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    200.into(),
                    0.into(),
                    0.into(),
                    100.into(),
                    100.into(),
                    Object::Real(y as f32),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
            Operation::new("Q", vec![]),
        ]
    }

    fn gradient_image(width: u32, height: u32) -> Stream {
        // Gradient so decoded pixels are distinguishable
        let mut samples = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                samples.push((x * 40) as u8);
                samples.push((y * 40) as u8);
                samples.push(128);
            }
        }
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            samples,
        )
    }

    /// A PDF whose single page has no content stream.
    pub(crate) fn empty_page() -> Vec<u8> {
        build(vec![], None)
    }

    fn build(operations: Vec<Operation>, image: Option<Stream>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        if let Some(stream) = image {
            let image_id = doc.add_object(stream);
            resources.set("XObject", dictionary! { "Im1" => image_id });
        }
        let resources_id = doc.add_object(resources);

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap_or_default(),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });

        // Resources sit on the page-tree node to exercise inheritance
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadmag_storage::MemoryStorage;

    fn pipeline_with(objects: &[(&str, Vec<u8>)]) -> ConversionPipeline {
        let storage = MemoryStorage::new();
        for (key, data) in objects {
            storage.set_object(key, data.clone());
        }
        ConversionPipeline::new(Arc::new(storage), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_convert_heading_and_body() {
        let pdf = test_pdfs::single_page_text(&[
            ("Lead Magnet Guide", 24.0, 72.0, 760.0),
            ("This is the opening paragraph of the guide.", 12.0, 72.0, 720.0),
            ("It continues on a second line right below.", 12.0, 72.0, 706.0),
        ]);
        let pipeline = pipeline_with(&[("pdfs/guide.pdf", pdf)]);

        let output = pipeline
            .convert("pdfs/guide.pdf", Uuid::new_v4())
            .await
            .unwrap();

        assert!(output.html.contains("<h1>Lead Magnet Guide</h1>"));
        assert!(output
            .html
            .contains("This is the opening paragraph of the guide. It continues on a second line right below."));
        assert!(output.images.is_empty());
    }

    #[tokio::test]
    async fn test_convert_extracts_image_with_placeholder() {
        let pdf = test_pdfs::single_page_with_image(4, 2);
        let pipeline = pipeline_with(&[("pdfs/img.pdf", pdf)]);

        let output = pipeline
            .convert("pdfs/img.pdf", Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(output.images.len(), 1);
        assert!(output.images.contains_key("image_1.png"));
        assert!(output.html.contains("src=\"image_1.png\""));
    }

    #[tokio::test]
    async fn test_reading_order_top_down() {
        // Runs listed bottom-first in the content stream
        let pdf = test_pdfs::single_page_text(&[
            ("Bottom paragraph text here.", 12.0, 72.0, 100.0),
            ("Top paragraph text here.", 12.0, 72.0, 700.0),
        ]);
        let pipeline = pipeline_with(&[("pdfs/order.pdf", pdf)]);

        let output = pipeline
            .convert("pdfs/order.pdf", Uuid::new_v4())
            .await
            .unwrap();

        let top = output.html.find("Top paragraph").unwrap();
        let bottom = output.html.find("Bottom paragraph").unwrap();
        assert!(top < bottom);
    }

    #[tokio::test]
    async fn test_mixed_document_keeps_reading_order() {
        // Heading, a paragraph above the figure, the figure, a paragraph below
        let pdf = test_pdfs::single_page_text_and_image(
            &[
                ("Guide Title", 24.0, 72.0, 760.0),
                ("Paragraph above the figure.", 12.0, 72.0, 700.0),
                ("Paragraph below the figure.", 12.0, 72.0, 200.0),
            ],
            400.0,
        );
        let pipeline = pipeline_with(&[("pdfs/mixed.pdf", pdf)]);

        let output = pipeline
            .convert("pdfs/mixed.pdf", Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(output.images.len(), 1);
        let html = &output.html;
        let heading = html.find("<h1>Guide Title</h1>").unwrap();
        let above = html.find("Paragraph above the figure.").unwrap();
        let image = html.find("src=\"image_1.png\"").unwrap();
        let below = html.find("Paragraph below the figure.").unwrap();
        assert!(heading < above);
        assert!(above < image);
        assert!(image < below);
    }

    #[tokio::test]
    async fn test_empty_page_is_no_content() {
        let pdf = test_pdfs::empty_page();
        let pipeline = pipeline_with(&[("pdfs/empty.pdf", pdf)]);

        let result = pipeline.convert("pdfs/empty.pdf", Uuid::new_v4()).await;
        assert!(matches!(result, Err(ConvertError::NoContent)));
    }

    #[tokio::test]
    async fn test_missing_source_is_unreadable() {
        let pipeline = pipeline_with(&[]);
        let result = pipeline.convert("pdfs/gone.pdf", Uuid::new_v4()).await;
        assert!(matches!(result, Err(ConvertError::SourceUnreadable(_))));
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_malformed() {
        let pipeline = pipeline_with(&[("pdfs/junk.pdf", b"%PDF-1.5 garbage".to_vec())]);
        let result = pipeline.convert("pdfs/junk.pdf", Uuid::new_v4()).await;
        assert!(matches!(result, Err(ConvertError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_identical_input_identical_output() {
        let pdf = test_pdfs::single_page_text(&[
            ("Title", 24.0, 72.0, 760.0),
            ("Body text for determinism check.", 12.0, 72.0, 700.0),
        ]);
        let pipeline = pipeline_with(&[("pdfs/a.pdf", pdf.clone()), ("pdfs/b.pdf", pdf)]);

        let a = pipeline.convert("pdfs/a.pdf", Uuid::new_v4()).await.unwrap();
        let b = pipeline.convert("pdfs/b.pdf", Uuid::new_v4()).await.unwrap();
        assert_eq!(a.html, b.html);
        assert_eq!(a.images.len(), b.images.len());
    }
}
