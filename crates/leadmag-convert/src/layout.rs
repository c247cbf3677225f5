//! Reading-order layout
//!
//! Merges per-page item streams into document reading order (page order,
//! top-down within a page, left-to-right as tiebreak), groups text runs into
//! lines and lines into blocks, and classifies headings against the
//! document's modal body font size.

use std::collections::HashMap;

/// A positioned item in document space: its page index plus the user-space
/// coordinates produced by the interpreter.
#[derive(Debug, Clone)]
pub struct Positioned {
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub seq: usize,
    pub kind: ItemKind,
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    Text { text: String, size: f64 },
    /// Index into the document's extracted-image list.
    Image { index: usize },
}

/// A structural block of the output document.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    Image { index: usize },
}

/// A block's font size must reach this multiple of the modal body size to be
/// a heading, and `H1_RATIO` to be a top-level heading.
const HEADING_RATIO: f64 = 1.25;
const H1_RATIO: f64 = 1.75;

/// Vertical gap between lines (in multiples of the body size) beyond which a
/// new paragraph starts.
const PARAGRAPH_GAP_FACTOR: f64 = 1.8;

struct Line {
    page: usize,
    y: f64,
    size: f64,
    text: String,
}

/// Arrange items into reading order and group them into blocks.
///
/// Identical input always yields an identical block sequence: the sort is
/// total (seq breaks any coordinate tie) and grouping is deterministic.
pub fn arrange(mut items: Vec<Positioned>) -> Vec<Block> {
    items.retain(|item| match &item.kind {
        ItemKind::Text { text, .. } => !text.trim().is_empty(),
        ItemKind::Image { .. } => true,
    });

    // Page order, then top-down (descending PDF y), then left-to-right
    items.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(b.y.total_cmp(&a.y))
            .then(a.x.total_cmp(&b.x))
            .then(a.seq.cmp(&b.seq))
    });

    let body_size = modal_body_size(&items);

    let mut blocks = Vec::new();
    let mut current_line: Option<Line> = None;
    let mut open_paragraph: Option<Line> = None;

    let mut flush_line =
        |line: Line, open_paragraph: &mut Option<Line>, blocks: &mut Vec<Block>| {
            if let Some(level) = heading_level(line.size, body_size) {
                close_paragraph(open_paragraph, blocks);
                blocks.push(Block::Heading {
                    level,
                    text: line.text,
                });
                return;
            }

            match open_paragraph {
                Some(para)
                    if para.page == line.page
                        && (para.y - line.y) <= PARAGRAPH_GAP_FACTOR * body_size =>
                {
                    para.text.push(' ');
                    para.text.push_str(&line.text);
                    para.y = line.y;
                }
                _ => {
                    close_paragraph(open_paragraph, blocks);
                    *open_paragraph = Some(line);
                }
            }
        };

    for item in items {
        match item.kind {
            ItemKind::Text { text, size } => {
                let joins_line = current_line.as_ref().is_some_and(|line| {
                    item.page == line.page && (line.y - item.y).abs() <= 0.5 * line.size.max(size)
                });

                if joins_line {
                    let line = current_line.as_mut().unwrap();
                    if !line.text.ends_with(' ') && !text.starts_with(' ') {
                        line.text.push(' ');
                    }
                    line.text.push_str(&text);
                    line.size = line.size.max(size);
                } else {
                    if let Some(line) = current_line.take() {
                        flush_line(line, &mut open_paragraph, &mut blocks);
                    }
                    current_line = Some(Line {
                        page: item.page,
                        y: item.y,
                        size,
                        text,
                    });
                }
            }
            ItemKind::Image { index } => {
                if let Some(line) = current_line.take() {
                    flush_line(line, &mut open_paragraph, &mut blocks);
                }
                close_paragraph(&mut open_paragraph, &mut blocks);
                blocks.push(Block::Image { index });
            }
        }
    }

    if let Some(line) = current_line.take() {
        flush_line(line, &mut open_paragraph, &mut blocks);
    }
    close_paragraph(&mut open_paragraph, &mut blocks);

    blocks
}

fn close_paragraph(open_paragraph: &mut Option<Line>, blocks: &mut Vec<Block>) {
    if let Some(para) = open_paragraph.take() {
        blocks.push(Block::Paragraph {
            text: normalize_whitespace(&para.text),
        });
    }
}

fn heading_level(size: f64, body_size: f64) -> Option<u8> {
    if body_size <= 0.0 {
        return None;
    }
    let ratio = size / body_size;
    if ratio >= H1_RATIO {
        Some(1)
    } else if ratio >= HEADING_RATIO {
        Some(2)
    } else {
        None
    }
}

/// Most frequent font size across text runs, weighted by text length and
/// bucketed to half points. This is what the document body is set in.
fn modal_body_size(items: &[Positioned]) -> f64 {
    let mut weights: HashMap<i64, usize> = HashMap::new();
    for item in items {
        if let ItemKind::Text { text, size } = &item.kind {
            let bucket = (size * 2.0).round() as i64;
            *weights.entry(bucket).or_insert(0) += text.trim().len();
        }
    }

    weights
        .into_iter()
        // Deterministic tie-break: prefer the smaller size
        .max_by(|(ka, wa), (kb, wb)| wa.cmp(wb).then(kb.cmp(ka)))
        .map(|(bucket, _)| bucket as f64 / 2.0)
        .unwrap_or(0.0)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(page: usize, x: f64, y: f64, size: f64, seq: usize, s: &str) -> Positioned {
        Positioned {
            page,
            x,
            y,
            seq,
            kind: ItemKind::Text {
                text: s.to_string(),
                size,
            },
        }
    }

    fn image(page: usize, x: f64, y: f64, seq: usize, index: usize) -> Positioned {
        Positioned {
            page,
            x,
            y,
            seq,
            kind: ItemKind::Image { index },
        }
    }

    #[test]
    fn test_heading_then_paragraph() {
        let items = vec![
            text(0, 72.0, 700.0, 24.0, 0, "Title"),
            text(0, 72.0, 660.0, 12.0, 1, "Body line one."),
            text(0, 72.0, 646.0, 12.0, 2, "Body line two."),
        ];

        let blocks = arrange(items);
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 1,
                text: "Title".to_string()
            }
        );
        assert_eq!(
            blocks[1],
            Block::Paragraph {
                text: "Body line one. Body line two.".to_string()
            }
        );
    }

    #[test]
    fn test_h2_at_intermediate_ratio() {
        let items = vec![
            text(0, 72.0, 700.0, 16.0, 0, "Section"),
            text(0, 72.0, 660.0, 12.0, 1, "Body text that outweighs the heading."),
        ];

        let blocks = arrange(items);
        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 2,
                text: "Section".to_string()
            }
        );
    }

    #[test]
    fn test_large_gap_starts_new_paragraph() {
        let items = vec![
            text(0, 72.0, 700.0, 12.0, 0, "First paragraph."),
            text(0, 72.0, 600.0, 12.0, 1, "Second paragraph."),
        ];

        let blocks = arrange(items);
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[0], Block::Paragraph { text } if text == "First paragraph."));
        assert!(matches!(&blocks[1], Block::Paragraph { text } if text == "Second paragraph."));
    }

    #[test]
    fn test_reading_order_across_pages() {
        // Page 1 content listed before page 0 in the input; sort must fix it
        let items = vec![
            text(1, 72.0, 700.0, 12.0, 0, "Second page."),
            text(0, 72.0, 100.0, 12.0, 1, "First page bottom."),
            text(0, 72.0, 700.0, 12.0, 2, "First page top."),
        ];

        let blocks = arrange(items);
        let texts: Vec<String> = blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph { text } => text.clone(),
                other => panic!("unexpected block {:?}", other),
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "First page top.".to_string(),
                "First page bottom.".to_string(),
                "Second page.".to_string()
            ]
        );
    }

    #[test]
    fn test_image_interleaves_between_text() {
        let items = vec![
            text(0, 72.0, 700.0, 12.0, 0, "Above the image."),
            image(0, 72.0, 500.0, 1, 0),
            text(0, 72.0, 300.0, 12.0, 2, "Below the image."),
        ];

        let blocks = arrange(items);
        assert_eq!(blocks.len(), 3);
        assert!(matches!(blocks[0], Block::Paragraph { .. }));
        assert_eq!(blocks[1], Block::Image { index: 0 });
        assert!(matches!(blocks[2], Block::Paragraph { .. }));
    }

    #[test]
    fn test_runs_on_same_line_join_left_to_right() {
        let items = vec![
            text(0, 200.0, 700.0, 12.0, 0, "world"),
            text(0, 72.0, 700.0, 12.0, 1, "Hello"),
        ];

        let blocks = arrange(items);
        assert_eq!(
            blocks[0],
            Block::Paragraph {
                text: "Hello world".to_string()
            }
        );
    }

    #[test]
    fn test_whitespace_only_runs_dropped() {
        let items = vec![text(0, 72.0, 700.0, 12.0, 0, "   ")];
        assert!(arrange(items).is_empty());
    }

    #[test]
    fn test_identical_input_is_deterministic() {
        let make = || {
            vec![
                text(0, 72.0, 700.0, 24.0, 0, "Title"),
                text(0, 72.0, 660.0, 12.0, 1, "Body."),
                image(0, 72.0, 500.0, 2, 0),
            ]
        };
        assert_eq!(arrange(make()), arrange(make()));
    }
}
