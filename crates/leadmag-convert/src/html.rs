//! HTML assembly
//!
//! Renders the block sequence into a self-contained HTML document with
//! embedded CSS. Image blocks reference their staged object name in `src`;
//! the caller rewrites those to public URLs once the objects are uploaded.

use std::collections::BTreeMap;

use crate::layout::Block;

const STYLE: &str = "\
        body {
            font-family: Arial, sans-serif;
            line-height: 1.6;
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
        }
        h1, h2 {
            line-height: 1.25;
        }
        p {
            margin: 0 0 1em;
        }
        img {
            max-width: 100%;
            height: auto;
            display: block;
            margin: 1em 0;
        }";

/// Render blocks as a standalone HTML document.
///
/// `image_names` maps `Block::Image` indexes to the staged object names used
/// as `src` placeholders. Indexes without a name render nothing.
pub fn render(blocks: &[Block], image_names: &[String]) -> String {
    let mut body = String::new();
    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let tag = if *level == 1 { "h1" } else { "h2" };
                body.push_str(&format!(
                    "    <{tag}>{}</{tag}>\n",
                    escape_html(text),
                    tag = tag
                ));
            }
            Block::Paragraph { text } => {
                body.push_str(&format!("    <p>{}</p>\n", escape_html(text)));
            }
            Block::Image { index } => {
                if let Some(name) = image_names.get(*index) {
                    body.push_str(&format!(
                        "    <img src=\"{}\" alt=\"\">\n",
                        escape_html(name)
                    ));
                }
            }
        }
    }

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         \x20   <meta charset=\"UTF-8\">\n\
         \x20   <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         \x20   <title>Document</title>\n\
         \x20   <style>\n{style}\n    </style>\n\
         </head>\n\
         <body>\n{body}</body>\n\
         </html>\n",
        style = STYLE,
        body = body
    )
}

/// Replace staged image names in `src` attributes with their public URLs.
pub fn rewrite_image_sources(html: &str, urls: &BTreeMap<String, String>) -> String {
    let mut out = html.to_string();
    for (name, url) in urls {
        let placeholder = format!("src=\"{}\"", escape_html(name));
        let replacement = format!("src=\"{}\"", escape_html(url));
        out = out.replace(&placeholder, &replacement);
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
