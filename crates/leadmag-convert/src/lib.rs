//! Leadmag Conversion Library
//!
//! The PDF→HTML conversion pipeline: lopdf-based content-stream
//! interpretation, reading-order extraction, image extraction, and HTML
//! assembly, plus the upload `FileValidator`.
//!
//! The pipeline is pure with respect to storage: it reads the source PDF via
//! the injected `Storage` and returns the derived HTML and extracted images
//! without writing anything.

pub mod content;
pub mod document;
pub mod fonts;
pub mod html;
pub mod images;
pub mod layout;
pub mod pipeline;
pub mod validator;

pub use html::rewrite_image_sources;
pub use layout::Block;
pub use pipeline::{ConversionOutput, ConversionPipeline, ConvertError};
pub use validator::{FileValidator, ValidationError};
