//! Markdown to HTML conversion for the MDR response pipeline.
//!
//! The pipeline treats conversion as a pure function behind the [`Converter`]
//! trait: complete source bytes and a [`RenderFlags`] set in, rendered bytes or a
//! [`ConvertError`] out. [`MarkdownConverter`] is the pulldown-cmark backed
//! implementation.
//!
//! # Extensions
//!
//! - `toc`: headings get unique anchor ids (`## FAQ` → `<h2 id="faq">`)
//! - `autolink`: bare `http(s)://` URLs become links
//! - `tab_stop`: tabs are expanded to 4-column stops before parsing
//! - `footnotes`: `[^label]` references and definitions
//!
//! # Example
//!
//! ```
//! use mdr_renderer::{Converter, MarkdownConverter, RenderFlags};
//!
//! let rendered = MarkdownConverter
//!     .convert(b"See https://example.com", RenderFlags::default())
//!     .unwrap();
//! assert!(rendered.html.contains(r#"<a href="https://example.com">"#));
//! ```

mod autolink;
mod converter;
mod heading;
mod markdown;

pub use converter::{ConvertError, Converter, RenderFlags, Rendered};
pub use markdown::MarkdownConverter;
