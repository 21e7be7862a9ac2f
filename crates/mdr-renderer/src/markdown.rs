//! pulldown-cmark backed converter.

use std::borrow::Cow;

use pulldown_cmark::{Event, Options, Parser, TextMergeStream, html};

use crate::autolink::link_bare_urls;
use crate::converter::{ConvertError, Converter, RenderFlags, Rendered};
use crate::heading::assign_heading_ids;

/// Column width of a tab stop.
const TAB_WIDTH: usize = 4;

/// Markdown to HTML converter.
///
/// Tables and strikethrough are always enabled; everything else is driven by
/// [`RenderFlags`].
///
/// # Example
///
/// ```
/// use mdr_renderer::{Converter, MarkdownConverter, RenderFlags};
///
/// let rendered = MarkdownConverter
///     .convert(b"# Hello\n\nWorld\n", RenderFlags::default())
///     .unwrap();
/// assert_eq!(rendered.html, "<h1 id=\"hello\">Hello</h1>\n<p>World</p>\n");
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownConverter;

impl MarkdownConverter {
    /// Parser options for the given flags.
    #[must_use]
    pub fn parser_options(flags: RenderFlags) -> Options {
        let mut options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        if flags.footnotes {
            options |= Options::ENABLE_FOOTNOTES;
        }
        options
    }
}

impl Converter for MarkdownConverter {
    fn convert(&self, source: &[u8], flags: RenderFlags) -> Result<Rendered, ConvertError> {
        // Bytes that are not UTF-8 become U+FFFD.
        let source = String::from_utf8_lossy(source);
        let text = if flags.tab_stop {
            expand_tabs(&source, TAB_WIDTH)
        } else {
            Cow::Borrowed(source.as_ref())
        };

        let parser = Parser::new_ext(&text, Self::parser_options(flags));
        let mut events: Vec<Event<'_>> = TextMergeStream::new(parser).collect();
        if flags.toc {
            assign_heading_ids(&mut events);
        }
        if flags.autolink {
            events = link_bare_urls(events);
        }

        let mut output = String::with_capacity(text.len() + text.len() / 2);
        html::push_html(&mut output, events.into_iter());
        Ok(Rendered { html: output })
    }
}

/// Replace tabs with spaces up to the next multiple of `width` columns.
fn expand_tabs(text: &str, width: usize) -> Cow<'_, str> {
    if !text.contains('\t') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut column = 0;
    for c in text.chars() {
        match c {
            '\t' => {
                let spaces = width - column % width;
                out.extend(std::iter::repeat_n(' ', spaces));
                column += spaces;
            }
            '\n' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    Cow::Owned(out)
}
