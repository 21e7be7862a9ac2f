//! Converter contract.

/// Markdown extensions applied during conversion.
///
/// [`RenderFlags::default`] enables every extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenderFlags {
    /// Give every heading a unique anchor id derived from its text.
    pub toc: bool,
    /// Turn bare `http://` and `https://` URLs into links.
    pub autolink: bool,
    /// Expand tabs to 4-column stops before parsing.
    pub tab_stop: bool,
    /// Enable `[^note]` footnotes.
    pub footnotes: bool,
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self {
            toc: true,
            autolink: true,
            tab_stop: true,
            footnotes: true,
        }
    }
}

impl RenderFlags {
    /// Flags with every extension disabled.
    #[must_use]
    pub fn none() -> Self {
        Self {
            toc: false,
            autolink: false,
            tab_stop: false,
            footnotes: false,
        }
    }
}

/// Output of a successful conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered {
    /// Rendered HTML.
    pub html: String,
}

impl Rendered {
    /// Length of the rendered HTML in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.html.len()
    }

    /// Whether nothing was rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }

    /// Take the rendered bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.html.into_bytes()
    }
}

/// Conversion failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConvertError {
    /// The converter could not process the document.
    #[error("conversion failed: {0}")]
    Failed(String),
}

/// Maps a complete markdown document to rendered markup.
///
/// Implementations are pure: the same bytes and flags always produce the same
/// output. They are called from a blocking worker thread, never from an async task.
pub trait Converter: Send + Sync {
    /// Convert a complete document.
    fn convert(&self, source: &[u8], flags: RenderFlags) -> Result<Rendered, ConvertError>;
}
