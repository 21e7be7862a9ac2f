//! `mdr render` command implementation.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use mdr_renderer::{Converter, MarkdownConverter, RenderFlags};

use crate::error::CliError;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render.
    file: PathBuf,

    /// Do not add anchor ids to headings.
    #[arg(long)]
    no_toc: bool,

    /// Do not turn bare URLs into links.
    #[arg(long)]
    no_autolink: bool,

    /// Do not expand tabs.
    #[arg(long)]
    no_tab_stop: bool,

    /// Disable footnotes.
    #[arg(long)]
    no_footnotes: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or converted.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        self.render_to(&mut stdout.lock())
    }

    fn flags(&self) -> RenderFlags {
        RenderFlags {
            toc: !self.no_toc,
            autolink: !self.no_autolink,
            tab_stop: !self.no_tab_stop,
            footnotes: !self.no_footnotes,
        }
    }

    fn render_to(&self, out: &mut impl Write) -> Result<(), CliError> {
        let source = std::fs::read(&self.file)?;
        let rendered = MarkdownConverter.convert(&source, self.flags())?;
        out.write_all(rendered.html.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(file: PathBuf) -> RenderArgs {
        RenderArgs {
            file,
            no_toc: false,
            no_autolink: false,
            no_tab_stop: false,
            no_footnotes: false,
        }
    }

    #[test]
    fn test_flags() {
        let mut args = args(PathBuf::from("doc.md"));
        assert_eq!(args.flags(), RenderFlags::default());

        args.no_toc = true;
        args.no_footnotes = true;
        let flags = args.flags();
        assert!(!flags.toc);
        assert!(!flags.footnotes);
        assert!(flags.autolink);
        assert!(flags.tab_stop);
    }

    #[test]
    fn test_render_to_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# Title\n").unwrap();

        let mut out = Vec::new();
        args(path).render_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<h1 id=\"title\">Title</h1>\n");
    }

    #[test]
    fn test_render_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let err = args(dir.path().join("missing.md"))
            .render_to(&mut out)
            .unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }
}
