mod block;
mod config;
mod html;
mod inline;
mod parser;
mod render;
pub mod report;
pub mod store;
mod typst;

pub use block::{Block, Span, plain_text};
pub use config::{Config, ConfigError, Features, PageConfig, Profile};
pub use html::blocks_to_html;
pub use inline::InlineFormatter;
pub use parser::classify_line;
pub use render::{RenderNode, StyleRole, render_nodes};

use std::sync::OnceLock;
use thiserror::Error;
use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_pdf::PdfOptions;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Typst compilation failed: {0}")]
    Typst(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// Renders clinical report text with one profile's features and icons.
#[derive(Debug, Clone)]
pub struct Renderer {
    formatter: InlineFormatter,
    page: PageConfig,
}

impl Renderer {
    /// Build a renderer for the named profile, or the config's default profile.
    pub fn new(config: &Config, profile: Option<&str>) -> Result<Self, ConfigError> {
        let profile = config.profile(profile)?;
        Ok(Self::with_profile(profile, config.page.clone()))
    }

    pub fn with_profile(profile: &Profile, page: PageConfig) -> Self {
        Self {
            formatter: InlineFormatter::from_profile(profile),
            page,
        }
    }

    /// Parse report text into blocks, one per line.
    pub fn parse(&self, text: &str) -> Vec<Block> {
        parser::parse(text, &self.formatter)
    }

    /// Inline spans for a single piece of content.
    pub fn format_inline(&self, content: &str) -> Vec<Span> {
        self.formatter.format(content)
    }

    pub fn to_html(&self, text: &str) -> String {
        blocks_to_html(&self.parse(text))
    }

    pub fn to_typst(&self, text: &str) -> String {
        typst::blocks_to_typst(&self.parse(text), &self.page)
    }

    /// Convert report text to PDF bytes.
    pub fn to_pdf(&self, text: &str) -> Result<Vec<u8>, Error> {
        use typst_library::layout::PagedDocument;

        let typst_content = self.to_typst(text);

        let font_options = TypstKitFontOptions::new()
            .include_embedded_fonts(true)
            .include_system_fonts(false);

        let engine = TypstEngine::builder()
            .main_file(typst_content)
            .search_fonts_with(font_options)
            .build();

        let doc: PagedDocument = engine
            .compile()
            .output
            .map_err(|e| Error::Typst(format!("{e:?}")))?;

        typst_pdf::pdf(&doc, &PdfOptions::default()).map_err(|e| Error::Pdf(format!("{e:?}")))
    }
}

impl Default for Renderer {
    fn default() -> Self {
        let config = Config::compiled_default();
        match config.profile(None) {
            Ok(profile) => Self::with_profile(profile, config.page.clone()),
            Err(_) => Self::with_profile(&Profile::default(), config.page.clone()),
        }
    }
}

fn default_renderer() -> &'static Renderer {
    static DEFAULT_RENDERER: OnceLock<Renderer> = OnceLock::new();
    DEFAULT_RENDERER.get_or_init(Renderer::default)
}

/// Parse report text with the compiled default profile.
pub fn parse(text: &str) -> Vec<Block> {
    default_renderer().parse(text)
}
