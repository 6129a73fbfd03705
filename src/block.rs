use serde::Serialize;

/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Span {
    Text(String),
    Bold(String),
    Italic(String),
    Code(String),
    /// A clinical pictogram from the active profile's allow-list.
    Icon(String),
}

impl Span {
    /// Visible text of the span, without any delimiter characters.
    pub fn text(&self) -> &str {
        match self {
            Span::Text(text)
            | Span::Bold(text)
            | Span::Italic(text)
            | Span::Code(text)
            | Span::Icon(text) => text,
        }
    }
}

/// Concatenate the visible text of a span sequence.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(Span::text).collect()
}

/// One classified line of a clinical report.
///
/// `C` is the content type: the classifier produces `Block<&str>` and the
/// inline formatter turns it into `Block<Vec<Span>>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block<C = Vec<Span>> {
    Spacer,
    Rule,
    Heading { level: u8, content: C },
    Quote { content: C },
    BulletItem { content: C },
    NumberedItem { index: u64, content: C },
    Paragraph { content: C },
}

impl<C> Block<C> {
    /// Content of the block, if it carries any.
    pub fn content(&self) -> Option<&C> {
        match self {
            Block::Spacer | Block::Rule => None,
            Block::Heading { content, .. }
            | Block::Quote { content }
            | Block::BulletItem { content }
            | Block::NumberedItem { content, .. }
            | Block::Paragraph { content } => Some(content),
        }
    }

    /// Replace the content of the block, keeping its kind.
    pub fn map_content<D>(self, f: impl FnOnce(C) -> D) -> Block<D> {
        match self {
            Block::Spacer => Block::Spacer,
            Block::Rule => Block::Rule,
            Block::Heading { level, content } => Block::Heading {
                level,
                content: f(content),
            },
            Block::Quote { content } => Block::Quote {
                content: f(content),
            },
            Block::BulletItem { content } => Block::BulletItem {
                content: f(content),
            },
            Block::NumberedItem { index, content } => Block::NumberedItem {
                index,
                content: f(content),
            },
            Block::Paragraph { content } => Block::Paragraph {
                content: f(content),
            },
        }
    }
}
