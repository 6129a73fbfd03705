use serde::Serialize;

use crate::block::{Block, Span};

/// Presentation role of a block. Depends only on the block kind and heading level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StyleRole {
    #[serde(rename = "heading-1")]
    Heading1,
    #[serde(rename = "heading-2")]
    Heading2,
    #[serde(rename = "heading-3")]
    Heading3,
    #[serde(rename = "rule")]
    Rule,
    #[serde(rename = "quote")]
    Quote,
    #[serde(rename = "bullet")]
    Bullet,
    #[serde(rename = "numbered")]
    Numbered,
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "spacer")]
    Spacer,
}

impl StyleRole {
    pub fn of<C>(block: &Block<C>) -> Self {
        match block {
            Block::Spacer => StyleRole::Spacer,
            Block::Rule => StyleRole::Rule,
            Block::Heading { level: 1, .. } => StyleRole::Heading1,
            Block::Heading { level: 2, .. } => StyleRole::Heading2,
            // The classifier caps levels at 3
            Block::Heading { .. } => StyleRole::Heading3,
            Block::Quote { .. } => StyleRole::Quote,
            Block::BulletItem { .. } => StyleRole::Bullet,
            Block::NumberedItem { .. } => StyleRole::Numbered,
            Block::Paragraph { .. } => StyleRole::Paragraph,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StyleRole::Heading1 => "heading-1",
            StyleRole::Heading2 => "heading-2",
            StyleRole::Heading3 => "heading-3",
            StyleRole::Rule => "rule",
            StyleRole::Quote => "quote",
            StyleRole::Bullet => "bullet",
            StyleRole::Numbered => "numbered",
            StyleRole::Paragraph => "paragraph",
            StyleRole::Spacer => "spacer",
        }
    }
}

/// A block ready for a presentation back end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderNode<'a> {
    pub role: StyleRole,
    /// Item number for numbered items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    pub spans: &'a [Span],
}

impl<'a> RenderNode<'a> {
    pub fn from_block(block: &'a Block) -> Self {
        let index = match block {
            Block::NumberedItem { index, .. } => Some(*index),
            _ => None,
        };
        Self {
            role: StyleRole::of(block),
            index,
            spans: block.content().map(Vec::as_slice).unwrap_or(&[]),
        }
    }
}

/// One node per block, in input order.
pub fn render_nodes(blocks: &[Block]) -> Vec<RenderNode<'_>> {
    blocks.iter().map(RenderNode::from_block).collect()
}
