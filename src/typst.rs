use crate::block::{Block, Span};
use crate::config::PageConfig;

/// Convert blocks to Typst markup
pub fn blocks_to_typst(blocks: &[Block], page: &PageConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!("#set page(paper: \"{}\"", escape_str(&page.paper)));
    if page.numbers {
        out.push_str(", numbering: \"1\"");
    }
    out.push_str(")\n");
    // Set up paragraph settings to prevent widows/orphans
    out.push_str("#set par(linebreaks: \"optimized\")\n\n");

    let mut i = 0;
    while i < blocks.len() {
        match &blocks[i] {
            Block::Heading { .. } => {
                // Keep heading with its first piece of real content
                out.push_str("#block(breakable: false)[\n");
                emit_block(blocks, i, &mut out);
                while i + 1 < blocks.len() {
                    i += 1;
                    emit_block(blocks, i, &mut out);
                    if !matches!(blocks[i], Block::Spacer) {
                        break;
                    }
                }
                out.push_str("]\n\n");
            }
            _ => emit_block(blocks, i, &mut out),
        }
        i += 1;
    }

    out
}

fn emit_block(blocks: &[Block], i: usize, out: &mut String) {
    match &blocks[i] {
        Block::Spacer => {
            out.push_str("#v(0.5em)\n\n");
        }
        Block::Rule => {
            out.push_str("#line(length: 100%)\n\n");
        }
        Block::Heading { level, content } => {
            for _ in 0..*level {
                out.push('=');
            }
            out.push(' ');
            spans_to_typst(content, out);
            out.push_str("\n\n");
        }
        Block::Quote { content } => {
            out.push_str("#quote(block: true)[");
            spans_to_typst(content, out);
            out.push_str("]\n\n");
        }
        Block::BulletItem { content } => {
            out.push_str("- ");
            spans_to_typst(content, out);
            out.push('\n');
            end_list_if_last(blocks, i, out);
        }
        Block::NumberedItem { index, content } => {
            out.push_str(&format!("{index}. "));
            spans_to_typst(content, out);
            out.push('\n');
            end_list_if_last(blocks, i, out);
        }
        Block::Paragraph { content } => {
            let rest = guard_line_start(content, out);
            spans_to_typst(rest, out);
            out.push_str("\n\n");
        }
    }
}

/// Separate a list from whatever follows so the next line isn't absorbed into the last item.
fn end_list_if_last(blocks: &[Block], i: usize, out: &mut String) {
    let same_kind = match (&blocks[i], blocks.get(i + 1)) {
        (Block::BulletItem { .. }, Some(Block::BulletItem { .. })) => true,
        (Block::NumberedItem { .. }, Some(Block::NumberedItem { .. })) => true,
        _ => false,
    };
    if !same_kind {
        out.push('\n');
    }
}

/// A paragraph starting with a Typst block marker would change kind.
///
/// Writes the first span with its marker escaped and returns the spans left to emit.
fn guard_line_start<'a>(content: &'a [Span], out: &mut String) -> &'a [Span] {
    let Some((Span::Text(text), rest)) = content.split_first() else {
        return content;
    };
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && text[digits..].starts_with('.') {
        out.push_str(&text[..digits]);
        out.push_str("\\.");
        escape_into(&text[digits + 1..], out);
    } else if text.starts_with(['=', '+', '-']) {
        out.push('\\');
        escape_into(text, out);
    } else {
        escape_into(text, out);
    }
    rest
}

fn spans_to_typst(spans: &[Span], out: &mut String) {
    let mut after_call = false;
    for span in spans {
        match span {
            // `#strong[..].x` would continue the call as a field access
            Span::Text(text) if after_call && text.starts_with('.') => {
                out.push_str("\\.");
                escape_into(&text[1..], out);
            }
            _ => span_to_typst(span, out),
        }
        after_call = matches!(span, Span::Bold(_) | Span::Italic(_));
    }
}

fn span_to_typst(span: &Span, out: &mut String) {
    match span {
        Span::Text(text) => escape_into(text, out),
        // Function form, since `*` and `_` only open emphasis at word boundaries
        Span::Bold(text) => {
            out.push_str("#strong[");
            escape_into(text, out);
            out.push(']');
        }
        Span::Italic(text) => {
            out.push_str("#emph[");
            escape_into(text, out);
            out.push(']');
        }
        Span::Code(text) => {
            // Payload can't hold a backtick, the delimiter ends the span
            out.push('`');
            out.push_str(text);
            out.push('`');
        }
        Span::Icon(glyph) => out.push_str(glyph),
    }
}

/// Escape special Typst markup characters
fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '/' | '~' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
}

fn escape_str(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
