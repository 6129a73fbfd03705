use html_escape::encode_text_to_string;

use crate::block::{Block, Span};
use crate::render::{RenderNode, StyleRole, render_nodes};

/// Render blocks as an HTML fragment, one element per block.
///
/// All span text is escaped; the only markup in the output is what this
/// function writes itself. Report text comes from an external generator and
/// is never passed through as markup.
pub fn blocks_to_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for node in render_nodes(blocks) {
        emit_node(&node, &mut out);
        out.push('\n');
    }
    out
}

fn emit_node(node: &RenderNode<'_>, out: &mut String) {
    let class = node.role.as_str();
    match node.role {
        StyleRole::Spacer => {
            out.push_str("<div class=\"spacer\"></div>");
        }
        StyleRole::Rule => {
            out.push_str("<hr class=\"rule\">");
        }
        StyleRole::Numbered => {
            out.push_str("<div class=\"numbered\"><span class=\"marker\">");
            if let Some(index) = node.index {
                out.push_str(&index.to_string());
            }
            out.push_str(".</span> ");
            spans_to_html(node.spans, out);
            out.push_str("</div>");
        }
        StyleRole::Bullet => {
            out.push_str("<div class=\"bullet\"><span class=\"marker\"></span>");
            spans_to_html(node.spans, out);
            out.push_str("</div>");
        }
        _ => {
            let tag = element_for(node.role);
            out.push('<');
            out.push_str(tag);
            out.push_str(" class=\"");
            out.push_str(class);
            out.push_str("\">");
            spans_to_html(node.spans, out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn element_for(role: StyleRole) -> &'static str {
    match role {
        StyleRole::Heading1 => "h1",
        StyleRole::Heading2 => "h2",
        StyleRole::Heading3 => "h3",
        StyleRole::Quote => "blockquote",
        _ => "p",
    }
}

fn spans_to_html(spans: &[Span], out: &mut String) {
    for span in spans {
        let (open, close) = match span {
            Span::Text(_) => ("", ""),
            Span::Bold(_) => ("<b>", "</b>"),
            Span::Italic(_) => ("<i>", "</i>"),
            Span::Code(_) => ("<code>", "</code>"),
            Span::Icon(_) => ("<span class=\"icon\">", "</span>"),
        };
        out.push_str(open);
        encode_text_to_string(span.text(), out);
        out.push_str(close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Features;
    use crate::inline::InlineFormatter;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn html(text: &str) -> String {
        let formatter = InlineFormatter::new(
            Features {
                numbered_lists: true,
                code_spans: true,
            },
            ["🔬", "⚠️"],
        );
        blocks_to_html(&parse(text, &formatter))
    }

    #[test]
    fn heading_with_icon() {
        assert_eq!(
            html("# 🔬 Findings"),
            "<h1 class=\"heading-1\"><span class=\"icon\">🔬</span> Findings</h1>\n"
        );
    }

    #[test]
    fn one_element_per_line() {
        assert_eq!(
            html("> note\n\n---\n* a\n2. b\ntext"),
            concat!(
                "<blockquote class=\"quote\">note</blockquote>\n",
                "<div class=\"spacer\"></div>\n",
                "<hr class=\"rule\">\n",
                "<div class=\"bullet\"><span class=\"marker\"></span>a</div>\n",
                "<div class=\"numbered\"><span class=\"marker\">2.</span> b</div>\n",
                "<p class=\"paragraph\">text</p>\n",
            )
        );
    }

    #[test]
    fn inline_spans() {
        assert_eq!(
            html("**Impression:** *mild* `J18.9`"),
            "<p class=\"paragraph\"><b>Impression:</b> <i>mild</i> <code>J18.9</code></p>\n"
        );
    }

    #[test]
    fn generated_markup_is_escaped() {
        assert_eq!(
            html("<script>alert(1)</script> & **<b>**"),
            "<p class=\"paragraph\">&lt;script&gt;alert(1)&lt;/script&gt; &amp; <b>&lt;b&gt;</b></p>\n"
        );
    }
}
