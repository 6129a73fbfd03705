//! Inline emphasis and pictogram handling for block content.
//!
//! Formatting runs as a series of passes over the fragments that are still
//! raw text: bold, then italic, then code (if enabled), then icon glyphs.
//! Once a pass has claimed a range it is never rescanned, so the `**` of a
//! bold span cannot be split into two italics.

use regex::Regex;
use std::sync::OnceLock;

use crate::block::Span;
use crate::config::{Features, Profile};

fn bold_regex() -> &'static Regex {
    static BOLD_REGEX: OnceLock<Regex> = OnceLock::new();
    BOLD_REGEX.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("Invalid bold regex"))
}

fn italic_regex() -> &'static Regex {
    static ITALIC_REGEX: OnceLock<Regex> = OnceLock::new();
    ITALIC_REGEX.get_or_init(|| Regex::new(r"\*(.+?)\*").expect("Invalid italic regex"))
}

fn code_regex() -> &'static Regex {
    static CODE_REGEX: OnceLock<Regex> = OnceLock::new();
    CODE_REGEX.get_or_init(|| Regex::new(r"`(.+?)`").expect("Invalid code regex"))
}

enum Piece<'a> {
    Raw(&'a str),
    Done(Span),
}

/// Turns block content into inline spans according to a profile.
#[derive(Debug, Clone)]
pub struct InlineFormatter {
    features: Features,
    // Longest first so a glyph with a variation selector beats its bare form
    icons: Vec<String>,
}

impl InlineFormatter {
    pub fn new<I, S>(features: Features, icons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut icons: Vec<String> = icons
            .into_iter()
            .map(Into::into)
            .filter(|icon| !icon.is_empty())
            .collect();
        icons.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        icons.dedup();
        Self { features, icons }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self::new(profile.features, profile.icons.iter().cloned())
    }

    pub fn features(&self) -> Features {
        self.features
    }

    /// Split `content` into spans. Never fails; unmatched delimiters stay literal.
    pub fn format(&self, content: &str) -> Vec<Span> {
        let mut pieces = vec![Piece::Raw(content)];
        pieces = split_delimited(pieces, bold_regex(), Span::Bold);
        pieces = split_delimited(pieces, italic_regex(), Span::Italic);
        if self.features.code_spans {
            pieces = split_delimited(pieces, code_regex(), Span::Code);
        }

        let mut spans = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match piece {
                Piece::Raw(raw) => self.push_with_icons(raw, &mut spans),
                Piece::Done(span) => spans.push(span),
            }
        }
        spans
    }

    fn push_with_icons(&self, raw: &str, spans: &mut Vec<Span>) {
        let mut text_start = 0;
        let mut pos = 0;
        while pos < raw.len() {
            let rest = &raw[pos..];
            match self.icons.iter().find(|icon| rest.starts_with(icon.as_str())) {
                Some(icon) => {
                    push_text(spans, &raw[text_start..pos]);
                    spans.push(Span::Icon(icon.clone()));
                    pos += icon.len();
                    text_start = pos;
                }
                None => pos += rest.chars().next().map_or(1, char::len_utf8),
            }
        }
        push_text(spans, &raw[text_start..]);
    }
}

fn push_text(spans: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(Span::Text(prev)) => prev.push_str(text),
        _ => spans.push(Span::Text(text.to_string())),
    }
}

/// Claim every match of `pattern` in the raw pieces, leaving the gaps raw.
///
/// Patterns are lazy with a non-empty payload, so each run closes at the
/// nearest delimiter and `a ** b` is not a span.
fn split_delimited<'a>(
    pieces: Vec<Piece<'a>>,
    pattern: &Regex,
    wrap: fn(String) -> Span,
) -> Vec<Piece<'a>> {
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let Piece::Raw(raw) = piece else {
            out.push(piece);
            continue;
        };
        let mut last = 0;
        for caps in pattern.captures_iter(raw) {
            let (Some(whole), Some(payload)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                out.push(Piece::Raw(&raw[last..whole.start()]));
            }
            out.push(Piece::Done(wrap(payload.as_str().to_string())));
            last = whole.end();
        }
        if last < raw.len() {
            out.push(Piece::Raw(&raw[last..]));
        }
    }
    out
}
