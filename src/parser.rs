use regex::Regex;
use std::sync::OnceLock;

use crate::block::Block;
use crate::config::Features;
use crate::inline::InlineFormatter;

fn heading_regex() -> &'static Regex {
    static HEADING_REGEX: OnceLock<Regex> = OnceLock::new();
    HEADING_REGEX.get_or_init(|| Regex::new(r"^(#{1,3}) (.+)").expect("Invalid heading regex"))
}

fn bullet_regex() -> &'static Regex {
    static BULLET_REGEX: OnceLock<Regex> = OnceLock::new();
    BULLET_REGEX.get_or_init(|| Regex::new(r"^[*•-] ").expect("Invalid bullet regex"))
}

fn numbered_regex() -> &'static Regex {
    static NUMBERED_REGEX: OnceLock<Regex> = OnceLock::new();
    NUMBERED_REGEX.get_or_init(|| Regex::new(r"^([0-9]+)\. ").expect("Invalid numbered regex"))
}

/// Classify a single line (no embedded newline) into a block.
///
/// Rules are tried in a fixed order and the first match wins: blank, rule,
/// heading, quote, bullet, numbered (if enabled), paragraph. Every line maps
/// to exactly one block.
pub fn classify_line<'a>(line: &'a str, features: &Features) -> Block<&'a str> {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Block::Spacer;
    }

    if trimmed == "---" || trimmed == "***" {
        return Block::Rule;
    }

    if let Some(caps) = heading_regex().captures(trimmed) {
        let level = caps[1].len() as u8;
        let content = caps.get(2).map_or("", |m| m.as_str());
        return Block::Heading { level, content };
    }

    if let Some(content) = trimmed.strip_prefix("> ") {
        return Block::Quote { content };
    }

    if let Some(marker) = bullet_regex().find(trimmed) {
        return Block::BulletItem {
            content: &trimmed[marker.end()..],
        };
    }

    if features.numbered_lists {
        if let Some(caps) = numbered_regex().captures(trimmed) {
            // Overlong digit runs saturate rather than reject the line
            let index = caps[1].parse().unwrap_or(u64::MAX);
            let end = caps.get(0).map_or(0, |m| m.end());
            return Block::NumberedItem {
                index,
                content: &trimmed[end..],
            };
        }
    }

    Block::Paragraph { content: trimmed }
}

/// Parse report text into blocks, one per physical line.
pub fn parse(text: &str, formatter: &InlineFormatter) -> Vec<Block> {
    let features = formatter.features();
    text.split('\n')
        .map(|line| classify_line(line, &features).map_content(|content| formatter.format(content)))
        .collect()
}
