//! Literal-token preservation.
//! Splits text into translatable runs and literal tokens (quoted strings,
//! numbers, identifier-shaped words) so engines never mangle code
//! identifiers, file paths, or numeric values embedded in error messages.

use regex::Regex;

/// One piece of split input, in original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must survive translation verbatim.
    Literal(String),
    /// Dispatched to the translation pipeline.
    Text(String),
}

pub struct TokenPreserver {
    full: Regex,
    quoted: Regex,
    bare_number: Regex,
    bare_identifier: Regex,
}

impl TokenPreserver {
    pub fn new() -> Self {
        Self {
            // Quoted literals, integer runs, identifier-shaped words
            full: Regex::new(r#""[^"]*"|'[^']*'|`[^`]*`|\d+|[A-Za-z_][A-Za-z0-9_]*"#)
                .expect("token pattern"),
            quoted: Regex::new(r#""[^"]*"|'[^']*'|`[^`]*`"#).expect("quote pattern"),
            bare_number: Regex::new(r"^\d+$").expect("number pattern"),
            bare_identifier: Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"),
        }
    }

    /// Full tokenization: every quoted literal, number, and identifier is a
    /// `Literal`; the punctuation and whitespace between them is `Text`.
    /// Used for formatted traceback lines.
    pub fn split(&self, text: &str) -> Vec<Segment> {
        split_with(&self.full, text)
    }

    /// Split on quoted literals only, leaving the surrounding sentence intact
    /// as translatable text. Used for error messages, where the prose should
    /// reach an engine as one piece.
    pub fn split_quoted(&self, text: &str) -> Vec<Segment> {
        split_with(&self.quoted, text)
    }

    /// Whole-string literal check: a bare number, a bare identifier, or a
    /// fully quoted string is returned unchanged by the smart translate path.
    pub fn is_preservable(&self, text: &str) -> bool {
        if self.bare_number.is_match(text) || self.bare_identifier.is_match(text) {
            return true;
        }
        let quoted = |open: char, close: char| {
            text.len() >= 2 && text.starts_with(open) && text.ends_with(close)
        };
        quoted('"', '"') || quoted('\'', '\'') || quoted('`', '`')
    }
}

impl Default for TokenPreserver {
    fn default() -> Self {
        Self::new()
    }
}

fn split_with(pattern: &Regex, text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for m in pattern.find_iter(text) {
        if m.start() > last {
            segments.push(Segment::Text(text[last..m.start()].to_string()));
        }
        segments.push(Segment::Literal(m.as_str().to_string()));
        last = m.end();
    }
    if last < text.len() {
        segments.push(Segment::Text(text[last..].to_string()));
    }
    segments
}
