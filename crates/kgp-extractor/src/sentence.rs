//! Sentence segmentation
//!
//! Splits on `.`, `!` and `?` followed by whitespace and an uppercase
//! letter, digit or quote. Common honorific abbreviations never end a
//! sentence.

/// Abbreviations that never end a sentence
const ABBREVIATIONS: &[&str] = &["Dr", "Mr", "Mrs", "Ms", "Prof", "St", "Jr", "Sr", "vs"];

/// A sentence with its byte span in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

impl Sentence<'_> {
    /// Whether a byte span lies inside this sentence
    pub fn contains_span(&self, start: usize, end: usize) -> bool {
        start >= self.start && end <= self.end
    }
}

/// Split text into trimmed, non-empty sentences
pub fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        let end = i + ch.len_utf8();
        if end <= start || !is_boundary(text, i, end) {
            continue;
        }
        push_trimmed(text, start, end, &mut sentences);
        start = end;
    }

    if start < text.len() {
        push_trimmed(text, start, text.len(), &mut sentences);
    }

    sentences
}

fn is_boundary(text: &str, punct: usize, end: usize) -> bool {
    let rest = &text[end..];
    let Some(first) = rest.chars().next() else {
        return true;
    };
    if !first.is_whitespace() {
        return false;
    }
    let next_visible = rest.trim_start().chars().next();
    let starts_sentence = next_visible
        .map(|c| c.is_uppercase() || c.is_ascii_digit() || c == '"' || c == '\'')
        .unwrap_or(true);
    if !starts_sentence {
        return false;
    }

    let word = text[..punct]
        .rsplit(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("");
    !ABBREVIATIONS.contains(&word)
}

fn push_trimmed<'a>(text: &'a str, start: usize, end: usize, out: &mut Vec<Sentence<'a>>) {
    let raw = &text[start..end];
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let s = start + leading;
    out.push(Sentence {
        start: s,
        end: s + trimmed.len(),
        text: trimmed,
    });
}
