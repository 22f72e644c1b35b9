//! Sentence-window splitting.
//!
//! Packs whole sentences into chunks up to the configured size and carries a
//! few trailing sentences into the next chunk as overlap.

use super::{ChunkingConfig, TextChunk};
use crate::document::DocumentPage;
use regex::Regex;

/// Splits document pages into overlapping chunks of sentences.
pub struct SentenceSplitter {
    config: ChunkingConfig,
    whitespace: Regex,
    boundary: Regex,
}

impl SentenceSplitter {
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            whitespace: Regex::new(r"\s+").expect("Invalid regex"),
            // Terminal punctuation followed by the space that separates sentences.
            boundary: Regex::new(r"[.!?]+ ").expect("Invalid regex"),
        }
    }

    /// Split pages into chunks. Chunks never span pages.
    pub fn split(&self, pages: &[DocumentPage]) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut order = 0;

        for page in pages {
            for text in self.split_text(&page.text) {
                chunks.push(TextChunk {
                    text,
                    file_name: page.file_name.clone(),
                    page_label: page.page_label.clone(),
                    order,
                });
                order += 1;
            }
        }

        chunks
    }

    /// Split a single text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let normalized = self.whitespace.replace_all(text, " ");
        let normalized = normalized.trim();
        if normalized.is_empty() {
            return Vec::new();
        }

        let max_chars = self.config.chunk_chars();
        let overlap_chars = self.config.overlap_chars();

        let pieces: Vec<String> = self
            .sentences(normalized)
            .into_iter()
            .flat_map(|s| split_long(s, max_chars))
            .collect();

        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for piece in pieces {
            if !current.is_empty() && joined_len(&current) + 1 + char_len(&piece) > max_chars {
                chunks.push(current.join(" "));

                let mut overlap = trailing_within(&current, overlap_chars);
                if !overlap.is_empty() && joined_len(&overlap) + 1 + char_len(&piece) > max_chars {
                    overlap.clear();
                }
                current = overlap;
            }
            current.push(piece);
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }

    /// Slice whitespace-normalised text into sentences.
    ///
    /// Joining the sentences with single spaces gives back `text` exactly.
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for boundary in self.boundary.find_iter(text) {
            // Keep the punctuation, drop the separating space
            sentences.push(&text[start..boundary.end() - 1]);
            start = boundary.end();
        }
        if start < text.len() {
            sentences.push(&text[start..]);
        }

        sentences
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Length of the pieces joined by single spaces.
fn joined_len(pieces: &[String]) -> usize {
    let chars: usize = pieces.iter().map(|p| char_len(p)).sum();
    chars + pieces.len().saturating_sub(1)
}

/// The longest run of trailing pieces that fits in `budget` characters.
fn trailing_within(pieces: &[String], budget: usize) -> Vec<String> {
    let mut taken = Vec::new();
    let mut used = 0;

    for piece in pieces.iter().rev() {
        let cost = char_len(piece) + usize::from(!taken.is_empty());
        if used + cost > budget {
            break;
        }
        used += cost;
        taken.push(piece.clone());
    }

    taken.reverse();
    taken
}

/// Break a sentence longer than `max_chars` on word boundaries.
fn split_long(sentence: &str, max_chars: usize) -> Vec<String> {
    if char_len(sentence) <= max_chars {
        return vec![sentence.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();

    for word in sentence.split(' ') {
        for fragment in split_word(word, max_chars) {
            let extra = if current.is_empty() { 0 } else { 1 };
            if !current.is_empty() && char_len(&current) + extra + char_len(&fragment) > max_chars {
                parts.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&fragment);
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Break a single word that is longer than `max_chars`.
fn split_word(word: &str, max_chars: usize) -> Vec<String> {
    if char_len(word) <= max_chars {
        return vec![word.to_string()];
    }
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect())
        .collect()
}
