//! # Length Fallback
//!
//! Splits oversize extract text into pieces of at most `max_len` characters.
//!
//! ## Strategy
//!
//! 1. Cut the text into units at sentence boundaries (UAX #29), at the start of
//!    enumerated (`1.`) or itemized (`-`, `*`) list lines and after blank lines
//! 2. Units still longer than `max_len` are cut again at word boundaries
//! 3. Units are packed greedily into pieces that stay within `max_len`
//!
//! Units are contiguous byte ranges of the input, so the trimmed pieces
//! joined together give back the input up to whitespace. A piece only
//! exceeds `max_len` when a single word does.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

fn boundary_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?m)^[ \t]*(?:\d+\.|[-*])[ \t]|\n[ \t]*\n").ok())
        .as_ref()
}

/// Split `text` into trimmed pieces of at most `max_len` characters
pub fn split_by_sentence(text: &str, max_len: usize) -> Vec<String> {
    let mut units = Vec::new();
    for segment in segments(text) {
        let base = segment.start;
        for (offset, sentence) in text[segment].split_sentence_bound_indices() {
            let range = base + offset..base + offset + sentence.len();
            if trimmed_len(&text[range.clone()]) > max_len {
                units.extend(
                    text[range.clone()]
                        .split_word_bound_indices()
                        .map(|(start, word)| range.start + start..range.start + start + word.len()),
                );
            } else {
                units.push(range);
            }
        }
    }

    let mut pieces = Vec::new();
    let mut current: Option<Range<usize>> = None;
    for unit in units {
        current = match current {
            None => Some(unit),
            Some(range) => {
                let grown = range.start..unit.end;
                if trimmed_len(&text[grown.clone()]) > max_len && trimmed_len(&text[range.clone()]) > 0 {
                    pieces.push(range);
                    Some(unit)
                } else {
                    Some(grown)
                }
            }
        };
    }
    pieces.extend(current);

    pieces
        .into_iter()
        .map(|range| text[range].trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Contiguous segments separated by paragraph breaks and list item starts
fn segments(text: &str) -> Vec<Range<usize>> {
    let mut cuts = vec![0];
    if let Some(pattern) = boundary_pattern() {
        for found in pattern.find_iter(text) {
            let at = if found.as_str().starts_with('\n') && found.as_str().trim().is_empty() {
                found.end()
            } else {
                found.start()
            };
            cuts.push(at);
        }
    }
    cuts.push(text.len());
    cuts.sort_unstable();
    cuts.dedup();
    cuts.windows(2).map(|pair| pair[0]..pair[1]).collect()
}

fn trimmed_len(text: &str) -> usize {
    text.trim().chars().count()
}
