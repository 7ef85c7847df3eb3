//! Splits extracted document text into overlapping chunks for embedding.
//!
//! Natural boundaries win: paragraphs first, then sentences, then a hard
//! character cut. All lengths are counted in chars, not bytes.
use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use tracing::debug;

/// Terminators that end a sentence wherever they appear.
const FULL_WIDTH_ENDS: &[char] = &['。', '！', '？', '；', '\n'];
/// Terminators that end a sentence only before whitespace or end of text,
/// so `3.14` and `example.com` stay whole.
const ASCII_ENDS: &[char] = &['.', '!', '?', ';'];

/// One chunk plus how many of its leading chars repeat the tail of the
/// previous chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub carried: usize,
}

impl Chunk {
    /// The part of the chunk that is new relative to its predecessor.
    pub fn fresh(&self) -> String { self.text.chars().skip(self.carried).collect() }
}

/// Byte range of a trimmed split unit within the normalized text.
#[derive(Debug, Clone, Copy)]
struct Unit {
    start: usize,
    end: usize,
    len: usize,
}

/// The chunk being packed, as a byte range of the normalized text.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    len: usize,
    carried: usize,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Validation("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Validation(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> { Self::new(config.chunk_size, config.chunk_overlap) }

    pub fn chunk_size(&self) -> usize { self.chunk_size }
    pub fn chunk_overlap(&self) -> usize { self.chunk_overlap }

    pub fn chunk(&self, text: &str) -> Vec<String> { self.split(text).into_iter().map(|c| c.text).collect() }

    /// Every chunk is a verbatim slice of `text` (after CRLF normalization);
    /// whitespace between units is kept as written.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let normalized = text.replace("\r\n", "\n");
        let units = self.units(&normalized);
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current: Option<Span> = None;
        let mut prev_end = 0usize;
        for unit in units {
            let joiner_len = normalized[prev_end..unit.start].chars().count();
            prev_end = unit.end;
            let Some(mut span) = current else {
                current = Some(Span { start: unit.start, end: unit.end, len: unit.len, carried: 0 });
                continue;
            };
            if span.len + joiner_len + unit.len <= self.chunk_size {
                span.end = unit.end;
                span.len += joiner_len + unit.len;
                current = Some(span);
                continue;
            }
            chunks.push(Chunk { text: normalized[span.start..span.end].to_string(), carried: span.carried });
            let take = self.chunk_overlap.min(self.chunk_size.saturating_sub(joiner_len + unit.len)).min(span.len);
            current = Some(match tail_start(&normalized[span.start..span.end], take) {
                Some(offset) => {
                    // Overlap never opens a chunk with whitespace.
                    let tail = &normalized[span.start + offset..span.end];
                    let skip = tail.len() - tail.trim_start().len();
                    let carried = take - tail[..skip].chars().count();
                    Span { start: span.start + offset + skip, end: unit.end, len: carried + joiner_len + unit.len, carried }
                }
                None => Span { start: unit.start, end: unit.end, len: unit.len, carried: 0 },
            });
        }
        if let Some(span) = current {
            chunks.push(Chunk { text: normalized[span.start..span.end].to_string(), carried: span.carried });
        }
        debug!(chars = normalized.chars().count(), chunks = chunks.len(), "split document");
        chunks
    }

    fn units(&self, text: &str) -> Vec<Unit> {
        let max_unit = self.chunk_size - self.chunk_overlap;
        let mut units = Vec::new();
        let mut offset = 0usize;
        for paragraph in text.split("\n\n") {
            let base = offset;
            offset += paragraph.len() + 2;
            let Some((ps, pe)) = trimmed_range(paragraph, 0, paragraph.len()) else { continue };
            let len = paragraph[ps..pe].chars().count();
            if len <= max_unit {
                units.push(Unit { start: base + ps, end: base + pe, len });
                continue;
            }
            for (ss, se) in sentence_ranges(paragraph) {
                let len = paragraph[ss..se].chars().count();
                if len <= max_unit {
                    units.push(Unit { start: base + ss, end: base + se, len });
                } else {
                    hard_cut(paragraph, ss, se, max_unit, base, &mut units);
                }
            }
        }
        units
    }
}

/// Byte offset where the last `take` chars of `s` begin.
fn tail_start(s: &str, take: usize) -> Option<usize> {
    if take == 0 {
        return None;
    }
    s.char_indices().rev().nth(take - 1).map(|(i, _)| i)
}

/// `s[start..end]` with surrounding whitespace removed, or `None` if blank.
fn trimmed_range(s: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let piece = &s[start..end];
    let trimmed = piece.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = piece.len() - piece.trim_start().len();
    Some((start + lead, start + lead + trimmed.len()))
}

/// Trimmed sentence ranges of `paragraph`, never blank.
fn sentence_ranges(paragraph: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut chars = paragraph.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let boundary = FULL_WIDTH_ENDS.contains(&c)
            || (ASCII_ENDS.contains(&c) && chars.peek().map_or(true, |&(_, next)| next.is_whitespace()));
        if boundary {
            let end = i + c.len_utf8();
            out.extend(trimmed_range(paragraph, start, end));
            start = end;
        }
    }
    out.extend(trimmed_range(paragraph, start, paragraph.len()));
    out
}

/// Cuts `s[start..end]` every `max_unit` chars; whitespace at the cut edges
/// stays between units.
fn hard_cut(s: &str, start: usize, end: usize, max_unit: usize, base: usize, units: &mut Vec<Unit>) {
    let mut bounds: Vec<usize> = s[start..end].char_indices().map(|(i, _)| start + i).step_by(max_unit).collect();
    bounds.push(end);
    for w in bounds.windows(2) {
        if let Some((ps, pe)) = trimmed_range(s, w[0], w[1]) {
            units.push(Unit { start: base + ps, end: base + pe, len: s[ps..pe].chars().count() });
        }
    }
}

/// Convenience wrapper: validate parameters and split in one call.
pub fn chunk(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
    Ok(Chunker::new(chunk_size, chunk_overlap)?.chunk(text))
}
