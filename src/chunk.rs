//! Sentence-boundary text chunker.
//!
//! Splits document text into [`Chunk`]s whose sizes respect the configured
//! `[min_chars, max_chars]` window. Splitting occurs on sentence-ending
//! punctuation boundaries to preserve semantic coherence within each chunk;
//! a sentence is only ever cut when it alone exceeds `max_chars`.
//!
//! Consecutive chunks carry up to `overlap_chars` of trailing context from
//! the previous chunk so the language model sees cross-chunk continuity.
//! Each chunk records its byte range in the original document; consecutive
//! ranges overlap by at most `overlap_chars` and never leave a gap.
//!
//! Chunking is deterministic: the same text and parameters always produce
//! the same chunk sequence. Resumability depends on this — the chunk set
//! recomputed on retry must match the one the checkpoint was built from.

use crate::config::ChunkingConfig;

/// A contiguous slice of the source document.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position in the ordered chunk sequence, 0-based.
    pub index: usize,
    /// Slice content, including any leading overlap from the previous chunk.
    pub text: String,
    /// Byte offset of `text` in the original document.
    pub start: usize,
    /// Byte offset one past the end of `text` in the original document.
    pub end: usize,
}

/// Split text into sentence-aligned chunks with bounded overlap.
///
/// Empty input yields zero chunks (the pipeline short-circuits to an
/// empty result without ever touching the checkpoint store).
pub fn split(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let segments = pack_segments(text, config);

    let mut chunks = Vec::with_capacity(segments.len());
    for (i, &(seg_start, seg_end)) in segments.iter().enumerate() {
        let start = if i == 0 {
            seg_start
        } else {
            // Pull in trailing context from the previous segment, but never
            // reach back past its start.
            let prev_start = segments[i - 1].0;
            floor_char_boundary(text, seg_start.saturating_sub(config.overlap_chars))
                .max(prev_start)
        };
        chunks.push(Chunk {
            index: i,
            text: text[start..seg_end].to_string(),
            start,
            end: seg_end,
        });
    }

    chunks
}

/// Pack sentences into contiguous, non-overlapping segments covering the
/// whole document. A segment closes once it has reached `min_chars` and
/// the next sentence would push it past `max_chars`. A single sentence
/// longer than `max_chars` is hard-split, preferring space boundaries.
fn pack_segments(text: &str, config: &ChunkingConfig) -> Vec<(usize, usize)> {
    let sentences = sentence_ranges(text);

    let mut segments: Vec<(usize, usize)> = Vec::new();
    let mut seg_start = 0usize;
    let mut cursor = 0usize;

    for &(s_start, s_end) in &sentences {
        let s_len = s_end - s_start;
        let cur_len = cursor - seg_start;

        if cur_len >= config.min_chars && cur_len + s_len > config.max_chars {
            segments.push((seg_start, cursor));
            seg_start = cursor;
        }

        if s_len > config.max_chars {
            if cursor > seg_start {
                segments.push((seg_start, cursor));
            }
            hard_split(text, s_start, s_end, config.max_chars, &mut segments);
            seg_start = s_end;
            cursor = s_end;
        } else {
            cursor = s_end;
        }
    }

    if cursor > seg_start {
        segments.push((seg_start, cursor));
    }

    segments
}

/// Cut an oversized sentence into pieces of at most `max_chars` bytes,
/// splitting at the last space inside the window when one exists.
fn hard_split(
    text: &str,
    start: usize,
    end: usize,
    max_chars: usize,
    segments: &mut Vec<(usize, usize)>,
) {
    let mut piece_start = start;
    while piece_start < end {
        let mut piece_end = (piece_start + max_chars).min(end);
        if piece_end < end {
            piece_end = match text[piece_start..floor_char_boundary(text, piece_end)].rfind(' ') {
                Some(pos) if pos > 0 => piece_start + pos + 1,
                _ => floor_char_boundary(text, piece_end),
            };
            // Tiny max_chars plus a multi-byte char can floor back to the
            // piece start; advance by one char to guarantee progress.
            if piece_end <= piece_start {
                piece_end = text[piece_start..]
                    .chars()
                    .next()
                    .map(|c| piece_start + c.len_utf8())
                    .unwrap_or(end);
            }
        }
        segments.push((piece_start, piece_end));
        piece_start = piece_end;
    }
}

/// Contiguous byte ranges, one per sentence. A sentence ends after `.`,
/// `!`, or `?` followed by whitespace (the whitespace run is attached to
/// the sentence it closes, so ranges tile the document exactly).
fn sentence_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0usize;
    let mut iter = text.char_indices().peekable();

    while let Some((i, ch)) = iter.next() {
        if matches!(ch, '.' | '!' | '?') {
            let mut end = i + ch.len_utf8();
            let mut saw_whitespace = false;
            while let Some(&(j, next)) = iter.peek() {
                if next.is_whitespace() {
                    saw_whitespace = true;
                    end = j + next.len_utf8();
                    iter.next();
                } else {
                    break;
                }
            }
            // "3.14" stays intact: punctuation mid-word ends no sentence.
            if saw_whitespace || iter.peek().is_none() {
                ranges.push((start, end));
                start = end;
            }
        }
    }

    if start < text.len() {
        ranges.push((start, text.len()));
    }

    ranges
}

fn floor_char_boundary(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}
