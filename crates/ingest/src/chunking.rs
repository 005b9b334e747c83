//! Chunking strategies and the length-tiered strategy selector: sentence,
//! paragraph, and fixed-window packing, chosen by input text length.

use hybridrag_core::chunk::Chunk;
use uuid::Uuid;

pub trait Chunker: Send + Sync {
    fn chunk_strategy(&self) -> &'static str;
    fn chunk(&self, text: &str) -> Vec<Chunk>;
}

fn new_chunk(text: &str) -> Chunk {
    Chunk::new(Uuid::new_v4().to_string(), text.to_string())
}

/// Fixed-size windowing over characters, stepping by `size - overlap`.
pub struct FixedWindowChunker {
    pub size: usize,
    pub overlap: usize,
}

impl Chunker for FixedWindowChunker {
    fn chunk_strategy(&self) -> &'static str {
        "fixed_char"
    }

    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0usize;
        let step = self.size.saturating_sub(self.overlap).max(1);

        while start < chars.len() {
            let end = (start + self.size).min(chars.len());
            let piece: String = chars[start..end].iter().collect();
            chunks.push(new_chunk(&piece));
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

/// Splits `text` right after a `.`/`!`/`?` that is followed by whitespace,
/// consuming that whitespace as the separator — equivalent to Python's
/// `re.split(r"(?<=[.!?])\s+", text)` without relying on lookbehind, which
/// the `regex` crate does not support.
fn split_sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'.' || b == b'!' || b == b'?' {
            let mut j = i + 1;
            let ws_start = j;
            while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                j += 1;
            }
            if j > ws_start {
                sentences.push(&text[start..i + 1]);
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Splits on sentence boundaries, then greedily packs sentences into
/// buffers no larger than `size` characters.
pub struct SentenceChunker {
    pub size: usize,
    pub overlap: usize,
}

impl Chunker for SentenceChunker {
    fn chunk_strategy(&self) -> &'static str {
        "sentence"
    }

    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }
        let sentences = split_sentences(text);
        pack_segments(&sentences, self.size, " ")
    }
}

/// Splits on blank lines, merges paragraphs into buffers up to `size`
/// characters. Overlap is not applied between paragraph buffers — the
/// `overlap` field is accepted for symmetry with the other strategies but
/// unused. An oversized single paragraph becomes its own solo chunk.
pub struct ParagraphChunker {
    pub size: usize,
    #[allow(dead_code)]
    pub overlap: usize,
}

impl Chunker for ParagraphChunker {
    fn chunk_strategy(&self) -> &'static str {
        "paragraph"
    }

    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }
        let paragraphs: Vec<&str> = text.split("\n\n").map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
        pack_segments(&paragraphs, self.size, "\n\n")
    }
}

/// Overflow is tested on `buffer.len() + segment.len()` — the joiner is
/// excluded from the threshold, matching the ground-truth chunker exactly.
fn pack_segments(segments: &[&str], size: usize, joiner: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for segment in segments {
        if buffer.is_empty() {
            buffer = segment.to_string();
        } else if buffer.len() + segment.len() <= size {
            buffer.push_str(joiner);
            buffer.push_str(segment);
        } else {
            chunks.push(new_chunk(&buffer));
            buffer = segment.to_string();
        }
    }
    if !buffer.is_empty() {
        chunks.push(new_chunk(&buffer));
    }
    chunks
}

/// Length-tiered strategy choice: short text gets small sentence chunks,
/// medium text gets paragraph chunks, everything else falls back to
/// fixed-size windowing.
pub fn choose_chunker(text: &str) -> Box<dyn Chunker> {
    let len = text.chars().count();
    if len < 2000 {
        Box::new(SentenceChunker { size: 200, overlap: 20 })
    } else if len < 10000 {
        Box::new(ParagraphChunker { size: 500, overlap: 50 })
    } else {
        Box::new(FixedWindowChunker { size: 1000, overlap: 100 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_selects_sentence_chunker() {
        let chunker = choose_chunker("short");
        assert_eq!(chunker.chunk_strategy(), "sentence");
    }

    #[test]
    fn medium_text_selects_paragraph_chunker() {
        let text = "x".repeat(5000);
        let chunker = choose_chunker(&text);
        assert_eq!(chunker.chunk_strategy(), "paragraph");
    }

    #[test]
    fn long_text_selects_fixed_window_chunker() {
        let text = "x".repeat(20000);
        let chunker = choose_chunker(&text);
        assert_eq!(chunker.chunk_strategy(), "fixed_char");
    }

    #[test]
    fn fixed_window_chunker_steps_by_size_minus_overlap() {
        let chunker = FixedWindowChunker { size: 10, overlap: 2 };
        let chunks = chunker.chunk(&"a".repeat(25));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "a".repeat(10));
    }

    #[test]
    fn sentence_chunker_splits_on_punctuation() {
        let chunker = SentenceChunker { size: 1000, overlap: 0 };
        let chunks = chunker.chunk("One. Two! Three?");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "One. Two! Three?");
    }

    #[test]
    fn sentence_chunker_packs_into_multiple_buffers_when_over_size() {
        let chunker = SentenceChunker { size: 8, overlap: 0 };
        let chunks = chunker.chunk("One. Two. Three.");
        assert!(chunks.len() > 1);
    }

    #[test]
    fn pack_segments_excludes_joiner_from_overflow_threshold() {
        // "aaaaa" (5) + "\n\n" (2) + "bbbbb" (5) = 12 chars if the buffer
        // merges them, which exceeds a size of 10 only when the joiner is
        // counted. Excluding the joiner (5 + 5 = 10 <= 10) packs both
        // paragraphs into a single chunk.
        let chunker = ParagraphChunker { size: 10, overlap: 0 };
        let chunks = chunker.chunk("aaaaa\n\nbbbbb");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "aaaaa\n\nbbbbb");
    }

    #[test]
    fn paragraph_chunker_keeps_oversized_paragraph_as_solo_chunk() {
        let chunker = ParagraphChunker { size: 5, overlap: 0 };
        let chunks = chunker.chunk("a long paragraph that exceeds the size\n\nshort");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "a long paragraph that exceeds the size");
    }
}
