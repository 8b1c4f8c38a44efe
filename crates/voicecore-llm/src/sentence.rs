//! Sentence-boundary extraction over a streaming token buffer (spec §4.6).

/// A sentence longer than this without a boundary is forcibly emitted at the
/// next whitespace past the limit.
pub const FORCE_EMIT_LENGTH: usize = 200;

/// Accumulates streamed LLM text and yields complete sentences as soon as a
/// boundary is recognized.
#[derive(Debug, Default)]
pub struct SentenceExtractor {
    buffer: String,
}

fn is_boundary_punct(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

impl SentenceExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of streamed text, returning every sentence the chunk
    /// completed, in source order.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        self.drain_ready(false)
    }

    /// Flush the remainder at end-of-stream, treating it as a final sentence
    /// boundary even without trailing punctuation.
    pub fn finish(&mut self) -> Vec<String> {
        let mut sentences = self.drain_ready(true);
        if !self.buffer.trim().is_empty() {
            sentences.push(std::mem::take(&mut self.buffer).trim().to_string());
        }
        sentences
    }

    fn drain_ready(&mut self, end_of_stream: bool) -> Vec<String> {
        let mut sentences = Vec::new();
        loop {
            if let Some(boundary) = self.find_punctuation_boundary() {
                let sentence = self.buffer[..boundary].trim().to_string();
                self.buffer = self.buffer[boundary..].trim_start().to_string();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                continue;
            }
            if let Some(boundary) = self.find_soft_newline_boundary() {
                let sentence = self.buffer[..boundary].trim().to_string();
                self.buffer = self.buffer[boundary..].trim_start().to_string();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                continue;
            }
            if self.buffer.chars().count() > FORCE_EMIT_LENGTH {
                if let Some(boundary) = self.find_forced_boundary() {
                    let sentence = self.buffer[..boundary].trim().to_string();
                    self.buffer = self.buffer[boundary..].trim_start().to_string();
                    if !sentence.is_empty() {
                        sentences.push(sentence);
                    }
                    continue;
                } else if end_of_stream {
                    // no whitespace anywhere past the limit; the whole
                    // buffer goes out as one unbroken chunk.
                    sentences.push(std::mem::take(&mut self.buffer).trim().to_string());
                }
            }
            break;
        }
        sentences
    }

    /// `. ! ?` followed by whitespace (or currently at buffer end, which is
    /// treated as end-of-stream only by `finish`).
    fn find_punctuation_boundary(&self) -> Option<usize> {
        let bytes = self.buffer.as_bytes();
        for (i, c) in self.buffer.char_indices() {
            if is_boundary_punct(c) {
                let next = i + c.len_utf8();
                if next < bytes.len() && self.buffer[next..].starts_with(char::is_whitespace) {
                    return Some(next);
                }
            }
        }
        None
    }

    /// A newline not immediately preceded by punctuation is a soft break.
    fn find_soft_newline_boundary(&self) -> Option<usize> {
        for (i, c) in self.buffer.char_indices() {
            if c == '\n' {
                let preceding = self.buffer[..i].trim_end();
                if !preceding.ends_with(is_boundary_punct) {
                    return Some(i + 1);
                }
            }
        }
        None
    }

    /// Next whitespace at or past [`FORCE_EMIT_LENGTH`] characters in.
    fn find_forced_boundary(&self) -> Option<usize> {
        let mut char_count = 0;
        for (i, c) in self.buffer.char_indices() {
            char_count += 1;
            if char_count > FORCE_EMIT_LENGTH && c.is_whitespace() {
                return Some(i + c.len_utf8());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_on_period_followed_by_whitespace() {
        let mut ex = SentenceExtractor::new();
        let out = ex.push("Hello there. How are you");
        assert_eq!(out, vec!["Hello there.".to_string()]);
    }

    #[test]
    fn holds_back_incomplete_trailing_text() {
        let mut ex = SentenceExtractor::new();
        let out = ex.push("Our return policy allows returns within 30 days");
        assert!(out.is_empty());
        let out = ex.push(".");
        assert!(out.is_empty());
        let out = ex.finish();
        assert_eq!(out, vec!["Our return policy allows returns within 30 days.".to_string()]);
    }

    #[test]
    fn soft_newline_not_preceded_by_punctuation_is_a_boundary() {
        let mut ex = SentenceExtractor::new();
        let out = ex.push("first line\nsecond line");
        assert_eq!(out, vec!["first line".to_string()]);
    }

    #[test]
    fn forces_emission_past_200_chars_with_whitespace() {
        let mut ex = SentenceExtractor::new();
        let long = "a".repeat(210) + " rest of sentence";
        let out = ex.push(&long);
        assert_eq!(out.len(), 1);
        assert!(out[0].chars().count() > FORCE_EMIT_LENGTH);
    }

    #[test]
    fn no_whitespace_past_limit_emits_single_unbroken_chunk_at_end_of_stream() {
        let mut ex = SentenceExtractor::new();
        let unbroken = "a".repeat(250);
        let out = ex.push(&unbroken);
        assert!(out.is_empty());
        let out = ex.finish();
        assert_eq!(out, vec![unbroken]);
    }
}
