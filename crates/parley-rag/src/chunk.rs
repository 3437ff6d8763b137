/// Characters per chunk handed to the embedding model.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
/// Characters shared between neighbouring chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Splits document text into overlapping character windows.
///
/// Boundaries prefer whitespace so words stay intact; the overlap keeps
/// context that straddles a boundary retrievable from either side.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker {
    /// `overlap` is clamped below `chunk_size` so every step makes progress.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size / 2),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < chars.len() {
            let hard_end = (start + self.chunk_size).min(chars.len());
            let end = if hard_end < chars.len() {
                // Break at the last whitespace in the window, unless that
                // would shrink the chunk below half size.
                match chars[start..hard_end]
                    .iter()
                    .rposition(|c| c.is_whitespace())
                {
                    Some(pos) if pos > self.chunk_size / 2 => start + pos + 1,
                    _ => hard_end,
                }
            } else {
                hard_end
            };

            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_owned());
            }

            if end >= chars.len() {
                break;
            }
            start = (end.saturating_sub(self.overlap)).max(start + 1);
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = Chunker::default().split("a short document");
        assert_eq!(chunks, ["a short document"]);
    }

    #[test]
    fn empty_and_blank_text_yield_nothing() {
        assert!(Chunker::default().split("").is_empty());
        assert!(Chunker::default().split("   \n\t  ").is_empty());
    }

    #[test]
    fn long_text_produces_overlapping_chunks() {
        let word = "lorem ";
        let text = word.repeat(400); // 2400 chars
        let chunker = Chunker::new(1_000, 200);
        let chunks = chunker.split(&text);

        assert!(chunks.len() >= 3, "got {} chunks", chunks.len());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1_000);
            assert!(!chunk.is_empty());
        }
        // Overlap: the tail of one chunk reappears at the head of the next.
        let tail: String = chunks[0].chars().rev().take(50).collect::<String>();
        let tail: String = tail.chars().rev().collect();
        assert!(chunks[1].contains(tail.trim()));
    }

    #[test]
    fn breaks_at_whitespace_when_possible() {
        let text = format!("{} {}", "a".repeat(700), "b".repeat(700));
        let chunks = Chunker::new(1_000, 100).split(&text);
        assert_eq!(chunks[0], "a".repeat(700));
    }

    #[test]
    fn handles_multibyte_text_without_panicking() {
        let text = "日本語のテキスト ".repeat(300);
        let chunks = Chunker::new(500, 100).split(&text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
        }
    }

    #[test]
    fn unbroken_text_still_advances() {
        let text = "x".repeat(2_500);
        let chunks = Chunker::new(1_000, 200).split(&text);
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert!(total >= 2_500);
        assert!(chunks.len() >= 3);
    }
}
