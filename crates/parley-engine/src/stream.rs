use tokenizers::Tokenizer;

use crate::errors::EngineError;

/// Incremental detokenizer for streamed generation.
///
/// BPE tokens do not map one-to-one onto text: a token may hold half of a
/// multi-byte character, and leading-space markers only resolve once the
/// neighbouring token is known. This type re-decodes a sliding window of the
/// generated tokens and emits the stable suffix, so callers receive valid
/// UTF-8 pieces that concatenate to the full decode.
pub(crate) struct TokenStream<'t> {
    tokenizer: &'t Tokenizer,
    tokens: Vec<u32>,
    prev_index: usize,
    current_index: usize,
}

impl<'t> TokenStream<'t> {
    pub(crate) fn new(tokenizer: &'t Tokenizer) -> Self {
        Self {
            tokenizer,
            tokens: Vec::new(),
            prev_index: 0,
            current_index: 0,
        }
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, EngineError> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(|source| EngineError::DecodeFailed {
                source: anyhow::Error::msg(source),
            })
    }

    /// Feed one generated token; returns the next printable piece, if any.
    ///
    /// A piece is withheld while the window still decodes to an incomplete
    /// character (U+FFFD at the tail).
    pub(crate) fn push(&mut self, token: u32) -> Result<Option<String>, EngineError> {
        let prev_text = self.decode(&self.tokens[self.prev_index..self.current_index])?;
        self.tokens.push(token);
        let text = self.decode(&self.tokens[self.prev_index..])?;

        if text.len() > prev_text.len() && !text.ends_with('\u{fffd}') {
            let piece = text[prev_text.len()..].to_string();
            self.prev_index = self.current_index;
            self.current_index = self.tokens.len();
            Ok(Some(piece))
        } else {
            Ok(None)
        }
    }

    /// Flush whatever the window still holds once generation ends.
    pub(crate) fn finish(&mut self) -> Result<Option<String>, EngineError> {
        let prev_text = self.decode(&self.tokens[self.prev_index..self.current_index])?;
        let text = self.decode(&self.tokens[self.prev_index..])?;
        self.current_index = self.tokens.len();
        self.prev_index = self.current_index;
        if text.len() > prev_text.len() {
            Ok(Some(text[prev_text.len()..].to_string()))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal word-level tokenizer so the streaming logic can be exercised
    /// without model files.
    fn test_tokenizer() -> Tokenizer {
        let definition = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": { "[UNK]": 0, "hello": 1, "world": 2, "again": 3 },
                "unk_token": "[UNK]"
            }
        });
        Tokenizer::from_bytes(definition.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn streamed_pieces_concatenate_to_full_decode() {
        let tokenizer = test_tokenizer();
        let tokens = [1u32, 2, 3, 1];

        let mut stream = TokenStream::new(&tokenizer);
        let mut streamed = String::new();
        for &token in &tokens {
            if let Some(piece) = stream.push(token).unwrap() {
                streamed.push_str(&piece);
            }
        }
        if let Some(rest) = stream.finish().unwrap() {
            streamed.push_str(&rest);
        }

        let full = tokenizer.decode(&tokens, true).unwrap();
        assert_eq!(streamed, full);
        assert!(streamed.contains("hello"));
        assert!(streamed.contains("world"));
    }

    #[test]
    fn finish_on_empty_stream_is_none() {
        let tokenizer = test_tokenizer();
        let mut stream = TokenStream::new(&tokenizer);
        assert!(stream.finish().unwrap().is_none());
    }
}
