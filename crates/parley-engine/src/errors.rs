use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to open weight file: {path}")]
    OpenWeights {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read GGUF weights from: {path}")]
    LoadWeights {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to load tokenizer from: {path}")]
    LoadTokenizer {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to render chat template")]
    RenderTemplate {
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to tokenize prompt")]
    TokenizeFailed {
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to decode generated tokens")]
    DecodeFailed {
        #[source]
        source: anyhow::Error,
    },

    #[error("prompt is {prompt_tokens} tokens but the max input+output length is {max_length}")]
    PromptTooLong {
        prompt_tokens: usize,
        max_length: usize,
    },

    #[error("token generation failed")]
    Generation {
        #[source]
        source: anyhow::Error,
    },

    #[error("inference worker shut down unexpectedly")]
    WorkerShutdown,

    #[error("failed to spawn inference worker thread")]
    SpawnWorkerFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("inference stream error: {message}")]
    InferenceStreamError { message: String },
}

/// A chunk of streaming output from the inference engine.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// A piece of generated text.
    Token(String),
    /// Generation completed normally.
    Done,
    /// Generation terminated due to an error.
    Error(String),
}

/// A handle to a streaming generation response.
///
/// Yields [`StreamChunk`] items as tokens are produced.  The stream ends
/// with [`StreamChunk::Done`] or [`StreamChunk::Error`].
pub type StreamHandle = mpsc::Receiver<StreamChunk>;
