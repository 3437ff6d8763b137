//! Quantized Llama inference engine.
//!
//! The engine owns a dedicated worker thread holding the GGUF model weights
//! and the tokenizer; callers talk to it over a command channel and consume
//! generated text through a [`StreamHandle`]. One generation runs at a time,
//! matching the one-window chat flow this crate serves.

mod config;
mod engine;
mod errors;
mod prompt;
mod stream;
mod worker;

pub use config::{
    InferenceConfig, InferenceConfigBuilder, InferenceConfigBuilderError, DEFAULT_MAX_LENGTH,
    DEFAULT_MAX_NEW_TOKENS,
};
pub use engine::LlamaChatEngine;
pub use errors::{EngineError, StreamChunk, StreamHandle};
pub use prompt::render_chat_prompt;
