//! Shared domain types for the Parley workspace.

mod encoding;
mod message;

pub use encoding::QuantizationEncoding;
pub use message::{ChatMessage, Role, Transcript, ASSISTANT_AVATAR, USER_AVATAR};
