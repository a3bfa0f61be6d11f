//! GPU Cloud Common Types
//!
//! Wire types shared by the gateway and anything that talks to it.

pub mod chat;
mod lenient;

pub use chat::{
    new_completion_id, ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse,
    ChatMessage, Choice, ChunkChoice, Delta, Usage, UsageChunk, DEFAULT_MODEL,
};
