//! Chunked streaming of completed results.
//!
//! The whole result is known before the first frame is produced, so the
//! encoder builds the complete frame sequence up front: content chunks, a
//! terminal chunk with the finish reason, a usage frame, and the `[DONE]`
//! sentinel.

use gpu_cloud_common::{ChatCompletionChunk, Delta, Usage, UsageChunk};

use super::executor::JobResult;

/// Target number of content pieces per response.
const CONTENT_PIECES: usize = 5;

/// Payload of the end-of-stream sentinel.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One discrete unit of a streamed response.
#[derive(Debug, Clone)]
pub enum StreamFrame {
    Chunk(ChatCompletionChunk),
    Usage(UsageChunk),
    Done,
}

impl StreamFrame {
    /// Text carried after `data: ` on the wire.
    pub fn data(&self) -> Result<String, serde_json::Error> {
        match self {
            StreamFrame::Chunk(chunk) => serde_json::to_string(chunk),
            StreamFrame::Usage(usage) => serde_json::to_string(usage),
            StreamFrame::Done => Ok(DONE_SENTINEL.to_string()),
        }
    }
}

/// Identity shared by every chunk of one response.
#[derive(Debug, Clone)]
pub struct StreamContext {
    pub id: String,
    pub created: i64,
    pub model: String,
}

/// Split a result into its ordered frame sequence.
pub fn encode(result: &JobResult, context: &StreamContext) -> Vec<StreamFrame> {
    let chunk = |delta: Delta, finish_reason: Option<String>| {
        StreamFrame::Chunk(ChatCompletionChunk::new(
            context.id.clone(),
            context.created,
            context.model.clone(),
            delta,
            finish_reason,
        ))
    };

    let mut frames: Vec<StreamFrame> = split_content(&result.content)
        .into_iter()
        .map(|piece| {
            chunk(
                Delta {
                    role: Some("assistant".to_string()),
                    content: Some(piece),
                },
                None,
            )
        })
        .collect();

    frames.push(chunk(Delta::default(), Some(result.finish_reason.clone())));
    frames.push(StreamFrame::Usage(UsageChunk {
        usage: Usage::new(result.prompt_tokens, result.completion_tokens),
    }));
    frames.push(StreamFrame::Done);
    frames
}

/// Split into consecutive pieces of `ceil(len / 5)` characters (at least 1).
fn split_content(content: &str) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let chunk_size = chars.len().div_ceil(CONTENT_PIECES).max(1);
    chars
        .chunks(chunk_size)
        .map(|piece| piece.iter().collect())
        .collect()
}
