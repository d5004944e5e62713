use super::wire::{ChatCompletionRequest, Message};

pub const MODEL: &str = "deepseek-chat";

/// Single-turn, non-streaming request.
pub(crate) fn request(message: &str) -> ChatCompletionRequest<'_> {
    ChatCompletionRequest {
        model: MODEL,
        messages: vec![Message::user(message)],
        stream: Some(false),
        max_tokens: None,
        temperature: None,
    }
}
