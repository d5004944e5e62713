use super::wire::{ChatCompletionRequest, Message};

pub const MODEL: &str = "gpt-3.5-turbo";
pub const MAX_TOKENS: u32 = 1000;
pub const TEMPERATURE: f64 = 0.7;

pub(crate) fn request(message: &str) -> ChatCompletionRequest<'_> {
    ChatCompletionRequest {
        model: MODEL,
        messages: vec![Message::user(message)],
        stream: None,
        max_tokens: Some(MAX_TOKENS),
        temperature: Some(TEMPERATURE),
    }
}
