use crate::llm::message::{ContentPart, Conversation, Turn};
use serde_json::{Value, json};

/// Render a conversation as a chat completions `messages` array.
///
/// A non-empty `system` becomes a leading `system` message. Text-only turns
/// use a plain string body; turns carrying images use a part array with
/// `image_url` data URLs.
pub fn to_openai_messages(system: Option<&str>, conversation: &Conversation) -> Vec<Value> {
    let mut messages = Vec::with_capacity(conversation.len() + 1);

    if let Some(system) = system.filter(|s| !s.is_empty()) {
        messages.push(json!({ "role": "system", "content": system }));
    }

    messages.extend(conversation.turns().iter().map(turn_to_message));
    messages
}

fn turn_to_message(turn: &Turn) -> Value {
    if !turn.has_images() {
        return json!({ "role": turn.role().as_str(), "content": turn.text() });
    }

    let parts: Vec<Value> = turn
        .parts()
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => json!({ "type": "text", "text": text }),
            ContentPart::Image(image) => json!({
                "type": "image_url",
                "image_url": { "url": image.to_data_url() }
            }),
        })
        .collect();

    json!({ "role": turn.role().as_str(), "content": parts })
}
