use crate::llm::message::{ContentPart, Conversation, Role};
use serde_json::{Value, json};

/// Number of trailing user turns that carry a prompt-cache breakpoint
const CACHED_USER_TURNS: usize = 2;

/// System prompt as a single text block, cached when the model supports it
pub fn to_anthropic_system(system: &str, prompt_cache: bool) -> Value {
    let mut block = json!({ "type": "text", "text": system });
    if prompt_cache {
        block["cache_control"] = json!({ "type": "ephemeral" });
    }
    json!([block])
}

/// Render turns as Messages API content blocks.
///
/// With `prompt_cache` set, the last block of each of the final two user
/// turns is marked `cache_control: ephemeral` so the prefix up to the
/// previous request is served from cache.
pub fn to_anthropic_messages(conversation: &Conversation, prompt_cache: bool) -> Vec<Value> {
    let turns = conversation.turns();

    let cached: Vec<usize> = if prompt_cache {
        turns
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, turn)| turn.role() == Role::User)
            .take(CACHED_USER_TURNS)
            .map(|(index, _)| index)
            .collect()
    } else {
        Vec::new()
    };

    turns
        .iter()
        .enumerate()
        .map(|(index, turn)| {
            let mut blocks: Vec<Value> = turn.parts().iter().map(part_to_block).collect();
            if cached.contains(&index)
                && let Some(last) = blocks.last_mut()
            {
                last["cache_control"] = json!({ "type": "ephemeral" });
            }
            json!({ "role": turn.role().as_str(), "content": blocks })
        })
        .collect()
}

fn part_to_block(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text(text) => json!({ "type": "text", "text": text }),
        ContentPart::Image(image) => json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": image.media_type,
                "data": image.to_base64(),
            }
        }),
    }
}
