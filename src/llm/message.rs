//! Canonical conversation model shared by every provider handler.
//!
//! A [`Conversation`] is an ordered list of [`Turn`]s. The system instruction
//! travels next to it rather than inside it, so backends with a dedicated
//! system slot and backends without one can both be served from the same value.

use crate::llm::types::LLMError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Raw image bytes plus their media type (e.g. `image/png`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub media_type: String,
    pub data: Vec<u8>,
}

impl ImageData {
    pub fn new(media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            data,
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image(ImageData),
}

/// One role-tagged turn. The part list is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    parts: Vec<ContentPart>,
}

impl Turn {
    pub fn new(role: Role, parts: Vec<ContentPart>) -> Result<Self, LLMError> {
        if parts.is_empty() {
            return Err(LLMError::Conversion(format!(
                "{} turn must contain at least one content part",
                role.as_str()
            )));
        }
        Ok(Self { role, parts })
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn with_image(mut self, image: ImageData) -> Self {
        self.parts.push(ContentPart::Image(image));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(ContentPart::Text(text.into()));
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn parts(&self) -> &[ContentPart] {
        &self.parts
    }

    pub fn has_images(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, ContentPart::Image(_)))
    }

    /// Text parts in order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            ContentPart::Text(text) => Some(text.as_str()),
            ContentPart::Image(_) => None,
        })
    }

    /// Text parts joined with newlines
    pub fn text(&self) -> String {
        self.texts().collect::<Vec<_>>().join("\n")
    }

    pub(crate) fn append_parts(&mut self, parts: impl IntoIterator<Item = ContentPart>) {
        self.parts.extend(parts);
    }
}

/// Ordered turns in chronological send order.
///
/// Conversations built by callers are canonical. Converters that merge
/// same-role runs produce conversations flagged as merged, which merging
/// converters refuse to process again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
    merged: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self {
            turns,
            merged: false,
        }
    }

    pub(crate) fn merged_from(turns: Vec<Turn>) -> Self {
        Self {
            turns,
            merged: true,
        }
    }

    pub fn with_turn(mut self, turn: Turn) -> Self {
        self.turns.push(turn);
        self
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn is_merged(&self) -> bool {
        self.merged
    }

    pub fn has_images(&self) -> bool {
        self.turns.iter().any(Turn::has_images)
    }
}
