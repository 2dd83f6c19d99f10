use base64::Engine;
use serde::{Deserialize, Serialize};

/// The author of a conversation turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person at the prompt.
    User,

    /// The model.
    Model,
}

/// Raw bytes sent inline with a request, tagged with their MIME type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// The MIME type of the data.
    pub mime_type: String,

    /// The base64-encoded bytes.
    pub data: String,
}

impl InlineData {
    /// Encode `bytes` as inline data of the given MIME type.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Decode the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }
}

/// A reference to content the service fetches itself, such as a video link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// The MIME type, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// The URI of the content.
    pub file_uri: String,
}

/// One piece of a conversation turn.
///
/// Exactly one of `text`, `inline_data` and `file_data` is normally set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Plain text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Inline bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,

    /// Content referenced by URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,

    /// Set on parts that carry model reasoning rather than answer text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    /// A text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// An inline-bytes part.
    pub fn bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            inline_data: Some(InlineData::from_bytes(bytes, mime_type)),
            ..Self::default()
        }
    }

    /// A part referencing content by URI.
    pub fn uri(file_uri: impl Into<String>, mime_type: Option<String>) -> Self {
        Self {
            file_data: Some(FileData {
                mime_type,
                file_uri: file_uri.into(),
            }),
            ..Self::default()
        }
    }

    /// Returns the answer text of this part, skipping thought parts.
    pub fn answer_text(&self) -> Option<&str> {
        if self.thought == Some(true) {
            return None;
        }
        self.text.as_deref()
    }
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Who produced this turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// The parts making up the turn.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a new `Content` with the given role and parts.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role: Some(role),
            parts,
        }
    }

    /// A user turn holding a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// A model turn holding a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// A role-less content used for the system instruction.
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated answer text of all parts.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::answer_text).collect()
    }
}
