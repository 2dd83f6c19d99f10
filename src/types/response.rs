use serde::{Deserialize, Serialize};

use crate::types::{Content, GroundingMetadata, Part, UrlContextMetadata};

/// Token accounting reported with a response chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt, including history.
    #[serde(default)]
    pub prompt_token_count: u64,

    /// Tokens in the candidates so far.
    #[serde(default)]
    pub candidates_token_count: u64,

    /// Tokens spent on reasoning.
    #[serde(default)]
    pub thoughts_token_count: u64,

    /// Total tokens.
    #[serde(default)]
    pub total_token_count: u64,
}

/// One candidate answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The (partial) content of the candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    /// Why generation stopped, on the final chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Search grounding, when the search tool was enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_metadata: Option<GroundingMetadata>,

    /// URL-context resolution, when the url-context tool was enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_context_metadata: Option<UrlContextMetadata>,
}

/// A `generateContent` response, or one chunk of a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate answers; the shell only ever reads the first.
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Token accounting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,

    /// The concrete model version that answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Answer text of the first candidate, or `None` when it carries no text.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let mut pieces = content.parts.iter().filter_map(Part::answer_text).peekable();
        pieces.peek()?;
        Some(pieces.collect())
    }

    /// Parts of every candidate, in order.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }
}
