//! The remote-service seam.
//!
//! The shell never talks to HTTP directly: it hands the conversation history
//! and the active [`QueryConfig`] to a [`RemoteService`] and consumes the
//! resulting stream of [`Fragment`]s.  [`Gemini`] is the production
//! implementation; tests script their own.

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::aggregator::Fragment;
use crate::client::Gemini;
use crate::error::Result;
use crate::types::{Content, GenerateContentRequest, Model, Tool};

/// A finite stream of answer fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// Server-side capabilities the user can switch on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolToggles {
    /// Ground answers with web search and collect grounding references.
    pub google_search: bool,

    /// Let the service fetch URLs and collect url-context references.
    pub url_context: bool,
}

impl ToolToggles {
    /// The tools to send with a request.
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        if self.google_search {
            tools.push(Tool::google_search());
        }
        if self.url_context {
            tools.push(Tool::url_context());
        }
        tools
    }
}

impl Default for ToolToggles {
    fn default() -> Self {
        Self {
            google_search: true,
            url_context: false,
        }
    }
}

/// Everything about a query that is not the history itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryConfig {
    /// The active instruction profile text; empty means none.
    pub instruction: String,

    /// Enabled capabilities.
    pub toggles: ToolToggles,

    /// The model to ask.
    pub model: Model,
}

impl QueryConfig {
    /// Build the wire request for `history`.
    pub fn request(&self, history: &[Content]) -> GenerateContentRequest {
        GenerateContentRequest::new(history.to_vec())
            .with_system_instruction(&self.instruction)
            .with_tools(self.toggles.tools())
            .with_thinking_budget(self.model.thinking_budget())
    }
}

/// A generative-language service that answers a conversation incrementally.
#[async_trait::async_trait]
pub trait RemoteService: Send + Sync {
    /// Start answering the last turn of `history`.
    ///
    /// Errors that happen before the first fragment are returned directly;
    /// errors mid-answer are yielded as stream items.
    async fn stream_query(&self, history: &[Content], config: &QueryConfig)
    -> Result<FragmentStream>;
}

#[async_trait::async_trait]
impl RemoteService for Gemini {
    async fn stream_query(
        &self,
        history: &[Content],
        config: &QueryConfig,
    ) -> Result<FragmentStream> {
        let request = config.request(history);
        let stream = self.stream(&config.model, &request).await?;
        Ok(Box::pin(stream.map(|chunk| chunk.map(Fragment::from))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;
    use serde_json::{json, to_value};

    #[test]
    fn default_toggles_enable_search_only() {
        let toggles = ToolToggles::default();
        assert_eq!(toggles.tools(), vec![Tool::google_search()]);
    }

    #[test]
    fn request_reflects_config() {
        let config = QueryConfig {
            instruction: "answer short".to_string(),
            toggles: ToolToggles {
                google_search: false,
                url_context: true,
            },
            model: Model::Known(KnownModel::Gemini25Pro),
        };
        let request = config.request(&[Content::user("hi")]);
        let json = to_value(&request).unwrap();
        assert_eq!(json["tools"], json!([{"urlContext": {}}]));
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "answer short");
        assert_eq!(
            json["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            128
        );
    }

    #[test]
    fn empty_instruction_is_not_sent() {
        let request = QueryConfig::default().request(&[]);
        assert!(request.system_instruction.is_none());
    }
}
