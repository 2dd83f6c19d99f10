use serde::{Deserialize, Serialize};

use crate::types::Content;

/// Empty configuration object for tools that take no options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOptions {}

/// A server-side tool the model may use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    /// Ground answers with web search.
    GoogleSearch(ToolOptions),

    /// Fetch URLs mentioned in the prompt.
    UrlContext(ToolOptions),
}

impl Tool {
    /// The web-search grounding tool.
    pub fn google_search() -> Self {
        Tool::GoogleSearch(ToolOptions::default())
    }

    /// The url-context tool.
    pub fn url_context() -> Self {
        Tool::UrlContext(ToolOptions::default())
    }
}

/// Reasoning budget for thinking models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    /// Tokens the model may spend thinking; zero disables thinking.
    pub thinking_budget: u32,
}

/// Sampling and output options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Thinking configuration, when the model supports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,

    /// Requested response MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

/// Body of a `generateContent`/`streamGenerateContent` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// The full conversation history, oldest first.
    pub contents: Vec<Content>,

    /// Behaviour directive applied to the whole conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    /// Enabled server-side tools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,

    /// Generation options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Create a request for the given history.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            system_instruction: None,
            tools: Vec::new(),
            generation_config: None,
        }
    }

    /// Sets the system instruction; blank text leaves it unset.
    pub fn with_system_instruction(mut self, text: &str) -> Self {
        self.system_instruction = if text.trim().is_empty() {
            None
        } else {
            Some(Content::instruction(text))
        };
        self
    }

    /// Sets the tools.
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the thinking budget and asks for plain text output.
    pub fn with_thinking_budget(mut self, budget: Option<u32>) -> Self {
        self.generation_config = Some(GenerationConfig {
            thinking_config: budget.map(|thinking_budget| ThinkingConfig { thinking_budget }),
            response_mime_type: Some("text/plain".to_string()),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn tool_serialization() {
        assert_eq!(to_value(Tool::google_search()).unwrap(), json!({"googleSearch": {}}));
        assert_eq!(to_value(Tool::url_context()).unwrap(), json!({"urlContext": {}}));
    }

    #[test]
    fn full_request_serialization() {
        let request = GenerateContentRequest::new(vec![Content::user("hi")])
            .with_system_instruction("answer short")
            .with_tools(vec![Tool::google_search()])
            .with_thinking_budget(Some(0));
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
                "systemInstruction": {"parts": [{"text": "answer short"}]},
                "tools": [{"googleSearch": {}}],
                "generationConfig": {
                    "thinkingConfig": {"thinkingBudget": 0},
                    "responseMimeType": "text/plain"
                }
            })
        );
    }

    #[test]
    fn blank_instruction_is_omitted() {
        let request = GenerateContentRequest::new(Vec::new()).with_system_instruction("  ");
        let json = to_value(&request).unwrap();
        assert!(json.get("systemInstruction").is_none());
        assert!(json.get("tools").is_none());
    }
}
