use serde::{Deserialize, Serialize};

/// A web page the answer was grounded on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebChunk {
    /// The page URI (often a redirect through the search service).
    #[serde(default)]
    pub uri: String,

    /// The page title.
    #[serde(default)]
    pub title: String,
}

/// A single grounding reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    /// The web source, when the reference came from search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<WebChunk>,
}

impl GroundingChunk {
    /// Construct a web grounding reference.
    pub fn web(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            web: Some(WebChunk {
                uri: uri.into(),
                title: title.into(),
            }),
        }
    }
}

/// Search grounding attached to a candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    /// The sources used.
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,

    /// The search queries the service issued.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub web_search_queries: Vec<String>,
}

/// A URL the service retrieved while composing an answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMetadata {
    /// The URL that was retrieved.
    #[serde(default)]
    pub retrieved_url: String,

    /// The retrieval status, e.g. `URL_RETRIEVAL_STATUS_SUCCESS`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_retrieval_status: Option<String>,
}

impl UrlMetadata {
    /// A successfully retrieved URL.
    pub fn retrieved(url: impl Into<String>) -> Self {
        Self {
            retrieved_url: url.into(),
            url_retrieval_status: Some("URL_RETRIEVAL_STATUS_SUCCESS".to_string()),
        }
    }
}

/// URL-context resolution attached to a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlContextMetadata {
    /// The URLs that were resolved.
    #[serde(default)]
    pub url_metadata: Vec<UrlMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grounding_deserialization() {
        let json = json!({
            "groundingChunks": [
                {"web": {"uri": "https://example.com/a", "title": "example.com"}}
            ],
            "webSearchQueries": ["rust streams"]
        });
        let meta: GroundingMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(
            meta.grounding_chunks,
            vec![GroundingChunk::web("example.com", "https://example.com/a")]
        );
        assert_eq!(meta.web_search_queries, vec!["rust streams".to_string()]);
    }

    #[test]
    fn url_context_deserialization() {
        let json = json!({
            "urlMetadata": [
                {"retrievedUrl": "https://docs.rs", "urlRetrievalStatus": "URL_RETRIEVAL_STATUS_SUCCESS"}
            ]
        });
        let meta: UrlContextMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(meta.url_metadata, vec![UrlMetadata::retrieved("https://docs.rs")]);
    }
}
