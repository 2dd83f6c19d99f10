//! Folds streamed answer fragments into a cumulative result while passing
//! progress through.
//!
//! [`AggregatingStream`] wraps a [`FragmentStream`] and yields an
//! [`AggregatedResult`] snapshot after every fragment, so callers can show
//! progress without waiting for the end of the answer.  Snapshot `k` always
//! holds the concatenation of the first `k` text deltas.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;

use crate::error::{Error, Result};
use crate::observability::{QUERY_FAILURES, QUERY_FRAGMENTS};
use crate::service::{FragmentStream, QueryConfig, RemoteService, ToolToggles};
use crate::types::{Content, GenerateContentResponse, GroundingChunk, Part, UrlMetadata};

/// One incremental unit of a streamed answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// Answer text added by this fragment.
    pub text: Option<String>,

    /// Grounding references attached to this fragment.
    pub grounding: Vec<GroundingChunk>,

    /// URL-context references attached to this fragment.
    pub url_context: Vec<UrlMetadata>,

    /// Raw response parts carried by this fragment.
    pub parts: Vec<Part>,
}

impl Fragment {
    /// A fragment carrying only a text delta.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Attach grounding references.
    pub fn with_grounding(mut self, grounding: Vec<GroundingChunk>) -> Self {
        self.grounding = grounding;
        self
    }

    /// Attach url-context references.
    pub fn with_url_context(mut self, url_context: Vec<UrlMetadata>) -> Self {
        self.url_context = url_context;
        self
    }
}

impl From<GenerateContentResponse> for Fragment {
    fn from(response: GenerateContentResponse) -> Self {
        let text = response.text();
        let parts = response.parts().cloned().collect();
        let first = response.candidates.into_iter().next();
        let (grounding, url_context) = match first {
            Some(candidate) => (
                candidate
                    .grounding_metadata
                    .map(|m| m.grounding_chunks)
                    .unwrap_or_default(),
                candidate
                    .url_context_metadata
                    .map(|m| m.url_metadata)
                    .unwrap_or_default(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            text,
            grounding,
            url_context,
            parts,
        }
    }
}

/// Everything accumulated for one query so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResult {
    /// Cumulative answer text.
    pub text: String,

    /// Grounding references in arrival order; the same source may repeat.
    pub grounding: Vec<GroundingChunk>,

    /// URL-context references in arrival order.
    pub url_context: Vec<UrlMetadata>,

    /// Raw response parts in arrival order.
    pub parts: Vec<Part>,
}

impl AggregatedResult {
    /// Fold one fragment in; references are kept only for enabled toggles.
    pub fn apply(&mut self, fragment: Fragment, toggles: ToolToggles) {
        if let Some(text) = fragment.text {
            self.text.push_str(&text);
        }
        if toggles.google_search {
            self.grounding.extend(fragment.grounding);
        }
        if toggles.url_context {
            self.url_context.extend(fragment.url_context);
        }
        self.parts.extend(fragment.parts);
    }

    /// True when the answer carries any references to render.
    pub fn has_references(&self) -> bool {
        !self.grounding.is_empty() || !self.url_context.is_empty()
    }
}

/// Lifecycle of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    /// No fragment received yet.
    Idle,
    /// At least one fragment received, more may follow.
    Streaming,
    /// The remote stream ended normally.
    Finalized,
    /// The remote stream reported an error; no further snapshots follow.
    Failed,
}

/// A stream of cumulative snapshots over a fragment stream.
pub struct AggregatingStream {
    inner: FragmentStream,
    toggles: ToolToggles,
    result: AggregatedResult,
    state: AggregatorState,
    fragments: u64,
}

impl AggregatingStream {
    /// Wrap `inner`, collecting references for the enabled `toggles`.
    pub fn new(inner: FragmentStream, toggles: ToolToggles) -> Self {
        Self {
            inner,
            toggles,
            result: AggregatedResult::default(),
            state: AggregatorState::Idle,
            fragments: 0,
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> AggregatorState {
        self.state
    }

    /// The snapshot accumulated so far.
    pub fn result(&self) -> &AggregatedResult {
        &self.result
    }

    /// Take the final result; only meaningful once the stream is finalized.
    pub fn into_result(self) -> Result<AggregatedResult> {
        match self.state {
            AggregatorState::Finalized => Ok(self.result),
            AggregatorState::Failed => Err(Error::streaming("answer stream failed", None)),
            AggregatorState::Idle | AggregatorState::Streaming => Err(Error::streaming(
                "answer stream was not drained to completion",
                None,
            )),
        }
    }
}

impl Stream for AggregatingStream {
    type Item = Result<AggregatedResult>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if matches!(
            this.state,
            AggregatorState::Finalized | AggregatorState::Failed
        ) {
            return Poll::Ready(None);
        }
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(fragment))) => {
                this.state = AggregatorState::Streaming;
                this.fragments += 1;
                this.result.apply(fragment, this.toggles);
                Poll::Ready(Some(Ok(this.result.clone())))
            }
            Poll::Ready(Some(Err(e))) => {
                this.state = AggregatorState::Failed;
                QUERY_FAILURES.click();
                tracing::warn!(error = %e, "answer stream failed");
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.state = AggregatorState::Finalized;
                QUERY_FRAGMENTS.add(this.fragments as f64);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Starts queries against a remote service.
#[derive(Clone)]
pub struct ResponseAggregator {
    service: Arc<dyn RemoteService>,
}

impl ResponseAggregator {
    /// Create an aggregator for `service`.
    pub fn new(service: Arc<dyn RemoteService>) -> Self {
        Self { service }
    }

    /// Record `query` as a user turn and start streaming the answer.
    ///
    /// The user turn is appended before the service is contacted, so it stays
    /// in `history` even when the request fails.  Appending the model turn is
    /// left to the caller once the returned stream is fully drained.
    pub async fn ask(
        &self,
        history: &mut Vec<Content>,
        config: &QueryConfig,
        query: &str,
    ) -> Result<AggregatingStream> {
        history.push(Content::user(query));
        let inner = self.service.stream_query(history, config).await?;
        Ok(AggregatingStream::new(inner, config.toggles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use futures::{StreamExt, stream};
    use std::sync::Mutex;

    struct Scripted {
        fragments: Vec<Result<Fragment>>,
        seen: Mutex<Vec<usize>>,
    }

    impl Scripted {
        fn new(fragments: Vec<Result<Fragment>>) -> Arc<Self> {
            Arc::new(Self {
                fragments,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl RemoteService for Scripted {
        async fn stream_query(
            &self,
            history: &[Content],
            _config: &QueryConfig,
        ) -> Result<FragmentStream> {
            self.seen.lock().unwrap().push(history.len());
            Ok(Box::pin(stream::iter(self.fragments.clone())))
        }
    }

    struct Refusing;

    #[async_trait::async_trait]
    impl RemoteService for Refusing {
        async fn stream_query(
            &self,
            _history: &[Content],
            _config: &QueryConfig,
        ) -> Result<FragmentStream> {
            Err(Error::authentication("no key"))
        }
    }

    fn all_on() -> ToolToggles {
        ToolToggles {
            google_search: true,
            url_context: true,
        }
    }

    #[tokio::test]
    async fn snapshots_are_prefixes() {
        let deltas = ["The ", "quick ", "brown ", "fox"];
        let fragments: Vec<Result<Fragment>> =
            deltas.iter().map(|d| Ok(Fragment::text(*d))).collect();
        let inner: FragmentStream = Box::pin(stream::iter(fragments));
        let mut stream = AggregatingStream::new(inner, all_on());

        let mut k = 0;
        while let Some(snapshot) = stream.next().await {
            k += 1;
            assert_eq!(snapshot.unwrap().text, deltas[..k].concat());
        }
        assert_eq!(k, deltas.len());
        assert_eq!(stream.state(), AggregatorState::Finalized);
        assert_eq!(stream.into_result().unwrap().text, "The quick brown fox");
    }

    #[tokio::test]
    async fn references_append_and_keep_duplicates() {
        let source = GroundingChunk::web("docs.rs", "https://docs.rs");
        let fragments = vec![
            Ok(Fragment::text("a").with_grounding(vec![source.clone()])),
            Ok(Fragment::text("b")
                .with_grounding(vec![source.clone()])
                .with_url_context(vec![UrlMetadata::retrieved("https://example.com")])),
        ];
        let mut stream = AggregatingStream::new(Box::pin(stream::iter(fragments)), all_on());
        while stream.next().await.is_some() {}
        let result = stream.into_result().unwrap();
        assert_eq!(result.grounding, vec![source.clone(), source]);
        assert_eq!(result.url_context.len(), 1);
        assert!(result.has_references());
    }

    #[tokio::test]
    async fn disabled_toggles_drop_references() {
        let fragments = vec![Ok(Fragment::text("a")
            .with_grounding(vec![GroundingChunk::web("t", "u")])
            .with_url_context(vec![UrlMetadata::retrieved("u")]))];
        let toggles = ToolToggles {
            google_search: false,
            url_context: false,
        };
        let mut stream = AggregatingStream::new(Box::pin(stream::iter(fragments)), toggles);
        while stream.next().await.is_some() {}
        let result = stream.into_result().unwrap();
        assert_eq!(result.text, "a");
        assert!(!result.has_references());
    }

    #[tokio::test]
    async fn error_ends_the_stream() {
        let fragments = vec![
            Ok(Fragment::text("partial")),
            Err(Error::streaming("connection reset", None)),
            Ok(Fragment::text(" never seen")),
        ];
        let mut stream = AggregatingStream::new(Box::pin(stream::iter(fragments)), all_on());
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
        assert_eq!(stream.state(), AggregatorState::Failed);
        assert_eq!(stream.result().text, "partial");
        assert!(stream.into_result().is_err());
    }

    #[tokio::test]
    async fn not_restartable() {
        let mut stream = AggregatingStream::new(
            Box::pin(stream::iter(vec![Ok(Fragment::text("x"))])),
            all_on(),
        );
        assert_eq!(stream.state(), AggregatorState::Idle);
        while stream.next().await.is_some() {}
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn undrained_stream_has_no_result() {
        let mut stream = AggregatingStream::new(
            Box::pin(stream::iter(vec![Ok(Fragment::text("x")), Ok(Fragment::text("y"))])),
            all_on(),
        );
        stream.next().await;
        assert_eq!(stream.state(), AggregatorState::Streaming);
        assert!(stream.into_result().is_err());
    }

    #[tokio::test]
    async fn ask_records_user_turn_first() {
        let service = Scripted::new(vec![Ok(Fragment::text("hello"))]);
        let aggregator = ResponseAggregator::new(service.clone());
        let mut history = vec![Content::model("earlier")];

        let mut stream = aggregator
            .ask(&mut history, &QueryConfig::default(), "hi")
            .await
            .unwrap();
        while stream.next().await.is_some() {}

        assert_eq!(*service.seen.lock().unwrap(), vec![2]);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Some(Role::User));
        assert_eq!(history[1].text(), "hi");
    }

    #[tokio::test]
    async fn failed_request_keeps_user_turn() {
        let aggregator = ResponseAggregator::new(Arc::new(Refusing));
        let mut history = Vec::new();
        let err = match aggregator
            .ask(&mut history, &QueryConfig::default(), "hi")
            .await
        {
            Ok(_) => panic!("expected an error"),
            Err(err) => err,
        };
        assert!(err.is_authentication());
        assert_eq!(history, vec![Content::user("hi")]);
    }

    #[test]
    fn fragment_from_response() {
        let json = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hi"}], "role": "model"},
                "groundingMetadata": {"groundingChunks": [{"web": {"uri": "u", "title": "t"}}]},
                "urlContextMetadata": {"urlMetadata": [{"retrievedUrl": "r"}]}
            }]
        });
        let response: GenerateContentResponse = serde_json::from_value(json).unwrap();
        let fragment = Fragment::from(response);
        assert_eq!(fragment.text.as_deref(), Some("Hi"));
        assert_eq!(fragment.grounding, vec![GroundingChunk::web("t", "u")]);
        assert_eq!(fragment.url_context[0].retrieved_url, "r");
        assert_eq!(fragment.parts, vec![Part::text("Hi")]);
    }
}
