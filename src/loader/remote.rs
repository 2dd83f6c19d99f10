use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Client as ReqwestClient, header};
use url::Url;

use crate::error::{Error, Result};
use crate::loader::{ContentLoader, MatchPolicy};
use crate::observability::{LOADER_PROBE_FAILURES, LOADER_PROBES};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:142.0) Gecko/20100101 Firefox/142.0";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?([\da-z\.-]+)\.([a-z\.]{2,6})([/%\w\.-]*)*/?$")
        .expect("url pattern is a valid regex")
});

/// Loads documents over HTTP(S).
#[derive(Debug, Clone)]
pub struct RemoteFileLoader {
    client: ReqwestClient,
}

impl RemoteFileLoader {
    /// A loader whose probe and fetch share a 5 second timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self { client })
    }
}

/// Scheme-less URLs are fetched over https.
fn absolute(identifier: &str) -> Result<Url> {
    if identifier.starts_with("http://") || identifier.starts_with("https://") {
        Ok(Url::parse(identifier)?)
    } else {
        Ok(Url::parse(&format!("https://{identifier}"))?)
    }
}

/// `text/html; charset=utf-8` becomes `text/html`.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[async_trait::async_trait]
impl ContentLoader for RemoteFileLoader {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn validate(&self, input: &str) -> Option<String> {
        let trimmed = input.trim();
        URL_PATTERN
            .is_match(trimmed)
            .then(|| trimmed.to_string())
    }

    async fn mimetype(&self, identifier: &str) -> Result<Option<String>> {
        LOADER_PROBES.click();
        let url = absolute(identifier).inspect_err(|_| LOADER_PROBE_FAILURES.click())?;
        let response = match self.client.head(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                LOADER_PROBE_FAILURES.click();
                tracing::debug!(%url, error = %e, "content type probe failed");
                return Err(Error::from_reqwest(e, Some(PROBE_TIMEOUT.as_secs_f64())));
            }
        };
        let status = response.status();
        if !status.is_success() {
            LOADER_PROBE_FAILURES.click();
            tracing::debug!(%url, %status, "content type probe refused");
            return Err(Error::api(
                status.as_u16(),
                None,
                format!("probing {url} failed with {status}"),
            ));
        }
        Ok(response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(essence)
            .filter(|mime| !mime.is_empty()))
    }

    async fn load(&self, identifier: &str) -> Result<Vec<u8>> {
        let url = absolute(identifier)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, Some(PROBE_TIMEOUT.as_secs_f64())))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::api(
                status.as_u16(),
                None,
                format!("fetching {url} failed with {status}"),
            ));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::from_reqwest(e, Some(PROBE_TIMEOUT.as_secs_f64())))?;
        Ok(bytes.to_vec())
    }

    fn policy(&self) -> MatchPolicy {
        MatchPolicy::Exact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{ContentDecision, MimeTypeGate};
    use wiremock::matchers::{header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn url_shapes() {
        let loader = RemoteFileLoader::new().unwrap();
        for ok in [
            "https://example.com/paper.pdf",
            "http://example.com",
            "example.com/a/b.png",
            "www.example.co.uk/",
            "https://example.com/a%20b.txt",
        ] {
            assert_eq!(loader.validate(ok), Some(ok.to_string()), "{ok}");
        }
        for bad in [
            "not a valid url??",
            "hello",
            "https://example.com/a b",
            "",
            "ftp://example.com/file",
            "https://example.com/?q=1",
        ] {
            assert_eq!(loader.validate(bad), None, "{bad}");
        }
    }

    #[test]
    fn helpers() {
        assert_eq!(
            absolute("example.com/x").unwrap().as_str(),
            "https://example.com/x"
        );
        assert_eq!(
            absolute("http://example.com").unwrap().as_str(),
            "http://example.com/"
        );
        assert!(absolute("http://exa mple.com").is_err());
        assert_eq!(essence("Text/HTML; charset=utf-8"), "text/html");
        assert_eq!(essence("application/pdf"), "application/pdf");
    }

    #[tokio::test]
    async fn probe_reads_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/paper.pdf"))
            .and(header_is("user-agent", USER_AGENT))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "application/pdf"),
            )
            .mount(&server)
            .await;
        let loader = RemoteFileLoader::new().unwrap();
        let url = format!("{}/paper.pdf", server.uri());
        assert_eq!(
            loader.mimetype(&url).await.unwrap().as_deref(),
            Some("application/pdf")
        );
    }

    #[tokio::test]
    async fn refused_probe_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let loader = RemoteFileLoader::new().unwrap();
        let url = format!("{}/missing.pdf", server.uri());
        assert_eq!(loader.mimetype(&url).await.unwrap_err().status_code(), Some(404));
        let decision = loader.resolve(&url, &MimeTypeGate::standard()).await.unwrap();
        assert_eq!(decision, ContentDecision::Unreachable);
    }

    #[tokio::test]
    async fn dead_host_is_unreachable() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{port}/paper.pdf");
        let loader = RemoteFileLoader::with_timeout(Duration::from_millis(500)).unwrap();
        let decision = loader.resolve(&url, &MimeTypeGate::standard()).await.unwrap();
        assert_eq!(decision, ContentDecision::Unreachable);
    }

    #[tokio::test]
    async fn missing_content_type_is_rejected_as_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let loader = RemoteFileLoader::new().unwrap();
        let url = format!("{}/blob", server.uri());
        let decision = loader.resolve(&url, &MimeTypeGate::standard()).await.unwrap();
        assert_eq!(decision, ContentDecision::Rejected { mime_type: None });
    }

    #[tokio::test]
    async fn html_is_rejected_under_exact_policy() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(0)
            .mount(&server)
            .await;
        let loader = RemoteFileLoader::new().unwrap();
        let url = format!("{}/page", server.uri());
        let decision = loader.resolve(&url, &MimeTypeGate::standard()).await.unwrap();
        assert_eq!(
            decision,
            ContentDecision::Rejected {
                mime_type: Some("text/html".to_string())
            }
        );
    }

    #[tokio::test]
    async fn accepted_document_is_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .expect(1)
            .mount(&server)
            .await;
        let loader = RemoteFileLoader::new().unwrap();
        let url = format!("{}/logo.png", server.uri());
        match loader.resolve(&url, &MimeTypeGate::standard()).await.unwrap() {
            ContentDecision::Accepted(content) => {
                assert_eq!(content.mime_type, "image/png");
                assert_eq!(content.bytes, vec![0x89, b'P', b'N', b'G']);
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_fetch_after_acceptance_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "application/pdf"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let loader = RemoteFileLoader::new().unwrap();
        let url = format!("{}/paper.pdf", server.uri());
        let decision = loader.resolve(&url, &MimeTypeGate::standard()).await.unwrap();
        assert_eq!(
            decision,
            ContentDecision::FetchFailed {
                reason: "HTTP 503".to_string()
            }
        );
    }

    #[tokio::test]
    async fn failed_fetch_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let loader = RemoteFileLoader::new().unwrap();
        let err = loader
            .load(&format!("{}/broken.pdf", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }
}
