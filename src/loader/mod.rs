//! Turning shell input into content the model can read.
//!
//! A [`ContentLoader`] recognises inputs that name some content (a local
//! path, a URL), determines the content's MIME type and loads its bytes.
//! Whether loaded content may be sent at all is decided by the
//! [`MimeTypeGate`].

use std::fmt;

use crate::error::{Error, Result};
use crate::observability::{LOADER_ACCEPTED, LOADER_BYTES, LOADER_REJECTED};
use crate::types::Part;

mod local;
pub mod mime;
mod remote;
mod video;

pub use local::LocalFileLoader;
pub use remote::RemoteFileLoader;
pub use video::VideoLinkValidator;

/// MIME types the service accepts as attachments.
///
/// Entries ending in `/` name a whole family under [`MatchPolicy::FamilyPrefix`].
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "text/",
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/heic",
    "image/heif",
    "video/mp4",
    "video/mpeg",
    "video/mov",
    "video/avi",
    "video/x-flv",
    "video/mpg",
    "video/webm",
    "video/wmv",
    "video/3gpp",
    "audio/wav",
    "audio/mp3",
    "audio/aiff",
    "audio/aac",
    "audio/ogg",
    "audio/flac",
    "audio/mpeg",
];

/// How a MIME type is compared against the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// The type must equal an entry.
    Exact,
    /// The type must start with an entry.
    FamilyPrefix,
}

/// A MIME type the gate refused; `None` when the type could not be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub mime_type: Option<String>,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mime_type {
            Some(mime) => write!(f, "{mime}"),
            None => write!(f, "unknown"),
        }
    }
}

/// Allow-list check applied before any content is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeTypeGate {
    allowed: Vec<String>,
}

impl MimeTypeGate {
    /// A gate over an explicit allow-list.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// The gate over [`ALLOWED_MIME_TYPES`].
    pub fn standard() -> Self {
        Self::new(ALLOWED_MIME_TYPES.iter().copied())
    }

    /// Check `mime` under `policy`.  An undetermined type is always rejected.
    pub fn check(&self, mime: Option<&str>, policy: MatchPolicy) -> std::result::Result<(), Rejection> {
        let Some(mime) = mime else {
            return Err(Rejection { mime_type: None });
        };
        let allowed = self.allowed.iter().any(|entry| match policy {
            MatchPolicy::Exact => mime == entry,
            MatchPolicy::FamilyPrefix => mime.starts_with(entry.as_str()),
        });
        if allowed {
            Ok(())
        } else {
            Err(Rejection {
                mime_type: Some(mime.to_string()),
            })
        }
    }
}

impl Default for MimeTypeGate {
    fn default() -> Self {
        Self::standard()
    }
}

/// Bytes loaded for an attachment, with the type they were accepted as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedContent {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl LoadedContent {
    /// The conversation part carrying this content inline.
    pub fn to_part(&self) -> Part {
        Part::bytes(&self.bytes, self.mime_type.clone())
    }
}

/// Result of running an identified input through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentDecision {
    Accepted(LoadedContent),
    Rejected { mime_type: Option<String> },
    /// The type probe could not reach the content; the input is not content after all.
    Unreachable,
    /// The type was accepted but fetching the bytes failed.
    FetchFailed { reason: String },
}

/// A short description of a transport failure, without the error chain.
fn fetch_failure(err: &Error) -> String {
    if err.is_timeout() {
        "timed out".to_string()
    } else if let Some(status) = err.status_code() {
        format!("HTTP {status}")
    } else {
        "connection failed".to_string()
    }
}

/// A source of attachable content.
#[async_trait::async_trait]
pub trait ContentLoader: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Return the canonical identifier if `input` names content this loader
    /// can reach.  Never fails: malformed input yields `None`.
    fn validate(&self, input: &str) -> Option<String>;

    /// Determine the MIME type of the identified content.
    ///
    /// `Ok(None)` means the content was reached but its type is unknown; an
    /// error means the content could not be reached at all.
    async fn mimetype(&self, identifier: &str) -> Result<Option<String>>;

    /// Load the identified content.
    async fn load(&self, identifier: &str) -> Result<Vec<u8>>;

    /// How this loader's MIME types are matched against the allow-list.
    fn policy(&self) -> MatchPolicy;

    /// Determine the type, consult `gate`, and load only if accepted.
    ///
    /// Only I/O errors while loading are returned as errors; transport
    /// failures become [`ContentDecision::Unreachable`] or
    /// [`ContentDecision::FetchFailed`].
    async fn resolve(&self, identifier: &str, gate: &MimeTypeGate) -> Result<ContentDecision> {
        let mime = match self.mimetype(identifier).await {
            Ok(mime) => mime,
            Err(err) => {
                tracing::debug!(loader = self.name(), identifier, error = %err, "content unreachable");
                return Ok(ContentDecision::Unreachable);
            }
        };
        if let Err(rejection) = gate.check(mime.as_deref(), self.policy()) {
            LOADER_REJECTED.click();
            tracing::info!(loader = self.name(), identifier, mime = %rejection, "content rejected");
            return Ok(ContentDecision::Rejected {
                mime_type: rejection.mime_type,
            });
        }
        let bytes = match self.load(identifier).await {
            Ok(bytes) => bytes,
            Err(err) if err.is_io() => return Err(err),
            Err(err) => {
                tracing::info!(loader = self.name(), identifier, error = %err, "content fetch failed");
                return Ok(ContentDecision::FetchFailed {
                    reason: fetch_failure(&err),
                });
            }
        };
        LOADER_ACCEPTED.click();
        LOADER_BYTES.add(bytes.len() as f64);
        tracing::debug!(loader = self.name(), identifier, bytes = bytes.len(), "content loaded");
        Ok(ContentDecision::Accepted(LoadedContent {
            bytes,
            // check() only passes for Some.
            mime_type: mime.unwrap_or_default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_prefix_admits_any_text_type() {
        let gate = MimeTypeGate::standard();
        assert!(gate.check(Some("text/x-rust"), MatchPolicy::FamilyPrefix).is_ok());
        assert!(gate.check(Some("text/plain"), MatchPolicy::FamilyPrefix).is_ok());
        assert!(gate.check(Some("application/pdf"), MatchPolicy::FamilyPrefix).is_ok());
    }

    #[test]
    fn exact_requires_equality() {
        let gate = MimeTypeGate::standard();
        assert!(gate.check(Some("image/png"), MatchPolicy::Exact).is_ok());
        assert_eq!(
            gate.check(Some("text/html"), MatchPolicy::Exact),
            Err(Rejection {
                mime_type: Some("text/html".to_string())
            })
        );
    }

    #[test]
    fn disallowed_and_unknown_types_are_rejected() {
        let gate = MimeTypeGate::standard();
        for policy in [MatchPolicy::Exact, MatchPolicy::FamilyPrefix] {
            assert!(gate.check(Some("application/zip"), policy).is_err());
            assert!(gate.check(Some("image/gif"), policy).is_err());
            assert_eq!(gate.check(None, policy), Err(Rejection { mime_type: None }));
        }
    }

    #[test]
    fn rejection_display() {
        assert_eq!(Rejection { mime_type: None }.to_string(), "unknown");
        assert_eq!(
            Rejection {
                mime_type: Some("application/zip".to_string())
            }
            .to_string(),
            "application/zip"
        );
    }

    #[test]
    fn fetch_failures_are_summarized() {
        assert_eq!(fetch_failure(&Error::timeout("slow", Some(5.0))), "timed out");
        assert_eq!(fetch_failure(&Error::api(502, None, "bad gateway")), "HTTP 502");
        assert_eq!(
            fetch_failure(&Error::connection("refused", None)),
            "connection failed"
        );
    }

    #[test]
    fn custom_allow_list() {
        let gate = MimeTypeGate::new(["application/json"]);
        assert!(gate.check(Some("application/json"), MatchPolicy::Exact).is_ok());
        assert!(gate.check(Some("text/plain"), MatchPolicy::FamilyPrefix).is_err());
    }
}
