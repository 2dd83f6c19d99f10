use regex::Regex;

use crate::error::Result;

const DEFAULT_HOST: &str = "www.youtube.com";

/// Recognises video links the service can watch by itself.
///
/// Nothing is downloaded: an accepted link is sent to the service as a URI
/// reference.
#[derive(Debug, Clone)]
pub struct VideoLinkValidator {
    pattern: Regex,
}

impl VideoLinkValidator {
    /// A validator for `https://www.youtube.com/watch?v=<id>` links.
    pub fn new() -> Result<Self> {
        Self::for_host(DEFAULT_HOST)
    }

    /// A validator for `https://<host>/watch?v=<id>` links.
    pub fn for_host(host: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(
            r"https://{}/watch\?v=[\w-]{{11}}",
            regex::escape(host)
        ))?;
        Ok(Self { pattern })
    }

    /// The first video link contained in `input`, if any.
    pub fn validate(&self, input: &str) -> Option<String> {
        self.pattern.find(input).map(|m| m.as_str().to_string())
    }

    /// The first video link in `input` and the words around it.
    ///
    /// Words containing the link are dropped whole, so trailing
    /// parameters such as `&t=42` go with it.
    pub fn split(&self, input: &str) -> Option<(String, String)> {
        let link = self.validate(input)?;
        let rest = input
            .split_whitespace()
            .filter(|word| !word.contains(link.as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        Some((link, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_link_anywhere_in_input() {
        let validator = VideoLinkValidator::new().unwrap();
        assert_eq!(
            validator.validate("summarize https://www.youtube.com/watch?v=dQw4w9WgXcQ please"),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn extra_query_is_dropped() {
        let validator = VideoLinkValidator::new().unwrap();
        assert_eq!(
            validator.validate("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn rejects_other_shapes() {
        let validator = VideoLinkValidator::new().unwrap();
        assert_eq!(validator.validate("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(validator.validate("http://www.youtube.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(validator.validate("https://wwwXyoutube.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(validator.validate("hello"), None);
    }

    #[test]
    fn split_keeps_the_question() {
        let validator = VideoLinkValidator::new().unwrap();
        assert_eq!(
            validator.split("summarize https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42 please"),
            Some((
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
                "summarize please".to_string()
            ))
        );
        assert_eq!(
            validator.split(" https://www.youtube.com/watch?v=dQw4w9WgXcQ "),
            Some((
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
                String::new()
            ))
        );
        assert_eq!(validator.split("no link here"), None);
    }

    #[test]
    fn configurable_host() {
        let validator = VideoLinkValidator::for_host("video-host.example").unwrap();
        assert_eq!(
            validator.validate("https://video-host.example/watch?v=ABCDEFGHIJK"),
            Some("https://video-host.example/watch?v=ABCDEFGHIJK".to_string())
        );
        assert_eq!(
            validator.validate("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            None
        );
    }
}
