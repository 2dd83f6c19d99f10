//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! With `alt=sse` the Gemini API sends one `data:` record per response chunk,
//! records separated by a blank line.  This module turns the raw byte stream
//! into a stream of parsed [`GenerateContentResponse`] values.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::{Error, GenerateContentResponse, Result};

/// Process a stream of bytes into a stream of response chunks.
///
/// A record that fails to parse yields an `Err` item; later records are
/// still delivered.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer = String::new();
    let pending: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, pending),
        move |(mut stream, mut buffer, mut pending)| async move {
            loop {
                // First drain complete records already in the buffer.
                while let Some((record, remaining)) = extract_record(&buffer) {
                    buffer = remaining;
                    if let Some(chunk) = record {
                        count(&chunk);
                        return Some((chunk, (stream, buffer, pending)));
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        pending.extend_from_slice(&bytes);
                        let valid = match std::str::from_utf8(&pending) {
                            Ok(text) => text.len(),
                            // A multi-byte character split across chunks.
                            Err(e) if e.error_len().is_none() => e.valid_up_to(),
                            Err(e) => {
                                STREAM_ERRORS.click();
                                pending.clear();
                                return Some((
                                    Err(Error::encoding(
                                        format!("Invalid UTF-8 in stream: {e}"),
                                        Some(Box::new(e)),
                                    )),
                                    (stream, buffer, pending),
                                ));
                            }
                        };
                        let rest = pending.split_off(valid);
                        buffer.push_str(&String::from_utf8_lossy(&pending));
                        pending = rest;
                        if buffer.contains('\r') {
                            buffer = buffer.replace("\r\n", "\n");
                        }
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer, pending)));
                    }
                    None => {
                        // A final record may lack its trailing blank line.
                        if !buffer.trim().is_empty() {
                            let last = std::mem::take(&mut buffer);
                            if let Some(chunk) = parse_record(&last) {
                                count(&chunk);
                                return Some((chunk, (stream, buffer, pending)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

fn count(chunk: &Result<GenerateContentResponse>) {
    match chunk {
        Ok(_) => STREAM_EVENTS.click(),
        Err(_) => STREAM_ERRORS.click(),
    }
}

/// Split one complete record off the front of `buffer`.
///
/// Returns `None` when no complete record is buffered yet, and `Some((None, rest))`
/// for records that carry no data (comments, keep-alives).
fn extract_record(buffer: &str) -> Option<(Option<Result<GenerateContentResponse>>, String)> {
    let (record, rest) = buffer.split_once("\n\n")?;
    Some((parse_record(record), rest.to_string()))
}

fn parse_record(record: &str) -> Option<Result<GenerateContentResponse>> {
    let data = record
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    if data.is_empty() {
        return None;
    }
    Some(serde_json::from_str::<GenerateContentResponse>(&data).map_err(|e| {
        Error::serialization(
            format!("Malformed SSE record: {e}: {data}"),
            Some(Box::new(e)),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunk(text: &str) -> String {
        format!(
            "data: {{\"candidates\": [{{\"content\": {{\"parts\": [{{\"text\": \"{text}\"}}], \"role\": \"model\"}}}}]}}\r\n\r\n"
        )
    }

    #[tokio::test]
    async fn parse_single_record() {
        let data = chunk("Hello");
        let stream = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(data))]);

        let mut sse_stream = Box::pin(process_sse(stream));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("Hello"));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn parse_multiple_records() {
        let data = format!("{}{}", chunk("a"), chunk("b"));
        let stream = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(data))]);

        let texts: Vec<_> = process_sse(stream)
            .map(|r| r.unwrap().text().unwrap())
            .collect()
            .await;
        assert_eq!(texts, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn handle_split_record() {
        let data = chunk("split");
        let (first, second) = data.split_at(17);
        let stream = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from(first.to_string())),
            Ok(Bytes::from(second.to_string())),
        ]);

        let mut sse_stream = Box::pin(process_sse(stream));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("split"));
    }

    #[tokio::test]
    async fn handle_crlf_split_between_chunks() {
        let data = chunk("x");
        let cut = data.len() - 3;
        let stream = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from(data[..cut].to_string())),
            Ok(Bytes::from(data[cut..].to_string())),
        ]);
        let events: Vec<_> = process_sse(stream).collect().await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_ok());
    }

    #[tokio::test]
    async fn malformed_record_does_not_end_stream() {
        let data = format!("data: {{not json\n\n{}", chunk("after"));
        let stream = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(data))]);

        let events: Vec<_> = process_sse(stream).collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_err());
        assert_eq!(events[1].as_ref().unwrap().text().as_deref(), Some("after"));
    }

    #[tokio::test]
    async fn trailing_record_without_separator() {
        let data = "data: {\"candidates\": []}";
        let stream = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(data))]);

        let events: Vec<_> = process_sse(stream).collect().await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_ok());
    }

    #[tokio::test]
    async fn comments_are_skipped() {
        let data = format!(": keep-alive\n\n{}", chunk("z"));
        let stream = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(data))]);

        let events: Vec<_> = process_sse(stream).collect().await;
        assert_eq!(events.len(), 1);
    }
}
