//! Streaming transport for chat turns.
//!
//! A spawned task posts the request, reads the byte stream, splits it into
//! frames, classifies each payload and forwards the results over an unbounded
//! channel. Events are tagged with a stream id so a consumer can discard
//! stragglers from an abandoned turn.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ChatRequest, ChatResponseBody};
use crate::core::classify::{classify, Payload};
use crate::core::frames::{frame_payload, FrameSplitter};
use crate::utils::url::construct_api_url;

#[derive(Clone, Debug)]
pub enum StreamMessage {
    Payload(Payload),
    Error(String),
    End,
}

fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        format!("API Error:\n```json\n{}\n```", trimmed)
    } else if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{}\n```", trimmed)
    } else {
        format!("API Error:\n```\n{}\n```", trimmed)
    }
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub request: ChatRequest,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                request,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = run_stream(client, base_url, request, tx.clone(), stream_id) => {}
                _ = cancel_token.cancelled() => {
                    let _ = tx.send((StreamMessage::End, stream_id));
                }
            }
        });
    }
}

async fn run_stream(
    client: reqwest::Client,
    base_url: String,
    request: ChatRequest,
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) {
    let url = construct_api_url(&base_url, request.endpoint());
    let response = match client
        .post(url)
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            let _ = tx.send((StreamMessage::Error(format_api_error(&err.to_string())), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
            return;
        }
    };

    if !response.status().is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        let _ = tx.send((StreamMessage::Error(format_api_error(&error_text)), stream_id));
        let _ = tx.send((StreamMessage::End, stream_id));
        return;
    }

    let mut stream = response.bytes_stream();
    let mut splitter = FrameSplitter::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = tx.send((StreamMessage::Error(format_api_error(&err.to_string())), stream_id));
                let _ = tx.send((StreamMessage::End, stream_id));
                return;
            }
        };

        for line in splitter.push(&chunk) {
            let Some(payload) = frame_payload(&line) else {
                continue;
            };
            match classify(payload) {
                Payload::Unrecognized => {
                    // Dropped, non-fatal; classify already logged it.
                }
                Payload::EndOfStream => {
                    let _ = tx.send((StreamMessage::Payload(Payload::EndOfStream), stream_id));
                    let _ = tx.send((StreamMessage::End, stream_id));
                    return;
                }
                payload => {
                    let _ = tx.send((StreamMessage::Payload(payload), stream_id));
                }
            }
        }
    }

    // Connection closed without an explicit completion token.
    splitter.finish();
    debug!("stream {stream_id} ended without a completion frame");
    let _ = tx.send((StreamMessage::End, stream_id));
}

/// Issue a non-streaming request and return the complete response body.
pub async fn send_once(
    client: &reqwest::Client,
    base_url: &str,
    request: &ChatRequest,
) -> Result<ChatResponseBody, String> {
    let url = construct_api_url(base_url, request.endpoint());
    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(request)
        .send()
        .await
        .map_err(|err| format_api_error(&err.to_string()))?;

    if !response.status().is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(format_api_error(&error_text));
    }

    response
        .json::<ChatResponseBody>()
        .await
        .map_err(|err| format_api_error(&err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_api_error_wraps_json_bodies() {
        let formatted = format_api_error(r#"{"error":"overloaded"}"#);
        assert!(formatted.starts_with("API Error:\n```json\n"));
        assert!(formatted.ends_with("```"));
    }

    #[test]
    fn format_api_error_wraps_plain_text() {
        let formatted = format_api_error("bad gateway");
        assert_eq!(formatted, "API Error:\n```\nbad gateway\n```");
    }

    #[tokio::test]
    async fn service_forwards_tagged_messages() {
        let (service, mut rx) = ChatStreamService::new();
        let _ = service
            .tx
            .send((StreamMessage::Payload(Payload::ContentDelta("hi".into())), 7));
        let _ = service.tx.send((StreamMessage::End, 7));

        let (message, id) = rx.recv().await.expect("payload message");
        assert_eq!(id, 7);
        assert!(matches!(
            message,
            StreamMessage::Payload(Payload::ContentDelta(ref text)) if text == "hi"
        ));
        let (message, _) = rx.recv().await.expect("end message");
        assert!(matches!(message, StreamMessage::End));
    }
}
