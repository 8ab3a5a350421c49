use axum::body::Body;
use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use futures::{future, Stream, StreamExt};
use serde_json::Value;
use std::convert::Infallible;

use super::{LlmError, TextStream};

/// Drive `upstream` on its own task and hand deltas over a channel.
///
/// The task outlives the client: when the receiver is dropped the remaining
/// upstream output is drained and discarded, so the provider call finishes on
/// its own. `on_complete` gets the concatenated text of every delta.
pub fn forward_detached<F>(
    mut upstream: TextStream,
    on_complete: F,
) -> UnboundedReceiver<Result<String, LlmError>>
where
    F: FnOnce(String) + Send + 'static,
{
    let (tx, rx) = unbounded();

    tokio::spawn(async move {
        let mut text = String::new();
        let mut client_gone = false;

        while let Some(item) = upstream.next().await {
            if let Ok(delta) = &item {
                text.push_str(delta);
            }
            if !client_gone && tx.unbounded_send(item).is_err() {
                client_gone = true;
                tracing::debug!("Client disconnected; draining upstream response");
            }
        }

        on_complete(text);
    });

    rx
}

/// `0:<json string>\n` text part of the AI data stream protocol
pub fn encode_text_part(delta: &str) -> String {
    format!("0:{}\n", Value::String(delta.to_string()))
}

/// `3:<json string>\n` error part of the AI data stream protocol
pub fn encode_error_part(message: &str) -> String {
    format!("3:{}\n", Value::String(message.to_string()))
}

/// Response body in the AI data stream protocol
pub fn data_stream_body<S>(deltas: S) -> Body
where
    S: Stream<Item = Result<String, LlmError>> + Send + 'static,
{
    let lines = deltas.map(|item| {
        let line = match item {
            Ok(delta) => encode_text_part(&delta),
            Err(e) => {
                tracing::error!("Chat stream failed: {}", e);
                encode_error_part("An error occurred.")
            }
        };
        Ok::<_, Infallible>(line)
    });
    Body::from_stream(lines)
}

/// Response body carrying the raw text deltas. An upstream error ends the
/// body early.
pub fn text_stream_body<S>(deltas: S) -> Body
where
    S: Stream<Item = Result<String, LlmError>> + Send + 'static,
{
    let text = deltas
        .take_while(|item| {
            if let Err(e) = item {
                tracing::error!("Text stream failed: {}", e);
            }
            future::ready(item.is_ok())
        })
        .filter_map(|item| future::ready(item.ok().map(Ok::<_, Infallible>)));
    Body::from_stream(text)
}
