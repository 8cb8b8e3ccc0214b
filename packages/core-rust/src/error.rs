//! Error taxonomy for calls against a remote collection.
//!
//! Cancellation is modelled as an error variant so remotes can report it
//! through the same channel, but the controllers never surface it: see
//! [`RemoteError::is_cancelled`].

use serde_json::Value as Json;

/// Failure of a remote `list`/`get`/`create`/`update`/`delete` call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The request was superseded or torn down before it settled.
    #[error("request cancelled")]
    Cancelled,
    /// The server answered with a failure status.
    #[error("server error{}: {}", status_suffix(.status), .message.as_deref().unwrap_or("no message"))]
    Server {
        /// HTTP status code, if the failure came from an HTTP exchange.
        status: Option<u16>,
        /// Human-readable message extracted from the response body.
        message: Option<String>,
    },
    /// The request never produced a server answer (connection, timeout, decoding).
    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Server failure with a message and no status.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        RemoteError::Server {
            status: None,
            message: Some(message.into()),
        }
    }

    /// Server failure built from a status code and a JSON error body.
    #[must_use]
    pub fn from_body(status: Option<u16>, body: &Json) -> Self {
        RemoteError::Server {
            status,
            message: extract_message(body),
        }
    }

    /// `true` for cancellations, which are never user-visible.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RemoteError::Cancelled)
    }

    /// Message to show the user: the server-supplied message when present,
    /// else the transport description, else `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            RemoteError::Server {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            RemoteError::Transport(m) if !m.trim().is_empty() => m.clone(),
            _ => fallback.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {s}")).unwrap_or_default()
}

/// Extracts the human-readable message from an error body.
///
/// Accepts `{ "response": { "data": { "message": .. } } }` and
/// `{ "message": .. }`. A message may be a string or an array of strings
/// (one per failed validation rule), which is joined with `"; "`.
#[must_use]
pub fn extract_message(body: &Json) -> Option<String> {
    body.pointer("/response/data/message")
        .and_then(message_text)
        .or_else(|| body.get("message").and_then(message_text))
}

fn message_text(value: &Json) -> Option<String> {
    match value {
        Json::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Json::Array(items) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(Json::as_str)
                .filter(|s| !s.trim().is_empty())
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}
