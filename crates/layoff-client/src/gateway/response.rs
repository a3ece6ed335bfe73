//! Failure normalization. Pure functions over raw responses.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use super::transport::{RawResponse, TransportError};

/// Status code carried by failures where no HTTP response was received.
pub const NETWORK_STATUS: u16 = 0;

pub const DEFAULT_FAILURE_MESSAGE: &str = "Request failed";
pub const NETWORK_FAILURE_MESSAGE: &str = "Network error - please check your connection";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response: connection refused, DNS, timeout.
    Unreachable,
    /// The server answered 401 and the session was torn down.
    SessionExpired,
    /// The server answered with a non-success status.
    Rejected,
    /// The body could not be encoded or decoded.
    Decode,
}

/// The one failure shape every gateway caller sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiFailure {
    pub message: String,
    pub status_code: u16,
    pub kind: FailureKind,
}

impl ApiFailure {
    pub fn new(message: impl Into<String>, status_code: u16, kind: FailureKind) -> Self {
        Self {
            message: message.into(),
            status_code,
            kind,
        }
    }

    pub fn network() -> Self {
        Self::new(NETWORK_FAILURE_MESSAGE, NETWORK_STATUS, FailureKind::Unreachable)
    }

    pub fn session_expired() -> Self {
        Self::new(SESSION_EXPIRED_MESSAGE, 401, FailureKind::SessionExpired)
    }

    pub fn is_network(&self) -> bool {
        self.status_code == NETWORK_STATUS && self.kind == FailureKind::Unreachable
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code == 401
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Pulls the server's message out of an error body, falling back to the
/// generic one when the body is empty, not JSON, or has no message.
fn server_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string())
}

pub fn failure_from_transport(err: &TransportError) -> ApiFailure {
    log::warn!("API request did not reach the server: {}", err);
    ApiFailure::network()
}

fn reject(raw: &RawResponse) -> ApiFailure {
    ApiFailure::new(server_message(&raw.body), raw.status, FailureKind::Rejected)
}

/// Decodes a success body, or normalizes a non-success response.
pub fn decode<T: DeserializeOwned>(raw: &RawResponse) -> Result<T, ApiFailure> {
    if !raw.is_success() {
        return Err(reject(raw));
    }
    let body = if raw.body.trim().is_empty() {
        "null"
    } else {
        raw.body.as_str()
    };
    serde_json::from_str(body).map_err(|e| {
        log::error!("Failed to decode response body (status {}): {}", raw.status, e);
        ApiFailure::new(
            format!("Unexpected response from server: {}", e),
            raw.status,
            FailureKind::Decode,
        )
    })
}

/// Like [`decode`] for endpoints whose success body is irrelevant.
pub fn decode_unit(raw: &RawResponse) -> Result<(), ApiFailure> {
    if raw.is_success() {
        Ok(())
    } else {
        Err(reject(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_server_message_is_used() {
        let failure = decode::<serde_json::Value>(&raw(404, r#"{"message":"Job not found"}"#))
            .unwrap_err();
        assert_eq!(failure.message, "Job not found");
        assert_eq!(failure.status_code, 404);
        assert_eq!(failure.kind, FailureKind::Rejected);
    }

    #[test]
    fn test_missing_message_falls_back() {
        let failure = decode_unit(&raw(500, "<html>oops</html>")).unwrap_err();
        assert_eq!(failure.message, DEFAULT_FAILURE_MESSAGE);
        assert_eq!(failure.status_code, 500);

        let failure = decode_unit(&raw(422, r#"{"message":"  "}"#)).unwrap_err();
        assert_eq!(failure.message, DEFAULT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_transport_failure_uses_sentinel() {
        let failure = failure_from_transport(&TransportError::Timeout);
        assert_eq!(failure.status_code, NETWORK_STATUS);
        assert_eq!(failure.message, NETWORK_FAILURE_MESSAGE);
        assert!(failure.is_network());
    }

    #[test]
    fn test_decode_success_and_bad_body() {
        let value: Vec<u32> = decode(&raw(200, "[1,2]")).unwrap();
        assert_eq!(value, vec![1, 2]);

        let failure = decode::<Vec<u32>>(&raw(200, "{")).unwrap_err();
        assert_eq!(failure.kind, FailureKind::Decode);

        let unit: Option<u32> = decode(&raw(204, "")).unwrap();
        assert_eq!(unit, None);
    }
}
