//! Error mapping helpers for the Bitbucket HTTP gateway.

use http::StatusCode;

use crate::bitbucket::error::BitbucketError;

const MAX_BODY_CHARS: usize = 200;

/// Checks if a status indicates rejected credentials or permissions.
pub(super) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

pub(super) fn map_http_error(operation: &str, status: StatusCode, body: &str) -> BitbucketError {
    let message = extract_bitbucket_message(body)
        .unwrap_or_else(|| truncate_for_message(body.trim(), MAX_BODY_CHARS));
    if is_auth_failure(status) {
        BitbucketError::Authentication {
            message: format!("{operation} failed: Bitbucket returned {status} {message}"),
        }
    } else {
        BitbucketError::Api {
            message: format!("{operation} failed with status {status}: {message}"),
        }
    }
}

pub(super) fn map_transport_error(operation: &str, error: &reqwest::Error) -> BitbucketError {
    let kind = if error.is_timeout() {
        "timed out"
    } else {
        "transport failed"
    };
    BitbucketError::Network {
        message: format!("{operation} {kind}: {error}"),
    }
}

pub(super) fn map_decode_error(operation: &str, error: &serde_json::Error) -> BitbucketError {
    BitbucketError::Decode {
        message: format!("{operation} returned an unexpected payload: {error}"),
    }
}

/// Pulls `errors[0].message` out of a Bitbucket error envelope.
pub(super) fn extract_bitbucket_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return None;
    };
    value
        .get("errors")
        .and_then(serde_json::Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|error| error.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}

fn truncate_for_message(message: &str, max_chars: usize) -> String {
    let mut output = String::new();
    let mut chars = message.chars();

    for _ in 0..max_chars {
        let Some(character) = chars.next() else {
            return output;
        };
        output.push(character);
    }

    if chars.next().is_some() {
        output.push_str("...");
    }

    output
}
