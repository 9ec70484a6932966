//! Retry policy for failed journal replays.

use serde::{Deserialize, Serialize};

use crate::remote::RemoteError;

/// Replays allowed before a retryable record is dead-lettered.
pub const MAX_ATTEMPTS: u32 = 10;

/// Retry policy classification for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Classify an HTTP status into retry behavior.
pub const fn classify_http_status(status: u16) -> RetryClass {
    match status {
        401 | 403 => RetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 | 500..=599 => RetryClass::Retryable,
        _ => RetryClass::Permanent,
    }
}

/// Transport failures carry no status and are always retryable.
pub const fn classify(error: &RemoteError) -> RetryClass {
    if error.is_unauthorized() {
        return RetryClass::ReauthRequired;
    }
    match error.code {
        Some(status) => classify_http_status(status),
        None => RetryClass::Retryable,
    }
}

/// Exponential backoff in milliseconds with cap.
pub fn backoff_millis(attempts: u32) -> i64 {
    const MAX_EXPONENT: u32 = 8;
    const BASE_DELAY_MILLIS: i64 = 5_000;

    2_i64.pow(attempts.min(MAX_EXPONENT)) * BASE_DELAY_MILLIS
}
