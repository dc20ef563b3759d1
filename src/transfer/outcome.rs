//! Transfer outcomes and the caller-facing output record.
//!
//! A transfer ends in exactly one of three ways. Success and soft failure are
//! returned as a [`TransferOutcome`]; hard failures are the `Err` side of
//! [`TransferOrchestrator::transfer`](super::TransferOrchestrator::transfer)
//! and are never assembled into a record by the library.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TransferError;
use super::request::TransferRequest;

/// Completed transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSuccess {
    /// Status of the download leg.
    pub download_status: u16,
    /// Status of the upload leg.
    pub upload_status: u16,
    /// Destination response, decoded as JSON when possible.
    pub upload_response: Value,
}

/// Failure reported as data rather than raised.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftFailure {
    /// Human-readable description.
    pub message: String,
    /// Status of the download leg, when one was received.
    pub download_status: Option<u16>,
    /// Status of the upload leg, when one was received.
    pub upload_status: Option<u16>,
    /// Source URL of the attempt.
    pub download_url: String,
    /// Destination URL of the attempt.
    pub upload_url: String,
}

impl SoftFailure {
    /// Captures a recoverable error for `request`.
    #[must_use]
    pub fn from_error(error: &TransferError, request: &TransferRequest) -> Self {
        Self {
            message: error.to_string(),
            download_status: error.download_status_code(),
            upload_status: error.upload_status_code(),
            download_url: request.download_url_str().to_string(),
            upload_url: request.upload_url_str().to_string(),
        }
    }
}

/// Outcome of a transfer that did not raise.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// Both legs returned 2xx.
    Success(TransferSuccess),
    /// A recoverable failure with `throw_on_error` disabled.
    SoftFailure(SoftFailure),
}

impl TransferOutcome {
    /// Returns true for [`TransferOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Converts the outcome into its output record.
    #[must_use]
    pub fn into_record(self) -> OutputRecord {
        assemble(self)
    }
}

/// Flat, serializable result of one invocation.
///
/// Field names are part of the host contract: `success`, `error`,
/// `downloadStatus`, `uploadStatus`, `uploadResponse`, `downloadUrl`,
/// `uploadUrl`. Absent fields are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    /// True only when both legs answered 2xx.
    pub success: bool,
    /// Failure message; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Status of the download leg, when one was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_status: Option<u16>,
    /// Status of the upload leg, when one was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<u16>,
    /// Destination response body; present on success only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_response: Option<Value>,
    /// Source URL; present on failure only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Destination URL; present on failure only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
}

impl OutputRecord {
    /// Builds the error record a host emits when it converts a raised failure
    /// into per-item data and keeps going.
    #[must_use]
    pub fn from_hard_failure(
        error: &TransferError,
        download_url: impl Into<String>,
        upload_url: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            download_status: error.download_status_code(),
            upload_status: error.upload_status_code(),
            upload_response: None,
            download_url: Some(download_url.into()),
            upload_url: Some(upload_url.into()),
        }
    }
}

/// Maps an outcome to its output record.
#[must_use]
pub fn assemble(outcome: TransferOutcome) -> OutputRecord {
    match outcome {
        TransferOutcome::Success(success) => OutputRecord {
            success: true,
            error: None,
            download_status: Some(success.download_status),
            upload_status: Some(success.upload_status),
            upload_response: Some(success.upload_response),
            download_url: None,
            upload_url: None,
        },
        TransferOutcome::SoftFailure(failure) => OutputRecord {
            success: false,
            error: Some(failure.message),
            download_status: failure.download_status,
            upload_status: failure.upload_status,
            upload_response: None,
            download_url: Some(failure.download_url),
            upload_url: Some(failure.upload_url),
        },
    }
}

/// Interprets the destination's response body.
///
/// UTF-8 text that parses as JSON becomes structured data; any other text is
/// passed through as a string. Non-UTF-8 bytes are decoded lossily.
#[must_use]
pub fn interpret_upload_body(body: &[u8]) -> Value {
    match std::str::from_utf8(body) {
        Ok(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
        Err(_) => Value::String(String::from_utf8_lossy(body).into_owned()),
    }
}
