//! Error types for the transfer pipeline.
//!
//! [`TransportError`] describes what went wrong inside a single HTTP leg.
//! [`TransferError`] is the pipeline-level taxonomy surfaced to callers; each
//! variant knows whether it may be downgraded to a soft failure.

use thiserror::Error;

/// Maximum characters of body content shown in stream-shape diagnostics.
pub const CONTENT_PREVIEW_CHARS: usize = 200;

/// Maximum number of object keys listed in stream-shape diagnostics.
const KEY_PREVIEW_COUNT: usize = 5;

/// Which side of the transfer an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferLeg {
    /// The GET request against the source URL.
    Download,
    /// The POST/PUT request against the destination URL.
    Upload,
}

impl TransferLeg {
    /// Capitalized label used at the start of user-facing messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Download => "Download",
            Self::Upload => "Upload",
        }
    }
}

/// Errors raised by a [`Transport`](super::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level failure (DNS, connection refused, TLS, body stream aborted).
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL of the failed request.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The request timed out while connecting or waiting for data.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL of the timed-out request.
        url: String,
    },

    /// A header name or value cannot be encoded on the wire.
    #[error("invalid request header {name:?}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },

    /// No transport is registered for the URL's scheme.
    #[error("no transport available for URL scheme {scheme:?}")]
    UnsupportedScheme {
        /// The rejected scheme.
        scheme: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build {scheme} HTTP client: {source}")]
    Client {
        /// Scheme the client was being built for.
        scheme: &'static str,
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Connection-level failure reported without a client error value.
    #[error("connection failed: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
    },
}

impl TransportError {
    /// Maps a client send error, separating timeouts from other failures.
    pub fn from_send(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates a connection error from a plain message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

/// Errors produced by a transfer attempt.
///
/// Errors for which [`is_recoverable`](Self::is_recoverable) returns true are
/// reported as soft failures when the request disables `throw_on_error`; all
/// others always propagate.
#[derive(Debug, Error)]
pub enum TransferError {
    /// A required URL is missing or blank.
    #[error("{} URL is required", .leg.label())]
    MissingUrl {
        /// Which URL was missing.
        leg: TransferLeg,
    },

    /// A URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid {} URL {url:?}: {reason}", .leg.label().to_ascii_lowercase())]
    InvalidUrl {
        /// Which URL was rejected.
        leg: TransferLeg,
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Raw parameters could not be decoded into a transfer request.
    #[error("Invalid transfer parameters: {message}")]
    InvalidParams {
        /// Decoder message.
        message: String,
    },

    /// The source answered with a non-2xx status.
    #[error("Download failed with HTTP {status} from {url}{}", reason_suffix(.reason.as_deref()))]
    DownloadStatus {
        /// The source URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Canonical reason phrase, when known.
        reason: Option<String>,
    },

    /// The destination answered with a non-2xx status.
    #[error("Upload failed with HTTP {status} to {url}{}", reason_suffix(.reason.as_deref()))]
    UploadStatus {
        /// The destination URL.
        url: String,
        /// The HTTP status code of the upload.
        status: u16,
        /// The HTTP status code of the preceding download.
        download_status: u16,
        /// Canonical reason phrase, when known.
        reason: Option<String>,
    },

    /// The download body arrived as parsed data instead of bytes.
    #[error(
        "Download response body is not a streamable format: received {body_kind} (keys: {key_preview}; content: {content_preview}). \
         Ensure the source URL returns binary data rather than parsed JSON or text."
    )]
    StreamShape {
        /// JSON kind of the received body.
        body_kind: &'static str,
        /// Up to five top-level keys, or an item count for arrays.
        key_preview: String,
        /// Serialized body, truncated to [`CONTENT_PREVIEW_CHARS`].
        content_preview: String,
    },

    /// A transport fault on either leg.
    #[error("{message}")]
    Transport {
        /// Message naming the URLs involved.
        message: String,
        /// Status of the download leg when the fault happened after it.
        download_status: Option<u16>,
        /// The transport error.
        #[source]
        source: TransportError,
    },
}

fn reason_suffix(reason: Option<&str>) -> String {
    reason.map(|r| format!(": {r}")).unwrap_or_default()
}

impl TransferError {
    /// Creates a download status error.
    pub fn download_status(url: impl Into<String>, status: reqwest::StatusCode) -> Self {
        Self::DownloadStatus {
            url: url.into(),
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
        }
    }

    /// Creates an upload status error.
    pub fn upload_status(
        url: impl Into<String>,
        status: reqwest::StatusCode,
        download_status: reqwest::StatusCode,
    ) -> Self {
        Self::UploadStatus {
            url: url.into(),
            status: status.as_u16(),
            download_status: download_status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
        }
    }

    /// Wraps a transport fault, naming both URLs unless the fault already
    /// mentions one of them.
    pub fn transport(
        source: TransportError,
        download_url: &str,
        upload_url: &str,
        download_status: Option<u16>,
    ) -> Self {
        let detail = source.to_string();
        let message = if detail.contains(download_url) || detail.contains(upload_url) {
            detail
        } else {
            format!("{detail} (download: {download_url}, upload: {upload_url})")
        };
        Self::Transport {
            message,
            download_status,
            source,
        }
    }

    /// Builds the diagnostic for a download body that arrived as parsed data.
    #[must_use]
    pub fn stream_shape(body: &serde_json::Value) -> Self {
        use serde_json::Value;

        let body_kind = match body {
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
        };
        let key_preview = match body {
            Value::Object(entries) => {
                let mut keys: Vec<&str> = entries
                    .keys()
                    .take(KEY_PREVIEW_COUNT)
                    .map(String::as_str)
                    .collect();
                if entries.len() > KEY_PREVIEW_COUNT {
                    keys.push("...");
                }
                if keys.is_empty() {
                    "none".to_string()
                } else {
                    keys.join(", ")
                }
            }
            Value::Array(items) => format!("{} items", items.len()),
            _ => "none".to_string(),
        };
        Self::StreamShape {
            body_kind,
            key_preview,
            content_preview: truncate_preview(&body.to_string()),
        }
    }

    /// Returns true if the error may be reported as a soft failure.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DownloadStatus { .. } | Self::UploadStatus { .. } | Self::Transport { .. }
        )
    }

    /// Status of the download leg, when it was observed.
    #[must_use]
    pub fn download_status_code(&self) -> Option<u16> {
        match self {
            Self::DownloadStatus { status, .. } => Some(*status),
            Self::UploadStatus {
                download_status, ..
            } => Some(*download_status),
            Self::Transport {
                download_status, ..
            } => *download_status,
            _ => None,
        }
    }

    /// Status of the upload leg, when it was observed.
    #[must_use]
    pub fn upload_status_code(&self) -> Option<u16> {
        match self {
            Self::UploadStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn truncate_preview(content: &str) -> String {
    if content.chars().count() <= CONTENT_PREVIEW_CHARS {
        return content.to_string();
    }
    let mut preview: String = content.chars().take(CONTENT_PREVIEW_CHARS - 3).collect();
    preview.push_str("...");
    preview
}
