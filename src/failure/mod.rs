//! Failure classification and user-facing descriptors for transfer errors.

use crate::transfer::{TransferError, TransferLeg, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureCategory {
    Input,
    Auth,
    Source,
    Destination,
    Network,
}

impl FailureCategory {
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Input => "❌",
            Self::Auth => "🔐",
            Self::Source => "📥",
            Self::Destination => "📤",
            Self::Network => "🌐",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Auth => "Authentication",
            Self::Source => "Source",
            Self::Destination => "Destination",
            Self::Network => "Network",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureDescriptor {
    pub category: FailureCategory,
    pub what: &'static str,
    pub why: &'static str,
    pub fix: &'static str,
}

/// Classifies a transfer error into a category and descriptor.
#[must_use]
pub fn classify_failure(error: &TransferError) -> FailureDescriptor {
    match error {
        TransferError::MissingUrl { .. } => FailureDescriptor {
            category: FailureCategory::Input,
            what: "Missing URL",
            why: "Both a download URL and an upload URL are required for every transfer.",
            fix: "Supply non-empty --download-url and --upload-url values (or downloadUrl/uploadUrl in batch input).",
        },
        TransferError::InvalidUrl { .. } | TransferError::InvalidParams { .. } => {
            FailureDescriptor {
                category: FailureCategory::Input,
                what: "Input could not be parsed",
                why: "A URL or parameter is malformed, or the URL does not use http/https.",
                fix: "Check the transfer parameters and retry with absolute http(s) URLs.",
            }
        }
        TransferError::DownloadStatus { status, .. } => {
            status_descriptor(TransferLeg::Download, *status)
        }
        TransferError::UploadStatus { status, .. } => {
            status_descriptor(TransferLeg::Upload, *status)
        }
        TransferError::StreamShape { .. } => FailureDescriptor {
            category: FailureCategory::Source,
            what: "Source body is not streamable",
            why: "The download arrived as parsed data instead of raw bytes, so it cannot be forwarded.",
            fix: "Ensure the source URL returns binary data (check its Content-Type and any API format parameters).",
        },
        TransferError::Transport { source, .. } => match source {
            TransportError::Timeout { .. } => FailureDescriptor {
                category: FailureCategory::Network,
                what: "Transfer timed out",
                why: "A remote host did not accept a connection or send data within the timeout window.",
                fix: "Check that both hosts are reachable, or raise read_timeout_secs in the config file.",
            },
            TransportError::InvalidHeader { .. } => FailureDescriptor {
                category: FailureCategory::Input,
                what: "Invalid request header",
                why: "A supplied header name or value cannot be sent over HTTP.",
                fix: "Remove spaces or control characters from header names and values.",
            },
            _ => FailureDescriptor {
                category: FailureCategory::Network,
                what: "Network request failed",
                why: "Connectivity, DNS, TLS, or proxy conditions interrupted one of the legs.",
                fix: "Check connectivity to both hosts, then retry.",
            },
        },
    }
}

fn status_descriptor(leg: TransferLeg, status: u16) -> FailureDescriptor {
    match (leg, status) {
        (TransferLeg::Download, 401 | 403) => FailureDescriptor {
            category: FailureCategory::Auth,
            what: "Source requires authentication",
            why: "The source rejected the download without valid credentials.",
            fix: "Pass the source's credentials with --download-headers, e.g. '{\"Authorization\": \"Bearer ...\"}'.",
        },
        (TransferLeg::Upload, 401 | 403) => FailureDescriptor {
            category: FailureCategory::Auth,
            what: "Destination requires authentication",
            why: "The destination rejected the upload without valid credentials.",
            fix: "Add ?bearer=<token> to the upload URL or pass an Authorization header with --upload-headers.",
        },
        (TransferLeg::Download, 404) => FailureDescriptor {
            category: FailureCategory::Source,
            what: "Source not found",
            why: "The download URL returned HTTP 404, which usually means the link is stale.",
            fix: "Verify the download URL and retry with an updated link.",
        },
        (TransferLeg::Download, _) => FailureDescriptor {
            category: FailureCategory::Source,
            what: "Source returned an error status",
            why: "The download URL answered with a non-2xx status, so no upload was attempted.",
            fix: "Check the source service and retry once it serves the file.",
        },
        (TransferLeg::Upload, _) => FailureDescriptor {
            category: FailureCategory::Destination,
            what: "Destination rejected the upload",
            why: "The upload URL answered with a non-2xx status after receiving the stream.",
            fix: "Check the destination's method (POST/PUT), size limits, and response body.",
        },
    }
}
