//! Transport strategy seam between the orchestrator and the HTTP client.
//!
//! A [`Transport`] performs exactly two operations: open a download and return
//! its body as an unconsumed [`StreamHandle`], and send an upload whose body is
//! a [`ByteStream`]. [`TransportSet`] picks the transport for each leg from the
//! URL scheme.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use url::Url;

use super::error::TransportError;
use super::request::UploadMethod;
use crate::headers::HeaderMapping;

/// Incrementally consumed response body.
pub type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Wraps an already-buffered block of bytes in a single-item stream.
#[must_use]
pub fn buffered_stream(bytes: Bytes) -> ByteStream {
    stream::once(async move { Ok(bytes) }).boxed()
}

/// Body of a download response as handed over by a transport.
pub enum ResponseBody {
    /// Live stream of bytes still arriving from the source.
    Stream(ByteStream),
    /// Body the transport already read into memory.
    Buffered(Bytes),
    /// Body the transport decoded into structured data; cannot be re-streamed.
    Structured(serde_json::Value),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            Self::Structured(value) => f.debug_tuple("Structured").field(value).finish(),
        }
    }
}

/// Handle over an in-flight download response.
///
/// Status and headers are available before any body byte is read. The handle
/// is consumed by [`into_body`](Self::into_body) and cannot be cloned.
#[derive(Debug)]
pub struct StreamHandle {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl StreamHandle {
    /// Creates a handle from a response's parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status of the download response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers of the download.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Length announced by the `Content-Length` response header.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// Gives up the handle and returns its body.
    #[must_use]
    pub fn into_body(self) -> ResponseBody {
        self.body
    }
}

/// Download leg request.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Source URL.
    pub url: Url,
    /// Effective download headers.
    pub headers: HeaderMapping,
}

/// Upload leg request carrying the streamed body.
pub struct UploadRequest {
    /// Destination URL, sent unmodified.
    pub url: Url,
    /// POST or PUT.
    pub method: UploadMethod,
    /// Effective upload headers.
    pub headers: HeaderMapping,
    /// Body forwarded chunk by chunk as it arrives from the download.
    pub body: ByteStream,
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("url", &self.url.as_str())
            .field("method", &self.method)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Response of the upload leg.
#[derive(Debug, Clone)]
pub struct UploadResponse {
    /// Status reported by the destination; `None` if the transport has none.
    pub status: Option<StatusCode>,
    /// Full response body of the destination.
    pub body: Bytes,
}

impl UploadResponse {
    /// Returns the reported status, defaulting to `200 OK`.
    #[must_use]
    pub fn status_or_ok(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }
}

/// A strategy for performing both HTTP legs.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues the GET for the download leg without consuming the body.
    async fn download(&self, request: DownloadRequest) -> Result<StreamHandle, TransportError>;

    /// Issues the POST/PUT for the upload leg, streaming `request.body`.
    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, TransportError>;
}

/// Transports keyed by URL scheme.
#[derive(Clone)]
pub struct TransportSet {
    http: Arc<dyn Transport>,
    https: Arc<dyn Transport>,
}

impl TransportSet {
    /// Creates a set from one transport per scheme.
    #[must_use]
    pub fn new(http: Arc<dyn Transport>, https: Arc<dyn Transport>) -> Self {
        Self { http, https }
    }

    /// Uses the same transport for both schemes.
    #[must_use]
    pub fn uniform(transport: Arc<dyn Transport>) -> Self {
        Self {
            http: Arc::clone(&transport),
            https: transport,
        }
    }

    /// Returns the transport responsible for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::UnsupportedScheme`] for schemes other than
    /// `http` and `https`.
    pub fn for_url(&self, url: &Url) -> Result<&dyn Transport, TransportError> {
        match url.scheme() {
            "http" => Ok(self.http.as_ref()),
            "https" => Ok(self.https.as_ref()),
            other => Err(TransportError::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }
}

impl fmt::Debug for TransportSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSet").finish_non_exhaustive()
    }
}
