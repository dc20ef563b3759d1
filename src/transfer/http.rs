//! reqwest-backed transports.
//!
//! One [`ReqwestTransport`] exists per URL scheme. Each holds two clients.
//! The download client follows redirects up to the configured limit and
//! enforces the per-read idle timeout. The upload client follows no redirects,
//! since a streamed body cannot be replayed, and has no read timeout: the
//! response read stays pending while the body is still being written, so an
//! idle limit there would cut off long uploads that are still moving. A
//! stalled source still fails the upload through the download stream.
//! Neither client decodes content, so the upload receives the source's bytes
//! exactly as they came off the wire.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Body, Client};
use tracing::{debug, instrument};
use url::Url;

use super::error::TransportError;
use super::transport::{
    DownloadRequest, ResponseBody, StreamHandle, Transport, TransportSet, UploadRequest,
    UploadResponse,
};
use crate::headers::HeaderMapping;
use crate::user_agent;

/// Default connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-read idle timeout (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default redirect limit for the download leg.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Client settings shared by both transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Longest pause allowed between two reads of the download body; there is
    /// no whole-request deadline.
    pub read_timeout: Duration,
    /// Redirects followed on the download leg; 0 disables following.
    pub max_redirects: usize,
    /// User-Agent sent unless a request overrides it.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: user_agent::default_user_agent(),
        }
    }
}

/// URL scheme served by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain `http`.
    Http,
    /// TLS `https`.
    Https,
}

impl Scheme {
    /// Scheme name as it appears in URLs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// HTTP transport for a single scheme.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    scheme: Scheme,
    download_client: Client,
    upload_client: Client,
}

impl ReqwestTransport {
    /// Creates the plain-HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the client cannot be built.
    pub fn http(settings: &HttpSettings) -> Result<Self, TransportError> {
        Self::build(Scheme::Http, settings)
    }

    /// Creates the HTTPS transport. Its clients refuse non-TLS connections,
    /// including redirects to `http` URLs.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the client cannot be built.
    pub fn https(settings: &HttpSettings) -> Result<Self, TransportError> {
        Self::build(Scheme::Https, settings)
    }

    fn build(scheme: Scheme, settings: &HttpSettings) -> Result<Self, TransportError> {
        let download_policy = if settings.max_redirects == 0 {
            Policy::none()
        } else {
            Policy::limited(settings.max_redirects)
        };
        let download_client =
            build_client(scheme, settings, download_policy, Some(settings.read_timeout))
                .map_err(|source| TransportError::Client {
                    scheme: scheme.as_str(),
                    source,
                })?;
        let upload_client =
            build_client(scheme, settings, Policy::none(), None).map_err(|source| {
                TransportError::Client {
                    scheme: scheme.as_str(),
                    source,
                }
            })?;
        Ok(Self {
            scheme,
            download_client,
            upload_client,
        })
    }

    /// Scheme this transport serves.
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    fn ensure_scheme(&self, url: &Url) -> Result<(), TransportError> {
        if url.scheme() == self.scheme.as_str() {
            Ok(())
        } else {
            Err(TransportError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            })
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(level = "debug", skip(self, request), fields(url = %request.url))]
    async fn download(&self, request: DownloadRequest) -> Result<StreamHandle, TransportError> {
        self.ensure_scheme(&request.url)?;
        let headers = to_header_map(&request.headers)?;

        let response = self
            .download_client
            .get(request.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| TransportError::from_send(request.url.as_str(), e))?;

        let status = response.status();
        let headers = response.headers().clone();
        debug!(status = status.as_u16(), final_url = %response.url(), "download response received");

        let body = response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed();
        Ok(StreamHandle::new(status, headers, ResponseBody::Stream(body)))
    }

    #[instrument(level = "debug", skip(self, request), fields(url = %request.url, method = %request.method))]
    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, TransportError> {
        self.ensure_scheme(&request.url)?;
        let headers = to_header_map(&request.headers)?;

        let response = self
            .upload_client
            .request(request.method.as_http(), request.url.clone())
            .headers(headers)
            .body(Body::wrap_stream(request.body))
            .send()
            .await
            .map_err(|e| TransportError::from_send(request.url.as_str(), e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "upload response received");
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_send(request.url.as_str(), e))?;

        Ok(UploadResponse {
            status: Some(status),
            body,
        })
    }
}

impl TransportSet {
    /// Builds the http and https transports from shared settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if either client cannot be built.
    pub fn from_settings(settings: &HttpSettings) -> Result<Self, TransportError> {
        Ok(Self::new(
            Arc::new(ReqwestTransport::http(settings)?),
            Arc::new(ReqwestTransport::https(settings)?),
        ))
    }
}

fn build_client(
    scheme: Scheme,
    settings: &HttpSettings,
    redirect: Policy,
    read_timeout: Option<Duration>,
) -> Result<Client, reqwest::Error> {
    let builder = Client::builder()
        .connect_timeout(settings.connect_timeout)
        .user_agent(settings.user_agent.clone())
        .redirect(redirect)
        .https_only(scheme == Scheme::Https);
    match read_timeout {
        Some(timeout) => builder.read_timeout(timeout),
        None => builder,
    }
    .build()
}

fn to_header_map(headers: &HeaderMapping) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = || TransportError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
