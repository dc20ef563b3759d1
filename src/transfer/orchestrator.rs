//! The transfer pipeline: download, validate, upload, validate, report.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::effective::EffectiveHeaders;
use super::error::{TransferError, TransportError};
use super::http::HttpSettings;
use super::outcome::{SoftFailure, TransferOutcome, TransferSuccess, interpret_upload_body};
use super::request::{TransferParams, TransferRequest};
use super::transport::{
    ByteStream, DownloadRequest, ResponseBody, TransportSet, UploadRequest, buffered_stream,
};

/// Runs single source-to-destination transfers.
///
/// The orchestrator holds no per-transfer state; one instance can serve any
/// number of sequential or concurrent transfers.
#[derive(Debug, Clone)]
pub struct TransferOrchestrator {
    transports: TransportSet,
}

impl TransferOrchestrator {
    /// Creates an orchestrator over the given transports.
    #[must_use]
    pub fn new(transports: TransportSet) -> Self {
        Self { transports }
    }

    /// Creates an orchestrator with reqwest transports built from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if an HTTP client cannot be built.
    pub fn with_settings(settings: &HttpSettings) -> Result<Self, TransportError> {
        Ok(Self::new(TransportSet::from_settings(settings)?))
    }

    /// Validates raw parameters and runs the transfer.
    ///
    /// # Errors
    ///
    /// See [`transfer`](Self::transfer). Validation errors are raised whatever
    /// the value of `throw_on_error`.
    pub async fn execute(&self, params: &TransferParams) -> Result<TransferOutcome, TransferError> {
        let request = TransferRequest::new(params)?;
        self.transfer(&request).await
    }

    /// Streams the download body of `request` into its upload.
    ///
    /// Returns [`TransferOutcome::Success`] when both legs answer 2xx. A
    /// non-2xx status or transport fault on either leg becomes
    /// [`TransferOutcome::SoftFailure`] when `throw_on_error` is false.
    ///
    /// # Errors
    ///
    /// Returns the [`TransferError`] for every other failure, and for
    /// recoverable failures when `throw_on_error` is true.
    #[instrument(
        skip_all,
        fields(
            download = %loggable(request.download_url()),
            upload = %loggable(request.upload_url()),
            method = %request.method(),
        )
    )]
    pub async fn transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferOutcome, TransferError> {
        match self.run(request).await {
            Ok(success) => Ok(TransferOutcome::Success(success)),
            Err(error) if error.is_recoverable() && !request.throw_on_error() => {
                warn!(error = %error, "transfer failed; reporting as soft failure");
                Ok(TransferOutcome::SoftFailure(SoftFailure::from_error(
                    &error, request,
                )))
            }
            Err(error) => Err(error),
        }
    }

    async fn run(&self, request: &TransferRequest) -> Result<TransferSuccess, TransferError> {
        let download_url = request.download_url_str();
        let upload_url = request.upload_url_str();
        let transport_error = |source: TransportError, download_status: Option<u16>| {
            TransferError::transport(source, download_url, upload_url, download_status)
        };

        let mut headers = EffectiveHeaders::derive(request);
        debug!(
            download_headers = ?headers.download().keys().collect::<Vec<_>>(),
            upload_headers = ?headers.upload().keys().collect::<Vec<_>>(),
            "derived effective headers"
        );

        let handle = self
            .transports
            .for_url(request.download_url())
            .map_err(|e| transport_error(e, None))?
            .download(DownloadRequest {
                url: request.download_url().clone(),
                headers: headers.download().clone(),
            })
            .await
            .map_err(|e| transport_error(e, None))?;

        let download_status = handle.status();
        if !download_status.is_success() {
            return Err(TransferError::download_status(download_url, download_status));
        }

        let content_length =
            headers.resolve_content_length(request.content_length(), handle.content_length());
        debug!(
            status = download_status.as_u16(),
            content_length, "download stream opened"
        );

        let body = into_byte_stream(handle.into_body())?;
        let forwarded = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&forwarded);
        let body = body
            .inspect_ok(move |chunk| {
                counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
            })
            .boxed();

        let (_, upload_headers) = headers.into_parts();
        let response = self
            .transports
            .for_url(request.upload_url())
            .map_err(|e| transport_error(e, Some(download_status.as_u16())))?
            .upload(UploadRequest {
                url: request.upload_url().clone(),
                method: request.method(),
                headers: upload_headers,
                body,
            })
            .await
            .map_err(|e| transport_error(e, Some(download_status.as_u16())))?;

        let upload_status = response.status_or_ok();
        if !upload_status.is_success() {
            return Err(TransferError::upload_status(
                upload_url,
                upload_status,
                download_status,
            ));
        }

        info!(
            bytes = forwarded.load(Ordering::Relaxed),
            download_status = download_status.as_u16(),
            upload_status = upload_status.as_u16(),
            "transfer complete"
        );

        Ok(TransferSuccess {
            download_status: download_status.as_u16(),
            upload_status: upload_status.as_u16(),
            upload_response: interpret_upload_body(&response.body),
        })
    }
}

/// Turns a download body into a stream the upload can consume.
fn into_byte_stream(body: ResponseBody) -> Result<ByteStream, TransferError> {
    match body {
        ResponseBody::Stream(stream) => Ok(stream),
        ResponseBody::Buffered(bytes) => Ok(buffered_stream(bytes)),
        ResponseBody::Structured(value) => Err(TransferError::stream_shape(&value)),
    }
}

/// URL without its query string, so embedded credentials stay out of logs.
fn loggable(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
