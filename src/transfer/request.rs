//! Transfer parameters and the validated transfer request.
//!
//! [`TransferParams`] is the raw per-invocation input a host supplies, with
//! the field names of the host contract (`downloadUrl`, `uploadUrl`, ...).
//! [`TransferRequest`] is the immutable, validated form the orchestrator
//! works on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::error::{TransferError, TransferLeg};
use crate::headers::{HeaderMapping, HeaderSpec, normalize};

/// HTTP method of the upload leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UploadMethod {
    /// `POST` (default).
    #[default]
    Post,
    /// `PUT`.
    Put,
}

impl UploadMethod {
    /// Canonical upper-case method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }

    /// Returns the corresponding client method.
    #[must_use]
    pub fn as_http(self) -> reqwest::Method {
        match self {
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
        }
    }
}

impl fmt::Display for UploadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a method name is neither POST nor PUT.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported upload method {0:?}; expected POST or PUT")]
pub struct ParseMethodError(String);

impl FromStr for UploadMethod {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("POST") {
            Ok(Self::Post)
        } else if trimmed.eq_ignore_ascii_case("PUT") {
            Ok(Self::Put)
        } else {
            Err(ParseMethodError(s.to_string()))
        }
    }
}

impl TryFrom<String> for UploadMethod {
    type Error = ParseMethodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UploadMethod> for String {
    fn from(method: UploadMethod) -> Self {
        method.as_str().to_string()
    }
}

/// Raw per-invocation transfer parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferParams {
    /// Source URL.
    pub download_url: String,
    /// Destination URL.
    pub upload_url: String,
    /// Upload method (default POST).
    pub method: UploadMethod,
    /// Extra download headers, as text or mapping.
    pub download_headers: HeaderSpec,
    /// Extra upload headers, as text or mapping.
    pub upload_headers: HeaderSpec,
    /// Explicit body length to announce on the upload.
    pub content_length: Option<u64>,
    /// Raise non-2xx and transport failures instead of returning them as data.
    pub throw_on_error: bool,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            download_url: String::new(),
            upload_url: String::new(),
            method: UploadMethod::default(),
            download_headers: HeaderSpec::default(),
            upload_headers: HeaderSpec::default(),
            content_length: None,
            throw_on_error: true,
        }
    }
}

impl TransferParams {
    /// Creates parameters for a POST transfer with default options.
    #[must_use]
    pub fn new(download_url: impl Into<String>, upload_url: impl Into<String>) -> Self {
        Self {
            download_url: download_url.into(),
            upload_url: upload_url.into(),
            ..Self::default()
        }
    }

    /// Sets the upload method.
    #[must_use]
    pub fn method(mut self, method: UploadMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the extra download headers.
    #[must_use]
    pub fn download_headers(mut self, headers: HeaderSpec) -> Self {
        self.download_headers = headers;
        self
    }

    /// Sets the extra upload headers.
    #[must_use]
    pub fn upload_headers(mut self, headers: HeaderSpec) -> Self {
        self.upload_headers = headers;
        self
    }

    /// Sets the explicit content length.
    #[must_use]
    pub fn content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Sets whether recoverable failures are raised.
    #[must_use]
    pub fn throw_on_error(mut self, throw: bool) -> Self {
        self.throw_on_error = throw;
        self
    }
}

/// Validated, immutable description of one transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    download_url: Url,
    upload_url: Url,
    download_url_raw: String,
    upload_url_raw: String,
    method: UploadMethod,
    download_headers: HeaderMapping,
    upload_headers: HeaderMapping,
    content_length: Option<u64>,
    throw_on_error: bool,
}

impl TransferRequest {
    /// Validates parameters and normalizes header input.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::MissingUrl`] when either URL is blank and
    /// [`TransferError::InvalidUrl`] when it does not parse as an `http` or
    /// `https` URL.
    pub fn new(params: &TransferParams) -> Result<Self, TransferError> {
        let download_url_raw = params.download_url.trim().to_string();
        let upload_url_raw = params.upload_url.trim().to_string();
        if download_url_raw.is_empty() {
            return Err(TransferError::MissingUrl {
                leg: TransferLeg::Download,
            });
        }
        if upload_url_raw.is_empty() {
            return Err(TransferError::MissingUrl {
                leg: TransferLeg::Upload,
            });
        }

        Ok(Self {
            download_url: parse_http_url(&download_url_raw, TransferLeg::Download)?,
            upload_url: parse_http_url(&upload_url_raw, TransferLeg::Upload)?,
            download_url_raw,
            upload_url_raw,
            method: params.method,
            download_headers: normalize(&params.download_headers),
            upload_headers: normalize(&params.upload_headers),
            content_length: params.content_length,
            throw_on_error: params.throw_on_error,
        })
    }

    /// Parsed source URL.
    #[must_use]
    pub fn download_url(&self) -> &Url {
        &self.download_url
    }

    /// Parsed destination URL.
    #[must_use]
    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    /// Source URL as supplied by the caller (trimmed).
    #[must_use]
    pub fn download_url_str(&self) -> &str {
        &self.download_url_raw
    }

    /// Destination URL as supplied by the caller (trimmed).
    #[must_use]
    pub fn upload_url_str(&self) -> &str {
        &self.upload_url_raw
    }

    /// Upload method.
    #[must_use]
    pub fn method(&self) -> UploadMethod {
        self.method
    }

    /// Normalized caller-supplied download headers.
    #[must_use]
    pub fn download_headers(&self) -> &HeaderMapping {
        &self.download_headers
    }

    /// Normalized caller-supplied upload headers.
    #[must_use]
    pub fn upload_headers(&self) -> &HeaderMapping {
        &self.upload_headers
    }

    /// Explicit content length, if any.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Whether recoverable failures are raised.
    #[must_use]
    pub fn throw_on_error(&self) -> bool {
        self.throw_on_error
    }
}

impl TryFrom<TransferParams> for TransferRequest {
    type Error = TransferError;

    fn try_from(params: TransferParams) -> Result<Self, Self::Error> {
        Self::new(&params)
    }
}

fn parse_http_url(raw: &str, leg: TransferLeg) -> Result<Url, TransferError> {
    let url = Url::parse(raw).map_err(|e| TransferError::InvalidUrl {
        leg,
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TransferError::InvalidUrl {
            leg,
            url: raw.to_string(),
            reason: format!("unsupported scheme {other:?}; expected http or https"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upload_method_parse_case_insensitive() {
        assert_eq!("post".parse::<UploadMethod>().unwrap(), UploadMethod::Post);
        assert_eq!("PUT".parse::<UploadMethod>().unwrap(), UploadMethod::Put);
        assert_eq!(" Put ".parse::<UploadMethod>().unwrap(), UploadMethod::Put);
        assert!("PATCH".parse::<UploadMethod>().is_err());
    }

    #[test]
    fn test_params_defaults() {
        let params = TransferParams::default();
        assert_eq!(params.method, UploadMethod::Post);
        assert!(params.throw_on_error);
        assert_eq!(params.content_length, None);
    }

    #[test]
    fn test_params_deserialize_host_field_names() {
        let params: TransferParams = serde_json::from_value(json!({
            "downloadUrl": "https://src.example/a.bin",
            "uploadUrl": "https://dst.example/up",
            "method": "PUT",
            "downloadHeaders": "{\"X-A\": \"1\"}",
            "uploadHeaders": {"X-B": 2},
            "contentLength": 10,
            "throwOnError": false
        }))
        .unwrap();

        assert_eq!(params.method, UploadMethod::Put);
        assert_eq!(params.content_length, Some(10));
        assert!(!params.throw_on_error);
        assert!(matches!(params.download_headers, HeaderSpec::Text(_)));
        assert!(matches!(params.upload_headers, HeaderSpec::Map(_)));
    }

    #[test]
    fn test_params_deserialize_defaults_when_fields_absent() {
        let params: TransferParams =
            serde_json::from_value(json!({"downloadUrl": "http://a", "uploadUrl": "http://b"}))
                .unwrap();
        assert!(params.throw_on_error);
        assert_eq!(params.method, UploadMethod::Post);
    }

    #[test]
    fn test_params_reject_negative_content_length() {
        let result: Result<TransferParams, _> = serde_json::from_value(json!({
            "downloadUrl": "http://a", "uploadUrl": "http://b", "contentLength": -1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_request_blank_urls_rejected() {
        for (download, upload, expected) in [
            ("", "http://dst", "Download URL is required"),
            ("   ", "http://dst", "Download URL is required"),
            ("http://src", "", "Upload URL is required"),
            ("http://src", "\t\n", "Upload URL is required"),
        ] {
            let error = TransferRequest::new(&TransferParams::new(download, upload)).unwrap_err();
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_request_blank_urls_rejected_regardless_of_throw_flag() {
        let params = TransferParams::new("", "http://dst").throw_on_error(false);
        assert!(matches!(
            TransferRequest::new(&params),
            Err(TransferError::MissingUrl {
                leg: TransferLeg::Download
            })
        ));
    }

    #[test]
    fn test_request_invalid_url_rejected() {
        let error =
            TransferRequest::new(&TransferParams::new("not a url", "http://dst")).unwrap_err();
        assert!(matches!(
            error,
            TransferError::InvalidUrl {
                leg: TransferLeg::Download,
                ..
            }
        ));
    }

    #[test]
    fn test_request_unsupported_scheme_rejected() {
        let error =
            TransferRequest::new(&TransferParams::new("http://src", "ftp://dst/file")).unwrap_err();
        let msg = error.to_string();
        assert!(msg.contains("unsupported scheme"), "{msg}");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_request_normalizes_headers_and_keeps_raw_urls() {
        let params = TransferParams::new(" https://src.example ", "https://dst.example/up?bearer=t")
            .download_headers(HeaderSpec::text("{broken"))
            .upload_headers(HeaderSpec::text(r#"{"X-Up": "1"}"#));
        let request = TransferRequest::new(&params).unwrap();

        assert_eq!(request.download_url_str(), "https://src.example");
        assert_eq!(request.upload_url_str(), "https://dst.example/up?bearer=t");
        assert!(request.download_headers().is_empty());
        assert_eq!(
            request.upload_headers().get("X-Up").map(String::as_str),
            Some("1")
        );
    }
}
