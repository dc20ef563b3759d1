//! Effective request headers for both legs of a transfer.

use tracing::debug;

use super::request::TransferRequest;
use crate::credential::extract_bearer;
use crate::headers::{HeaderMapping, contains_header, merge_headers};

/// Default `Accept` value for the download leg.
pub const DEFAULT_ACCEPT: &str = "*/*";

/// Default `Content-Type` value for the upload leg.
pub const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// Headers actually sent on the download and upload legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveHeaders {
    download: HeaderMapping,
    upload: HeaderMapping,
}

impl EffectiveHeaders {
    /// Derives the headers known before the download response arrives.
    ///
    /// Download: `Accept: */*` overridden by caller headers. Upload:
    /// `Content-Type: application/octet-stream` overridden by caller headers,
    /// plus `Authorization: Bearer <token>` when the upload URL carries a
    /// `bearer` query parameter and no `Authorization` header was supplied.
    #[must_use]
    pub fn derive(request: &TransferRequest) -> Self {
        let download = merge_headers(
            HeaderMapping::from([("Accept".to_string(), DEFAULT_ACCEPT.to_string())]),
            request.download_headers(),
        );

        let mut upload = merge_headers(
            HeaderMapping::from([(
                "Content-Type".to_string(),
                DEFAULT_UPLOAD_CONTENT_TYPE.to_string(),
            )]),
            request.upload_headers(),
        );
        if !contains_header(&upload, "Authorization")
            && let Some(token) = extract_bearer(request.upload_url_str())
        {
            debug!("using bearer credential from upload URL");
            upload.insert("Authorization".to_string(), format!("Bearer {token}"));
        }

        Self { download, upload }
    }

    /// Sets the upload `Content-Length` once the download response is known.
    ///
    /// The explicit length wins over the length the source announced. Nothing
    /// is set when the caller already supplied `Content-Length` or when the
    /// resolved length is zero or unknown. Returns the length now in effect.
    pub fn resolve_content_length(
        &mut self,
        explicit: Option<u64>,
        announced: Option<u64>,
    ) -> Option<u64> {
        if let Some(existing) = self
            .upload
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("Content-Length"))
        {
            return existing.1.trim().parse().ok();
        }
        let length = explicit.or(announced).filter(|len| *len > 0)?;
        self.upload
            .insert("Content-Length".to_string(), length.to_string());
        Some(length)
    }

    /// Headers for the download leg.
    #[must_use]
    pub fn download(&self) -> &HeaderMapping {
        &self.download
    }

    /// Headers for the upload leg.
    #[must_use]
    pub fn upload(&self) -> &HeaderMapping {
        &self.upload
    }

    /// Splits into `(download, upload)` mappings.
    #[must_use]
    pub fn into_parts(self) -> (HeaderMapping, HeaderMapping) {
        (self.download, self.upload)
    }
}
