//! Streaming transfer pipeline.
//!
//! A transfer opens a GET against the source, checks its status, and hands the
//! still-unread response body to a POST or PUT against the destination. Bytes
//! are forwarded as they arrive, so memory use stays bounded by the client's
//! buffers whatever the size of the file.
//!
//! # Outcomes
//!
//! - Both legs 2xx: [`TransferOutcome::Success`].
//! - Non-2xx or transport fault with `throw_on_error == false`:
//!   [`TransferOutcome::SoftFailure`], returned as data.
//! - Everything else: `Err(TransferError)`.
//!
//! A failed download never reaches the upload leg, so no partial body is sent.
//!
//! # Example
//!
//! ```no_run
//! use stream_relay::transfer::{HttpSettings, TransferOrchestrator, TransferParams};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = TransferOrchestrator::with_settings(&HttpSettings::default())?;
//! let params = TransferParams::new(
//!     "https://files.example.com/report.pdf",
//!     "https://uploads.example.com/inbox?bearer=token",
//! )
//! .throw_on_error(false);
//!
//! let record = orchestrator.execute(&params).await?.into_record();
//! println!("{}", serde_json::to_string(&record)?);
//! # Ok(())
//! # }
//! ```

mod effective;
mod error;
mod http;
mod orchestrator;
mod outcome;
mod request;
mod transport;

pub use effective::{DEFAULT_ACCEPT, DEFAULT_UPLOAD_CONTENT_TYPE, EffectiveHeaders};
pub use error::{CONTENT_PREVIEW_CHARS, TransferError, TransferLeg, TransportError};
pub use http::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_REDIRECTS, HttpSettings, READ_TIMEOUT_SECS,
    ReqwestTransport, Scheme,
};
pub use orchestrator::TransferOrchestrator;
pub use outcome::{
    OutputRecord, SoftFailure, TransferOutcome, TransferSuccess, assemble, interpret_upload_body,
};
pub use request::{ParseMethodError, TransferParams, TransferRequest, UploadMethod};
pub use transport::{
    ByteStream, DownloadRequest, ResponseBody, StreamHandle, Transport, TransportSet,
    UploadRequest, UploadResponse, buffered_stream,
};
