//! Stream Relay Library
//!
//! This library moves a file from a source HTTP(S) URL to a destination URL
//! without materializing it. The download response body is handed, still
//! unread, to the upload request, so memory use is independent of file size.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`headers`] - Header specification normalization
//! - [`credential`] - Bearer token extraction from destination URLs
//! - [`transfer`] - Transfer orchestration, transports and result records
//! - [`failure`] - User-facing classification of transfer failures
//! - [`batch`] - Sequential execution of many transfers

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod credential;
pub mod failure;
pub mod headers;
pub mod transfer;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use batch::{
    BatchAborted, BatchEvent, BatchInputError, BatchOptions, BatchReport, parse_batch_input,
    run_batch,
};
pub use credential::extract_bearer;
pub use failure::{FailureCategory, FailureDescriptor, classify_failure};
pub use headers::{HeaderMapping, HeaderSpec, normalize};
pub use transfer::{
    HttpSettings, OutputRecord, TransferError, TransferOrchestrator, TransferOutcome,
    TransferParams, TransportError, UploadMethod,
};
