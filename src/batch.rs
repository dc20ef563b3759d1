//! Sequential batch execution of transfer parameter sets.
//!
//! Batch input is a JSON array of parameter objects (a single object is
//! accepted as a one-item batch). Items run one after another against a
//! shared [`TransferOrchestrator`] and each produces one [`OutputRecord`].
//!
//! Soft failures are ordinary records. A raised failure either aborts the
//! batch or, with [`BatchOptions::continue_on_fail`], is converted into an
//! error record carrying the failure message and the item's URLs.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::transfer::{OutputRecord, TransferError, TransferOrchestrator, TransferParams};

/// Errors raised while reading batch input.
#[derive(Debug, Error)]
pub enum BatchInputError {
    /// The input is not valid JSON.
    #[error("batch input is not valid JSON: {0}")]
    Json(serde_json::Error),

    /// The input is JSON but neither an array nor an object.
    #[error("batch input must be a JSON array of parameter objects, found {found}")]
    Shape {
        /// JSON kind that was found instead.
        found: &'static str,
    },
}

/// Options controlling batch execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Convert raised failures into error records instead of aborting.
    pub continue_on_fail: bool,
}

/// Result of a batch that ran to completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    records: Vec<OutputRecord>,
}

impl BatchReport {
    /// Records in input order.
    #[must_use]
    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    /// Consumes the report, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<OutputRecord> {
        self.records
    }

    /// Number of records with `success == true`.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.success).count()
    }

    /// Number of records with `success == false`.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.records.len() - self.succeeded()
    }
}

/// Progress notification passed to the [`run_batch`] observer.
#[derive(Debug, Clone, Copy)]
pub enum BatchEvent<'a> {
    /// An item is about to run.
    Started {
        /// Zero-based item index.
        index: usize,
        /// The raw item.
        item: &'a Value,
    },
    /// An item produced its record.
    Finished {
        /// Zero-based item index.
        index: usize,
        /// The item's record.
        record: &'a OutputRecord,
    },
}

/// A batch stopped by a raised failure.
#[derive(Debug, Error)]
#[error("batch aborted at item {index}: {source}")]
pub struct BatchAborted {
    /// Zero-based index of the failing item.
    pub index: usize,
    /// Records produced before the failure.
    pub records: Vec<OutputRecord>,
    /// The failure that stopped the batch.
    #[source]
    pub source: TransferError,
}

/// Parses batch input into raw parameter items.
///
/// # Errors
///
/// Returns [`BatchInputError`] when the input is not JSON, or is JSON other
/// than an array or object.
pub fn parse_batch_input(raw: &str) -> Result<Vec<Value>, BatchInputError> {
    let value: Value = serde_json::from_str(raw).map_err(BatchInputError::Json)?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(_) => Ok(vec![value]),
        other => Err(BatchInputError::Shape {
            found: json_kind(&other),
        }),
    }
}

/// Runs each item in order, reporting each start and record to `observer`.
///
/// # Errors
///
/// Returns [`BatchAborted`] on the first raised failure unless
/// `options.continue_on_fail` is set.
pub async fn run_batch<F>(
    orchestrator: &TransferOrchestrator,
    items: Vec<Value>,
    options: BatchOptions,
    mut observer: F,
) -> Result<BatchReport, BatchAborted>
where
    F: FnMut(BatchEvent<'_>),
{
    let total = items.len();
    let mut records = Vec::with_capacity(total);

    for (index, item) in items.into_iter().enumerate() {
        let (download_url, upload_url) = item_urls(&item);
        debug!(index, total, "running batch item");
        observer(BatchEvent::Started {
            index,
            item: &item,
        });

        let result = match decode_params(item) {
            Ok(params) => orchestrator.execute(&params).await,
            Err(error) => Err(error),
        };

        let record = match result {
            Ok(outcome) => outcome.into_record(),
            Err(error) if options.continue_on_fail => {
                warn!(index, error = %error, "batch item failed; continuing");
                OutputRecord::from_hard_failure(&error, download_url, upload_url)
            }
            Err(source) => {
                warn!(index, error = %source, "batch item failed; aborting");
                return Err(BatchAborted {
                    index,
                    records,
                    source,
                });
            }
        };

        observer(BatchEvent::Finished {
            index,
            record: &record,
        });
        records.push(record);
    }

    let report = BatchReport { records };
    info!(
        total,
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch complete"
    );
    Ok(report)
}

fn decode_params(item: Value) -> Result<TransferParams, TransferError> {
    serde_json::from_value(item).map_err(|e| TransferError::InvalidParams {
        message: e.to_string(),
    })
}

fn item_urls(item: &Value) -> (String, String) {
    let field = |name: &str| {
        item.get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string()
    };
    (field("downloadUrl"), field("uploadUrl"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
