//! Progress UI (spinner) for batch runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use url::Url;

/// Spinner reporting `[done/total]` while a batch runs.
///
/// A hidden spinner is used when `enabled` is false so callers never branch.
pub(crate) struct BatchProgress {
    spinner: ProgressBar,
    total: usize,
    failed: usize,
}

impl BatchProgress {
    pub(crate) fn start(enabled: bool, total: usize) -> Self {
        let spinner = if enabled {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        } else {
            ProgressBar::hidden()
        };
        let progress = Self {
            spinner,
            total,
            failed: 0,
        };
        progress.spinner.set_message(progress.message(0, None));
        progress
    }

    /// Announces the item about to run.
    pub(crate) fn begin_item(&self, index: usize, item: &Value) {
        let host = item
            .get("downloadUrl")
            .and_then(Value::as_str)
            .and_then(|raw| Url::parse(raw.trim()).ok())
            .and_then(|url| url.host_str().map(str::to_string));
        self.spinner.set_message(self.message(index, host.as_deref()));
    }

    /// Records a finished item.
    pub(crate) fn finish_item(&mut self, index: usize, success: bool) {
        if !success {
            self.failed += 1;
        }
        self.spinner.set_message(self.message(index + 1, None));
    }

    pub(crate) fn finish(self) {
        self.spinner.finish_and_clear();
    }

    fn message(&self, done: usize, host: Option<&str>) -> String {
        let current = if host.is_some() {
            done.saturating_add(1)
        } else {
            done
        };
        let mut message = format!("[{}/{}] ", current.min(self.total), self.total);
        match host {
            Some(host) => message.push_str(&format!("Relaying from {host}...")),
            None => message.push_str("Relaying..."),
        }
        if self.failed > 0 {
            message.push_str(&format!(" ({} failed)", self.failed));
        }
        message
    }
}
