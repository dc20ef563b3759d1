//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stream_relay::UploadMethod;

/// Stream a file from one HTTP(S) URL to another without buffering it.
///
/// Stream Relay opens the source with GET and forwards the response body,
/// chunk by chunk, as the body of a POST or PUT to the destination.
#[derive(Parser, Debug)]
#[command(name = "stream-relay")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (defaults to $XDG_CONFIG_HOME/stream-relay/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single transfer and print its result record as JSON
    Transfer(TransferArgs),
    /// Run a JSON array of transfers sequentially
    Batch(BatchArgs),
}

#[derive(clap::Args, Debug)]
pub struct TransferArgs {
    /// Source URL (http or https)
    #[arg(short = 'd', long)]
    pub download_url: String,

    /// Destination URL; a `bearer` query parameter becomes an Authorization header
    #[arg(short = 'u', long)]
    pub upload_url: String,

    /// Upload method (POST or PUT)
    #[arg(short = 'm', long, default_value = "POST")]
    pub method: UploadMethod,

    /// Extra download headers as a JSON object
    #[arg(long, value_name = "JSON")]
    pub download_headers: Option<String>,

    /// Extra upload headers as a JSON object
    #[arg(long, value_name = "JSON")]
    pub upload_headers: Option<String>,

    /// Content-Length to announce on the upload when the source does not send one
    #[arg(long, value_name = "BYTES")]
    pub content_length: Option<u64>,

    /// Report HTTP and network failures as a result record instead of an error
    #[arg(long, conflicts_with = "throw")]
    pub no_throw: bool,

    /// Raise HTTP and network failures as errors (default)
    #[arg(long)]
    pub throw: bool,
}

impl TransferArgs {
    /// Explicit `throw_on_error` choice, if either flag was given.
    #[must_use]
    pub fn throw_on_error(&self) -> Option<bool> {
        if self.no_throw {
            Some(false)
        } else if self.throw {
            Some(true)
        } else {
            None
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct BatchArgs {
    /// JSON file of transfer parameters, or `-` for stdin
    #[arg(default_value = "-")]
    pub input: String,

    /// Record hard failures and keep going instead of aborting
    #[arg(long)]
    pub continue_on_fail: bool,
}
