//! CLI entry point for the stream-relay tool.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use stream_relay::{
    BatchEvent, BatchOptions, HeaderSpec, TransferError, TransferOrchestrator, TransferParams,
    classify_failure, parse_batch_input, run_batch,
};
use tracing::{debug, info};

mod app_config;
mod cli;
mod exit_handler;
mod progress;

use app_config::{FileConfig, load_config};
use cli::{Args, BatchArgs, Command, TransferArgs};
use exit_handler::{ProcessExit, determine_exit_outcome};
use progress::BatchProgress;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries result records only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(exit) => exit.into(),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: Args) -> Result<ProcessExit> {
    let loaded = load_config(args.config.as_deref())?;
    if loaded.loaded_from_file {
        debug!(path = ?loaded.path, "Loaded config file");
    }

    let settings = loaded.config.http_settings();
    let orchestrator =
        TransferOrchestrator::with_settings(&settings).context("Failed to build HTTP clients")?;

    match args.command {
        Command::Transfer(transfer) => run_transfer(&orchestrator, &transfer, &loaded.config).await,
        Command::Batch(batch) => {
            let show_spinner = !args.quiet && io::stderr().is_terminal();
            run_batch_command(&orchestrator, &batch, &loaded.config, show_spinner).await
        }
    }
}

async fn run_transfer(
    orchestrator: &TransferOrchestrator,
    args: &TransferArgs,
    config: &FileConfig,
) -> Result<ProcessExit> {
    let throw_on_error = args
        .throw_on_error()
        .or(config.throw_on_error)
        .unwrap_or(true);

    let mut params = TransferParams::new(args.download_url.as_str(), args.upload_url.as_str())
        .method(args.method)
        .throw_on_error(throw_on_error);
    if let Some(headers) = &args.download_headers {
        params = params.download_headers(HeaderSpec::text(headers.as_str()));
    }
    if let Some(headers) = &args.upload_headers {
        params = params.upload_headers(HeaderSpec::text(headers.as_str()));
    }
    if let Some(length) = args.content_length {
        params = params.content_length(length);
    }

    match orchestrator.execute(&params).await {
        Ok(outcome) => {
            let exit = if outcome.is_success() {
                ProcessExit::Success
            } else {
                ProcessExit::Partial
            };
            print_json(&outcome.into_record())?;
            Ok(exit)
        }
        Err(error) => {
            report_failure(&error);
            Ok(ProcessExit::Failure)
        }
    }
}

async fn run_batch_command(
    orchestrator: &TransferOrchestrator,
    args: &BatchArgs,
    config: &FileConfig,
    show_spinner: bool,
) -> Result<ProcessExit> {
    let raw = read_batch_input(&args.input)?;
    let items = parse_batch_input(&raw)?;
    let options = BatchOptions {
        continue_on_fail: args.continue_on_fail || config.continue_on_fail.unwrap_or(false),
    };
    info!(
        items = items.len(),
        continue_on_fail = options.continue_on_fail,
        "Starting batch"
    );

    let mut progress = BatchProgress::start(show_spinner, items.len());
    let result = run_batch(orchestrator, items, options, |event| match event {
        BatchEvent::Started { index, item } => progress.begin_item(index, item),
        BatchEvent::Finished { index, record } => progress.finish_item(index, record.success),
    })
    .await;
    progress.finish();

    match result {
        Ok(report) => {
            print_json(report.records())?;
            Ok(determine_exit_outcome(report.succeeded(), report.failed()))
        }
        Err(aborted) => {
            print_json(&aborted.records)?;
            eprintln!("Batch aborted at item {}.", aborted.index);
            report_failure(&aborted.source);
            Ok(ProcessExit::Failure)
        }
    }
}

fn read_batch_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read batch input from stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(input)
            .with_context(|| format!("Failed to read batch input file '{input}'"))
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).context("Failed to serialize result record")?;
    println!("{rendered}");
    Ok(())
}

fn report_failure(error: &TransferError) {
    let descriptor = classify_failure(error);
    eprintln!(
        "{} {} failure: {error}",
        descriptor.category.icon(),
        descriptor.category.label()
    );
    eprintln!("  What: {}", descriptor.what);
    eprintln!("  Why:  {}", descriptor.why);
    eprintln!("  Fix:  {}", descriptor.fix);
}
