// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scan-Lite CLI - architectural feature extraction from scans and models.
//!
//! Reads one JSON request (or a JSON array of requests) from the file named
//! by the first argument, or from stdin, and prints one JSON response (or an
//! array in the same order) to stdout. Logs go to stderr.
//!
//! # Operations
//!
//! - `info` - point count, bounds and attributes of a point cloud
//! - `downsample` - voxel grid down-sampling into a new file
//! - `segment_planes` - RANSAC floors, ceilings and walls
//! - `extract_floors` - story elevations from horizontal points
//! - `section` - horizontal or vertical section cut to SVG / DXF
//!
//! ```text
//! echo '{"operation":"info","file_path":"scan.ply"}' | scan-lite
//! ```

use anyhow::Context;
use rayon::prelude::*;
use serde_json::Value;
use std::io::{Read, Write};
use std::process::ExitCode;

mod config;
mod error;
mod ops;
mod types;

use config::{Config, LogFormat};
use error::CliError;
use types::{Output, Reply, Request};

fn init_tracing(config: &Config) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .with_writer(std::io::stderr);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

fn read_input(path: Option<String>) -> anyhow::Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read request file {}", path))
        }
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read request from stdin")?;
            Ok(input)
        }
    }
}

fn handle(value: Value) -> Reply {
    let outcome = Request::from_value(value).and_then(|request| ops::run(&request));
    if let Err(err) = &outcome {
        tracing::warn!(code = err.code(), error = %err, "Request failed");
    }
    Reply::from(outcome)
}

fn main() -> anyhow::Result<ExitCode> {
    let config = Config::from_env();
    init_tracing(&config);

    tracing::debug!(
        worker_threads = config.worker_threads,
        log_format = ?config.log_format,
        "Starting scan-lite"
    );

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("Failed to initialize rayon thread pool")?;

    let input = read_input(std::env::args().nth(1))?;
    let output = match serde_json::from_str::<Value>(&input) {
        Ok(Value::Array(requests)) => Output::Batch(requests.into_par_iter().map(handle).collect()),
        Ok(value) => Output::Single(handle(value)),
        Err(err) => Output::Single(Reply::Err(CliError::from(err).to_response())),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer(&mut out, &output).context("Failed to write response")?;
    writeln!(out).context("Failed to write response")?;

    Ok(if output.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
