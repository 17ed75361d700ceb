//! Face blur worker binary.
//!
//! Reads one handler event as JSON from the file named by the first argument,
//! or from stdin, and prints the handler response as JSON.

use std::process::ExitCode;

use anyhow::Context;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use faceblur_models::HandlerResponse;
use faceblur_worker::{dispatch, parse_event, DefaultProcessor, WorkerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    // Logs go to stderr so stdout carries only the response.
    let env_filter = EnvFilter::from_default_env().add_directive("faceblur=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true),
            )
            .with(env_filter)
            .init();
    }

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Worker failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Handle one event; `Ok(false)` when a failure response was printed.
async fn run() -> anyhow::Result<bool> {
    let raw = match std::env::args().nth(1) {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading event from {}", path))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("reading event from stdin")?;
            buf
        }
    };
    let event = match parse_event(&raw) {
        Ok(event) => event,
        Err(response) => return respond(&response),
    };

    let config = WorkerConfig::from_env();
    info!(action = event.action(), "Starting faceblur-worker");

    let processor = match DefaultProcessor::from_env(config).await {
        Ok(processor) => processor,
        Err(e) => {
            error!("Cannot create processor: {}", e);
            return respond(&HandlerResponse::error(e.to_string()));
        }
    };
    let response = dispatch(&processor, &event).await;

    respond(&response)
}

fn respond(response: &HandlerResponse) -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string(response)?);
    Ok(response.is_success())
}
