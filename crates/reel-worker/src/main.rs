//! Promo reel generation binary.
//!
//! Usage: `reel-worker <request.json> [session_id]` renders one request and
//! prints the result as JSON; `reel-worker --schema` prints the request
//! JSON schema.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_models::{GenerationRequest, SessionId};
use reel_worker::{VideoGenerator, WorkerConfig};

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("reel_worker=info".parse()?)
        .add_directive("reel_media=info".parse()?);

    // Logs go to stderr; stdout carries the result JSON.
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
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let mut args = std::env::args().skip(1);
    let Some(first) = args.next() else {
        anyhow::bail!("usage: reel-worker <request.json> [session_id] | --schema");
    };

    if first == "--schema" {
        let schema = schemars::schema_for!(GenerationRequest);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let raw = tokio::fs::read_to_string(&first)
        .await
        .with_context(|| format!("failed to read request {}", first))?;
    let mut request: GenerationRequest =
        serde_json::from_str(&raw).with_context(|| format!("invalid request JSON in {}", first))?;
    request.images = request.images.into_iter().map(|image| image.resolved()).collect();

    let session_id = args.next().map(SessionId::from_string).unwrap_or_default();

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let generator =
        Arc::new(VideoGenerator::from_config(&config).context("failed to build generator")?);

    let signal_generator = Arc::clone(&generator);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_generator.cancel();
        }
    });

    let result = generator.generate(&request, &session_id).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
