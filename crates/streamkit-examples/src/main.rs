//! Demo pipeline: a ticker feeding a log sink, plus live reconfiguration
//! and introspection of a gethttp block.
//!
//! Run with `STREAMKIT_LOG_LEVEL=info` (the default) to watch the ticks
//! land in the log.

use std::time::Duration;

use serde_json::json;
use streamkit_blocks::build_library;
use streamkit_core::{connect, init_observability, spawn_type, stop_all};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_observability();
    build_library();

    // ticker -> tolog: every tick lands in the log
    let ticker = spawn_type("ticker", "tick-1")?;
    let logsink = spawn_type("tolog", "log-1")?;
    connect(&ticker, &logsink, "in")?;
    ticker.send_rule(json!({ "Interval": "500ms" })).await?;

    // a gethttp block, reconfigured and introspected while it runs
    let fetcher = spawn_type("gethttp", "http-1")?;
    fetcher
        .send_rule(json!({ "Path": "data.url", "Header": "Accept:application/json" }))
        .await?;
    let config = fetcher.query("rule").await?;
    println!("{} ({}): {config}", fetcher.name(), fetcher.kind());

    tokio::time::sleep(Duration::from_secs(2)).await;

    stop_all(vec![ticker, logsink, fetcher]).await;
    Ok(())
}
