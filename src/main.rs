use std::sync::Arc;

use anyhow::Result;
use compact_companion::{build_companion, CompanionEvent, HostEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    compact_core::init()?;

    let (config, _validation) = compact_core::Config::load_validated()?;
    tracing::info!("Config directory: {}", config.config_dir.display());

    let companion = Arc::new(build_companion(&config, tokio::io::stdout())?);
    let (tx, rx) = mpsc::channel(32);
    let runner = tokio::spawn(Arc::clone(&companion).run(rx));

    tx.send(CompanionEvent::Ready).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let event = match HostEvent::parse(&line).and_then(HostEvent::into_companion_event) {
            Ok(Some(event)) => event,
            Ok(None) => {
                if let Err(e) = companion.channel().write_configuration().await {
                    tracing::error!("Failed to write configuration: {}", e);
                }
                continue;
            }
            Err(e) => {
                tracing::warn!("Ignoring host event: {}", e);
                continue;
            }
        };

        if tx.send(event).await.is_err() {
            break;
        }
    }

    // Graceful shutdown: let started cycles finish
    drop(tx);
    runner.await?;
    tracing::info!("Compact Info companion stopped");

    Ok(())
}
