// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-Window Gate Demo
//!
//! Drives a burst of concurrent workers through one gate, the way a client
//! of a quota-limited document API would: every worker wraps its call in
//! the gate, so at most `limit` calls start per window no matter how many
//! workers are ready.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `GATE_LIMIT`: operations allowed to start per window (default: 5)
//! - `GATE_WINDOW_MS`: window length in milliseconds (default: 60000)
//! - `GATE_WORKERS`: concurrent workers (default: 20)
//! - `GATE_WORK_MS`: simulated duration of each operation (default: 250)
//! - `GATE_METRICS`: print Prometheus metrics at exit (default: true)

use prometheus::{Encoder, Registry, TextEncoder};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fixed_window_gate::{config::GateConfig, gate::FixedWindowGate, metrics::GateMetrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = GateConfig::from_env();
    config.validate()?;
    info!(
        limit = config.limit,
        window_ms = config.window_ms,
        workers = config.workers,
        work_ms = config.work_ms,
        "Starting fixed-window gate demo"
    );

    let registry = Registry::new();
    let gate = if config.metrics_enabled {
        FixedWindowGate::with_metrics(
            config.limit,
            config.window_duration(),
            GateMetrics::new(&registry)?,
        )?
    } else {
        FixedWindowGate::from_config(&config)?
    };

    let mut workers = JoinSet::new();
    for worker in 0..config.workers {
        let gate = gate.clone();
        let work = config.work_duration();
        workers.spawn(async move {
            let observer = gate.clone();
            gate.run(simulated_operation(worker, observer, work)).await
        });
    }

    let mut completed = 0usize;
    while let Some(joined) = workers.join_next().await {
        joined??;
        completed += 1;
    }

    gate.shutdown();
    info!(completed, "All workers finished");

    println!("{}", serde_json::to_string_pretty(&gate.snapshot())?);

    if config.metrics_enabled {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        println!("{}", String::from_utf8(buffer)?);
    }

    Ok(())
}

/// Stand-in for the upstream call a worker makes once admitted.
async fn simulated_operation(worker: usize, gate: FixedWindowGate, work: Duration) {
    info!(
        worker,
        in_flight = gate.in_flight(),
        available = gate.available(),
        "Worker starting operation"
    );
    tokio::time::sleep(work).await;
    info!(worker, "Worker finished operation");
}
