// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the fixed-window gate.
//!
//! Defaults reproduce the upstream document API quota of 5 document
//! creations per minute.

use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a gate and the demo workload driven through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Operations allowed to start per window (default: 5)
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Window length in milliseconds (default: 60000)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Concurrent workers spawned by the demo driver (default: 20)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Simulated duration of one guarded operation in milliseconds (default: 250)
    #[serde(default = "default_work_ms")]
    pub work_ms: u64,

    /// Register Prometheus collectors for the gate (default: true)
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

// Default value functions
fn default_limit() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_workers() -> usize {
    20
}

fn default_work_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_ms: default_window_ms(),
            workers: default_workers(),
            work_ms: default_work_ms(),
            metrics_enabled: default_true(),
        }
    }
}

impl GateConfig {
    /// Get the window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Get the simulated operation duration
    pub fn work_duration(&self) -> Duration {
        Duration::from_millis(self.work_ms)
    }

    /// Reject values the gate cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(GateError::invalid("limit", "must be greater than zero"));
        }
        if self.window_ms == 0 {
            return Err(GateError::invalid("window_ms", "must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration from environment variables.
    ///
    /// - `GATE_LIMIT`: operations per window (default: 5)
    /// - `GATE_WINDOW_MS`: window length in milliseconds (default: 60000)
    /// - `GATE_WORKERS`: demo worker count (default: 20)
    /// - `GATE_WORK_MS`: demo operation duration (default: 250)
    /// - `GATE_METRICS`: `true`/`false` (default: true)
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            limit: lookup("GATE_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.limit),
            window_ms: lookup("GATE_WINDOW_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.window_ms),
            workers: lookup("GATE_WORKERS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.workers),
            work_ms: lookup("GATE_WORK_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.work_ms),
            metrics_enabled: lookup("GATE_METRICS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.metrics_enabled),
        }
    }
}
