// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-Window Gate
//!
//! This crate provides an in-process gate that caps how many operations may
//! start within a recurring fixed time window, for calling upstream APIs that
//! publish an "N requests per unit of time" quota:
//!
//! - At most `limit` permits per window
//! - Callers beyond the quota wait for the next window reset
//! - Resets overwrite the pool; releasing a permit never refills it
//! - Cancellable and timed acquisition
//! - Explicit shutdown of the reset loop
//! - Optional Prometheus metrics

pub mod config;
pub mod error;
pub mod gate;
pub mod metrics;

pub use config::GateConfig;
pub use error::{GateError, Result};
pub use gate::{FixedWindowGate, GateSnapshot, WindowPermit};
pub use metrics::GateMetrics;
