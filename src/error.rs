// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the fixed-window gate.

use std::time::Duration;
use thiserror::Error;

/// Gate error types.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    #[error("Gate has been shut down, no further window resets will occur")]
    Shutdown,

    #[error("Permit acquisition cancelled")]
    Cancelled,

    #[error("Permit acquisition timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl GateError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GateError>;
