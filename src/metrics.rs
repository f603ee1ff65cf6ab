// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus collectors for gate activity.

use crate::error::Result;
use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Registry,
};

/// Metrics describing permit flow through a gate.
#[derive(Clone, Debug)]
pub struct GateMetrics {
    pub(crate) permits_granted: IntCounter,
    pub(crate) acquire_waits: IntCounter,
    pub(crate) acquire_abandoned: IntCounter,
    pub(crate) resets: IntCounter,
    pub(crate) in_flight: IntGauge,
    pub(crate) available_permits: IntGauge,
}

impl GateMetrics {
    /// Register the gate collectors with `registry`.
    pub fn new(registry: &Registry) -> Result<Self> {
        Ok(Self {
            permits_granted: register_int_counter_with_registry!(
                "gate_permits_granted_total",
                "Total number of permits handed out by the gate",
                registry
            )?,
            acquire_waits: register_int_counter_with_registry!(
                "gate_acquire_waits_total",
                "Total number of acquisitions that found the window exhausted and had to wait",
                registry
            )?,
            acquire_abandoned: register_int_counter_with_registry!(
                "gate_acquire_abandoned_total",
                "Total number of waiting acquisitions abandoned by cancellation or timeout",
                registry
            )?,
            resets: register_int_counter_with_registry!(
                "gate_resets_total",
                "Total number of window resets performed",
                registry
            )?,
            in_flight: register_int_gauge_with_registry!(
                "gate_in_flight",
                "Operations holding a permit that have not yet released it",
                registry
            )?,
            available_permits: register_int_gauge_with_registry!(
                "gate_available_permits",
                "Permits left in the current window",
                registry
            )?,
        })
    }

    /// Permits granted so far.
    pub fn permits_granted(&self) -> u64 {
        self.permits_granted.get()
    }

    /// Acquisitions that had to wait for a reset.
    pub fn acquire_waits(&self) -> u64 {
        self.acquire_waits.get()
    }

    /// Waits given up before a permit arrived.
    pub fn acquire_abandoned(&self) -> u64 {
        self.acquire_abandoned.get()
    }

    /// Window resets performed.
    pub fn resets(&self) -> u64 {
        self.resets.get()
    }
}
