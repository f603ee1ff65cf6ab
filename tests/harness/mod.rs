// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for driving workloads through a fixed-window gate.
//!
//! This module provides workload patterns and a timeline recorder used to
//! check how many operations the gate admits in each window.

pub mod timeline;
