// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Timeline of admissions recorded while a workload runs.

use std::collections::BTreeMap;
use std::time::Duration;

/// Possible outcomes for a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Granted,
    TimedOut,
    Cancelled,
    Shutdown,
}

/// One worker's result.
#[derive(Debug, Clone)]
pub struct Event {
    pub worker: usize,
    pub outcome: Outcome,
    /// Offset from workload start
    pub at: Duration,
    /// In-flight count observed right after the outcome
    pub in_flight: usize,
}

/// Collects worker outcomes during a run.
#[derive(Debug, Clone)]
pub struct Timeline {
    window: Duration,
    events: Vec<Event>,
}

impl Timeline {
    /// Create an empty timeline for a gate with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            events: Vec::new(),
        }
    }

    /// Record a worker outcome.
    pub fn record(&mut self, worker: usize, outcome: Outcome, at: Duration, in_flight: usize) {
        self.events.push(Event {
            worker,
            outcome,
            at,
            in_flight,
        });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.events.iter().filter(|e| e.outcome == outcome).count()
    }

    /// Window index an offset falls into.
    pub fn window_of(&self, at: Duration) -> usize {
        (at.as_nanos() / self.window.as_nanos()) as usize
    }

    /// Grants per window index.
    pub fn grants_per_window(&self) -> BTreeMap<usize, usize> {
        let mut windows = BTreeMap::new();
        for event in self.events.iter().filter(|e| e.outcome == Outcome::Granted) {
            *windows.entry(self.window_of(event.at)).or_insert(0) += 1;
        }
        windows
    }

    /// Largest grant count seen in any single window.
    pub fn max_grants_in_window(&self) -> usize {
        self.grants_per_window().values().copied().max().unwrap_or(0)
    }

    /// Highest in-flight count seen at a grant.
    pub fn peak_in_flight(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.outcome == Outcome::Granted)
            .map(|e| e.in_flight)
            .max()
            .unwrap_or(0)
    }

    /// Workers in the order they were granted.
    pub fn grant_order(&self) -> Vec<usize> {
        let mut granted: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| e.outcome == Outcome::Granted)
            .collect();
        granted.sort_by_key(|e| e.at);
        granted.iter().map(|e| e.worker).collect()
    }
}

impl std::fmt::Display for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Gate Timeline ===")?;
        writeln!(f, "Window:            {:?}", self.window)?;
        writeln!(f, "Granted:           {}", self.count(Outcome::Granted))?;
        writeln!(f, "Timed Out:         {}", self.count(Outcome::TimedOut))?;
        writeln!(f, "Cancelled:         {}", self.count(Outcome::Cancelled))?;
        writeln!(f, "Shutdown:          {}", self.count(Outcome::Shutdown))?;
        writeln!(f, "Peak In-Flight:    {}", self.peak_in_flight())?;
        writeln!(f)?;
        writeln!(f, "--- Grants per window ---")?;
        for (window, grants) in self.grants_per_window() {
            writeln!(f, "#{:<4}             {}", window, grants)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grants_bucketed_by_window() {
        let mut timeline = Timeline::new(Duration::from_millis(100));
        timeline.record(0, Outcome::Granted, Duration::ZERO, 1);
        timeline.record(1, Outcome::Granted, Duration::from_millis(99), 2);
        timeline.record(2, Outcome::Granted, Duration::from_millis(100), 1);
        timeline.record(3, Outcome::TimedOut, Duration::from_millis(150), 1);

        let windows = timeline.grants_per_window();
        assert_eq!(windows.get(&0), Some(&2));
        assert_eq!(windows.get(&1), Some(&1));
        assert_eq!(timeline.count(Outcome::TimedOut), 1);
        assert_eq!(timeline.peak_in_flight(), 2);
    }
}
