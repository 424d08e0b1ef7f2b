//! Local host system state at decision time

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Snapshot of the local host's load when a decision is made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    /// Number of workloads waiting locally
    pub queue_depth: u32,

    /// Queue depth above which the host is under pressure
    pub queue_threshold: u32,

    /// Compute usage (0.0-1.0)
    pub compute_usage: f64,

    /// Memory usage (0.0-1.0)
    pub memory_usage: f64,

    /// Network usage (0.0-1.0)
    pub network_usage: f64,

    /// Master-node usage (0.0-1.0)
    pub master_usage: f64,

    /// Hour of day (0..=23)
    pub time_slot: u8,

    /// Day of week
    pub day_of_week: Weekday,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
}

impl SystemState {
    /// Snapshot with all usages at zero, stamped now
    pub fn idle() -> Self {
        let now = Utc::now();
        Self {
            queue_depth: 0,
            queue_threshold: 0,
            compute_usage: 0.0,
            memory_usage: 0.0,
            network_usage: 0.0,
            master_usage: 0.0,
            time_slot: 0,
            day_of_week: Weekday::Mon,
            timestamp: now,
        }
    }

    /// Derived load score: usage components weighted toward compute and
    /// memory, which dominate placement pressure.
    pub fn load_score(&self) -> f64 {
        let score = 0.4 * self.compute_usage
            + 0.3 * self.memory_usage
            + 0.2 * self.network_usage
            + 0.1 * self.master_usage;
        score.clamp(0.0, 1.0)
    }

    /// High-load predicate: any single dimension saturated enough that
    /// local execution would degrade it further.
    pub fn is_high_load(&self) -> bool {
        self.compute_usage > 0.8 || self.memory_usage > 0.85 || self.master_usage > 0.9
    }

    /// Queue pressure relative to the configured threshold; zero when no
    /// threshold is configured.
    pub fn queue_pressure(&self) -> f64 {
        if self.queue_threshold == 0 {
            return 0.0;
        }
        f64::from(self.queue_depth) / f64::from(self.queue_threshold)
    }

    /// Validate usage ranges and the time slot
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("compute usage", self.compute_usage),
            ("memory usage", self.memory_usage),
            ("network usage", self.network_usage),
            ("master usage", self.master_usage),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ModelError::InvalidState(format!(
                    "{name} outside [0, 1]: {value}"
                )));
            }
        }
        if self.time_slot > 23 {
            return Err(ModelError::InvalidState(format!(
                "time slot outside 0..=23: {}",
                self.time_slot
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_idle_state_valid() {
        let s = SystemState::idle();
        assert!(s.validate().is_ok());
        assert_eq!(s.load_score(), 0.0);
        assert!(!s.is_high_load());
    }

    #[test]
    fn test_load_score_weighting() {
        let mut s = SystemState::idle();
        s.compute_usage = 1.0;
        assert!((s.load_score() - 0.4).abs() < 1e-9);
        s.memory_usage = 1.0;
        assert!((s.load_score() - 0.7).abs() < 1e-9);
    }

    #[test_case(0.81, 0.0, 0.0 => true; "compute saturated")]
    #[test_case(0.0, 0.86, 0.0 => true; "memory saturated")]
    #[test_case(0.0, 0.0, 0.91 => true; "master saturated")]
    #[test_case(0.79, 0.84, 0.89 => false; "all below thresholds")]
    fn test_high_load(compute: f64, memory: f64, master: f64) -> bool {
        let mut s = SystemState::idle();
        s.compute_usage = compute;
        s.memory_usage = memory;
        s.master_usage = master;
        s.is_high_load()
    }

    #[test]
    fn test_queue_pressure_without_threshold() {
        let mut s = SystemState::idle();
        s.queue_depth = 50;
        assert_eq!(s.queue_pressure(), 0.0);
        s.queue_threshold = 20;
        assert!((s.queue_pressure() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut s = SystemState::idle();
        s.compute_usage = 1.2;
        assert!(s.validate().is_err());

        let mut s = SystemState::idle();
        s.time_slot = 24;
        assert!(s.validate().is_err());
    }
}
