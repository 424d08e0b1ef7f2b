//! Execution targets: candidate destinations for offloaded work
//!
//! A target exposes the three derived quantities the scorer consumes:
//! `can_accommodate`, `estimated_execution_time`, and `total_cost`, plus a
//! capability-match score used by the PolicyMatch scoring component.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ModelError, Result};
use crate::workload::Workload;
use crate::{MAX_SECURITY_LEVEL, TARGET_STALENESS_SECS};

/// Kind of execution destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetType {
    /// The submitting host itself
    Local,
    /// Edge node close to the submitter
    Edge,
    /// Private cloud deployment
    PrivateCloud,
    /// Public cloud deployment
    PublicCloud,
    /// Mixed private/public deployment
    HybridCloud,
    /// HPC cluster
    HpcCluster,
    /// Fog node
    Fog,
}

impl TargetType {
    /// True for placements that keep data in the submitter's locality
    pub fn is_local_or_edge(self) -> bool {
        matches!(self, Self::Local | Self::Edge)
    }
}

/// Compute capacity of a target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capacity {
    /// Total CPU cores
    pub total_cpu: f64,

    /// CPU cores currently available
    pub available_cpu: f64,

    /// Total memory in bytes
    pub total_memory: u64,

    /// Memory currently available in bytes
    pub available_memory: u64,
}

/// Network characteristics of the path to a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// Round-trip latency
    pub latency: Duration,

    /// Bandwidth in bytes per second
    pub bandwidth: f64,

    /// Link stability (0.0-1.0)
    pub stability: f64,

    /// Cost per byte transferred
    pub cost_per_byte: f64,
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(10),
            bandwidth: 100_000_000.0,
            stability: 1.0,
            cost_per_byte: 0.0,
        }
    }
}

/// A candidate execution destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Target identity
    pub id: String,

    /// Kind of destination
    pub target_type: TargetType,

    /// Compute capacity
    pub capacity: Capacity,

    /// Network path characteristics
    pub network: NetworkProfile,

    /// Processing-speed multiplier relative to the local host
    pub processing_speed: f64,

    /// Historical reliability (0.0-1.0)
    pub reliability: f64,

    /// Compute cost per hour
    pub compute_cost_per_hour: f64,

    /// Energy cost per hour
    pub energy_cost_per_hour: f64,

    /// Security level offered (0..=5)
    pub security_level: u8,

    /// Data jurisdiction tag
    pub jurisdiction: String,

    /// Compliance tags (ordered for deterministic serialization)
    pub compliance_tags: BTreeSet<String>,

    /// Energy source tag
    pub energy_source: String,

    /// Capability tags, matched against workload type tags
    pub capabilities: BTreeSet<String>,

    /// Current load (0.0-1.0)
    pub current_load: f64,

    /// Estimated wait before a new workload starts
    pub estimated_wait: Duration,

    /// Last heartbeat; targets unseen for 90 s are unhealthy
    pub last_seen: DateTime<Utc>,

    /// Measured fraction of past placements that succeeded, when known
    pub success_rate: Option<f64>,

    /// Additive bonus accumulated from satisfied/violated soft policy
    /// rules. Only `PolicyEngine::filter_targets` writes this, on the
    /// clones it returns.
    #[serde(default)]
    pub policy_bonus: f64,
}

impl Target {
    /// Create a target with neutral defaults
    pub fn new(id: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            id: id.into(),
            target_type,
            capacity: Capacity::default(),
            network: NetworkProfile::default(),
            processing_speed: 1.0,
            reliability: 1.0,
            compute_cost_per_hour: 0.0,
            energy_cost_per_hour: 0.0,
            security_level: 0,
            jurisdiction: String::new(),
            compliance_tags: BTreeSet::new(),
            energy_source: String::new(),
            capabilities: BTreeSet::new(),
            current_load: 0.0,
            estimated_wait: Duration::ZERO,
            last_seen: Utc::now(),
            success_rate: None,
            policy_bonus: 0.0,
        }
    }

    /// Set the compute capacity
    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the network profile
    pub fn with_network(mut self, network: NetworkProfile) -> Self {
        self.network = network;
        self
    }

    /// Set the security level
    pub fn with_security_level(mut self, level: u8) -> Self {
        self.security_level = level;
        self
    }

    /// Set the reliability
    pub fn with_reliability(mut self, reliability: f64) -> Self {
        self.reliability = reliability;
        self
    }

    /// Set the processing-speed multiplier
    pub fn with_processing_speed(mut self, speed: f64) -> Self {
        self.processing_speed = speed;
        self
    }

    /// Set the per-hour compute cost
    pub fn with_compute_cost(mut self, per_hour: f64) -> Self {
        self.compute_cost_per_hour = per_hour;
        self
    }

    /// True when the target's heartbeat is within the staleness bound
    pub fn is_healthy(&self, now: DateTime<Utc>) -> bool {
        (now - self.last_seen).num_seconds() <= TARGET_STALENESS_SECS
    }

    /// True iff the target can hold the workload's demand at its security
    /// level: cpu and memory fit within what is available and the offered
    /// security level covers what the workload requires.
    pub fn can_accommodate(&self, workload: &Workload) -> bool {
        workload.demand.cpu_cores <= self.capacity.available_cpu
            && workload.demand.memory_bytes <= self.capacity.available_memory
            && workload.security_level <= self.security_level
    }

    /// Estimated wall time for the workload on this target:
    /// compute time scaled by processing speed, two network round trips,
    /// queue wait, and data transfer at the link bandwidth.
    pub fn estimated_execution_time(&self, workload: &Workload) -> Duration {
        let speed = if self.processing_speed > 0.0 {
            self.processing_speed
        } else {
            1.0
        };
        let compute = workload.estimated_duration.as_secs_f64() / speed;

        let transfer = if self.network.bandwidth > 0.0 {
            workload.data.transfer_bytes() as f64 / self.network.bandwidth
        } else {
            0.0
        };

        let total = compute
            + 2.0 * self.network.latency.as_secs_f64()
            + self.estimated_wait.as_secs_f64()
            + transfer;
        Duration::from_secs_f64(total.max(0.0))
    }

    /// Estimated monetary cost of running the workload here: compute and
    /// energy billed per hour of estimated execution time, network billed
    /// per megabyte transferred.
    pub fn total_cost(&self, workload: &Workload) -> f64 {
        let hours = self.estimated_execution_time(workload).as_secs_f64() / 3600.0;
        let megabytes = workload.data.transfer_bytes() as f64 / 1_000_000.0;
        self.compute_cost_per_hour * hours
            + self.network.cost_per_byte * 1_000_000.0 * megabytes
            + self.energy_cost_per_hour * hours
    }

    /// Capability/compatibility score in [0, 1] for the PolicyMatch
    /// scoring component: security coverage, capability-tag match,
    /// locality fit, and link stability, equally weighted. An unknown
    /// capability tag counts half rather than zero so targets without a
    /// curated tag set are not shut out.
    pub fn capability_match(&self, workload: &Workload) -> f64 {
        let security = if workload.security_level <= self.security_level {
            1.0
        } else {
            0.0
        };
        let capability = if self.capabilities.contains(&workload.workload_type) {
            1.0
        } else if self.capabilities.is_empty() {
            0.5
        } else {
            0.25
        };
        let locality = if workload.locality_required {
            if self.target_type.is_local_or_edge() {
                1.0
            } else {
                0.0
            }
        } else {
            1.0
        };
        let stability = self.network.stability.clamp(0.0, 1.0);

        (security + capability + locality + stability) / 4.0
    }

    /// Validate target invariants. Available capacity exceeding total is a
    /// warning, not an error.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(ModelError::InvalidTarget {
                id: self.id.clone(),
                reason: reason.to_string(),
            })
        };

        if self.id.is_empty() {
            return fail("empty id");
        }
        if !(0.0..=1.0).contains(&self.reliability) {
            return fail("reliability outside [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.network.stability) {
            return fail("network stability outside [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.current_load) {
            return fail("current load outside [0, 1]");
        }
        if self.security_level > MAX_SECURITY_LEVEL {
            return fail("security level above maximum level");
        }
        if !(self.capacity.total_cpu >= 0.0) || !(self.capacity.available_cpu >= 0.0) {
            return fail("negative cpu capacity");
        }

        if self.capacity.available_cpu > self.capacity.total_cpu
            || self.capacity.available_memory > self.capacity.total_memory
        {
            warn!(target_id = %self.id, "available capacity exceeds total capacity");
        }
        Ok(())
    }
}
