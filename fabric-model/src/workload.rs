//! Workloads: the unit of work being placed
//!
//! A workload describes resource demand, data footprint, timing, and the
//! policy attributes that constrain where it may run. Lifecycle transitions
//! follow a fixed graph; the three terminal states have no outgoing edges.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::MAX_SECURITY_LEVEL;

/// Resource demand of a workload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDemand {
    /// CPU cores requested
    pub cpu_cores: f64,

    /// Memory in bytes
    pub memory_bytes: u64,

    /// Disk in bytes
    pub disk_bytes: u64,

    /// Network bandwidth in bytes per second
    pub network_bandwidth: f64,
}

/// Data footprint moved when the workload is offloaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataProfile {
    /// Input bytes shipped to the target
    pub input_bytes: u64,

    /// Output bytes shipped back
    pub output_bytes: u64,

    /// Data-sensitivity level (0..=5)
    pub sensitivity: u8,
}

impl DataProfile {
    /// Total bytes crossing the network for one placement
    pub fn transfer_bytes(&self) -> u64 {
        self.input_bytes + self.output_bytes
    }
}

/// Workload lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    /// Waiting for placement
    Queued,
    /// Placed on a target, not yet running
    Assigned,
    /// Running
    Executing,
    /// Finished successfully (terminal)
    Completed,
    /// Finished with an error (terminal)
    Failed,
    /// Withdrawn before completion (terminal)
    Cancelled,
}

impl WorkloadStatus {
    /// True when the status has no outgoing transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// True when `self -> next` is an edge of the lifecycle graph
    pub fn can_transition_to(self, next: Self) -> bool {
        use WorkloadStatus::*;
        matches!(
            (self, next),
            (Queued, Assigned)
                | (Queued, Cancelled)
                | (Assigned, Executing)
                | (Assigned, Failed)
                | (Assigned, Cancelled)
                | (Executing, Completed)
                | (Executing, Failed)
        )
    }
}

/// One stage of a workload pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStage {
    /// Stage identity, unique within the pipeline
    pub id: String,

    /// Ids of stages that must complete first
    pub depends_on: Vec<String>,
}

/// Pipeline structure attached to a workload
///
/// The model preserves the DAG; the decision core never executes it. A
/// workload carrying a pipeline is placed with the `Pipelined` strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Stages in declaration order
    pub stages: Vec<PipelineStage>,
}

impl PipelineSpec {
    /// Validate stage ids, edge resolvability, and acyclicity
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut ids = BTreeSet::new();
        for stage in &self.stages {
            if !ids.insert(stage.id.as_str()) {
                return Err(format!("duplicate pipeline stage '{}'", stage.id));
            }
        }
        for stage in &self.stages {
            for dep in &stage.depends_on {
                if dep == &stage.id {
                    return Err(format!("pipeline stage '{}' depends on itself", stage.id));
                }
                if !ids.contains(dep.as_str()) {
                    return Err(format!(
                        "pipeline stage '{}' depends on unknown stage '{}'",
                        stage.id, dep
                    ));
                }
            }
        }
        self.check_acyclic()
    }

    /// Depth-first cycle check over the dependency edges
    fn check_acyclic(&self) -> std::result::Result<(), String> {
        const UNSEEN: u8 = 0;
        const ACTIVE: u8 = 1;
        const DONE: u8 = 2;

        let index: std::collections::BTreeMap<&str, usize> = self
            .stages
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.as_str(), i))
            .collect();
        let mut marks = vec![UNSEEN; self.stages.len()];

        fn visit(
            at: usize,
            stages: &[PipelineStage],
            index: &std::collections::BTreeMap<&str, usize>,
            marks: &mut [u8],
        ) -> std::result::Result<(), String> {
            match marks[at] {
                ACTIVE => return Err(format!("pipeline cycle through stage '{}'", stages[at].id)),
                DONE => return Ok(()),
                _ => {}
            }
            marks[at] = ACTIVE;
            for dep in &stages[at].depends_on {
                if let Some(&next) = index.get(dep.as_str()) {
                    visit(next, stages, index, marks)?;
                }
            }
            marks[at] = DONE;
            Ok(())
        }

        for at in 0..self.stages.len() {
            visit(at, &self.stages, &index, &mut marks)?;
        }
        Ok(())
    }
}

/// The unit being placed by the decision engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    /// Workload identity
    pub id: String,

    /// Type tag (matched against target capabilities)
    pub workload_type: String,

    /// Resource demand
    pub demand: ResourceDemand,

    /// Data footprint
    pub data: DataProfile,

    /// Estimated duration; must be positive for a valid workload
    pub estimated_duration: Duration,

    /// Completion deadline; zero means unbounded
    pub deadline: Duration,

    /// Workload requires real-time placement (latency-gated)
    pub real_time: bool,

    /// Workload may only ever run on the local target
    pub safety_critical: bool,

    /// Workload must stay on local or edge targets
    pub locality_required: bool,

    /// Minimum security level of any target (0..=5)
    pub security_level: u8,

    /// Priority (1..=10)
    pub priority: u8,

    /// Ids of workloads that must complete first
    pub dependencies: Vec<String>,

    /// Optional pipeline structure (preserved, not executed)
    pub pipeline: Option<PipelineSpec>,

    /// Lifecycle status
    pub status: WorkloadStatus,

    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,
}

impl Workload {
    /// Create a queued workload with neutral defaults
    pub fn new(id: impl Into<String>, workload_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            workload_type: workload_type.into(),
            demand: ResourceDemand::default(),
            data: DataProfile::default(),
            estimated_duration: Duration::from_secs(1),
            deadline: Duration::ZERO,
            real_time: false,
            safety_critical: false,
            locality_required: false,
            security_level: 0,
            priority: 5,
            dependencies: Vec::new(),
            pipeline: None,
            status: WorkloadStatus::Queued,
            submitted_at: Utc::now(),
        }
    }

    /// Set the resource demand
    pub fn with_demand(mut self, demand: ResourceDemand) -> Self {
        self.demand = demand;
        self
    }

    /// Set the data footprint
    pub fn with_data(mut self, data: DataProfile) -> Self {
        self.data = data;
        self
    }

    /// Set the estimated duration
    pub fn with_estimated_duration(mut self, duration: Duration) -> Self {
        self.estimated_duration = duration;
        self
    }

    /// Set the deadline (zero = unbounded)
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set the priority (1..=10)
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Set the required security level (0..=5)
    pub fn with_security_level(mut self, level: u8) -> Self {
        self.security_level = level;
        self
    }

    /// Mark the workload safety-critical
    pub fn safety_critical(mut self) -> Self {
        self.safety_critical = true;
        self
    }

    /// Mark the workload real-time
    pub fn real_time(mut self) -> Self {
        self.real_time = true;
        self
    }

    /// Require local or edge placement
    pub fn locality_required(mut self) -> Self {
        self.locality_required = true;
        self
    }

    /// Attach a pipeline structure
    pub fn with_pipeline(mut self, pipeline: PipelineSpec) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Transition the lifecycle status, rejecting illegal edges
    pub fn transition_to(&mut self, next: WorkloadStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ModelError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Validate every invariant the decision engine relies on
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(ModelError::InvalidWorkload {
                id: self.id.clone(),
                reason: reason.to_string(),
            })
        };

        if self.id.is_empty() {
            return fail("empty id");
        }
        if self.estimated_duration.is_zero() {
            return fail("estimated duration must be positive");
        }
        if !(self.demand.cpu_cores >= 0.0) {
            return fail("cpu demand must be non-negative");
        }
        if !(self.demand.network_bandwidth >= 0.0) {
            return fail("network bandwidth demand must be non-negative");
        }
        if self.data.sensitivity > MAX_SECURITY_LEVEL {
            return fail("data sensitivity above maximum level");
        }
        if self.security_level > MAX_SECURITY_LEVEL {
            return fail("security level above maximum level");
        }
        if !(1..=10).contains(&self.priority) {
            return fail("priority outside 1..=10");
        }

        let mut seen = BTreeSet::new();
        for dep in &self.dependencies {
            if dep == &self.id {
                return fail("workload depends on itself");
            }
            if !seen.insert(dep.as_str()) {
                return fail("duplicate dependency");
            }
        }

        if let Some(pipeline) = &self.pipeline {
            if let Err(reason) = pipeline.validate() {
                return fail(&reason);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(id: &str, deps: &[&str]) -> PipelineStage {
        PipelineStage {
            id: id.to_string(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_valid_workload() {
        let w = Workload::new("w1", "batch")
            .with_estimated_duration(Duration::from_secs(30))
            .with_priority(5);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut w = Workload::new("w1", "batch");
        w.estimated_duration = Duration::ZERO;
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_priority_bounds() {
        let mut w = Workload::new("w1", "batch");
        w.priority = 0;
        assert!(w.validate().is_err());
        w.priority = 11;
        assert!(w.validate().is_err());
        w.priority = 10;
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_self_dependency_rejected() {
        let mut w = Workload::new("w1", "batch");
        w.dependencies = vec!["w1".to_string()];
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_duplicate_dependency_rejected() {
        let mut w = Workload::new("w1", "batch");
        w.dependencies = vec!["w2".to_string(), "w2".to_string()];
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_lifecycle_edges() {
        use WorkloadStatus::*;
        assert!(Queued.can_transition_to(Assigned));
        assert!(Queued.can_transition_to(Cancelled));
        assert!(Assigned.can_transition_to(Executing));
        assert!(Assigned.can_transition_to(Failed));
        assert!(Executing.can_transition_to(Completed));
        assert!(Executing.can_transition_to(Failed));

        assert!(!Queued.can_transition_to(Executing));
        assert!(!Executing.can_transition_to(Cancelled));
        for terminal in [Completed, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Queued, Assigned, Executing, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_transition_updates_status() {
        let mut w = Workload::new("w1", "batch");
        w.transition_to(WorkloadStatus::Assigned).unwrap();
        assert_eq!(w.status, WorkloadStatus::Assigned);

        let err = w.transition_to(WorkloadStatus::Queued).unwrap_err();
        assert!(matches!(err, ModelError::InvalidTransition { .. }));
        assert_eq!(w.status, WorkloadStatus::Assigned);
    }

    #[test]
    fn test_pipeline_cycle_rejected() {
        let pipeline = PipelineSpec {
            stages: vec![stage("a", &["c"]), stage("b", &["a"]), stage("c", &["b"])],
        };
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn test_pipeline_dag_accepted() {
        let pipeline = PipelineSpec {
            stages: vec![stage("a", &[]), stage("b", &["a"]), stage("c", &["a", "b"])],
        };
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_pipeline_unknown_stage_rejected() {
        let pipeline = PipelineSpec {
            stages: vec![stage("a", &["missing"])],
        };
        assert!(pipeline.validate().is_err());
    }
}
