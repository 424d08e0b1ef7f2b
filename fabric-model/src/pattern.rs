//! Learned conditional patterns
//!
//! A pattern is a conditional rule mined from outcome history: when its
//! conditions match the current workload and system state, the engine
//! re-weights the scorer by the pattern's adjustment map. Condition fields
//! are a closed feature set and comparisons are fully typed, so condition
//! evaluation is total — a combination that cannot be compared is a
//! non-match, never an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::SystemState;
use crate::weights::ScoreComponent;
use crate::workload::Workload;

/// The scalar features a pattern condition may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureTag {
    /// `SystemState::queue_depth`
    QueueDepth,
    /// `SystemState::compute_usage`
    ComputeUsage,
    /// `Workload::priority`
    ProcessPriority,
    /// `Workload::workload_type`
    ProcessType,
    /// `SystemState::network_usage`
    NetworkUsage,
}

/// Typed comparison value for a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionValue {
    /// Numeric comparand
    Number(f64),
    /// Textual comparand (equality and containment only)
    Text(String),
    /// Inclusive numeric range for between/not-between
    Range(f64, f64),
}

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// Greater than or equal
    Ge,
    /// Less than or equal
    Le,
    /// Within an inclusive range
    Between,
    /// Outside an inclusive range
    NotBetween,
    /// Text containment
    Contains,
    /// Negated text containment
    NotContains,
}

/// The feature value read from a workload or system state
enum FeatureValue {
    Number(f64),
    Text(String),
}

/// One condition of a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCondition {
    /// Feature the condition reads
    pub field: FeatureTag,

    /// Comparison operator
    pub op: Comparison,

    /// Comparand
    pub value: ConditionValue,

    /// Weight in the pattern's aggregated match score
    pub weight: f64,
}

impl PatternCondition {
    /// Build a numeric condition with unit weight
    pub fn numeric(field: FeatureTag, op: Comparison, value: f64) -> Self {
        Self {
            field,
            op,
            value: ConditionValue::Number(value),
            weight: 1.0,
        }
    }

    /// Read the referenced feature
    fn read(&self, workload: &Workload, state: &SystemState) -> FeatureValue {
        match self.field {
            FeatureTag::QueueDepth => FeatureValue::Number(f64::from(state.queue_depth)),
            FeatureTag::ComputeUsage => FeatureValue::Number(state.compute_usage),
            FeatureTag::ProcessPriority => FeatureValue::Number(f64::from(workload.priority)),
            FeatureTag::ProcessType => FeatureValue::Text(workload.workload_type.clone()),
            FeatureTag::NetworkUsage => FeatureValue::Number(state.network_usage),
        }
    }

    /// Evaluate the condition against a workload and state. Dispatch is
    /// total over (feature kind, operator, comparand kind); combinations
    /// with no defined comparison are non-matches.
    pub fn matches(&self, workload: &Workload, state: &SystemState) -> bool {
        match (self.read(workload, state), &self.value) {
            (FeatureValue::Number(actual), ConditionValue::Number(expected)) => match self.op {
                Comparison::Eq => (actual - expected).abs() < f64::EPSILON,
                Comparison::Ne => (actual - expected).abs() >= f64::EPSILON,
                Comparison::Gt => actual > *expected,
                Comparison::Lt => actual < *expected,
                Comparison::Ge => actual >= *expected,
                Comparison::Le => actual <= *expected,
                _ => false,
            },
            (FeatureValue::Number(actual), ConditionValue::Range(low, high)) => match self.op {
                Comparison::Between => actual >= *low && actual <= *high,
                Comparison::NotBetween => actual < *low || actual > *high,
                _ => false,
            },
            (FeatureValue::Text(actual), ConditionValue::Text(expected)) => match self.op {
                Comparison::Eq => &actual == expected,
                Comparison::Ne => &actual != expected,
                Comparison::Contains => actual.contains(expected.as_str()),
                Comparison::NotContains => !actual.contains(expected.as_str()),
                _ => false,
            },
            // Mixed feature/comparand kinds cannot be compared.
            _ => false,
        }
    }
}

/// Action a matched pattern recommends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// Offloading tends to pay off under this condition
    Offload,
    /// Keep the workload local under this condition
    KeepLocal,
}

/// Validation lifecycle of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Candidate still gathering evidence
    Discovering,
    /// Enough successful applications to influence scoring
    Validated,
    /// Persistent underperformer, excluded from matching
    Deprecated,
}

impl ValidationStatus {
    /// Rank used when pruning (higher survives)
    pub fn rank(self) -> u8 {
        match self {
            Self::Validated => 2,
            Self::Discovering => 1,
            Self::Deprecated => 0,
        }
    }
}

/// A conditional rule learned from outcome history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Pattern identity
    pub id: Uuid,

    /// Stable name; discovery merges re-proposed candidates by name
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Conditions, all evaluated for the aggregated match score
    pub conditions: Vec<PatternCondition>,

    /// Confidence (0.0-1.0): share of history supporting the pattern
    pub confidence: f64,

    /// Action the pattern recommends when matched
    pub action: RecommendedAction,

    /// Multiplicative weight adjustments applied on match, as signed
    /// deltas: weight *= (1 + delta), then renormalized
    pub weight_adjustments: BTreeMap<ScoreComponent, f64>,

    /// How many times the pattern has been applied or re-proposed
    pub applications: u64,

    /// Success rate over applications (0.0-1.0)
    pub success_rate: f64,

    /// When the pattern was first proposed
    pub created_at: DateTime<Utc>,

    /// When the pattern last changed
    pub updated_at: DateTime<Utc>,

    /// When the pattern last matched a decision
    pub last_used: DateTime<Utc>,

    /// Stability of the pattern's success rate over time
    pub stability: f64,

    /// Applications required before validation
    pub min_samples: u64,

    /// Validation lifecycle state
    pub status: ValidationStatus,
}

impl Pattern {
    /// Create a discovering pattern with a fresh id
    pub fn new(name: impl Into<String>, action: RecommendedAction) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            conditions: Vec::new(),
            confidence: 0.0,
            action,
            weight_adjustments: BTreeMap::new(),
            applications: 0,
            success_rate: 0.0,
            created_at: now,
            updated_at: now,
            last_used: now,
            stability: 0.0,
            min_samples: 10,
            status: ValidationStatus::Discovering,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a condition
    pub fn with_condition(mut self, condition: PatternCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a weight adjustment
    pub fn with_adjustment(mut self, component: ScoreComponent, delta: f64) -> Self {
        self.weight_adjustments.insert(component, delta);
        self
    }

    /// Weighted fraction of conditions that match:
    /// `sum(weight * matched) / sum(weight)`. Zero when the pattern has no
    /// conditions or no condition weight.
    pub fn match_score(&self, workload: &Workload, state: &SystemState) -> f64 {
        let total: f64 = self.conditions.iter().map(|c| c.weight.max(0.0)).sum();
        if total <= 0.0 {
            return 0.0;
        }
        let matched: f64 = self
            .conditions
            .iter()
            .filter(|c| c.matches(workload, state))
            .map(|c| c.weight.max(0.0))
            .sum();
        matched / total
    }
}
