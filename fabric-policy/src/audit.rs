//! Tamper-evident audit log
//!
//! Append-only log of policy activity. Each record carries a SHA-256
//! signature over its own canonical JSON encoding, which embeds the
//! previous record's signature, so the log forms a hash chain: flipping
//! any byte of any record, or reordering records, invalidates
//! verification. `AuditLog::append` is the only signing path.

use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use fabric_model::{Target, Workload};

use crate::error::{PolicyError, Result};
use crate::rule::RuleKind;

/// Audit verbosity attached to a rule or record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    /// Record the evaluation result only
    Summary,
    /// Additionally snapshot the workload, target, and rule-by-rule trace
    Full,
}

/// What a record documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// A (workload, target) pair was evaluated against the rule set
    TargetEvaluation,
    /// A rule was added
    RuleAdded,
    /// A rule was removed
    RuleRemoved,
    /// A rule's priority changed
    RuleUpdated,
    /// An execution epoch started
    ExecutionStarted,
    /// An execution epoch stopped
    ExecutionStopped,
    /// Safety constraints were replaced
    ConstraintsUpdated,
}

/// One rule's result within a target evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// Rule description
    pub rule: String,

    /// Rule kind
    pub kind: RuleKind,

    /// Did the predicate hold
    pub passed: bool,
}

/// A signed audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Record identity
    pub id: Uuid,

    /// Position in the log, starting at 0
    pub sequence: u64,

    /// When the event happened
    pub timestamp: DateTime<Utc>,

    /// What happened
    pub event: AuditEventKind,

    /// Workload involved, when any
    pub workload_id: String,

    /// Target involved, when any
    pub target_id: Option<String>,

    /// Rule description, or the summary headline of the event
    pub rule: String,

    /// Outcome headline ("allowed", "denied", ...)
    pub decision: String,

    /// Verbosity this record was captured at
    pub level: AuditLevel,

    /// Deep copy of the workload at evaluation time (full level only)
    pub workload_snapshot: Option<Workload>,

    /// Deep copy of the target at evaluation time (full level only)
    pub target_snapshot: Option<Target>,

    /// Rule-by-rule evaluation trace (full level only)
    pub evaluations: Vec<RuleEvaluation>,

    /// Signature of the previous record ("" for the first record)
    pub previous_signature: String,

    /// SHA-256 over this record's canonical encoding, hex-encoded
    pub signature: String,
}

impl AuditRecord {
    /// Canonical content digest: the record serialized with an empty
    /// signature field. The previous record's signature is part of the
    /// encoding, which is what chains the log.
    fn compute_signature(&self) -> String {
        let mut unsigned = self.clone();
        unsigned.signature = String::new();
        // Struct serialization is field-ordered and all maps in the model
        // are BTree-backed, so the encoding is canonical.
        let encoded = serde_json::to_string(&unsigned).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(encoded.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Unsigned event handed to `AuditLog::append`
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// What happened
    pub event: AuditEventKind,
    /// Workload involved, when any
    pub workload_id: String,
    /// Target involved, when any
    pub target_id: Option<String>,
    /// Rule description or event headline
    pub rule: String,
    /// Outcome headline
    pub decision: String,
    /// Capture verbosity
    pub level: AuditLevel,
    /// Full-level workload snapshot
    pub workload_snapshot: Option<Workload>,
    /// Full-level target snapshot
    pub target_snapshot: Option<Target>,
    /// Full-level rule trace
    pub evaluations: Vec<RuleEvaluation>,
}

impl AuditEvent {
    /// Summary-level event with no snapshots
    pub fn summary(
        event: AuditEventKind,
        rule: impl Into<String>,
        decision: impl Into<String>,
    ) -> Self {
        Self {
            event,
            workload_id: String::new(),
            target_id: None,
            rule: rule.into(),
            decision: decision.into(),
            level: AuditLevel::Summary,
            workload_snapshot: None,
            target_snapshot: None,
            evaluations: Vec::new(),
        }
    }
}

/// Append-only signed audit log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
}

impl AuditLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign and append an event; the only way records enter the log
    pub fn append(&mut self, event: AuditEvent) -> &AuditRecord {
        let previous_signature = self
            .records
            .last()
            .map(|r| r.signature.clone())
            .unwrap_or_default();

        let mut record = AuditRecord {
            id: Uuid::new_v4(),
            sequence: self.records.len() as u64,
            timestamp: Utc::now(),
            event: event.event,
            workload_id: event.workload_id,
            target_id: event.target_id,
            rule: event.rule,
            decision: event.decision,
            level: event.level,
            workload_snapshot: event.workload_snapshot,
            target_snapshot: event.target_snapshot,
            evaluations: event.evaluations,
            previous_signature,
            signature: String::new(),
        };
        record.signature = record.compute_signature();
        self.records.push(record);
        match self.records.last() {
            Some(appended) => appended,
            None => unreachable!("a record was just pushed"),
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records have been appended
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, oldest first
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Iterate records, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &AuditRecord> {
        self.records.iter()
    }

    /// Verify a single record's signature against its content
    pub fn verify_record(record: &AuditRecord) -> Result<()> {
        let expected = record.compute_signature();
        if record.signature != expected {
            return Err(PolicyError::IntegrityViolation {
                sequence: record.sequence,
                reason: "record signature does not match content".to_string(),
            });
        }
        Ok(())
    }

    /// Verify the whole chain: every record's signature and every link to
    /// the previous record
    pub fn verify_integrity(&self) -> Result<()> {
        let mut previous_signature = "";
        for (index, record) in self.records.iter().enumerate() {
            if record.sequence != index as u64 {
                return Err(PolicyError::IntegrityViolation {
                    sequence: record.sequence,
                    reason: format!("sequence gap at position {index}"),
                });
            }
            if record.previous_signature != previous_signature {
                return Err(PolicyError::IntegrityViolation {
                    sequence: record.sequence,
                    reason: "chain link does not match previous record".to_string(),
                });
            }
            Self::verify_record(record)?;
            previous_signature = &record.signature;
        }
        Ok(())
    }

    /// Stream the log as JSON lines without materializing a second copy
    pub fn export_json_lines<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        for record in &self.records {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log(n: usize) -> AuditLog {
        let mut log = AuditLog::new();
        for i in 0..n {
            log.append(AuditEvent::summary(
                AuditEventKind::TargetEvaluation,
                format!("rule-{i}"),
                "allowed",
            ));
        }
        log
    }

    #[test]
    fn test_chain_verifies() {
        let log = sample_log(5);
        assert!(log.verify_integrity().is_ok());
    }

    #[test]
    fn test_empty_log_verifies() {
        assert!(AuditLog::new().verify_integrity().is_ok());
    }

    #[test]
    fn test_content_tamper_detected() {
        let mut log = sample_log(5);
        log.records[2].decision = "denied".to_string();
        assert!(log.verify_integrity().is_err());
        assert!(AuditLog::verify_record(&log.records[2]).is_err());
    }

    #[test]
    fn test_signature_tamper_detected() {
        let mut log = sample_log(5);
        log.records[3].signature = format!("{}00", &log.records[3].signature[..62]);
        assert!(log.verify_integrity().is_err());
    }

    #[test]
    fn test_reorder_detected() {
        let mut log = sample_log(5);
        log.records.swap(1, 2);
        assert!(log.verify_integrity().is_err());
    }

    #[test]
    fn test_removal_detected() {
        let mut log = sample_log(5);
        log.records.remove(2);
        assert!(log.verify_integrity().is_err());
    }

    #[test]
    fn test_export_json_lines() {
        let log = sample_log(3);
        let mut buffer = Vec::new();
        log.export_json_lines(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 3);
        for line in text.lines() {
            let parsed: AuditRecord = serde_json::from_str(line).unwrap();
            assert!(AuditLog::verify_record(&parsed).is_ok());
        }
    }
}
