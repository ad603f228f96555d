//! Append-only audit trail of a synthesis run's privacy accounting.
//!
//! Every orchestrator transition appends exactly one [`AuditRecord`] and emits
//! one `info` event on the [`AUDIT_TARGET`] target carrying the same numbers.

use std::fmt;
use std::time::SystemTime;

use serde::Serialize;
use tracing::info;

use netdpsyn_accounting::{PrivacyBudget, StageRatios};

/// `tracing` target of audit events.
pub const AUDIT_TARGET: &str = "netdpsyn::audit";

/// State a run has reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Dataset loaded, nothing spent.
    Initialized,
    /// Rho split across stages.
    BudgetAllocated,
    /// Marginal set fixed.
    MarginalsSelected,
    /// Binning sigma derived.
    SigmaCalibrated,
    /// Attributes recoded.
    AttributesRecoded,
    /// Accounting verified.
    Complete,
}

impl RunState {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Initialized => "initialized",
            RunState::BudgetAllocated => "budget_allocated",
            RunState::MarginalsSelected => "marginals_selected",
            RunState::SigmaCalibrated => "sigma_calibrated",
            RunState::AttributesRecoded => "attributes_recoded",
            RunState::Complete => "complete",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of every budget number at one transition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditRecord {
    /// Position in the trail, from zero.
    pub sequence: usize,
    /// State entered.
    pub state: RunState,
    /// Wall-clock time of the transition.
    pub timestamp: SystemTime,
    /// Dataset the run is synthesizing.
    pub dataset_name: String,
    /// Target epsilon.
    pub epsilon: f64,
    /// Target delta.
    pub delta: f64,
    /// Total rho.
    pub total_rho: f64,
    /// Binning rho.
    pub binning_rho: f64,
    /// Selection rho.
    pub selection_rho: f64,
    /// Publish rho.
    pub publish_rho: f64,
    /// Ratios the split used.
    pub ratios: StageRatios,
    /// Whether the configured ratios were rescaled.
    pub ratios_normalized: bool,
    /// Configured ratios, when they differ from `ratios`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_ratios: Option<StageRatios>,
    /// Binning noise scale, once calibrated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binning_sigma: Option<f64>,
    /// Free-form context for the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AuditRecord {
    /// Record for `state` from the run's budget.
    pub(crate) fn snapshot(
        state: RunState,
        dataset_name: &str,
        budget: &PrivacyBudget,
        binning_sigma: Option<f64>,
    ) -> Self {
        let rho = budget.rho();
        Self {
            sequence: 0,
            state,
            timestamp: SystemTime::now(),
            dataset_name: dataset_name.to_string(),
            epsilon: budget.params().epsilon(),
            delta: budget.params().delta(),
            total_rho: rho.total(),
            binning_rho: rho.binning(),
            selection_rho: rho.selection(),
            publish_rho: rho.publish(),
            ratios: rho.ratios(),
            ratios_normalized: rho.was_normalized(),
            requested_ratios: rho.normalization().map(|n| n.requested),
            binning_sigma,
            note: None,
        }
    }

    pub(crate) fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// The records of one run, in order. Records are never modified once appended.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AuditTrail {
    records: Vec<AuditRecord>,
}

impl AuditTrail {
    /// Empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, mut record: AuditRecord) {
        record.sequence = self.records.len();
        info!(
            target: AUDIT_TARGET,
            sequence = record.sequence,
            state = record.state.as_str(),
            dataset = %record.dataset_name,
            epsilon = record.epsilon,
            delta = record.delta,
            total_rho = record.total_rho,
            binning_rho = record.binning_rho,
            selection_rho = record.selection_rho,
            publish_rho = record.publish_rho,
            ratios_normalized = record.ratios_normalized,
            binning_sigma = ?record.binning_sigma,
            note = ?record.note,
            "privacy accounting"
        );
        self.records.push(record);
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&AuditRecord> {
        self.records.last()
    }

    /// Record for `state`, if the run reached it.
    pub fn find(&self, state: RunState) -> Option<&AuditRecord> {
        self.records.iter().find(|r| r.state == state)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One JSON object per line.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdpsyn_accounting::{CompositionAccountant, PrivacyParameters};

    fn budget(ratios: StageRatios) -> PrivacyBudget {
        let params = PrivacyParameters::new(2.0, 1e-10, 1.0).expect("params");
        PrivacyBudget::allocate(params, ratios, &CompositionAccountant::default(), 1)
            .expect("budget")
    }

    #[test]
    fn append_assigns_sequence() {
        let b = budget(StageRatios::default());
        let mut trail = AuditTrail::new();
        trail.append(AuditRecord::snapshot(RunState::BudgetAllocated, "flows", &b, None));
        trail.append(AuditRecord::snapshot(RunState::SigmaCalibrated, "flows", &b, Some(3.0)));
        assert_eq!(trail.len(), 2);
        assert_eq!(trail.records()[1].sequence, 1);
        assert_eq!(trail.last().and_then(|r| r.binning_sigma), Some(3.0));
        assert!(trail.find(RunState::Complete).is_none());
    }

    #[test]
    fn normalization_is_visible_in_records() {
        let b = budget(StageRatios::new(0.2, 0.2, 0.2));
        let record = AuditRecord::snapshot(RunState::BudgetAllocated, "flows", &b, None);
        assert!(record.ratios_normalized);
        assert_eq!(record.requested_ratios, Some(StageRatios::new(0.2, 0.2, 0.2)));
        assert!((record.ratios.binning - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn json_lines_have_one_object_per_record() {
        let b = budget(StageRatios::default());
        let mut trail = AuditTrail::new();
        trail.append(AuditRecord::snapshot(RunState::BudgetAllocated, "flows", &b, None));
        trail.append(
            AuditRecord::snapshot(RunState::Complete, "flows", &b, Some(1.5)).with_note("done"),
        );
        let text = trail.to_json_lines().expect("json");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let last: serde_json::Value = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(last["state"], "complete");
        assert_eq!(last["binning_sigma"], 1.5);
        assert_eq!(last["note"], "done");
        assert!(last.get("requested_ratios").is_none());
    }
}
