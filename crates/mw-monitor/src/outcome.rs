//! Per-source outcomes and the cycle report built from them.

use chrono::{DateTime, Utc};
use mw_diff::ChangeSet;
use serde::Serialize;
use uuid::Uuid;

/// Final result of reconciling one source within one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SourceOutcome {
    Success {
        #[serde(rename = "provider")]
        source_id: String,
        name: String,
        count: usize,
        changes: ChangeSet,
        /// True when a snapshot was written (and a notification sent).
        published: bool,
        timestamp: DateTime<Utc>,
    },
    Failure {
        #[serde(rename = "provider")]
        source_id: String,
        name: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl SourceOutcome {
    pub fn source_id(&self) -> &str {
        match self {
            SourceOutcome::Success { source_id, .. } | SourceOutcome::Failure { source_id, .. } => {
                source_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SourceOutcome::Success { .. })
    }

    pub fn changes(&self) -> Option<&ChangeSet> {
        match self {
            SourceOutcome::Success { changes, .. } => Some(changes),
            SourceOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SourceOutcome::Failure { error, .. } => Some(error),
            SourceOutcome::Success { .. } => None,
        }
    }
}

/// A registered source left out of the cycle for lack of secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    #[serde(rename = "provider")]
    pub source_id: String,
    pub name: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Outcomes whose change set has `has_changes`; first observations excluded.
    pub changed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Registry order, configured sources only.
    pub outcomes: Vec<SourceOutcome>,
    pub skipped: Vec<SkippedSource>,
}

impl CycleReport {
    pub fn summary(&self) -> CycleSummary {
        let successful = self.outcomes.iter().filter(|o| o.is_success()).count();
        let changed = self
            .outcomes
            .iter()
            .filter_map(SourceOutcome::changes)
            .filter(|c| c.has_changes)
            .count();
        CycleSummary {
            total: self.outcomes.len(),
            successful,
            failed: self.outcomes.len() - successful,
            changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mw_schemas::Resource;

    fn ok(id: &str, first: bool, has_changes: bool) -> SourceOutcome {
        SourceOutcome::Success {
            source_id: id.to_string(),
            name: id.to_string(),
            count: 1,
            changes: ChangeSet {
                added: vec![Resource::new("m", "m")],
                removed: vec![],
                is_first_observation: first,
                has_changes,
            },
            published: first || has_changes,
            timestamp: Utc::now(),
        }
    }

    fn failed(id: &str) -> SourceOutcome {
        SourceOutcome::Failure {
            source_id: id.to_string(),
            name: id.to_string(),
            error: "HTTP 500: Internal Server Error".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn summary_counts() {
        let now = Utc::now();
        let report = CycleReport {
            cycle_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            outcomes: vec![ok("a", true, false), ok("b", false, true), ok("c", false, false), failed("d")],
            skipped: vec![],
        };
        assert_eq!(
            report.summary(),
            CycleSummary {
                total: 4,
                successful: 3,
                failed: 1,
                changed: 1
            }
        );
    }

    #[test]
    fn outcome_serializes_with_tag_and_provider_key() {
        let v = serde_json::to_value(failed("openai")).unwrap();
        assert_eq!(v["outcome"], "failure");
        assert_eq!(v["provider"], "openai");
        assert_eq!(v["error"], "HTTP 500: Internal Server Error");

        let v = serde_json::to_value(ok("openai", true, false)).unwrap();
        assert_eq!(v["outcome"], "success");
        assert_eq!(v["changes"]["is_first_observation"], true);
    }
}
