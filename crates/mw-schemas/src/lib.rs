//! mw-schemas
//!
//! Shared data model for the catalog monitor: the canonical `Resource`, the
//! result of one fetch, and the persisted `Snapshot`.
//!
//! Wire names follow the persisted format (`provider`, `models`, `count`,
//! `timestamp`, `created`, `owned_by`) so stored snapshots stay readable by
//! older deployments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// Creation time as reported upstream.
///
/// Catalog APIs disagree: OpenAI-style lists report epoch seconds, Anthropic
/// reports RFC 3339 strings. Both are kept verbatim; nothing downstream
/// compares them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatedAt {
    Epoch(i64),
    Text(String),
}

impl CreatedAt {
    /// Interpret an arbitrary JSON value as a creation time.
    ///
    /// Fractional epochs are truncated. `null`, booleans, arrays and objects
    /// yield `None`.
    pub fn from_json(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .map(CreatedAt::Epoch),
            Value::String(s) if !s.trim().is_empty() => Some(CreatedAt::Text(s.clone())),
            _ => None,
        }
    }
}

/// One catalog entry. Identity for diffing is `id` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(rename = "created", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<CreatedAt>,
    #[serde(rename = "owned_by", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: None,
            owner: None,
        }
    }

    pub fn with_created_at(mut self, created_at: CreatedAt) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Human label: the name, or the id when the name is blank.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSuccess {
    pub source_id: String,
    pub resources: Vec<Resource>,
    pub observed_at: DateTime<Utc>,
}

impl FetchSuccess {
    pub fn count(&self) -> usize {
        self.resources.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub source_id: String,
    pub message: String,
    pub observed_at: DateTime<Utc>,
}

/// Outcome of polling one source once (after any retries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Success(FetchSuccess),
    Failure(FetchFailure),
}

impl FetchResult {
    pub fn source_id(&self) -> &str {
        match self {
            FetchResult::Success(s) => &s.source_id,
            FetchResult::Failure(f) => &f.source_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success(_))
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Last observed state of one source.
///
/// `resources` is meaningful iff `success`; `error` is present iff not.
/// Only successful snapshots are ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub success: bool,
    #[serde(rename = "provider")]
    pub source_id: String,
    #[serde(rename = "models", default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub count: usize,
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Snapshot {
    pub fn from_success(s: &FetchSuccess) -> Self {
        Self {
            success: true,
            source_id: s.source_id.clone(),
            resources: s.resources.clone(),
            count: s.count(),
            observed_at: s.observed_at,
            error: None,
        }
    }

    pub fn from_failure(f: &FetchFailure) -> Self {
        Self {
            success: false,
            source_id: f.source_id.clone(),
            resources: Vec::new(),
            count: 0,
            observed_at: f.observed_at,
            error: Some(f.message.clone()),
        }
    }
}

impl From<&FetchSuccess> for Snapshot {
    fn from(s: &FetchSuccess) -> Self {
        Snapshot::from_success(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn created_at_accepts_epoch_float_and_text() {
        assert_eq!(CreatedAt::from_json(&json!(17)), Some(CreatedAt::Epoch(17)));
        assert_eq!(
            CreatedAt::from_json(&json!(17.9)),
            Some(CreatedAt::Epoch(17))
        );
        assert_eq!(
            CreatedAt::from_json(&json!("2024-10-22T00:00:00Z")),
            Some(CreatedAt::Text("2024-10-22T00:00:00Z".to_string()))
        );
        assert_eq!(CreatedAt::from_json(&json!(null)), None);
        assert_eq!(CreatedAt::from_json(&json!("  ")), None);
    }

    #[test]
    fn resource_uses_persisted_field_names() {
        let r = Resource::new("gpt-4", "gpt-4")
            .with_created_at(CreatedAt::Epoch(1))
            .with_owner("openai");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            json!({"id": "gpt-4", "name": "gpt-4", "created": 1, "owned_by": "openai"})
        );
    }

    #[test]
    fn resource_label_falls_back_to_id() {
        assert_eq!(Resource::new("m-1", "").label(), "m-1");
        assert_eq!(Resource::new("m-1", "Model One").label(), "Model One");
    }

    #[test]
    fn snapshot_from_success_serializes_to_persisted_shape() {
        let s = FetchSuccess {
            source_id: "openai".to_string(),
            resources: vec![Resource::new("gpt-4", "gpt-4")],
            observed_at: at(1_700_000_000),
        };
        let snap = Snapshot::from_success(&s);
        let v = serde_json::to_value(&snap).unwrap();

        assert_eq!(v["success"], true);
        assert_eq!(v["provider"], "openai");
        assert_eq!(v["count"], 1);
        assert_eq!(v["models"][0]["id"], "gpt-4");
        assert!(v.get("error").is_none());
        assert!(v["timestamp"].is_string());
    }

    #[test]
    fn snapshot_from_failure_carries_error_and_no_resources() {
        let f = FetchFailure {
            source_id: "openai".to_string(),
            message: "HTTP 401: Unauthorized".to_string(),
            observed_at: at(1_700_000_000),
        };
        let snap = Snapshot::from_failure(&f);
        assert!(!snap.success);
        assert!(snap.resources.is_empty());
        assert_eq!(snap.error.as_deref(), Some("HTTP 401: Unauthorized"));
    }
}
