//! mw-diff
//!
//! Pure comparison of a source's prior snapshot against a fresh fetch.
//! No IO, no clock.
//!
//! Identity is `Resource::id` alone. A resource whose name, creation time or
//! owner changed under the same id is not a change.

use std::collections::HashSet;

use mw_schemas::{FetchSuccess, Resource, Snapshot};
use serde::Serialize;

/// Delta between the prior snapshot and the current fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// In the current fetch's order.
    pub added: Vec<Resource>,
    /// In the prior snapshot's order.
    pub removed: Vec<Resource>,
    pub is_first_observation: bool,
    /// Always false on a first observation; see [`ChangeSet::requires_publish`].
    pub has_changes: bool,
}

impl ChangeSet {
    /// Notify and persist iff this is true.
    pub fn requires_publish(&self) -> bool {
        self.is_first_observation || self.has_changes
    }
}

/// Compare `prior` (if any) with `current`.
pub fn compare(prior: Option<&Snapshot>, current: &FetchSuccess) -> ChangeSet {
    let Some(prior) = prior else {
        return ChangeSet {
            added: current.resources.clone(),
            removed: Vec::new(),
            is_first_observation: true,
            has_changes: false,
        };
    };

    let prior_ids: HashSet<&str> = prior.resources.iter().map(|r| r.id.as_str()).collect();
    let current_ids: HashSet<&str> = current.resources.iter().map(|r| r.id.as_str()).collect();

    let added: Vec<Resource> = current
        .resources
        .iter()
        .filter(|r| !prior_ids.contains(r.id.as_str()))
        .cloned()
        .collect();
    let removed: Vec<Resource> = prior
        .resources
        .iter()
        .filter(|r| !current_ids.contains(r.id.as_str()))
        .cloned()
        .collect();

    let has_changes = !added.is_empty() || !removed.is_empty();
    ChangeSet {
        added,
        removed,
        is_first_observation: false,
        has_changes,
    }
}
