//! Scenario: identity-only diffing.
//!
//! GREEN when:
//! - added, unchanged and removed partition the union of ids with no overlap;
//! - has_changes == (added non-empty OR removed non-empty);
//! - a metadata-only edit under the same id is NOT reported as a change;
//! - the concrete two-poll sequence (gpt-4, then gpt-4 + gpt-4o) yields exactly
//!   one addition.

use std::collections::BTreeSet;

use chrono::Utc;
use mw_diff::compare;
use mw_schemas::{CreatedAt, FetchSuccess, Resource, Snapshot};

fn fetched(resources: Vec<Resource>) -> FetchSuccess {
    FetchSuccess {
        source_id: "openai".to_string(),
        resources,
        observed_at: Utc::now(),
    }
}

fn ids(names: &[&str]) -> Vec<Resource> {
    names.iter().map(|n| Resource::new(*n, *n)).collect()
}

#[test]
fn partition_holds_across_a_range_of_pairs() {
    let cases: &[(&[&str], &[&str])] = &[
        (&[], &[]),
        (&["a"], &[]),
        (&[], &["a"]),
        (&["a", "b", "c"], &["b", "c", "d"]),
        (&["a", "b"], &["a", "b"]),
        (&["a", "b", "c", "d"], &["e"]),
    ];

    for (prior_ids, current_ids) in cases {
        let prior = Snapshot::from_success(&fetched(ids(prior_ids)));
        let current = fetched(ids(current_ids));
        let cs = compare(Some(&prior), &current);

        let added: BTreeSet<&str> = cs.added.iter().map(|r| r.id.as_str()).collect();
        let removed: BTreeSet<&str> = cs.removed.iter().map(|r| r.id.as_str()).collect();
        let p: BTreeSet<&str> = prior_ids.iter().copied().collect();
        let c: BTreeSet<&str> = current_ids.iter().copied().collect();
        let unchanged: BTreeSet<&str> = p.intersection(&c).copied().collect();

        assert!(added.is_disjoint(&removed));
        assert!(added.is_disjoint(&unchanged));
        assert!(removed.is_disjoint(&unchanged));

        let union: BTreeSet<&str> = p.union(&c).copied().collect();
        let covered: BTreeSet<&str> = added
            .iter()
            .chain(removed.iter())
            .chain(unchanged.iter())
            .copied()
            .collect();
        assert_eq!(covered, union, "prior={prior_ids:?} current={current_ids:?}");

        assert_eq!(cs.has_changes, !cs.added.is_empty() || !cs.removed.is_empty());
        assert!(!cs.is_first_observation);
    }
}

#[test]
fn metadata_change_under_same_id_is_not_a_change() {
    let before = vec![Resource::new("gpt-4", "gpt-4")
        .with_created_at(CreatedAt::Epoch(1))
        .with_owner("openai")];
    let after = vec![Resource::new("gpt-4", "GPT-4 (renamed)")
        .with_created_at(CreatedAt::Epoch(99))
        .with_owner("someone-else")];

    let prior = Snapshot::from_success(&fetched(before));
    let cs = compare(Some(&prior), &fetched(after));

    assert!(!cs.has_changes);
    assert!(!cs.requires_publish());
}

#[test]
fn second_poll_reports_single_addition() {
    let first = fetched(vec![Resource::new("gpt-4", "gpt-4")
        .with_created_at(CreatedAt::Epoch(1))
        .with_owner("openai")]);
    let cs1 = compare(None, &first);
    assert!(cs1.is_first_observation);
    assert_eq!(cs1.added.len(), 1);

    let prior = Snapshot::from_success(&first);
    let second = fetched(vec![
        Resource::new("gpt-4", "gpt-4"),
        Resource::new("gpt-4o", "gpt-4o"),
    ]);
    let cs2 = compare(Some(&prior), &second);

    assert_eq!(cs2.added, vec![Resource::new("gpt-4o", "gpt-4o")]);
    assert!(cs2.removed.is_empty());
    assert!(cs2.has_changes);
}

#[test]
fn change_set_serializes_for_reports() {
    let cs = compare(None, &fetched(ids(&["a"])));
    let v = serde_json::to_value(&cs).unwrap();
    assert_eq!(v["is_first_observation"], true);
    assert_eq!(v["has_changes"], false);
    assert_eq!(v["added"][0]["id"], "a");
}
