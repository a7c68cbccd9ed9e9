//! Scenario: sources missing secrets are skipped before any fetch.
//!
//! GREEN when:
//! - a source missing one or more secrets never appears in fetcher calls;
//! - its reported missing names equal required \ present exactly;
//! - skipped sources contribute no outcome and no notification;
//! - a source with no placeholders at all is always polled.

use std::sync::Arc;

use mw_config::secrets::Secrets;
use mw_monitor::Orchestrator;
use mw_snapshot::MemorySnapshotStore;
use mw_sources::{missing_secret_names, SourceDescriptor, SourceRegistry};
use mw_testkit::{RecordingNotifier, RecordingSleeper, ScriptedFetcher};

#[tokio::test]
async fn missing_secrets_mean_no_fetch_and_exact_missing_names() {
    let registry = SourceRegistry::new(vec![
        SourceDescriptor::new("ready", "Ready", "http://ready.invalid")
            .with_header("Authorization", "Bearer {{READY_KEY}}"),
        SourceDescriptor::new("half", "Half", "http://half.invalid")
            .with_header("Authorization", "Basic {{HALF_USER}}:{{HALF_PASS}}")
            .with_header("X-Org", "{{HALF_ORG}}"),
        SourceDescriptor::new("public", "Public", "http://public.invalid"),
        SourceDescriptor::new("none", "None", "http://none.invalid")
            .with_header("Authorization", "Bearer {{NONE_KEY}}"),
    ])
    .unwrap();
    let secrets = Secrets::from_pairs([
        ("READY_KEY", "r"),
        ("HALF_USER", "u"),
        ("NONE_KEY", "   "), // blank counts as absent
    ]);

    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .catalog("ready", &["a"])
            .catalog("public", &["b"]),
    );
    let notifier = Arc::new(RecordingNotifier::new());
    let orch = Orchestrator::new(
        Arc::new(registry.clone()),
        Arc::new(secrets.clone()),
        fetcher.clone(),
        Arc::new(MemorySnapshotStore::new()),
        notifier.clone(),
    )
    .with_sleeper(Arc::new(RecordingSleeper::new()));

    let report = orch.run().await;

    assert_eq!(fetcher.calls(), vec!["ready", "public"]);
    assert_eq!(
        report
            .outcomes
            .iter()
            .map(|o| o.source_id())
            .collect::<Vec<_>>(),
        vec!["ready", "public"]
    );

    let skipped: Vec<(&str, Vec<&str>)> = report
        .skipped
        .iter()
        .map(|s| (s.source_id.as_str(), s.missing.iter().map(String::as_str).collect()))
        .collect();
    assert_eq!(
        skipped,
        vec![
            ("half", vec!["HALF_ORG", "HALF_PASS"]),
            ("none", vec!["NONE_KEY"]),
        ]
    );

    // same answer as the resolver's own set difference
    for s in &report.skipped {
        let d = registry.get(&s.source_id).unwrap();
        let expected: Vec<String> = missing_secret_names(d, &secrets).into_iter().collect();
        assert_eq!(s.missing, expected);
    }

    // only the two polled sources produced (first-observation) notifications
    assert_eq!(notifier.sent().len(), 2);
}
