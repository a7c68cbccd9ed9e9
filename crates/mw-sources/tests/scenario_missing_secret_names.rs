//! A source's missing secret names are exactly `required \ present`.
//!
//! GREEN when, for every built-in source and several secret subsets:
//! - `missing_secret_names` == `required_secret_names` minus the present names
//! - `is_configured` is true iff that difference is empty

use std::collections::BTreeSet;

use mw_config::secrets::Secrets;
use mw_sources::{is_configured, missing_secret_names, required_secret_names, SourceRegistry};

fn subsets() -> Vec<Secrets> {
    vec![
        Secrets::empty(),
        Secrets::from_pairs([("OPENAI_API_KEY", "k1")]),
        Secrets::from_pairs([("OPENAI_API_KEY", "k1"), ("ANTHROPIC_API_KEY", "k2")]),
        Secrets::from_pairs([("GROQ_API_KEY", "k3"), ("UNRELATED", "x")]),
    ]
}

#[test]
fn missing_equals_required_minus_present() {
    let reg = SourceRegistry::builtin().unwrap();

    for secrets in subsets() {
        let present: BTreeSet<String> = secrets.names().map(str::to_string).collect();
        for d in reg.iter() {
            let required = required_secret_names(d);
            let expected: BTreeSet<String> = required.difference(&present).cloned().collect();
            let missing = missing_secret_names(d, &secrets);

            assert_eq!(missing, expected, "source {}", d.id);
            assert_eq!(is_configured(d, &secrets), expected.is_empty(), "source {}", d.id);
        }
    }
}

#[test]
fn only_openai_configured_with_openai_key() {
    let reg = SourceRegistry::builtin().unwrap();
    let secrets = Secrets::from_pairs([("OPENAI_API_KEY", "k1")]);

    let configured: Vec<&str> = reg
        .iter()
        .filter(|d| is_configured(d, &secrets))
        .map(|d| d.id.as_str())
        .collect();
    assert_eq!(configured, vec!["openai"]);
}
