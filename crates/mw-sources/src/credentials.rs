//! Placeholder substitution for header templates.
//!
//! A template value such as `Bearer {{OPENAI_API_KEY}}` references the secret
//! `OPENAI_API_KEY`. Substitution never blanks a value: an unresolved
//! placeholder stays verbatim in the output so the upstream rejects it loudly.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use mw_config::secrets::Secrets;
use regex::{Captures, Regex};
use tracing::debug;

use crate::SourceDescriptor;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([^}]+)\}\}").expect("placeholder pattern is valid"))
}

/// Placeholder names referenced anywhere in the descriptor's header templates.
pub fn required_secret_names(descriptor: &SourceDescriptor) -> BTreeSet<String> {
    descriptor
        .header_templates
        .values()
        .flat_map(|v| {
            placeholder_re()
                .captures_iter(v)
                .map(|c| c[1].to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Header templates with every resolvable placeholder substituted.
pub fn resolve_headers(descriptor: &SourceDescriptor, secrets: &Secrets) -> BTreeMap<String, String> {
    descriptor
        .header_templates
        .iter()
        .map(|(name, template)| {
            let value = placeholder_re().replace_all(template, |c: &Captures<'_>| {
                match secrets.get(&c[1]) {
                    Some(v) => Cow::Owned(v.to_string()),
                    None => {
                        debug!(source = %descriptor.id, secret = &c[1], "secret not found; placeholder left in place");
                        Cow::Owned(c[0].to_string())
                    }
                }
            });
            (name.clone(), value.into_owned())
        })
        .collect()
}

/// Required names the secrets map does not provide.
pub fn missing_secret_names(descriptor: &SourceDescriptor, secrets: &Secrets) -> BTreeSet<String> {
    required_secret_names(descriptor)
        .into_iter()
        .filter(|n| !secrets.contains(n))
        .collect()
}

/// True iff every referenced placeholder has a non-empty secret.
/// A source with no placeholders is always configured.
pub fn is_configured(descriptor: &SourceDescriptor, secrets: &Secrets) -> bool {
    missing_secret_names(descriptor, secrets).is_empty()
}
