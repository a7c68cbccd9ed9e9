//! Runtime secret resolution.
//!
//! # Contract
//! - Configuration stores only env var NAMES (placeholders such as `{{OPENAI_API_KEY}}`
//!   and the `notify.*_env` keys).
//! - At startup, callers build one [`Secrets`] for exactly the names they need and
//!   pass it into constructors; never scatter `std::env::var` calls across crates.
//! - A blank value counts as absent.
//! - `Debug` redacts every value. Errors and logs name variables, never values.

use std::collections::BTreeMap;

/// Name -> value map of resolved secrets.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    values: BTreeMap<String, String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut m = f.debug_map();
        for k in self.values.keys() {
            m.entry(k, &"<REDACTED>");
        }
        m.finish()
    }
}

impl Secrets {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve each named variable from the process environment.
    /// Unset or blank variables are simply left out.
    pub fn from_env<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = names
            .into_iter()
            .filter_map(|n| {
                let name = n.as_ref();
                resolve_env(name).map(|v| (name.to_string(), v))
            })
            .collect();
        Self { values }
    }

    /// Build from explicit pairs (tests, embedding). Blank values are dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolve a named environment variable.
/// Returns `None` if the variable is unset or its value is blank.
pub fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_pairs_are_absent() {
        let s = Secrets::from_pairs([("A", "x"), ("B", "   "), ("C", "")]);
        assert!(s.contains("A"));
        assert!(!s.contains("B"));
        assert!(!s.contains("C"));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn debug_redacts_values() {
        let s = Secrets::from_pairs([("OPENAI_API_KEY", "super-secret-value")]);
        let dbg = format!("{s:?}");
        assert!(dbg.contains("OPENAI_API_KEY"));
        assert!(dbg.contains("<REDACTED>"));
        assert!(!dbg.contains("super-secret-value"));
    }

    #[test]
    fn unset_env_names_are_skipped() {
        // Sentinel name guaranteed unset in any CI; avoids set_var races.
        let s = Secrets::from_env(["MW_SENTINEL_NEVER_SET_7F3A"]);
        assert!(s.is_empty());
    }
}
