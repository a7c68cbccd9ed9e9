//! mw-sources
//!
//! Source registry and credential resolution.
//!
//! The registry is an immutable table built once at startup (from configuration
//! or the built-in provider list) and shared read-only. Nothing mutates it after
//! construction; tests build their own registries with synthetic sources.

mod credentials;

use std::collections::{BTreeMap, BTreeSet};

use mw_config::{MonitorConfig, SourceSpec};
use thiserror::Error;

pub use credentials::{
    is_configured, missing_secret_names, required_secret_names, resolve_headers,
};

const BUILTIN_SOURCES_YAML: &str = include_str!("builtin_sources.yaml");

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// One polled catalog endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    /// Unique id; also the store key suffix, so restricted to `[A-Za-z0-9_-]`.
    pub id: String,
    pub display_name: String,
    pub endpoint: String,
    /// Header name -> value template; values may contain `{{NAME}}` placeholders.
    pub header_templates: BTreeMap<String, String>,
}

impl SourceDescriptor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            endpoint: endpoint.into(),
            header_templates: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.header_templates.insert(name.into(), template.into());
        self
    }
}

impl From<&SourceSpec> for SourceDescriptor {
    fn from(spec: &SourceSpec) -> Self {
        Self {
            id: spec.id.clone(),
            display_name: spec.name.clone(),
            endpoint: spec.endpoint.clone(),
            header_templates: spec.headers.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("source id must not be empty")]
    EmptyId,
    #[error("source id '{0}' contains characters outside [A-Za-z0-9_-]")]
    InvalidId(String),
    #[error("duplicate source id '{0}'")]
    DuplicateId(String),
    #[error("source '{0}' has an empty endpoint")]
    EmptyEndpoint(String),
    #[error("built-in source table is malformed: {0}")]
    Builtin(String),
}

/// Ordered, validated, immutable set of sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self, RegistryError> {
        let mut seen = BTreeSet::new();
        for s in &sources {
            validate_id(&s.id)?;
            if s.endpoint.trim().is_empty() {
                return Err(RegistryError::EmptyEndpoint(s.id.clone()));
            }
            if !seen.insert(s.id.as_str()) {
                return Err(RegistryError::DuplicateId(s.id.clone()));
            }
        }
        Ok(Self { sources })
    }

    pub fn from_specs(specs: &[SourceSpec]) -> Result<Self, RegistryError> {
        Self::new(specs.iter().map(SourceDescriptor::from).collect())
    }

    /// The provider table compiled into the binary.
    pub fn builtin() -> Result<Self, RegistryError> {
        let specs: Vec<SourceSpec> = serde_yaml::from_str(BUILTIN_SOURCES_YAML)
            .map_err(|e| RegistryError::Builtin(e.to_string()))?;
        Self::from_specs(&specs)
    }

    /// Configured sources when present, built-in table otherwise.
    pub fn from_config(cfg: &MonitorConfig) -> Result<Self, RegistryError> {
        match &cfg.sources {
            Some(specs) => Self::from_specs(specs),
            None => Self::builtin(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Every placeholder name referenced by any source (what to read from env).
    pub fn secret_names(&self) -> BTreeSet<String> {
        self.sources
            .iter()
            .flat_map(required_secret_names)
            .collect()
    }
}

fn validate_id(id: &str) -> Result<(), RegistryError> {
    if id.is_empty() {
        return Err(RegistryError::EmptyId);
    }
    let ok = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !ok {
        return Err(RegistryError::InvalidId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_valid_and_ordered() {
        let reg = SourceRegistry::builtin().unwrap();
        assert_eq!(reg.len(), 16);
        let ids: Vec<&str> = reg.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"openai"));
        assert_eq!(ids.last(), Some(&"gemini"));

        let anthropic = reg.get("anthropic").unwrap();
        assert_eq!(
            anthropic.header_templates.get("anthropic-version").map(String::as_str),
            Some("2023-06-01")
        );
    }

    #[test]
    fn builtin_secret_names_cover_every_provider() {
        let names = SourceRegistry::builtin().unwrap().secret_names();
        assert!(names.contains("OPENAI_API_KEY"));
        assert!(names.contains("ANTHROPIC_API_KEY"));
        assert!(names.contains("GEMINI_API_KEY"));
        assert_eq!(names.len(), 16);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = SourceRegistry::new(vec![
            SourceDescriptor::new("a", "A", "http://a"),
            SourceDescriptor::new("a", "A again", "http://a2"),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId("a".to_string()));
    }

    #[test]
    fn ids_must_be_key_safe() {
        let err = SourceRegistry::new(vec![SourceDescriptor::new("../etc", "x", "http://x")])
            .unwrap_err();
        assert_eq!(err, RegistryError::InvalidId("../etc".to_string()));

        let err = SourceRegistry::new(vec![SourceDescriptor::new("", "x", "http://x")]).unwrap_err();
        assert_eq!(err, RegistryError::EmptyId);
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let err = SourceRegistry::new(vec![SourceDescriptor::new("a", "A", "  ")]).unwrap_err();
        assert_eq!(err, RegistryError::EmptyEndpoint("a".to_string()));
    }
}
