//! mw-config
//!
//! Layered YAML configuration for the catalog monitor.
//!
//! # Contract
//! - YAML documents are merged in order: earlier docs are base, later docs override.
//! - The merged tree is checked for literal credentials before anything else sees it.
//!   Header templates reference secrets by `{{NAME}}` placeholder only.
//! - The canonical JSON of the merged tree is hashed (SHA-256, hex) so operators
//!   can tell which configuration a running daemon was started with.
//! - The merged tree is then deserialized into [`MonitorConfig`]; unknown keys fail.

pub mod secrets;

use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Env var holding comma-separated config paths, merged in order.
pub const ENV_CONFIG_PATHS: &str = "MW_CONFIG";

/// Known credential prefixes. A leaf string containing a token that starts with
/// one of these aborts loading with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI / Anthropic / DeepSeek style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "gsk_",       // Groq
    "xai-",       // xAI
    "AIza",       // Google API keys
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
];

// ---------------------------------------------------------------------------
// Typed configuration
// ---------------------------------------------------------------------------

/// Cycle tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleConfig {
    /// Hard wall-clock bound on one HTTP GET.
    pub request_timeout_ms: u64,
    /// Sources polled concurrently per batch. Must be >= 1.
    pub batch_size: usize,
    /// Pause between consecutive batches (none after the last one).
    pub batch_delay_ms: u64,
    /// Extra attempts after a failed fetch. 0 = single attempt.
    pub max_retries: u32,
    /// Fixed wait before each retry.
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            batch_size: 5,
            batch_delay_ms: 1_000,
            max_retries: 0,
            retry_delay_ms: 2_000,
            user_agent: "Mozilla/5.0 (compatible; LLMModelMonitor/1.0)".to_string(),
        }
    }
}

impl CycleConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Outbound chat channel. Only env var NAMES live here, never values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyConfig {
    pub bot_token_env: String,
    pub chat_id_env: String,
    pub api_base: String,
    /// IANA timezone used for timestamps inside messages.
    pub timezone: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bot_token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            chat_id_env: "TELEGRAM_CHAT_ID".to_string(),
            api_base: "https://api.telegram.org".to_string(),
            timezone: "Asia/Shanghai".to_string(),
        }
    }
}

impl NotifyConfig {
    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| anyhow::anyhow!("CONFIG_INVALID notify.timezone '{}'", self.timezone))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory holding one JSON file per snapshot key.
    pub dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: "./data/snapshots".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Seconds between scheduled cycles. 0 disables the scheduler.
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3_600,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

/// One catalog source as written in configuration.
///
/// Validation (id charset, uniqueness) happens when the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    pub monitor: CycleConfig,
    pub notify: NotifyConfig,
    pub store: StoreConfig,
    pub schedule: ScheduleConfig,
    /// `None` selects the built-in provider table.
    pub sources: Option<Vec<SourceSpec>>,
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.monitor.batch_size == 0 {
            bail!("CONFIG_INVALID monitor.batch_size must be >= 1");
        }
        if self.monitor.request_timeout_ms == 0 {
            bail!("CONFIG_INVALID monitor.request_timeout_ms must be > 0");
        }
        self.notify.timezone()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
    pub config: MonitorConfig,
}

/// Load config from the paths listed in `MW_CONFIG`; defaults when unset.
pub fn load_from_env() -> Result<LoadedConfig> {
    let raw = std::env::var(ENV_CONFIG_PATHS).unwrap_or_default();
    let paths: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    load_layered_yaml(&paths)
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty document contributes nothing.
        if v_json.is_null() {
            continue;
        }
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let config: MonitorConfig =
        serde_json::from_value(merged.clone()).context("config does not match schema")?;
    config.validate()?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
        config,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json's default Map is ordered by key, so this is stable for equal trees.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

/// Header values look like `Bearer <token>`, so every token is checked.
fn looks_like_secret(s: &str) -> bool {
    s.split_whitespace()
        .any(|tok| tok.len() >= 8 && SECRET_PREFIXES.iter().any(|p| tok.starts_with(p)))
}
