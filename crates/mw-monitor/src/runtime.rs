//! Production wiring shared by the daemon and the CLI.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mw_config::secrets::Secrets;
use mw_config::MonitorConfig;
use mw_fetch::{FetchPolicy, HttpFetcher, TokioSleeper};
use mw_notify::ChatNotifier;
use mw_snapshot::FileSnapshotStore;
use mw_sources::SourceRegistry;
use tracing::info;

use crate::{CycleSettings, Orchestrator};

/// Every env var name the process needs: registry placeholders plus the
/// notifier's token and chat-id variables.
pub fn runtime_secret_names(cfg: &MonitorConfig, registry: &SourceRegistry) -> BTreeSet<String> {
    let mut names = registry.secret_names();
    names.insert(cfg.notify.bot_token_env.clone());
    names.insert(cfg.notify.chat_id_env.clone());
    names
}

pub struct Runtime {
    pub orchestrator: Arc<Orchestrator>,
    /// `None` when the scheduler is disabled.
    pub schedule: Option<Duration>,
}

impl Runtime {
    /// Wire HTTP fetcher, file store and chat notifier around `secrets`.
    pub fn from_config(cfg: &MonitorConfig, secrets: Secrets) -> Result<Self> {
        let registry = SourceRegistry::from_config(cfg).context("source registry invalid")?;
        Self::build(cfg, Arc::new(registry), secrets)
    }

    /// Like [`Runtime::from_config`], resolving secrets from the process env.
    pub fn from_env(cfg: &MonitorConfig) -> Result<Self> {
        let registry = SourceRegistry::from_config(cfg).context("source registry invalid")?;
        let secrets = Secrets::from_env(runtime_secret_names(cfg, &registry));
        Self::build(cfg, Arc::new(registry), secrets)
    }

    fn build(cfg: &MonitorConfig, registry: Arc<SourceRegistry>, secrets: Secrets) -> Result<Self> {
        let sleeper = Arc::new(TokioSleeper);
        let fetcher = HttpFetcher::new(FetchPolicy::from_config(&cfg.monitor), sleeper.clone())
            .context("http fetcher init failed")?;
        let notifier = ChatNotifier::from_config(&cfg.notify, &secrets)?;
        let store = FileSnapshotStore::new(&cfg.store.dir);

        info!(
            sources = registry.len(),
            secrets = secrets.len(),
            notifier_configured = notifier.is_configured(),
            store_dir = %cfg.store.dir,
            "runtime wired"
        );

        let orchestrator = Orchestrator::new(
            registry,
            Arc::new(secrets),
            Arc::new(fetcher),
            Arc::new(store),
            Arc::new(notifier),
        )
        .with_settings(CycleSettings::from_config(&cfg.monitor))
        .with_sleeper(sleeper);

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            schedule: cfg.schedule.interval(),
        })
    }
}
