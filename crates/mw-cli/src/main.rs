use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use mw_config::secrets::Secrets;
use mw_config::LoadedConfig;
use mw_monitor::{runtime_secret_names, Runtime};
use mw_sources::{missing_secret_names, SourceRegistry};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "mw")]
#[command(about = "modelwatch operator CLI", long_about = None)]
struct Cli {
    /// Config paths in merge order (base -> overrides). Falls back to MW_CONFIG.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one monitoring cycle now and print its summary
    Run,

    /// Print per-source status from the snapshot store
    Status,

    /// Delete every stored snapshot. Guardrail: refuses unless --yes is provided.
    Clear {
        /// Acknowledge that all change history will be lost.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// List registered sources with their credential state
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present; silent otherwise.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run => {
            let loaded = load_config(&cli.config_paths)?;
            let runtime = Runtime::from_env(&loaded.config)?;
            let report = runtime.orchestrator.run().await;
            print_json(&json!({
                "success": true,
                "cycle_id": report.cycle_id,
                "timestamp": report.finished_at,
                "summary": report.summary(),
                "results": report.outcomes,
                "skipped": report.skipped,
            }))?;
        }

        Commands::Status => {
            let loaded = load_config(&cli.config_paths)?;
            let runtime = Runtime::from_env(&loaded.config)?;
            let report = runtime
                .orchestrator
                .status()
                .await
                .context("status failed")?;
            print_json(&json!({
                "success": true,
                "timestamp": report.timestamp,
                "config_hash": loaded.config_hash,
                "providers": report.providers,
            }))?;
        }

        Commands::Clear { yes } => {
            if !yes {
                bail!("REFUSING clear: all stored snapshots would be deleted. Re-run with --yes.");
            }
            let loaded = load_config(&cli.config_paths)?;
            let runtime = Runtime::from_env(&loaded.config)?;
            let removed = runtime
                .orchestrator
                .clear_all()
                .await
                .context("clear failed")?;
            print_json(&json!({
                "success": true,
                "message": "All cached data cleared",
                "removed": removed,
                "timestamp": Utc::now(),
            }))?;
        }

        Commands::Sources => {
            let loaded = load_config(&cli.config_paths)?;
            let registry =
                SourceRegistry::from_config(&loaded.config).context("source registry invalid")?;
            let secrets = Secrets::from_env(runtime_secret_names(&loaded.config, &registry));

            let rows: Vec<Value> = registry
                .iter()
                .map(|s| {
                    let missing = missing_secret_names(s, &secrets);
                    json!({
                        "id": s.id,
                        "name": s.display_name,
                        "endpoint": s.endpoint,
                        "configured": missing.is_empty(),
                        "missing": missing,
                    })
                })
                .collect();
            print_json(&json!({ "count": rows.len(), "sources": rows }))?;
        }
    }

    Ok(())
}

fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    if paths.is_empty() {
        return mw_config::load_from_env().context("load config from MW_CONFIG");
    }
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    mw_config::load_layered_yaml(&refs).context("load config")
}

// stdout carries JSON only; logs go to stderr.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
