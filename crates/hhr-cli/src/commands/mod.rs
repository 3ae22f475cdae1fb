//! Command handler modules for hhr-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod hand;

use anyhow::{Context, Result};
use hhr_config::{
    load_layered_yaml, paths_from_env, report_unused_keys, split_paths, ConfigConsumer,
    DeskConfig, UnusedKeyPolicy,
};
use hhr_db::PgPool;
use serde_json::Value;
use std::fs;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

/// `--config` wins over HHR_CONFIG; no layers at all means defaults.
pub fn load_cli_config(flag: Option<&str>) -> Result<DeskConfig> {
    let paths: Vec<String> = match flag {
        Some(v) => split_paths(v),
        None => paths_from_env(),
    };
    if paths.is_empty() {
        return Ok(DeskConfig::default());
    }

    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&refs)?;

    let report = report_unused_keys(ConfigConsumer::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        eprintln!(
            "WARN: CONFIG_UNUSED_KEYS consumer={} unused_leaf_keys={}",
            report.consumer,
            report.unused_leaf_pointers.len()
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            eprintln!("  unused={}", p);
        }
    }

    DeskConfig::from_loaded(&loaded)
}

pub async fn connect(cfg: &DeskConfig) -> Result<PgPool> {
    hhr_db::connect_from_env_var(&cfg.database.url_env, cfg.database.max_connections).await
}

/// Read a JSON payload file. A UTF-8 BOM (common from Windows editors) is skipped.
pub fn load_payload_file(path: &str) -> Result<Value> {
    let bytes = fs::read(path).with_context(|| format!("read payload file failed: {}", path))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    let raw = std::str::from_utf8(bytes).context("payload file must be UTF-8 text")?;
    let v: Value = serde_json::from_str(raw.trim()).context("payload file must contain valid JSON")?;
    Ok(v)
}
