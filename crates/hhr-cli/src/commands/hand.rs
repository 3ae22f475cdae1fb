//! Hand-history command handlers.
//!
//! Covers all subcommands of `hhr hand`: replay, ingest, push, recent.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use hhr_config::DeskConfig;
use hhr_db::{HandStore, PgHandStore};
use hhr_ingest::{IngestAck, IngestGate};
use hhr_notify::Broadcaster;
use hhr_schemas::HandFull;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{connect, load_payload_file};

// ---------------------------------------------------------------------------
// hand replay
// ---------------------------------------------------------------------------

/// Normalize a payload file in memory and print its timeline. Nothing touches
/// the database, so this works on a laptop with no Postgres.
pub fn replay_file(path: &str) -> Result<()> {
    let payload = load_payload_file(path)?;
    let normalized = hhr_normalize::normalize_value(&payload, Utc::now())
        .with_context(|| format!("payload {path} is not a valid hand"))?;
    print_timeline(&HandFull::from_normalized(&normalized))
}

pub async fn replay_stored(cfg: &DeskConfig, hand_id: Uuid) -> Result<()> {
    let store = PgHandStore::new(connect(cfg).await?);
    let hand = store
        .fetch_hand(hand_id)
        .await?
        .ok_or_else(|| anyhow!("hand {hand_id} not found"))?;
    print_timeline(&hand)
}

fn print_timeline(hand: &HandFull) -> Result<()> {
    let timeline = hhr_replay::build_timeline(hand);
    let out = serde_json::to_string_pretty(&timeline).context("serialize timeline")?;
    println!("{out}");
    Ok(())
}

// ---------------------------------------------------------------------------
// hand ingest
// ---------------------------------------------------------------------------

/// Runs the same gate the daemon uses. No viewers are attached to this
/// process, so the new-hand notification reaches nobody.
pub async fn ingest_file(cfg: &DeskConfig, path: &str) -> Result<()> {
    let payload = load_payload_file(path)?;
    let store: Arc<dyn HandStore> = Arc::new(PgHandStore::new(connect(cfg).await?));
    let gate = IngestGate::new(store, Broadcaster::default());

    match gate.ingest(&payload).await.context("ingest failed")? {
        IngestAck::Stored { hand_id } => println!("stored=true hand_id={hand_id}"),
        IngestAck::Duplicate { hand_id } => println!("stored=false duplicate_of={hand_id}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// hand push
// ---------------------------------------------------------------------------

pub async fn push_file(cfg: &DeskConfig, path: &str, url: Option<&str>) -> Result<()> {
    let payload = load_payload_file(path)?;
    let base = match url {
        Some(u) => u.to_string(),
        None => format!("http://{}", cfg.server.addr),
    };
    let endpoint = hands_endpoint(&base);
    debug!(%endpoint, "pushing hand");

    let resp = reqwest::Client::new()
        .post(&endpoint)
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("push to {endpoint} failed"))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!(
            "daemon rejected hand status={} message={}",
            status.as_u16(),
            body.trim()
        ));
    }

    println!(
        "pushed=true status={} external_hand_id={}",
        status.as_u16(),
        payload.get("id").and_then(Value::as_str).unwrap_or("")
    );
    Ok(())
}

fn hands_endpoint(base: &str) -> String {
    format!("{}/v1/hands", base.trim_end_matches('/'))
}

// ---------------------------------------------------------------------------
// hand recent
// ---------------------------------------------------------------------------

pub async fn recent(cfg: &DeskConfig) -> Result<()> {
    let store = PgHandStore::new(connect(cfg).await?);
    match store.most_recent_hand().await? {
        Some(hand) => {
            let out = serde_json::to_string_pretty(&hand).context("serialize hand")?;
            println!("{out}");
        }
        None => println!("no hands stored"),
    }
    Ok(())
}
