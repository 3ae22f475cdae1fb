//! Postgres-backed HandStore scenarios.
//!
//! DB-backed tests, skipped if HHR_DATABASE_URL is not set.

use hhr_db::{HandStore, InsertOutcome, PgHandStore};
use hhr_testkit::{normalized, showdown_hand, HandPayload};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn store_or_skip() -> anyhow::Result<Option<PgHandStore>> {
    let url = match std::env::var(hhr_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: HHR_DATABASE_URL not set");
            return Ok(None);
        }
    };
    let pool = PgPoolOptions::new().max_connections(4).connect(&url).await?;
    hhr_db::migrate(&pool).await?;
    Ok(Some(PgHandStore::new(pool)))
}

/// Unique per run so repeated test runs never collide on external ids.
fn unique_external_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

#[tokio::test]
async fn migrate_is_idempotent() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };
    hhr_db::migrate(store.pool()).await?;
    let st = hhr_db::status(store.pool()).await?;
    assert!(st.ok);
    assert!(st.has_hands_table);
    Ok(())
}

#[tokio::test]
async fn roundtrip_preserves_entities() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };
    let mut v = showdown_hand()?;
    v["id"] = serde_json::json!(unique_external_id("PG-RT"));
    let n = normalized(&v, 0)?;

    assert_eq!(
        store.insert_hand(&n).await?,
        InsertOutcome::Inserted { hand_id: n.hand.id }
    );

    let full = store.fetch_hand(n.hand.id).await?.expect("stored");
    assert_eq!(full.hand.table_name, "Menkalinan");
    assert_eq!(full.players.len(), 5);
    assert_eq!(full.actions.len(), n.actions.len());
    assert_eq!(full.community_cards, n.community_cards);
    let shown = full
        .players
        .iter()
        .filter(|p| p.cards.is_some())
        .count();
    assert_eq!(shown, 2);

    let keys: Vec<_> = full.actions.iter().map(|a| a.action.order_key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    Ok(())
}

#[tokio::test]
async fn list_page_keeps_each_hands_rows_apart() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };
    // Later than anything a previous run stored, so these two head page 0.
    let base = 10_000_000_000 + std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs() as i64;

    let mut v = showdown_hand()?;
    v["id"] = serde_json::json!(unique_external_id("PG-LIST-A"));
    let big = normalized(&v, base)?;
    let small = normalized(
        &HandPayload::heads_up(&unique_external_id("PG-LIST-B"))
            .action("preflop", "sb", "Fold", None)
            .build(),
        base + 1,
    )?;
    store.insert_hand(&big).await?;
    store.insert_hand(&small).await?;

    let page = store.list_hands(0, 2).await?;
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].hand.id, small.hand.id);
    assert_eq!(page[1].hand.id, big.hand.id);

    assert_eq!(page[0].players.len(), 2);
    assert_eq!(page[0].actions.len(), 3);
    assert!(page[0].community_cards.is_none());
    assert!(page[0].players.iter().all(|p| p.cards.is_none()));

    assert_eq!(page[1].players.len(), 5);
    assert_eq!(page[1].actions.len(), big.actions.len());
    assert_eq!(page[1].community_cards, big.community_cards);
    assert_eq!(page[1].players.iter().filter(|p| p.cards.is_some()).count(), 2);
    assert!(page[1].actions.iter().all(|a| a.action.hand_id == big.hand.id));

    // Same hand through both read paths.
    assert_eq!(store.fetch_hand(big.hand.id).await?.as_ref(), Some(&page[1]));
    Ok(())
}

#[tokio::test]
async fn unique_external_id_closes_the_race() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };
    let ext = unique_external_id("PG-DUP");
    let a = normalized(&HandPayload::heads_up(&ext).build(), 0)?;
    let b = normalized(&HandPayload::heads_up(&ext).build(), 1)?;

    // Both callers passed the lookup; only the first insert may win.
    store.insert_hand(&a).await?;
    assert_eq!(
        store.insert_hand(&b).await?,
        InsertOutcome::Duplicate { existing: a.hand.id }
    );
    assert!(store.fetch_hand(b.hand.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn check_constraints_reject_bad_rows() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };
    let n = normalized(
        &HandPayload::heads_up(&unique_external_id("PG-CHK")).build(),
        0,
    )?;
    store.insert_hand(&n).await?;

    let err = sqlx::query(
        "insert into actions (id, hand_id, hand_player_id, street, sequence, name) \
         values ($1, $2, $3, 9, 0, 'Fold')",
    )
    .bind(Uuid::new_v4())
    .bind(n.hand.id)
    .bind(n.players[0].id)
    .execute(store.pool())
    .await
    .expect_err("street 9 must be rejected");
    if let sqlx::Error::Database(db) = &err {
        assert_eq!(db.code().as_deref(), Some("23514"));
    } else {
        panic!("expected check violation, got {err:?}");
    }
    Ok(())
}
