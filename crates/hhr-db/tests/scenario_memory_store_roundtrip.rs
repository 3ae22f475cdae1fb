//! MemoryHandStore honours the same contract as the Postgres store.

use hhr_db::{HandStore, InsertOutcome, MemoryHandStore};
use hhr_schemas::Street;
use hhr_testkit::{normalized, showdown_hand, HandPayload};

#[tokio::test]
async fn insert_fetch_preserves_order_and_cards() -> anyhow::Result<()> {
    let store = MemoryHandStore::new();
    let n = normalized(&showdown_hand()?, 0)?;

    let outcome = store.insert_hand(&n).await?;
    assert_eq!(outcome, InsertOutcome::Inserted { hand_id: n.hand.id });

    let full = store.fetch_hand(n.hand.id).await?.expect("hand stored");
    let keys: Vec<(Street, i32)> = full.actions.iter().map(|a| a.action.order_key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let hero = full.players.iter().find(|p| p.player.is_hero).expect("hero");
    assert_eq!(hero.player.name, "Hero");
    assert_eq!(hero.cards.map(|c| c.card1.to_string()).as_deref(), Some("Ah"));
    assert!(full.community_cards.and_then(|b| b.river).is_some());
    Ok(())
}

#[tokio::test]
async fn duplicate_external_id_is_reported_not_written() -> anyhow::Result<()> {
    let store = MemoryHandStore::new();
    let first = normalized(&HandPayload::heads_up("DUP-1").build(), 0)?;
    let second = normalized(&HandPayload::heads_up("DUP-1").build(), 1)?;

    store.insert_hand(&first).await?;
    let outcome = store.insert_hand(&second).await?;
    assert_eq!(
        outcome,
        InsertOutcome::Duplicate {
            existing: first.hand.id
        }
    );
    assert_eq!(store.len().await, 1);
    assert_eq!(
        store.find_hand_by_external_id("DUP-1").await?,
        Some(first.hand.id)
    );
    assert!(store.fetch_hand(second.hand.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn list_is_newest_first_and_paged() -> anyhow::Result<()> {
    let store = MemoryHandStore::new();
    for i in 0..5 {
        let n = normalized(&HandPayload::heads_up(&format!("P-{i}")).build(), i)?;
        store.insert_hand(&n).await?;
    }

    let page0 = store.list_hands(0, 2).await?;
    let ids: Vec<_> = page0
        .iter()
        .map(|h| h.hand.external_hand_id.clone().unwrap_or_default())
        .collect();
    assert_eq!(ids, ["P-4", "P-3"]);

    let page2 = store.list_hands(2, 2).await?;
    assert_eq!(page2.len(), 1);
    assert_eq!(page2[0].hand.external_hand_id.as_deref(), Some("P-0"));

    assert!(store.list_hands(9, 2).await?.is_empty());

    let recent = store.most_recent_hand().await?.expect("recent");
    assert_eq!(recent.hand.external_hand_id.as_deref(), Some("P-4"));
    Ok(())
}

#[tokio::test]
async fn empty_store_has_no_recent_hand() -> anyhow::Result<()> {
    let store = MemoryHandStore::new();
    assert!(store.is_empty().await);
    assert!(store.most_recent_hand().await?.is_none());
    assert!(store.find_hand_by_external_id("nope").await?.is_none());
    Ok(())
}
