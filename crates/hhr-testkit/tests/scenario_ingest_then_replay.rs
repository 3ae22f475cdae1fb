//! End to end without HTTP: payload -> gate -> store -> replay, with viewers
//! attached to the broadcaster.

use std::sync::Arc;

use hhr_db::{HandStore, MemoryHandStore};
use hhr_ingest::IngestGate;
use hhr_notify::{Broadcaster, Notification};
use hhr_replay::{build_timeline, CommunityCardReveal, ReplayEvent};
use hhr_schemas::{ActionName, HandFull, Street};
use hhr_testkit::{showdown_hand, HandPayload};

fn wiring() -> (IngestGate, Arc<MemoryHandStore>, Broadcaster) {
    let store = Arc::new(MemoryHandStore::new());
    let broadcaster = Broadcaster::default();
    let gate = IngestGate::new(store.clone(), broadcaster.clone());
    (gate, store, broadcaster)
}

async fn ingest_and_fetch(payload: &serde_json::Value) -> anyhow::Result<HandFull> {
    let (gate, store, _) = wiring();
    let ack = gate.ingest(payload).await?;
    let hand = store
        .fetch_hand(ack.hand_id())
        .await?
        .ok_or_else(|| anyhow::anyhow!("stored hand not readable"))?;
    Ok(hand)
}

/// Street of every entry, reveals reported as the street they open.
fn streets(timeline: &[ReplayEvent]) -> Vec<Street> {
    timeline
        .iter()
        .map(|e| match e {
            ReplayEvent::PlayerAction(a) => a.action.street,
            ReplayEvent::Reveal(r) => r.street(),
        })
        .collect()
}

#[tokio::test]
async fn showdown_hand_replays_street_by_street() -> anyhow::Result<()> {
    let hand = ingest_and_fetch(&showdown_hand()?).await?;

    let hero = hand
        .players
        .iter()
        .find(|p| p.player.is_hero)
        .expect("hero flagged");
    assert_eq!(hero.player.name, "Hero");
    let hero_cards = hero.cards.expect("hero cards stored");
    assert_eq!(hero_cards.card1.to_string(), "Ah");

    let villain = hand
        .players
        .iter()
        .find(|p| p.player.name == "kraken77")
        .expect("villain");
    assert_eq!(villain.cards.map(|c| c.card2.to_string()), Some("Qd".into()));

    let timeline = build_timeline(&hand);
    assert_eq!(timeline.len(), 19);

    // Street never decreases along the timeline.
    let s = streets(&timeline);
    assert!(s.windows(2).all(|w| w[0] <= w[1]), "{s:?}");

    let reveal_at: Vec<usize> = timeline
        .iter()
        .enumerate()
        .filter(|(_, e)| e.as_reveal().is_some())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(reveal_at, [6, 10, 13]);

    assert!(timeline
        .iter()
        .filter_map(ReplayEvent::as_action)
        .all(|a| !a.action.name.is_bookkeeping()));
    Ok(())
}

#[tokio::test]
async fn preflop_walk_has_no_reveals() -> anyhow::Result<()> {
    let payload = HandPayload::heads_up("WALK-1")
        .action("preflop", "sb", "Fold", None)
        .action("show_down", "bb", "Collected", Some(1.0))
        .build();
    let hand = ingest_and_fetch(&payload).await?;

    let timeline = build_timeline(&hand);
    assert!(timeline.iter().all(|e| e.as_reveal().is_none()));
    let names: Vec<ActionName> = timeline
        .iter()
        .filter_map(ReplayEvent::as_action)
        .map(|a| a.action.name)
        .collect();
    assert_eq!(
        names,
        [
            ActionName::PostSmallBlind,
            ActionName::PostBigBlind,
            ActionName::Fold,
            ActionName::Collected
        ]
    );
    Ok(())
}

#[tokio::test]
async fn hero_folds_preflop_with_cards_recorded() -> anyhow::Result<()> {
    let payload = HandPayload::new("HERO-1")
        .player(1, Some("SB"), "sb", 50.0)
        .player(2, Some("BB"), "bb", 50.0)
        .player(3, Some("UTG"), "hero", 50.0)
        .action("pre", "sb", "PostSmallBlind", Some(0.5))
        .action("pre", "bb", "PostBigBlind", Some(1.0))
        .action("preflop", "hero", "Fold", None)
        .board(&[])
        .hero("hero", &["As", "Kh"])
        .build();
    let hand = ingest_and_fetch(&payload).await?;

    assert_eq!(hand.actions.len(), 3);
    assert!(hand.community_cards.is_none());
    let hero = hand
        .players
        .iter()
        .find(|p| p.player.is_hero)
        .expect("hero flagged");
    assert_eq!(hero.player.name, "hero");
    let cards = hero.cards.expect("hero cards stored");
    assert_eq!((cards.card1.to_string(), cards.card2.to_string()), ("As".into(), "Kh".into()));

    let timeline = build_timeline(&hand);
    assert_eq!(timeline.iter().filter(|e| e.as_action().is_some()).count(), 3);
    assert!(timeline.iter().all(|e| e.as_reveal().is_none()));
    Ok(())
}

#[tokio::test]
async fn all_in_preflop_runs_the_whole_board_before_showdown() -> anyhow::Result<()> {
    let payload = HandPayload::heads_up("ALLIN-1")
        .action("preflop", "sb", "RaiseAndAllIn", Some(49.5))
        .action("preflop", "bb", "CallAndAllIn", Some(49.0))
        .board(&["9c", "9d", "4s", "Jh", "2d"])
        .shows("show_down", "sb", "Ac", "Ad")
        .shows("show_down", "bb", "Kc", "Kd")
        .action("show_down", "sb", "Collected", Some(100.0))
        .build();
    let hand = ingest_and_fetch(&payload).await?;
    let timeline = build_timeline(&hand);

    // blinds, two all-ins, three reveals, two shows, collect
    assert_eq!(timeline.len(), 10);
    let reveals: Vec<&CommunityCardReveal> =
        timeline[4..7].iter().filter_map(ReplayEvent::as_reveal).collect();
    assert_eq!(reveals.len(), 3);
    assert_eq!(reveals[0].street(), Street::Flop);
    assert_eq!(reveals[1].street(), Street::Turn);
    assert_eq!(reveals[2].street(), Street::River);
    assert_eq!(
        timeline[7].as_action().map(|a| a.action.street),
        Some(Street::Showdown)
    );

    // Shown cards land on both players.
    assert!(hand.players.iter().all(|p| p.cards.is_some()));
    Ok(())
}

#[tokio::test]
async fn concurrent_ingests_reach_every_viewer() -> anyhow::Result<()> {
    let (gate, store, broadcaster) = wiring();
    let mut a = broadcaster.subscribe();
    let mut b = broadcaster.subscribe();

    let p1 = HandPayload::heads_up("C-1").build();
    let p2 = HandPayload::heads_up("C-2").build();
    let p3 = HandPayload::heads_up("C-3").build();
    let (r1, r2, r3, r4) = tokio::join!(
        gate.ingest(&p1),
        gate.ingest(&p2),
        gate.ingest(&p3),
        gate.ingest(&p1),
    );
    for r in [r1, r2, r3, r4] {
        r?;
    }
    assert_eq!(store.len().await, 3);

    for viewer in [&mut a, &mut b] {
        assert_eq!(viewer.recv().await, Some(Notification::Connected));
        let mut new_hands = 0;
        for _ in 0..3 {
            if viewer.recv().await == Some(Notification::NewHand) {
                new_hands += 1;
            }
        }
        assert_eq!(new_hands, 3);
    }
    Ok(())
}
