use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use hhr_schemas::{
    Action, ActionName, Card, CommunityCards, Hand, HandFull, NormalizedHand, Player, PlayerCards,
    Position, Street,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::{is_unique_constraint_violation, HandStore, InsertOutcome};

const UQ_EXTERNAL_HAND_ID: &str = "uq_hands_external_hand_id";

/// Postgres-backed [`HandStore`].
#[derive(Clone)]
pub struct PgHandStore {
    pool: PgPool,
}

impl PgHandStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn duplicate_of(&self, external_id: &str) -> Result<InsertOutcome> {
        match self.find_hand_by_external_id(external_id).await? {
            Some(existing) => Ok(InsertOutcome::Duplicate { existing }),
            None => Err(anyhow!(
                "unique conflict on external hand id '{external_id}' but no row found"
            )),
        }
    }
}

#[async_trait]
impl HandStore for PgHandStore {
    async fn find_hand_by_external_id(&self, external_id: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query("select id from hands where external_hand_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .context("find_hand_by_external_id failed")?;
        row.map(|r| r.try_get::<Uuid, _>("id"))
            .transpose()
            .context("decode hands.id failed")
    }

    async fn insert_hand(&self, n: &NormalizedHand) -> Result<InsertOutcome> {
        let h = &n.hand;
        let mut tx = self.pool.begin().await.context("begin insert_hand tx failed")?;

        let res = sqlx::query(
            r#"
            insert into hands (
              id, external_hand_id, date, time, table_name, small_blind, max_players,
              dealer_seat, total_pot, main_pot, side_pot, side_pot2, rake, created_at
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14
            )
            "#,
        )
        .bind(h.id)
        .bind(&h.external_hand_id)
        .bind(&h.date)
        .bind(&h.time)
        .bind(&h.table_name)
        .bind(h.small_blind)
        .bind(h.max_players)
        .bind(h.dealer_seat)
        .bind(h.total_pot)
        .bind(h.main_pot)
        .bind(h.side_pot)
        .bind(h.side_pot2)
        .bind(h.rake)
        .bind(h.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = res {
            if let (true, Some(ext)) = (
                is_unique_constraint_violation(&e, UQ_EXTERNAL_HAND_ID),
                h.external_hand_id.as_deref(),
            ) {
                tx.rollback().await.context("rollback after conflict failed")?;
                debug!(external_hand_id = ext, "insert lost uniqueness race");
                return self.duplicate_of(ext).await;
            }
            return Err(anyhow::Error::new(e).context("insert hands row failed"));
        }

        for p in &n.players {
            sqlx::query(
                r#"
                insert into hand_players (
                  id, hand_id, seat, position, name, chips, chips_after_hand,
                  is_sitting_out, is_hero
                ) values (
                  $1, $2, $3, $4, $5, $6, $7, $8, $9
                )
                "#,
            )
            .bind(p.id)
            .bind(p.hand_id)
            .bind(p.seat)
            .bind(p.position.map(|pos| pos.as_str()))
            .bind(&p.name)
            .bind(p.chips)
            .bind(p.chips_after_hand)
            .bind(p.is_sitting_out)
            .bind(p.is_hero)
            .execute(&mut *tx)
            .await
            .context("insert hand_players row failed")?;
        }

        if let Some(b) = &n.community_cards {
            sqlx::query(
                r#"
                insert into community_cards (hand_id, flop1, flop2, flop3, turn, river)
                values ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(b.hand_id)
            .bind(card_text(b.flop1))
            .bind(card_text(b.flop2))
            .bind(card_text(b.flop3))
            .bind(card_text(b.turn))
            .bind(card_text(b.river))
            .execute(&mut *tx)
            .await
            .context("insert community_cards row failed")?;
        }

        for a in &n.actions {
            sqlx::query(
                r#"
                insert into actions (
                  id, hand_id, hand_player_id, street, sequence, name,
                  amount, amount2, card1, card2, text
                ) values (
                  $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
                )
                "#,
            )
            .bind(a.id)
            .bind(a.hand_id)
            .bind(a.player_id)
            .bind(a.street.as_i16())
            .bind(a.sequence)
            .bind(a.name.as_str())
            .bind(a.amount)
            .bind(a.amount2)
            .bind(card_text(a.card1))
            .bind(card_text(a.card2))
            .bind(&a.text)
            .execute(&mut *tx)
            .await
            .context("insert actions row failed")?;
        }

        for c in &n.player_cards {
            sqlx::query(
                "insert into hand_player_cards (hand_player_id, card1, card2) values ($1, $2, $3)",
            )
            .bind(c.player_id)
            .bind(c.card1.to_string())
            .bind(c.card2.to_string())
            .execute(&mut *tx)
            .await
            .context("insert hand_player_cards row failed")?;
        }

        tx.commit().await.context("commit insert_hand tx failed")?;
        Ok(InsertOutcome::Inserted { hand_id: h.id })
    }

    async fn fetch_hand(&self, hand_id: Uuid) -> Result<Option<HandFull>> {
        let Some(row) = sqlx::query(&format!("select {HAND_COLUMNS} from hands where id = $1"))
            .bind(hand_id)
            .fetch_optional(&self.pool)
            .await
            .context("fetch hands row failed")?
        else {
            return Ok(None);
        };
        let hand = hand_from_row(&row)?;
        Ok(self.assemble(vec![hand]).await?.pop())
    }

    async fn list_hands(&self, page: u32, page_size: u32) -> Result<Vec<HandFull>> {
        let hands = sqlx::query(&format!(
            "select {HAND_COLUMNS} from hands order by created_at desc, id desc limit $1 offset $2"
        ))
        .bind(i64::from(page_size))
        .bind(i64::from(page) * i64::from(page_size))
        .fetch_all(&self.pool)
        .await
        .context("list_hands failed")?
        .iter()
        .map(hand_from_row)
        .collect::<Result<Vec<_>>>()?;

        self.assemble(hands).await
    }
}

const HAND_COLUMNS: &str = "id, external_hand_id, date, time, table_name, small_blind, \
    max_players, dealer_seat, total_pot, main_pot, side_pot, side_pot2, rake, created_at";

impl PgHandStore {
    /// Load the child rows of every hand with one query per table and attach
    /// them. Output keeps the order of `hands`.
    async fn assemble(&self, hands: Vec<Hand>) -> Result<Vec<HandFull>> {
        if hands.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = hands.iter().map(|h| h.id).collect();

        let mut players: HashMap<Uuid, Vec<Player>> = HashMap::new();
        for r in sqlx::query(
            r#"
            select id, hand_id, seat, position, name, chips, chips_after_hand,
                   is_sitting_out, is_hero
            from hand_players
            where hand_id = any($1)
            order by hand_id, seat asc
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await
        .context("fetch hand_players failed")?
        {
            let p = player_from_row(&r)?;
            players.entry(p.hand_id).or_default().push(p);
        }

        let mut player_cards: HashMap<Uuid, Vec<PlayerCards>> = HashMap::new();
        for r in sqlx::query(
            r#"
            select p.hand_id, c.hand_player_id, c.card1, c.card2
            from hand_player_cards c
            join hand_players p on p.id = c.hand_player_id
            where p.hand_id = any($1)
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await
        .context("fetch hand_player_cards failed")?
        {
            let hand_id: Uuid = r.try_get("hand_id")?;
            player_cards.entry(hand_id).or_default().push(PlayerCards {
                player_id: r.try_get("hand_player_id")?,
                card1: parse_card(r.try_get("card1")?)?,
                card2: parse_card(r.try_get("card2")?)?,
            });
        }

        let mut boards: HashMap<Uuid, CommunityCards> = HashMap::new();
        for r in sqlx::query(
            r#"
            select hand_id, flop1, flop2, flop3, turn, river
            from community_cards
            where hand_id = any($1)
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await
        .context("fetch community_cards failed")?
        {
            let b = CommunityCards {
                hand_id: r.try_get("hand_id")?,
                flop1: parse_opt_card(r.try_get("flop1")?)?,
                flop2: parse_opt_card(r.try_get("flop2")?)?,
                flop3: parse_opt_card(r.try_get("flop3")?)?,
                turn: parse_opt_card(r.try_get("turn")?)?,
                river: parse_opt_card(r.try_get("river")?)?,
            };
            boards.insert(b.hand_id, b);
        }

        let mut actions: HashMap<Uuid, Vec<Action>> = HashMap::new();
        for r in sqlx::query(
            r#"
            select id, hand_id, hand_player_id, street, sequence, name,
                   amount, amount2, card1, card2, text
            from actions
            where hand_id = any($1)
            order by hand_id, street asc, sequence asc
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await
        .context("fetch actions failed")?
        {
            let a = action_from_row(&r)?;
            actions.entry(a.hand_id).or_default().push(a);
        }

        Ok(hands
            .into_iter()
            .map(|hand| {
                let id = hand.id;
                HandFull::from_normalized(&NormalizedHand {
                    hand,
                    players: players.remove(&id).unwrap_or_default(),
                    community_cards: boards.remove(&id),
                    actions: actions.remove(&id).unwrap_or_default(),
                    player_cards: player_cards.remove(&id).unwrap_or_default(),
                })
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn card_text(c: Option<Card>) -> Option<String> {
    c.map(|c| c.to_string())
}

fn parse_card(s: String) -> Result<Card> {
    Card::parse(&s).map_err(|e| anyhow!("stored {e}"))
}

fn parse_opt_card(s: Option<String>) -> Result<Option<Card>> {
    s.map(parse_card).transpose()
}

fn hand_from_row(r: &PgRow) -> Result<Hand> {
    Ok(Hand {
        id: r.try_get("id")?,
        external_hand_id: r.try_get("external_hand_id")?,
        date: r.try_get("date")?,
        time: r.try_get("time")?,
        table_name: r.try_get("table_name")?,
        small_blind: r.try_get("small_blind")?,
        max_players: r.try_get("max_players")?,
        dealer_seat: r.try_get("dealer_seat")?,
        total_pot: r.try_get("total_pot")?,
        main_pot: r.try_get("main_pot")?,
        side_pot: r.try_get("side_pot")?,
        side_pot2: r.try_get("side_pot2")?,
        rake: r.try_get("rake")?,
        created_at: r.try_get("created_at")?,
    })
}

fn player_from_row(r: &PgRow) -> Result<Player> {
    let position = r
        .try_get::<Option<String>, _>("position")?
        .map(|p| Position::parse(&p).ok_or_else(|| anyhow!("invalid stored position: {p}")))
        .transpose()?;
    Ok(Player {
        id: r.try_get("id")?,
        hand_id: r.try_get("hand_id")?,
        seat: r.try_get("seat")?,
        position,
        name: r.try_get("name")?,
        chips: r.try_get("chips")?,
        chips_after_hand: r.try_get("chips_after_hand")?,
        is_sitting_out: r.try_get("is_sitting_out")?,
        is_hero: r.try_get("is_hero")?,
    })
}

fn action_from_row(r: &PgRow) -> Result<Action> {
    let street_num: i16 = r.try_get("street")?;
    let street =
        Street::from_i16(street_num).ok_or_else(|| anyhow!("invalid stored street: {street_num}"))?;
    let name_text: String = r.try_get("name")?;
    let name = ActionName::parse(&name_text)
        .ok_or_else(|| anyhow!("invalid stored action name: {name_text}"))?;
    Ok(Action {
        id: r.try_get("id")?,
        hand_id: r.try_get("hand_id")?,
        player_id: r.try_get("hand_player_id")?,
        street,
        sequence: r.try_get("sequence")?,
        name,
        amount: r.try_get("amount")?,
        amount2: r.try_get("amount2")?,
        card1: parse_opt_card(r.try_get("card1")?)?,
        card2: parse_opt_card(r.try_get("card2")?)?,
        text: r.try_get("text")?,
    })
}
