//! Hand-history persistence.
//!
//! [`HandStore`] is the seam the ingestion gate and the HTTP layer talk to.
//! [`PgHandStore`] is the production implementation; [`MemoryHandStore`]
//! backs tests and the daemon's `--memory` mode.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

mod memory;
mod pg;
mod store;

pub use memory::MemoryHandStore;
pub use pg::PgHandStore;
pub use sqlx::PgPool;
pub use store::{HandStore, InsertOutcome};

/// Default name of the variable holding the Postgres URL.
pub const ENV_DB_URL: &str = "HHR_DATABASE_URL";

/// Connect using the URL held in `var`.
pub async fn connect_from_env_var(var: &str, max_connections: u32) -> Result<PgPool> {
    let url = std::env::var(var).with_context(|| format!("missing env var {var}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations. Safe to call repeatedly.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'hands'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    let hand_count = if exists {
        let (n,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*)::bigint from hands")
            .fetch_one(pool)
            .await
            .context("status hand count failed")?;
        Some(n)
    } else {
        None
    };

    Ok(DbStatus {
        ok: one == 1,
        has_hands_table: exists,
        hand_count,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_hands_table: bool,
    /// `None` until migrations have run.
    pub hand_count: Option<i64>,
}

/// Detect a Postgres unique constraint violation by name.
pub(crate) fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
