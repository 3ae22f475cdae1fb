//! `hhr hand ingest` stores a hand once; the second run reports the duplicate.
//!
//! DB-backed: skipped when HHR_DATABASE_URL is not set.

use predicates::prelude::*;

#[allow(deprecated)]
#[tokio::test]
async fn cli_ingest_twice_stores_once() -> anyhow::Result<()> {
    let url = match std::env::var(hhr_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: HHR_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = match hhr_db::connect_from_env_var(hhr_db::ENV_DB_URL, 2).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("SKIP: cannot connect to DB: {e}");
            return Ok(());
        }
    };
    if let Err(e) = hhr_db::migrate(&pool).await {
        eprintln!("SKIP: cannot migrate DB: {e}");
        return Ok(());
    }

    // Unique external id per run so reruns against the same DB stay valid.
    let external_id = format!("CLI-{}", uuid::Uuid::new_v4());
    let payload = hhr_testkit::HandPayload::heads_up(&external_id)
        .action("preflop", "sb", "Fold", None)
        .action("show_down", "bb", "Collected", Some(1.0))
        .build();
    let mut f = tempfile::NamedTempFile::new()?;
    std::io::Write::write_all(&mut f, payload.to_string().as_bytes())?;

    let ingest = || {
        let mut cmd = assert_cmd::Command::cargo_bin("hhr").expect("hhr binary builds");
        cmd.env(hhr_db::ENV_DB_URL, &url)
            .env_remove(hhr_config::ENV_CONFIG_PATHS)
            .args(["hand", "ingest", "--file"])
            .arg(f.path());
        cmd
    };

    ingest()
        .assert()
        .success()
        .stdout(predicate::str::contains("stored=true"));
    ingest()
        .assert()
        .success()
        .stdout(predicate::str::contains("stored=false duplicate_of="));

    let (n,): (i64,) =
        sqlx::query_as("select count(*)::bigint from hands where external_hand_id = $1")
            .bind(&external_id)
            .fetch_one(&pool)
            .await?;
    assert_eq!(n, 1);
    Ok(())
}
