use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "hhr")]
#[command(about = "Hand-history replay CLI", long_about = None)]
struct Cli {
    /// Comma-separated YAML layers (falls back to HHR_CONFIG, then defaults)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Hand-history commands
    Hand {
        #[command(subcommand)]
        cmd: HandCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence
    Status,

    /// Apply SQL migrations (idempotent)
    Migrate,
}

#[derive(Subcommand)]
enum HandCmd {
    /// Print the replay timeline as JSON
    Replay {
        /// Raw hand payload; normalized offline, nothing is stored
        #[arg(long, conflicts_with = "hand_id", required_unless_present = "hand_id")]
        file: Option<String>,

        /// Stored hand id
        #[arg(long = "hand-id")]
        hand_id: Option<Uuid>,
    },

    /// Ingest a payload file straight into the database
    Ingest {
        #[arg(long)]
        file: String,
    },

    /// POST a payload file to a running daemon
    Push {
        #[arg(long)]
        file: String,

        /// Daemon base URL (default: http://<server.addr>)
        #[arg(long)]
        url: Option<String>,
    },

    /// Print the most recently stored hand
    Recent,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev convenience; silent when the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    commands::init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let cfg = commands::load_cli_config(cli.config.as_deref())?;
            let pool = commands::connect(&cfg).await?;
            match cmd {
                DbCmd::Status => {
                    let s = hhr_db::status(&pool).await?;
                    let count = s
                        .hand_count
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "n/a".to_string());
                    println!(
                        "db_ok={} has_hands_table={} hand_count={}",
                        s.ok, s.has_hands_table, count
                    );
                }
                DbCmd::Migrate => {
                    hhr_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = hhr_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Hand { cmd } => {
            let cfg = commands::load_cli_config(cli.config.as_deref())?;
            match cmd {
                HandCmd::Replay { file, hand_id } => match (file, hand_id) {
                    (Some(path), _) => commands::hand::replay_file(&path)?,
                    (None, Some(id)) => commands::hand::replay_stored(&cfg, id).await?,
                    (None, None) => anyhow::bail!("must provide --file or --hand-id"),
                },
                HandCmd::Ingest { file } => commands::hand::ingest_file(&cfg, &file).await?,
                HandCmd::Push { file, url } => {
                    commands::hand::push_file(&cfg, &file, url.as_deref()).await?
                }
                HandCmd::Recent => commands::hand::recent(&cfg).await?,
            }
        }
    }

    Ok(())
}
