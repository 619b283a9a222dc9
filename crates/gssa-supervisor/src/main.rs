//! `gssa`: run and inspect simulations.
//!
//! Reads `gssa.toml` (or the path given with `--config`) and `GSSA_*`
//! environment variables, opens the SQLite store and reclassifies any runs a
//! previous process left unfinished before doing anything else.
//!
//! ```
//! gssa run definition.json
//! gssa status 3f2a
//! gssa delete 3f2a9c0e1b7d4e55a1c2b3d4e5f60718 --hard
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use gssa_core::{
  definition::Definition,
  record::{Retrieved, new_guid},
  store::{DeleteMode, SimulationStore},
};
use gssa_store_sqlite::SqliteStore;
use gssa_supervisor::{Supervisor, SupervisorConfig};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "GSSA simulation supervisor")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "gssa.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Compile a JSON definition and run it to completion. Ctrl-C cancels.
  Run {
    definition: PathBuf,
    /// Job GUID; a new one is generated if omitted.
    #[arg(long)]
    guid:       Option<String>,
  },
  /// Print every stored record, deleted ones included.
  List,
  /// Print live records whose GUID starts with a prefix.
  Search { prefix: String },
  /// Print status and validation of one job, or the matches of a prefix.
  Status { guid: String },
  /// Print the validation output of one job.
  Validation { guid: String },
  /// Delete a record (soft unless `--hard`).
  Delete {
    guid: String,
    #[arg(long)]
    hard: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let config = SupervisorConfig::load(&cli.config).context("failed to read configuration")?;

  if let Some(parent) = config.database.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&config.database, tracing::info_span!("store"))
    .await
    .with_context(|| format!("failed to open store at {:?}", config.database))?;

  let supervisor = Supervisor::new(store, config, tracing::info_span!("supervisor"));
  supervisor.start().await.context("failed to sweep unfinished runs")?;

  let store = supervisor.store();
  match cli.command {
    Command::Run { definition, guid } => {
      let raw = tokio::fs::read_to_string(&definition)
        .await
        .with_context(|| format!("reading definition {}", definition.display()))?;
      let definition: Definition = serde_json::from_str(&raw).context("parsing definition")?;
      let guid = guid.unwrap_or_else(new_guid);

      println!("{guid}");
      let code = supervisor.run(&guid, definition, ctrl_c()).await?;
      println!("{code}");
    }
    Command::List => print_json(&store.all().await?)?,
    Command::Search { prefix } => {
      let matches = store.search(&prefix).await.context("search failed")?;
      print_json(&matches)?;
    }
    Command::Status { guid } => match store.retrieve(&guid).await {
      Some(Retrieved::One(handle)) => {
        let status = store
          .get_status_and_validation(&handle.guid)
          .await
          .with_context(|| format!("no status for {guid}"))?;
        print_json(&status)?;
      }
      Some(Retrieved::Matches(matches)) => print_json(&matches)?,
      None => anyhow::bail!("no simulation matches {guid}"),
    },
    Command::Validation { guid } => {
      let validation = store
        .get_validation(&guid)
        .await
        .with_context(|| format!("no validation for {guid}"))?;
      println!("{validation}");
    }
    Command::Delete { guid, hard } => {
      let mode = if hard { DeleteMode::Hard } else { DeleteMode::Soft };
      store.delete(&guid, mode).await?;
    }
  }

  Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!("could not listen for Ctrl-C: {e}");
    std::future::pending::<()>().await;
  }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
