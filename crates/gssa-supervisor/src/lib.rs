//! Job orchestration for GSSA.
//!
//! Ties a [`SimulationStore`](gssa_core::store::SimulationStore) to the
//! `elmer-libnuma-legacy` family: registers job directories, runs the solver
//! and writes the outcome back. The `gssa` binary is a thin CLI over
//! [`Supervisor`].

pub mod error;
pub mod supervisor;

pub use error::{Error, Result};
pub use supervisor::Supervisor;

use std::path::{Path, PathBuf};

use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `gssa.toml` and `GSSA_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct SupervisorConfig {
  /// SQLite database holding the simulation records.
  #[serde(default = "default_database")]
  pub database:   PathBuf,
  /// Job directories are created as `<work_root>/<guid>`.
  #[serde(default = "default_work_root")]
  pub work_root:  PathBuf,
  #[serde(default = "default_launcher")]
  pub launcher:   String,
  /// Refuse new runs while this many records are in progress.
  #[serde(default)]
  pub max_active: Option<usize>,
}

fn default_database() -> PathBuf { PathBuf::from("~/.gssa/simulations.db") }

fn default_work_root() -> PathBuf { PathBuf::from("~/.gssa/jobs") }

fn default_launcher() -> String { gssa_elmer::DEFAULT_LAUNCHER.to_owned() }

impl Default for SupervisorConfig {
  fn default() -> Self {
    Self {
      database:   default_database(),
      work_root:  default_work_root(),
      launcher:   default_launcher(),
      max_active: None,
    }
  }
}

impl SupervisorConfig {
  /// Layer the optional TOML file at `path` under `GSSA_*` environment
  /// variables, then expand `~` in every path.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    let cfg: Self = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("GSSA"))
      .build()?
      .try_deserialize()?;
    Ok(cfg.expanded())
  }

  pub fn expanded(self) -> Self {
    Self {
      database: expand_tilde(&self.database),
      work_root: expand_tilde(&self.work_root),
      ..self
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn load_reads_toml_and_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gssa.toml");
    std::fs::write(
      &path,
      "database = \"/var/lib/gssa/sims.db\"\nlauncher = \"/opt/bin/launch\"\nmax_active = 4\n",
    )
    .unwrap();

    let cfg = SupervisorConfig::load(&path).unwrap();
    assert_eq!(cfg.database, PathBuf::from("/var/lib/gssa/sims.db"));
    assert_eq!(cfg.launcher, "/opt/bin/launch");
    assert_eq!(cfg.max_active, Some(4));
    assert!(!cfg.work_root.starts_with("~"));
  }

  #[test]
  fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SupervisorConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.launcher, gssa_elmer::DEFAULT_LAUNCHER);
    assert_eq!(cfg.max_active, None);
  }

  #[test]
  fn tilde_only_expands_as_prefix() {
    assert_eq!(expand_tilde(Path::new("/abs/~/x")), PathBuf::from("/abs/~/x"));
    assert_eq!(expand_tilde(Path::new("relative")), PathBuf::from("relative"));
  }
}
