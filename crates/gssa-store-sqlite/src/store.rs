//! [`SqliteStore`], the SQLite implementation of [`SimulationStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tracing::Span;

use gssa_core::{
  record::{
    ExitCode, GUID_LENGTH, IN_PROGRESS, Retrieved, SimulationHandle, SimulationRecord,
    StatusAndValidation,
  },
  store::{DeleteMode, SimulationStore},
};

use crate::{
  Result,
  encode::{RECORD_COLUMNS, RawRecord, RawStatus, decode_dt, encode_dt, encode_exit_code, encode_path},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A simulation store backed by a single SQLite file.
///
/// Cloning is cheap. The inner connection is reference-counted and every
/// clone shares the same statement queue.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  span: Span,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and ensure the schema exists.
  /// Log output is emitted inside `span`.
  pub async fn open(path: impl AsRef<Path>, span: Span) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, span };
    store.create().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory(span: Span) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, span };
    store.create().await?;
    Ok(store)
  }

  async fn try_add_or_update(&self, guid: &str, directory: &Path) -> Result<()> {
    let guid_str = guid.to_owned();
    let dir_str = encode_path(directory)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO simulations (guid, directory) VALUES (?1, ?2)
           ON CONFLICT (guid) DO UPDATE SET directory = excluded.directory",
          rusqlite::params![guid_str, dir_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn try_get_status(&self, guid: &str) -> Result<Option<StatusAndValidation>> {
    let guid_str = guid.to_owned();

    let raw: Option<RawStatus> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT percentage, status, exit_code, timestamp, validation
             FROM simulations
             WHERE guid = ?1 AND deleted = 0",
            rusqlite::params![guid_str],
            |row| {
              Ok(RawStatus {
                percentage: row.get(0)?,
                status:     row.get(1)?,
                exit_code:  row.get(2)?,
                timestamp:  row.get(3)?,
                validation: row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    let Some(raw) = raw else { return Ok(None) };

    Ok(Some(StatusAndValidation {
      percentage: raw.percentage,
      status:     raw.status,
      exit_code:  raw.exit_code.map(ExitCode::from),
      timestamp:  raw.timestamp.as_deref().map(decode_dt).transpose()?,
      validation: raw.validation,
    }))
  }

  async fn try_get_validation(&self, guid: &str) -> Result<Option<String>> {
    let guid_str = guid.to_owned();

    let validation: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT validation FROM simulations WHERE guid = ?1 AND deleted = 0",
            rusqlite::params![guid_str],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(validation.flatten())
  }

  async fn try_search(&self, prefix: &str) -> Result<BTreeMap<String, SimulationHandle>> {
    let prefix_str = prefix.to_owned();

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {RECORD_COLUMNS}
           FROM simulations
           WHERE substr(guid, 1, length(?1)) = ?1 AND deleted = 0"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![prefix_str], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut handles = BTreeMap::new();
    for raw in raws {
      let record = raw.into_record()?;
      if directory_exists(&record.directory).await {
        handles.insert(record.guid.clone(), SimulationHandle::from_record(record));
      }
    }
    Ok(handles)
  }

  async fn try_retrieve_exact(&self, guid: &str) -> Result<Option<SimulationHandle>> {
    let guid_str = guid.to_owned();

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {RECORD_COLUMNS} FROM simulations WHERE guid = ?1 AND deleted = 0"
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![guid_str], RawRecord::from_row)
            .optional()?,
        )
      })
      .await?;

    let Some(record) = raw.map(RawRecord::into_record).transpose()? else {
      return Ok(None);
    };

    if !directory_exists(&record.directory).await {
      return Ok(None);
    }
    Ok(Some(SimulationHandle::from_record(record)))
  }
}

async fn directory_exists(path: &Path) -> bool {
  tokio::fs::try_exists(path).await.unwrap_or(false)
}

// ─── SimulationStore impl ────────────────────────────────────────────────────

impl SimulationStore for SqliteStore {
  type Error = crate::Error;

  async fn create(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn add_or_update(&self, guid: &str, directory: &Path) {
    if let Err(e) = self.try_add_or_update(guid, directory).await {
      tracing::error!(
        parent: &self.span,
        guid,
        directory = %directory.display(),
        "problem inserting simulation record: {e}"
      );
    }
  }

  async fn set_status(
    &self,
    guid: &str,
    exit_code: Option<ExitCode>,
    status: &str,
    percentage: f64,
    timestamp: Option<DateTime<Utc>>,
  ) -> Result<()> {
    let guid_str   = guid.to_owned();
    let exit_str   = encode_exit_code(exit_code.as_ref());
    let status_str = status.to_owned();
    let at_str     = encode_dt(timestamp.unwrap_or_else(Utc::now));

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE simulations
           SET exit_code = ?2, status = ?3, percentage = ?4, timestamp = ?5
           WHERE guid = ?1",
          rusqlite::params![guid_str, exit_str, status_str, percentage, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      tracing::debug!(parent: &self.span, guid, "status update for unknown simulation ignored");
    }
    Ok(())
  }

  async fn update_validation(&self, guid: &str, validation: &str) -> Result<()> {
    let guid_str       = guid.to_owned();
    let validation_str = validation.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE simulations SET validation = ?2 WHERE guid = ?1",
          rusqlite::params![guid_str, validation_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_validation(&self, guid: &str) -> Option<String> {
    match self.try_get_validation(guid).await {
      Ok(validation) => validation,
      Err(e) => {
        tracing::warn!(parent: &self.span, guid, "could not read validation: {e}");
        None
      }
    }
  }

  async fn get_status_and_validation(&self, guid: &str) -> Option<StatusAndValidation> {
    match self.try_get_status(guid).await {
      Ok(status) => status,
      Err(e) => {
        tracing::warn!(parent: &self.span, guid, "could not read status: {e}");
        None
      }
    }
  }

  async fn mark_all_old(&self) -> Result<usize> {
    let unknown = ExitCode::Unknown.to_string();

    // Rows already at 0% with the unknown marker are the sweep's own output
    // and are left alone, so a second sweep changes nothing.
    let swept = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE simulations
           SET status = ('Unfinished (' || percentage || '%)'),
               percentage = 0,
               exit_code = ?1
           WHERE percentage IS NOT NULL
             AND percentage >= 0
             AND percentage < 100
             AND NOT (percentage = 0 AND exit_code IS ?1)",
          rusqlite::params![unknown],
        )?)
      })
      .await?;

    tracing::info!(parent: &self.span, swept, "marked unfinished simulations");
    Ok(swept)
  }

  async fn active_count(&self) -> Result<usize> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(id) FROM simulations WHERE status = ?1",
          rusqlite::params![IN_PROGRESS],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count.max(0) as usize)
  }

  async fn all(&self) -> Result<Vec<SimulationRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(|conn| {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM simulations ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn search(&self, prefix: &str) -> Option<BTreeMap<String, SimulationHandle>> {
    match self.try_search(prefix).await {
      Ok(handles) => Some(handles),
      Err(e) => {
        tracing::warn!(parent: &self.span, prefix, "simulation search failed: {e}");
        None
      }
    }
  }

  async fn retrieve(&self, guid_or_prefix: &str) -> Option<Retrieved> {
    if guid_or_prefix.chars().count() < GUID_LENGTH {
      return self.search(guid_or_prefix).await.map(Retrieved::Matches);
    }

    match self.try_retrieve_exact(guid_or_prefix).await {
      Ok(handle) => handle.map(Retrieved::One),
      Err(e) => {
        tracing::warn!(parent: &self.span, guid = guid_or_prefix, "simulation lookup failed: {e}");
        None
      }
    }
  }

  async fn delete(&self, guid: &str, mode: DeleteMode) -> Result<()> {
    let guid_str = guid.to_owned();

    self
      .conn
      .call(move |conn| {
        match mode {
          DeleteMode::Soft => conn.execute(
            "UPDATE simulations SET deleted = 1 WHERE guid = ?1",
            rusqlite::params![guid_str],
          )?,
          DeleteMode::Hard => conn.execute(
            "DELETE FROM simulations WHERE guid = ?1",
            rusqlite::params![guid_str],
          )?,
        };
        Ok(())
      })
      .await?;

    tracing::debug!(parent: &self.span, guid, ?mode, "deleted simulation");
    Ok(())
  }
}
