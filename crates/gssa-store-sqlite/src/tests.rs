//! Integration tests for `SqliteStore` against an in-memory database.

use std::path::{Path, PathBuf};

use gssa_core::{
  record::{ExitCode, IN_PROGRESS, Retrieved, new_guid},
  store::{DeleteMode, SimulationStore},
};
use tempfile::TempDir;
use tracing::Span;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory(Span::none())
    .await
    .expect("in-memory store")
}

/// A fresh job directory inside `root`.
fn job_dir(root: &TempDir, name: &str) -> PathBuf {
  let dir = root.path().join(name);
  std::fs::create_dir_all(&dir).unwrap();
  dir
}

async fn register(s: &SqliteStore, root: &TempDir) -> (String, PathBuf) {
  let guid = new_guid();
  let dir = job_dir(root, &guid);
  s.add_or_update(&guid, &dir).await;
  (guid, dir)
}

fn unwrap_one(retrieved: Option<Retrieved>) -> gssa_core::record::SimulationHandle {
  match retrieved {
    Some(Retrieved::One(handle)) => handle,
    other => panic!("expected a single handle, got {other:?}"),
  }
}

// ─── Registration and retrieval ──────────────────────────────────────────────

#[tokio::test]
async fn add_then_retrieve_returns_directory() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, dir) = register(&s, &root).await;

  let handle = unwrap_one(s.retrieve(&guid).await);
  assert_eq!(handle.guid, guid);
  assert_eq!(handle.directory, dir);
  assert!(!handle.is_finished());
}

#[tokio::test]
async fn add_or_update_existing_guid_moves_directory_and_keeps_status() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, _) = register(&s, &root).await;
  s.set_status(&guid, None, IN_PROGRESS, 10.0, None).await.unwrap();

  let moved = job_dir(&root, "moved");
  s.add_or_update(&guid, &moved).await;

  let all = s.all().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].directory, moved);
  assert_eq!(all[0].status.as_deref(), Some(IN_PROGRESS));
}

#[tokio::test]
async fn retrieve_unknown_full_guid_is_absent() {
  let s = store().await;
  assert!(s.retrieve(&new_guid()).await.is_none());
}

#[tokio::test]
async fn retrieve_with_missing_directory_is_absent() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, dir) = register(&s, &root).await;

  std::fs::remove_dir(&dir).unwrap();

  assert!(s.retrieve(&guid).await.is_none());
  // The row itself is untouched.
  assert_eq!(s.all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn retrieve_short_input_searches_by_prefix() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, _) = register(&s, &root).await;

  match s.retrieve(&guid[..8]).await {
    Some(Retrieved::Matches(found)) => {
      assert_eq!(found.len(), 1);
      assert!(found.contains_key(&guid));
    }
    other => panic!("expected prefix matches, got {other:?}"),
  }
}

#[tokio::test]
async fn retrieve_threshold_counts_characters() {
  let s = store().await;
  // 20 characters, 40 bytes.
  let prefix = "é".repeat(20);

  match s.retrieve(&prefix).await {
    Some(Retrieved::Matches(found)) => assert!(found.is_empty()),
    other => panic!("expected prefix matches, got {other:?}"),
  }
}

#[cfg(unix)]
#[tokio::test]
async fn add_or_update_swallows_unencodable_directory() {
  use std::{ffi::OsStr, os::unix::ffi::OsStrExt as _};

  let s = store().await;
  let dir = Path::new("/tmp").join(OsStr::from_bytes(b"\xff"));

  s.add_or_update(&new_guid(), &dir).await;

  assert!(s.all().await.unwrap().is_empty());
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_filters_prefix_deleted_and_missing_directories() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();

  let kept = "abc00000000000000000000000000001";
  let deleted = "abc00000000000000000000000000002";
  let vanished = "abc00000000000000000000000000003";
  let other = "fff00000000000000000000000000004";

  for guid in [kept, deleted, vanished, other] {
    let dir = job_dir(&root, guid);
    s.add_or_update(guid, &dir).await;
  }
  s.delete(deleted, DeleteMode::Soft).await.unwrap();

  let found = s.search("abc").await.unwrap();
  let guids: Vec<&str> = found.keys().map(String::as_str).collect();
  assert_eq!(guids, vec![kept, vanished]);

  // Removing the directory out-of-band drops it from later searches.
  std::fs::remove_dir(root.path().join(vanished)).unwrap();
  let found = s.search("abc").await.unwrap();
  let guids: Vec<&str> = found.keys().map(String::as_str).collect();
  assert_eq!(guids, vec![kept]);
}

#[tokio::test]
async fn search_prefix_is_literal() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, _) = register(&s, &root).await;

  // LIKE wildcards have no special meaning.
  assert!(s.search("%").await.unwrap().is_empty());
  assert!(s.search("_").await.unwrap().is_empty());
  assert_eq!(s.search("").await.unwrap().len(), 1);
  assert!(s.search(&guid).await.unwrap().contains_key(&guid));
}

#[tokio::test]
async fn search_handles_carry_status() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, _) = register(&s, &root).await;
  s.set_status(&guid, Some(ExitCode::Code(3)), "Solver crashed", 40.0, None)
    .await
    .unwrap();

  let found = s.search(&guid[..4]).await.unwrap();
  let handle = &found[&guid];
  assert_eq!(handle.exit_code, Some(ExitCode::Code(3)));
  assert_eq!(handle.status.message.as_deref(), Some("Solver crashed"));
  assert_eq!(handle.status.percentage, Some(40.0));
  assert!(handle.status.timestamp.is_some());
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn soft_delete_hides_record_but_keeps_row() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, _) = register(&s, &root).await;
  s.update_validation(&guid, r#"{"dice":"0.8"}"#).await.unwrap();

  s.delete(&guid, DeleteMode::Soft).await.unwrap();

  assert!(s.retrieve(&guid).await.is_none());
  assert!(s.get_validation(&guid).await.is_none());
  assert!(s.get_status_and_validation(&guid).await.is_none());

  let all = s.all().await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(all[0].deleted);
  assert_eq!(all[0].guid, guid);
}

#[tokio::test]
async fn delete_is_idempotent() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, _) = register(&s, &root).await;

  s.delete(&guid, DeleteMode::Soft).await.unwrap();
  s.delete(&guid, DeleteMode::Soft).await.unwrap();
  s.delete(&guid, DeleteMode::Hard).await.unwrap();
  s.delete(&guid, DeleteMode::Hard).await.unwrap();

  assert!(s.all().await.unwrap().is_empty());
}

// ─── Status and validation ───────────────────────────────────────────────────

#[tokio::test]
async fn status_and_validation_roundtrip() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, _) = register(&s, &root).await;

  s.set_status(&guid, Some(ExitCode::Success), "SUCCESS", 100.0, None)
    .await
    .unwrap();
  s.update_validation(&guid, r#"{"volume":"12.5"}"#).await.unwrap();

  let sv = s.get_status_and_validation(&guid).await.unwrap();
  assert_eq!(sv.percentage, Some(100.0));
  assert_eq!(sv.status.as_deref(), Some("SUCCESS"));
  assert_eq!(sv.exit_code, Some(ExitCode::Success));
  assert_eq!(sv.validation.as_deref(), Some(r#"{"volume":"12.5"}"#));
  assert_eq!(s.get_validation(&guid).await.as_deref(), Some(r#"{"volume":"12.5"}"#));
}

#[tokio::test]
async fn validation_absent_before_update() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, _) = register(&s, &root).await;

  assert!(s.get_validation(&guid).await.is_none());
  assert!(s.get_validation(&new_guid()).await.is_none());
}

#[tokio::test]
async fn set_status_unknown_guid_is_noop() {
  let s = store().await;
  s.set_status(&new_guid(), None, IN_PROGRESS, 5.0, None)
    .await
    .unwrap();
  assert!(s.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn set_status_keeps_supplied_timestamp() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, _) = register(&s, &root).await;
  let at = chrono::DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
    .unwrap()
    .with_timezone(&chrono::Utc);

  s.set_status(&guid, None, "Meshing", 12.0, Some(at)).await.unwrap();

  let sv = s.get_status_and_validation(&guid).await.unwrap();
  assert_eq!(sv.timestamp, Some(at));
}

// ─── Start-up sweep ──────────────────────────────────────────────────────────

#[tokio::test]
async fn mark_all_old_reclassifies_unfinished() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (running, _) = register(&s, &root).await;
  let (finished, _) = register(&s, &root).await;
  let (untouched, _) = register(&s, &root).await;

  s.set_status(&running, None, IN_PROGRESS, 37.5, None).await.unwrap();
  s.set_status(&finished, Some(ExitCode::Success), "SUCCESS", 100.0, None)
    .await
    .unwrap();

  assert_eq!(s.mark_all_old().await.unwrap(), 1);

  let sv = s.get_status_and_validation(&running).await.unwrap();
  assert_eq!(sv.percentage, Some(0.0));
  assert_eq!(sv.exit_code, Some(ExitCode::Unknown));
  assert_eq!(sv.status.as_deref(), Some("Unfinished (37.5%)"));

  let sv = s.get_status_and_validation(&finished).await.unwrap();
  assert_eq!(sv.exit_code, Some(ExitCode::Success));

  // Never started: no percentage, so not swept.
  let sv = s.get_status_and_validation(&untouched).await.unwrap();
  assert_eq!(sv.percentage, None);
  assert_eq!(sv.exit_code, None);
}

#[tokio::test]
async fn mark_all_old_is_idempotent() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (guid, _) = register(&s, &root).await;
  s.set_status(&guid, None, IN_PROGRESS, 37.5, None).await.unwrap();

  s.mark_all_old().await.unwrap();
  let first = s.get_status_and_validation(&guid).await.unwrap();

  assert_eq!(s.mark_all_old().await.unwrap(), 0);
  let second = s.get_status_and_validation(&guid).await.unwrap();

  assert_eq!(first, second);
  assert_eq!(second.percentage, Some(0.0));
  assert_eq!(second.exit_code, Some(ExitCode::Unknown));
}

#[tokio::test]
async fn mark_all_old_sweeps_partial_unknown_but_not_settled_unknown() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();
  let (retrying, _) = register(&s, &root).await;
  let (cancelled, _) = register(&s, &root).await;
  let (starting, _) = register(&s, &root).await;

  s.set_status(&retrying, Some(ExitCode::Unknown), "Retrying", 50.0, None)
    .await
    .unwrap();
  s.set_status(&cancelled, Some(ExitCode::Unknown), "Cancelled", 0.0, None)
    .await
    .unwrap();
  s.set_status(&starting, None, IN_PROGRESS, 0.0, None).await.unwrap();

  assert_eq!(s.mark_all_old().await.unwrap(), 2);

  let sv = s.get_status_and_validation(&retrying).await.unwrap();
  assert_eq!(sv.percentage, Some(0.0));
  assert_eq!(sv.exit_code, Some(ExitCode::Unknown));
  assert!(sv.status.unwrap().starts_with("Unfinished (50"));

  let sv = s.get_status_and_validation(&cancelled).await.unwrap();
  assert_eq!(sv.status.as_deref(), Some("Cancelled"));

  let sv = s.get_status_and_validation(&starting).await.unwrap();
  assert_eq!(sv.exit_code, Some(ExitCode::Unknown));
  assert!(sv.status.unwrap().starts_with("Unfinished (0"));
}

// ─── Counting ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn active_count_tracks_concurrent_updates() {
  let s = store().await;
  let root = tempfile::tempdir().unwrap();

  let mut guids = Vec::new();
  for _ in 0..8 {
    guids.push(register(&s, &root).await.0);
  }

  let mut tasks = Vec::new();
  for (i, guid) in guids.iter().cloned().enumerate() {
    let s = s.clone();
    tasks.push(tokio::spawn(async move {
      let status = if i % 2 == 0 { IN_PROGRESS } else { "SUCCESS" };
      s.set_status(&guid, None, status, 50.0, None).await.unwrap();
    }));
  }
  for task in tasks {
    task.await.unwrap();
  }

  assert_eq!(s.active_count().await.unwrap(), 4);

  s.set_status(&guids[0], Some(ExitCode::Success), "SUCCESS", 100.0, None)
    .await
    .unwrap();
  assert_eq!(s.active_count().await.unwrap(), 3);
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn file_store_survives_reopen() {
  let root = tempfile::tempdir().unwrap();
  let db: &Path = &root.path().join("simulations.db");
  let guid = new_guid();
  let dir = job_dir(&root, &guid);

  {
    let s = SqliteStore::open(db, Span::none()).await.unwrap();
    s.add_or_update(&guid, &dir).await;
  }

  let s = SqliteStore::open(db, Span::none()).await.unwrap();
  let handle = unwrap_one(s.retrieve(&guid).await);
  assert_eq!(handle.directory, dir);
  assert!(s.all().await.unwrap()[0].created_at <= chrono::Utc::now());
}
