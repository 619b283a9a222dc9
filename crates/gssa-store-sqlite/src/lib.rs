//! SQLite backend for the GSSA simulation store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread. The single connection serialises every statement; each call
//! commits on its own.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
