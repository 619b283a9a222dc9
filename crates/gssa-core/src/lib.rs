//! Core types and trait definitions for the GSSA simulation job manager.
//!
//! This crate is deliberately free of database, XML and process
//! dependencies. The store backend and the solver families depend on it; it
//! depends on nothing proprietary.

pub mod definition;
pub mod error;
pub mod family;
pub mod parameter;
pub mod record;
pub mod store;

pub use error::{Error, Result};
