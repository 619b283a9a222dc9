//! The `elmer-libnuma-legacy` solver family.
//!
//! Compiles a [`Definition`](gssa_core::definition::Definition) into the
//! `settings.xml` document read by `go-smart-launcher`, runs the launcher
//! against a job directory and reads back its `validation.xml`.
//!
//! The family is assembled from independent parts:
//!
//! - [`compiler::DefinitionCompiler`] renders and polices the document,
//! - [`executor::JobExecutor`] owns the solver process,
//! - [`validation::ValidationReader`] flattens the validation output,
//!
//! and [`family::ElmerLibNumaLegacy`] delegates to each of them.

pub mod arguments;
pub mod compiler;
pub mod document;
pub mod error;
pub mod executor;
pub mod family;
pub mod mesher;
pub mod validation;

pub use error::{Error, Result};
pub use family::ElmerLibNumaLegacy;

/// Solver configuration written into the job directory.
pub const CONFIG_FILE: &str = "settings.xml";

/// Socket the solver reports progress on, inside the job directory.
pub const STATUS_SOCKET_FILE: &str = "update.sock";

/// Validation output produced by the solver on completion.
pub const VALIDATION_FILE: &str = "validation.xml";

/// Launcher executable used when none is configured.
pub const DEFAULT_LAUNCHER: &str = "go-smart-launcher";
