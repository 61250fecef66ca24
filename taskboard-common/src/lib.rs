//! # Taskboard Common
//!
//! Foundational types shared by the taskboard crates.
//!
//! ## Modules
//!
//! - [`error`] - Severity classification every crate-level error implements
//! - [`logging`] - Tracing subscriber setup and the [`Pretty`] log formatter

pub mod error;
pub mod logging;

pub use error::{ErrorSeverity, Severity};
pub use logging::{init_tracing, LoggingInitError, Pretty};
