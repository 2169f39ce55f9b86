//! Embeddable core library for includefix.
//!
//! Provides a clap-free entry point suitable for linking into a host
//! process: the full reconcile pipeline, settings structs, and port traits
//! for artifact output.
//!
//! # Entry points
//!
//! - [`run_reconcile`](pipeline::run_reconcile) — discovery, rewriting,
//!   build-config patch, report assembly
//! - [`write_reconcile_artifacts`](pipeline::write_reconcile_artifacts) —
//!   persist report.json / report.md / patch.diff through a [`WritePort`]

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use ports::WritePort;

// Re-export the error type so callers don't need includefix-edit directly.
pub use includefix_edit::{HaltError, ReconcileError};

// Re-export the report types embedders most often inspect.
pub use includefix_types::report::{ReconcileReport, RunStatus, ToolInfo};
