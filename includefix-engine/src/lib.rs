//! The include reconciliation core: rule set and source rewriter.
//!
//! This crate owns *what* a reference should become. It does not own *how*
//! files are enumerated or persisted; that's the `includefix-edit` crate.
//!
//! Everything here is a pure function of its inputs: the rule set and the
//! header registry are built once, frozen, and shared by reference, so the
//! rewriter can run concurrently over many files without coordination.

mod rewrite;
mod rules;

pub use rewrite::{ReferenceOutcome, ReferenceRecord, RewriteOutcome, rewrite_source};
pub use rules::{RewriteRule, RuleSet, RuleShape, default_root_prefixes};
