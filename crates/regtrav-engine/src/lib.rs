#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Successor enumeration for NFA construction over regex syntax trees.
//!
//! Given a node the automaton builder reached, [`Traversal`] finds every
//! node reachable without consuming input, in match priority order, and
//! reports each with the guards, capture effects, open lookarounds and
//! anchors collected on the way.
//!
//! Module layout:
//! - `path`, `guard`, `captures`: the per-run state and its algebra
//! - `dedup`, `context`: state equivalence and the mutable run context
//! - `traversal`: the search itself
//! - `trace`, `dump`: debugging output

mod captures;
mod config;
mod context;
mod dedup;
pub mod dump;
mod error;
mod guard;
mod invariants;
mod path;
mod successor;
mod trace;
mod traversal;

#[cfg(test)]
mod lookaround_tests;

pub use captures::{CaptureBoundaries, CaptureLog, CaptureOp};
pub use config::TraversalConfig;
pub use dedup::{DedupIndex, DedupKey};
pub use error::TraversalError;
pub use guard::{CounterValue, Guard, GuardKind, GuardLog, Iteration, Verdict, canonicalize};
pub use path::{Action, Mark, Path, PathElement};
pub use successor::{Anchors, OwnedSuccessor, Successor, Target};
pub use trace::{NoopTracer, PrintTracer, Prune, Tracer};
pub use traversal::{Traversal, Visitor};

/// Result type for traversal runs.
pub type Result<T> = std::result::Result<T, TraversalError>;
