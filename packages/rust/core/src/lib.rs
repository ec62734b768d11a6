//! Core pipeline orchestration and domain logic for recipefeed.
//!
//! This crate turns raw connector records into the published data set:
//! normalization and age classification, source fingerprints, batched
//! translation with copy-forward reuse, change detection, and the
//! end-to-end [`pipeline::run_pipeline`].

pub mod artifacts;
pub mod change;
pub mod classify;
pub mod fingerprint;
pub mod localize;
pub mod normalize;
pub mod pipeline;
pub mod reuse;

pub use classify::{AgeRule, AgeRules};
pub use fingerprint::Fingerprint;
pub use pipeline::{ProgressReporter, RunServices, RunSummary, SilentProgress, run_pipeline};
