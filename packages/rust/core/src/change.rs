//! Change detection against the previously persisted documents.
//!
//! Volatile fields are blanked before comparison: `version` and
//! `updated_at` for the manifest, `updated_at` for detail records. A record
//! whose only difference is its `_translation` block is rewritten, but its
//! `updated_at` is carried forward.

use chrono::{DateTime, Utc};
use recipefeed_shared::{DetailRecord, IndexItem, Manifest, RecipeIndex};

/// Timestamp format used for `updated_at` and minted versions.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Version token for a writing run: the explicit override when present and
/// non-blank, else the run timestamp.
pub fn mint_version(version_override: Option<&str>, now: DateTime<Utc>) -> String {
    version_override
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| timestamp(now), str::to_string)
}

// ---------------------------------------------------------------------------
// Per-document checks
// ---------------------------------------------------------------------------

/// The index changed if the item sequences differ. A missing index always
/// counts as changed.
pub fn index_changed(old: Option<&RecipeIndex>, new_items: &[IndexItem]) -> bool {
    old.is_none_or(|o| o.items != new_items)
}

/// The manifest changed if it differs with `version` and `updated_at`
/// ignored.
pub fn manifest_changed(old: Option<&Manifest>, new: &Manifest) -> bool {
    let strip = |m: &Manifest| Manifest {
        version: String::new(),
        updated_at: String::new(),
        ..m.clone()
    };
    old.is_none_or(|o| strip(o) != strip(new))
}

/// Outcome of stamping one detail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailChange {
    /// No prior record.
    New,
    /// Content differs; `updated_at` set to the run timestamp.
    Changed,
    /// Only translation metadata differs; rewritten with the old `updated_at`.
    MetadataOnly,
    /// Identical apart from `updated_at`; not rewritten.
    Unchanged,
}

impl DetailChange {
    pub fn needs_write(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Compare `new` with `old` and set `new.updated_at` accordingly.
pub fn stamp_detail(old: Option<&DetailRecord>, new: &mut DetailRecord, now: &str) -> DetailChange {
    let Some(old) = old else {
        new.updated_at = now.to_string();
        return DetailChange::New;
    };

    let without_stamp = |d: &DetailRecord| DetailRecord {
        updated_at: String::new(),
        ..d.clone()
    };
    let content = |d: &DetailRecord| DetailRecord {
        updated_at: String::new(),
        translation: None,
        ..d.clone()
    };

    if without_stamp(old) == without_stamp(new) {
        new.updated_at = old.updated_at.clone();
        DetailChange::Unchanged
    } else if content(old) == content(new) {
        new.updated_at = old.updated_at.clone();
        DetailChange::MetadataOnly
    } else {
        new.updated_at = now.to_string();
        DetailChange::Changed
    }
}

// ---------------------------------------------------------------------------
// Run-level aggregate
// ---------------------------------------------------------------------------

/// Everything the change detector found in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub index: bool,
    pub manifest: bool,
    pub new_details: usize,
    pub changed_details: usize,
    pub metadata_only_details: usize,
    pub unchanged_details: usize,
}

impl ChangeSet {
    pub fn record(&mut self, change: DetailChange) {
        match change {
            DetailChange::New => self.new_details += 1,
            DetailChange::Changed => self.changed_details += 1,
            DetailChange::MetadataOnly => self.metadata_only_details += 1,
            DetailChange::Unchanged => self.unchanged_details += 1,
        }
    }

    pub fn any(&self) -> bool {
        self.index
            || self.manifest
            || self.new_details + self.changed_details + self.metadata_only_details > 0
    }
}
