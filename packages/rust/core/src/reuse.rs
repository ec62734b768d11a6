//! Copy-forward of previous translations.
//!
//! A persisted translation is reused only when it was produced for the same
//! destination language and the same source text, and was judged
//! successful. Copying is positional, so a list group is copied only when
//! the old and new lists have the same length; groups that fail the check
//! are reported back as stale.

use recipefeed_shared::DetailRecord;

use crate::fingerprint::Fingerprint;
use crate::localize::FieldGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseDecision {
    CopyForward,
    Retranslate,
}

/// Decide whether `old`'s translation can be reused for a record whose
/// source text hashes to `fingerprint`.
pub fn decide_reuse(
    old: Option<&DetailRecord>,
    dest_language: &str,
    fingerprint: &Fingerprint,
) -> ReuseDecision {
    let reusable = old
        .and_then(|o| o.translation.as_ref())
        .is_some_and(|meta| {
            meta.translated
                && meta.dest_language == dest_language
                && fingerprint.matches(&meta.source_fingerprint)
        });

    if reusable {
        ReuseDecision::CopyForward
    } else {
        ReuseDecision::Retranslate
    }
}

/// Copy translated text from `old` into `new` and return the groups that
/// could not be copied.
///
/// With an `authoritative_title` the title is taken from it instead of the
/// old record. Step numbering and media stay as in `new`.
pub fn copy_forward(
    old: &DetailRecord,
    new: &mut DetailRecord,
    authoritative_title: Option<&str>,
) -> Vec<FieldGroup> {
    let mut stale = Vec::new();

    match authoritative_title {
        Some(title) => new.title = title.to_string(),
        None if !old.title.is_empty() => new.title = old.title.clone(),
        None => stale.push(FieldGroup::Title),
    }

    new.nutrition_tip = old.nutrition_tip.clone();

    if old.ingredients.len() == new.ingredients.len() {
        for (n, o) in new.ingredients.iter_mut().zip(&old.ingredients) {
            n.name = o.name.clone();
            n.amount = o.amount.clone();
        }
    } else {
        stale.push(FieldGroup::Ingredients);
    }

    if old.steps.len() == new.steps.len() {
        for (n, o) in new.steps.iter_mut().zip(&old.steps) {
            n.text = o.text.clone();
        }
    } else {
        stale.push(FieldGroup::Steps);
    }

    if old.warnings.len() == new.warnings.len() {
        new.warnings = old.warnings.clone();
    } else {
        stale.push(FieldGroup::Warnings);
    }

    stale
}
