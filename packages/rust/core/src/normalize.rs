//! Raw connector output to the canonical index/detail pair.

use std::collections::HashSet;

use recipefeed_shared::text::{collapse_ws, is_iso_date, truncate_chars};
use recipefeed_shared::{
    DetailRecord, IndexItem, RawRecord, SourceInfo, Step, UNKNOWN_PUBLISH_DATE, record_id,
};

use crate::classify::AgeRules;

/// Character budget of the teaser derived from the description.
pub const TIP_MAX_CHARS: usize = 80;

const TIP_ELLIPSIS: &str = "…";

/// Build the listing entry and the full record for one raw record.
///
/// `tags` are the connector-mapped labels; blanks and repeats are dropped,
/// first occurrence kept. The result carries no translation metadata and
/// an empty `updated_at`; both are filled in later in the run.
pub fn normalize(
    raw: &RawRecord,
    source: &SourceInfo,
    tags: Vec<String>,
    rules: &AgeRules,
) -> (IndexItem, DetailRecord) {
    let mut seen = HashSet::new();
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| collapse_ws(&t))
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect();

    let publish_date = if is_iso_date(&raw.publish_date) {
        raw.publish_date.clone()
    } else {
        UNKNOWN_PUBLISH_DATE.to_string()
    };

    let min_age_month = rules.classify(
        &raw.title,
        &raw.description,
        raw.ingredients.iter().map(|i| i.name.as_str()),
        &tags,
    );

    let steps = raw
        .steps
        .iter()
        .zip(1..)
        .map(|(text, index)| Step {
            index,
            img: String::new(),
            text: text.clone(),
        })
        .collect();

    let detail = DetailRecord {
        id: record_id(&raw.source_url),
        title: raw.title.clone(),
        min_age_month,
        tags,
        difficulty: 1,
        time_cost: raw.duration_minutes.unwrap_or(0),
        cover_image: raw.cover_image_url.clone(),
        nutrition_tip: truncate_chars(&raw.description, TIP_MAX_CHARS, TIP_ELLIPSIS),
        ingredients: raw.ingredients.clone(),
        steps,
        warnings: raw.warnings.clone(),
        publish_date,
        updated_at: String::new(),
        source_url: raw.source_url.clone(),
        origin_url: raw.origin_url.clone(),
        source_name: source.name.clone(),
        translation: None,
    };

    (detail.to_index_item(), detail)
}
