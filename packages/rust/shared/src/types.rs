//! Core domain types for the recipe feed.
//!
//! The serialized field order of every document type is fixed by struct
//! declaration order so that persisted JSON stays diffable between runs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Publish date used when a publisher gives none or gives a malformed one.
pub const UNKNOWN_PUBLISH_DATE: &str = "1970-01-01";

/// Content address of a record: first 32 hex chars of SHA-256 over the
/// canonical source URL. Independent of record content.
pub fn record_id(source_url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(source_url.as_bytes()));
    digest[..32].to_string()
}

// ---------------------------------------------------------------------------
// Connector output
// ---------------------------------------------------------------------------

/// A recipe as parsed from a publisher page, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Connector-specific identifier the record was fetched by.
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Unvalidated publish date as found on the page.
    pub publish_date: String,
    /// Remote cover image URL, empty when the page has none.
    pub cover_image_url: String,
    /// Canonical URL of the recipe page. Hashed into the record id.
    pub source_url: String,
    /// Upstream attribution URL, empty when unknown.
    pub origin_url: String,
    pub meal_types: Vec<String>,
    pub categories: Vec<String>,
    pub food_groups: Vec<String>,
    /// Preparation or total time in minutes.
    pub duration_minutes: Option<u32>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub warnings: Vec<String>,
}

/// Provenance of one publisher, as recorded in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub note: String,
}

// ---------------------------------------------------------------------------
// IndexItem / DetailRecord
// ---------------------------------------------------------------------------

/// Lightweight listing entry in `recipes_index.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexItem {
    pub id: String,
    pub title: String,
    pub min_age_month: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default)]
    pub time_cost: u32,
    #[serde(default)]
    pub cover_image: String,
    pub publish_date: String,
    #[serde(default)]
    pub source_name: String,
}

fn default_difficulty() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
        }
    }
}

/// One preparation step. `img` is empty when the step has no media.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "step_index")]
    pub index: u32,
    #[serde(default)]
    pub img: String,
    #[serde(default)]
    pub text: String,
}

/// Translation bookkeeping stored alongside each detail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationMeta {
    #[serde(alias = "dest")]
    pub dest_language: String,
    #[serde(alias = "source_hash")]
    pub source_fingerprint: String,
    pub translated: bool,
}

/// Full record written to `recipes/<id>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub id: String,
    pub title: String,
    pub min_age_month: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default)]
    pub time_cost: u32,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub nutrition_tip: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub publish_date: String,
    /// Last time the content changed, not the last run.
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub origin_url: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(
        rename = "_translation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub translation: Option<TranslationMeta>,
}

impl DetailRecord {
    /// Listing entry carrying the same shared fields.
    pub fn to_index_item(&self) -> IndexItem {
        IndexItem {
            id: self.id.clone(),
            title: self.title.clone(),
            min_age_month: self.min_age_month,
            tags: self.tags.clone(),
            difficulty: self.difficulty,
            time_cost: self.time_cost,
            cover_image: self.cover_image.clone(),
            publish_date: self.publish_date.clone(),
            source_name: self.source_name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest / RecipeIndex
// ---------------------------------------------------------------------------

/// Run-level summary written to `manifest.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub updated_at: String,
    pub recipe_count: usize,
    #[serde(default)]
    pub latest_ids: Vec<String>,
    #[serde(default)]
    pub source: SourceInfo,
    #[serde(default)]
    pub sources: Vec<SourceInfo>,
}

/// Root structure of `recipes_index.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeIndex {
    #[serde(default)]
    pub version: String,
    pub items: Vec<IndexItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_is_stable_and_url_addressed() {
        let a = record_id("https://www.nutrition.gov/recipes/apple-oatmeal");
        let b = record_id("https://www.nutrition.gov/recipes/apple-oatmeal");
        let c = record_id("https://www.nutrition.gov/recipes/banana-bread");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn detail_serializes_wire_names() {
        let detail = DetailRecord {
            id: "abc".into(),
            title: "Soup".into(),
            min_age_month: 8,
            steps: vec![Step {
                index: 1,
                img: String::new(),
                text: "Boil".into(),
            }],
            publish_date: UNKNOWN_PUBLISH_DATE.into(),
            translation: Some(TranslationMeta {
                dest_language: "zh-CN".into(),
                source_fingerprint: "ff".into(),
                translated: true,
            }),
            ..Default::default()
        };

        let json = serde_json::to_value(&detail).expect("serialize");
        assert_eq!(json["steps"][0]["step_index"], 1);
        assert_eq!(json["steps"][0]["img"], "");
        assert_eq!(json["_translation"]["dest_language"], "zh-CN");
    }

    #[test]
    fn translation_meta_accepts_legacy_keys() {
        let raw = r#"{"dest": "zh-CN", "source_hash": "0a1b", "translated": true}"#;
        let meta: TranslationMeta = serde_json::from_str(raw).expect("parse legacy meta");
        assert_eq!(meta.dest_language, "zh-CN");
        assert_eq!(meta.source_fingerprint, "0a1b");
        assert!(meta.translated);
    }

    #[test]
    fn detail_without_translation_omits_block() {
        let detail = DetailRecord {
            id: "x".into(),
            publish_date: "2024-05-01".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&detail).expect("serialize");
        assert!(!json.contains("_translation"));

        let parsed: DetailRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, detail);
    }

    #[test]
    fn index_item_from_detail() {
        let detail = DetailRecord {
            id: "id1".into(),
            title: "Mashed Peas".into(),
            min_age_month: 6,
            tags: vec!["早餐".into()],
            difficulty: 1,
            time_cost: 10,
            publish_date: "2024-01-02".into(),
            source_name: "Nutrition.gov (USDA)".into(),
            nutrition_tip: "ignored".into(),
            ..Default::default()
        };
        let item = detail.to_index_item();
        assert_eq!(item.id, "id1");
        assert_eq!(item.time_cost, 10);
        assert_eq!(item.source_name, "Nutrition.gov (USDA)");
    }
}
