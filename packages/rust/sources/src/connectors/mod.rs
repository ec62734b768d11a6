//! Source connector trait, tag mapping and the connector registry.

mod myplate_gov;
mod nutrition_gov;

use std::collections::HashSet;

use async_trait::async_trait;
use recipefeed_shared::text::collapse_ws;
use recipefeed_shared::{ALL_SITES, RawRecord, RecipeFeedError, Result, SourceInfo};
use scraper::ElementRef;

use crate::http::HttpSession;

pub use myplate_gov::MyPlateConnector;
pub use nutrition_gov::NutritionGovConnector;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A publisher of recipe records.
///
/// Connectors are drained one at a time. `fetch_record` failures are
/// per-record and must be handled by the caller.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Registry name used for site selection (e.g. `nutrition_gov`).
    fn name(&self) -> &str;

    /// Provenance recorded in the manifest.
    fn info(&self) -> SourceInfo;

    /// Identifiers of the records currently published, fetching at most
    /// `page_budget` listing pages.
    async fn list_record_slugs(&self, page_budget: u32) -> Result<Vec<String>>;

    /// Fetch and parse one record.
    async fn fetch_record(&self, slug: &str) -> Result<RawRecord>;

    /// Localized tags for a record.
    fn map_tags(&self, raw: &RawRecord) -> Vec<String>;
}

// ---------------------------------------------------------------------------
// Tag mapping
// ---------------------------------------------------------------------------

/// Label translations for one publisher.
pub struct TagMap {
    pub meals: &'static [(&'static str, &'static str)],
    pub labels: &'static [(&'static str, &'static str)],
}

impl TagMap {
    /// Map meal types, categories and food groups in that order. Unknown
    /// labels pass through; empty and repeated tags are dropped.
    pub fn map(&self, raw: &RawRecord) -> Vec<String> {
        let lookup = |table: &[(&str, &str)], label: &str| {
            table
                .iter()
                .find(|(from, _)| *from == label)
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| label.to_string())
        };

        let meals = raw.meal_types.iter().map(|t| lookup(self.meals, t));
        let labels = raw
            .categories
            .iter()
            .chain(&raw.food_groups)
            .map(|t| lookup(self.labels, t));

        let mut seen = HashSet::new();
        meals
            .chain(labels)
            .map(|t| collapse_ws(&t))
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect()
    }
}

/// Text content of an element, pieces joined by spaces and collapsed.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<Vec<_>>().join(" "))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Connectors in configured run order.
pub struct SourceRegistry {
    connectors: Vec<Box<dyn SourceConnector>>,
}

impl SourceRegistry {
    /// All built-in connectors sharing one HTTP session.
    pub fn new(session: &HttpSession) -> Self {
        Self {
            connectors: vec![
                Box::new(NutritionGovConnector::new(session.clone())),
                Box::new(MyPlateConnector::new(session.clone())),
            ],
        }
    }

    pub fn from_connectors(connectors: Vec<Box<dyn SourceConnector>>) -> Self {
        Self { connectors }
    }

    pub fn names(&self) -> Vec<&str> {
        self.connectors.iter().map(|c| c.name()).collect()
    }

    /// Resolve a site selector to connectors. `all` selects every connector
    /// in registry order; anything else must name exactly one.
    pub fn select(&self, site: &str) -> Result<Vec<&dyn SourceConnector>> {
        if site == ALL_SITES {
            return Ok(self.connectors.iter().map(|c| c.as_ref()).collect());
        }

        self.connectors
            .iter()
            .find(|c| c.name() == site)
            .map(|c| vec![c.as_ref()])
            .ok_or_else(|| {
                RecipeFeedError::config(format!(
                    "unsupported site '{site}', expected one of: {}, {}",
                    ALL_SITES,
                    self.names().join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use recipefeed_shared::HttpConfig;

    const MAP: TagMap = TagMap {
        meals: &[("Breakfast", "早餐")],
        labels: &[("Vegetables", "蔬菜"), ("Kid-Friendly", "儿童友好")],
    };

    #[test]
    fn tag_map_translates_and_dedupes() {
        let raw = RawRecord {
            meal_types: vec!["Breakfast".into(), "Brunch".into()],
            categories: vec!["Kid-Friendly".into(), " ".into()],
            food_groups: vec!["Vegetables".into(), "Kid-Friendly".into()],
            ..Default::default()
        };
        assert_eq!(MAP.map(&raw), vec!["早餐", "Brunch", "儿童友好", "蔬菜"]);
    }

    #[test]
    fn registry_selects_by_name() {
        let session = HttpSession::new(&HttpConfig::default()).expect("session");
        let registry = SourceRegistry::new(&session);
        assert_eq!(registry.names(), vec!["nutrition_gov", "myplate_gov"]);

        let all = registry.select("all").expect("all");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name(), "nutrition_gov");

        let one = registry.select("myplate_gov").expect("one");
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].info().name, "MyPlate Kitchen (USDA)");
    }

    #[test]
    fn registry_rejects_unknown_site() {
        let session = HttpSession::new(&HttpConfig::default()).expect("session");
        let registry = SourceRegistry::new(&session);
        let Err(err) = registry.select("allrecipes") else {
            panic!("unknown site must be rejected");
        };
        assert!(matches!(err, RecipeFeedError::Config { .. }));
        assert!(err.to_string().contains("allrecipes"));
    }
}
