//! Nutrition.gov recipe connector.
//!
//! Listing comes from the paginated search page; details combine JSON-LD
//! with the site's Drupal field markup.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use recipefeed_shared::text::collapse_ws;
use recipefeed_shared::{Ingredient, RawRecord, RecipeFeedError, Result, SourceInfo};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use super::{SourceConnector, TagMap, element_text};
use crate::http::{self, HttpSession};
use crate::jsonld;

const DEFAULT_BASE: &str = "https://www.nutrition.gov";

static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*minutes?").expect("valid regex"));

const TAGS: TagMap = TagMap {
    meals: &[
        ("Breakfast", "早餐"),
        ("Lunch", "午餐"),
        ("Dinner", "晚餐"),
        ("Snack", "小吃"),
    ],
    labels: &[
        ("Kid-Friendly", "儿童友好"),
        ("30 Minutes or Less", "30分钟内"),
        ("Vegetables", "蔬菜"),
        ("Fruits", "水果"),
        ("Protein", "蛋白质"),
        ("Grains", "谷物"),
        ("Dairy", "乳制品"),
    ],
};

pub struct NutritionGovConnector {
    session: HttpSession,
    base: String,
}

impl NutritionGovConnector {
    pub fn new(session: HttpSession) -> Self {
        Self::with_base_url(session, DEFAULT_BASE)
    }

    /// Point the connector at another host (mirrors, tests).
    pub fn with_base_url(session: HttpSession, base: &str) -> Self {
        Self {
            session,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self) -> String {
        format!("{}/recipes/search", self.base)
    }
}

/// Slugs of recipe cards on one search results page.
fn parse_listing(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(cards) = Selector::parse(r#"div.recipe[about^="/recipes/"]"#) else {
        return Vec::new();
    };
    doc.select(&cards)
        .filter_map(|card| card.value().attr("about"))
        .filter_map(|about| about.strip_prefix("/recipes/"))
        .filter(|slug| !slug.is_empty())
        .map(str::to_string)
        .collect()
}

fn select_texts(doc: &Html, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&sel)
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse a recipe detail page.
fn parse_recipe_page(html: &str, slug: &str, page_url: &str) -> RawRecord {
    let doc = Html::parse_document(html);
    let ld = jsonld::extract_recipe(&doc).unwrap_or(Value::Null);

    let title = match jsonld::str_field(&ld, "name") {
        t if t.is_empty() => collapse_ws(&slug.replace('-', " ")),
        t => t,
    };

    let origin_url = ld
        .get("creator")
        .and_then(|c| c.get("url"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let duration_minutes = Selector::parse("div.field--name-recipe-prep-time .field--item")
        .ok()
        .and_then(|sel| doc.select(&sel).next().map(|el| element_text(&el)))
        .and_then(|text| {
            MINUTES
                .captures(&text)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        });

    let mut ingredients = Vec::new();
    if let (Ok(rows), Ok(qty), Ok(name)) = (
        Selector::parse("div.field--name-ingredients .field--name-ingredients .field--item"),
        Selector::parse(".quantity-unit"),
        Selector::parse(".ingredient-name"),
    ) {
        for row in doc.select(&rows) {
            let Some(name_el) = row.select(&name).next() else {
                continue;
            };
            let name = element_text(&name_el);
            if name.is_empty() {
                continue;
            }
            let amount = row
                .select(&qty)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default();
            ingredients.push(Ingredient::new(name, amount));
        }
    }

    RawRecord {
        slug: slug.to_string(),
        title,
        description: jsonld::str_field(&ld, "description"),
        publish_date: jsonld::str_field(&ld, "datePublished"),
        cover_image_url: http::resolve_href(page_url, &jsonld::image_url(&ld)),
        source_url: page_url.to_string(),
        origin_url,
        meal_types: select_texts(&doc, "div.field--name-recipe-course span.field--item"),
        categories: select_texts(&doc, "div.field--name-recipe-category a"),
        food_groups: select_texts(&doc, "div.field--name-recipe-food-group span.field--item"),
        duration_minutes,
        ingredients,
        steps: select_texts(&doc, "div.field--name-recipe-instructions ol li"),
        warnings: Vec::new(),
    }
}

#[async_trait]
impl SourceConnector for NutritionGovConnector {
    fn name(&self) -> &str {
        "nutrition_gov"
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "Nutrition.gov (USDA)".into(),
            base_url: self.search_url(),
            note: "USDA/NAL content, generally public domain. Keep source_url and origin_url for attribution.".into(),
        }
    }

    async fn list_record_slugs(&self, page_budget: u32) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut slugs = Vec::new();

        for page in 0..page_budget {
            let url = format!("{}?page={page}", self.search_url());
            let html = match self.session.get_text(&url).await {
                Ok(html) => html,
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    warn!(%url, error = %e, "listing page failed, stopping pagination");
                    break;
                }
            };

            let before = slugs.len();
            for slug in parse_listing(&html) {
                if seen.insert(slug.clone()) {
                    slugs.push(slug);
                }
            }
            debug!(page, added = slugs.len() - before, total = slugs.len(), "listing page parsed");

            if slugs.len() == before {
                break;
            }
        }

        Ok(slugs)
    }

    async fn fetch_record(&self, slug: &str) -> Result<RawRecord> {
        let page_url = format!("{}/recipes/{slug}", self.base);
        let html = self.session.get_text(&page_url).await?;
        let record = parse_recipe_page(&html, slug, &page_url);
        if record.title.is_empty() {
            return Err(RecipeFeedError::parse(format!("{page_url}: no title")));
        }
        Ok(record)
    }

    fn map_tags(&self, raw: &RawRecord) -> Vec<String> {
        TAGS.map(raw)
    }
}
