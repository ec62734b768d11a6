//! MyPlate Kitchen connector.
//!
//! Slugs come from the site sitemaps, falling back to the paginated recipe
//! listing when no sitemap yields anything. Details are JSON-LD only.

use std::collections::HashSet;

use async_trait::async_trait;
use recipefeed_shared::text::collapse_ws;
use recipefeed_shared::{Ingredient, RawRecord, RecipeFeedError, Result, SourceInfo};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{SourceConnector, TagMap};
use crate::http::{self, HttpSession};
use crate::{jsonld, sitemap};

const DEFAULT_BASE: &str = "https://www.myplate.gov";
const RECIPES_PATH: &str = "/myplate-kitchen/recipes";

/// Sitemap slugs gathered per unit of page budget.
const SLUGS_PER_PAGE: usize = 50;

const TAGS: TagMap = TagMap {
    meals: &[
        ("Breakfast", "早餐"),
        ("Lunch", "午餐"),
        ("Dinner", "晚餐"),
        ("Snack", "小吃"),
        ("Snacks", "小吃"),
    ],
    labels: &[
        ("Kid-Friendly", "儿童友好"),
        ("30 Minutes or Less", "30分钟内"),
        ("Vegetables", "蔬菜"),
        ("Fruits", "水果"),
        ("Protein", "蛋白质"),
        ("Grains", "谷物"),
        ("Dairy", "乳制品"),
        ("Main Dish", "主菜"),
        ("Main Dishes", "主菜"),
        ("Side Dish", "配菜"),
        ("Side Dishes", "配菜"),
        ("Appetizer", "开胃菜"),
        ("Dessert", "甜品"),
    ],
};

pub struct MyPlateConnector {
    session: HttpSession,
    base: String,
}

impl MyPlateConnector {
    pub fn new(session: HttpSession) -> Self {
        Self::with_base_url(session, DEFAULT_BASE)
    }

    pub fn with_base_url(session: HttpSession, base: &str) -> Self {
        Self {
            session,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn listing_url(&self) -> String {
        format!("{}{RECIPES_PATH}", self.base)
    }

    fn recipe_prefix(&self) -> String {
        format!("{}{RECIPES_PATH}/", self.base)
    }

    async fn list_from_pages(&self, page_budget: u32) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut slugs = Vec::new();

        for page in 0..page_budget {
            let url = match page {
                0 => self.listing_url(),
                n => format!("{}?page={n}", self.listing_url()),
            };
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
            if slugs.len() == before {
                break;
            }
        }

        Ok(slugs)
    }
}

/// Recipe slugs linked from a listing page.
fn parse_listing(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(links) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let prefix = format!("{RECIPES_PATH}/");
    doc.select(&links)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| sitemap::slug_under(href, &prefix))
        .collect()
}

/// `mainEntityOfPage` as a URL, whether given as a string, `{@id}` or `{url}`.
fn main_entity_url(ld: &Value) -> String {
    match ld.get("mainEntityOfPage") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Object(obj)) => obj
            .get("@id")
            .or_else(|| obj.get("url"))
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn parse_recipe_page(html: &str, slug: &str, page_url: &str) -> Result<RawRecord> {
    let doc = Html::parse_document(html);
    let ld = jsonld::extract_recipe(&doc)
        .ok_or_else(|| RecipeFeedError::parse(format!("{page_url}: no Recipe JSON-LD")))?;

    let title = match jsonld::str_field(&ld, "name") {
        t if t.is_empty() => collapse_ws(&slug.replace('-', " ")),
        t => t,
    };

    let duration_minutes = ["totalTime", "prepTime"]
        .iter()
        .filter_map(|key| ld.get(*key).and_then(Value::as_str))
        .find_map(jsonld::parse_duration_minutes);

    let ingredients = jsonld::ingredient_lines(&ld)
        .into_iter()
        .map(|line| Ingredient::new(line, ""))
        .collect();

    let mut categories = jsonld::string_list(ld.get("recipeCuisine"));
    categories.extend(jsonld::string_list(ld.get("keywords")));

    let origin_url = match main_entity_url(&ld) {
        url if url == page_url => String::new(),
        url => url,
    };

    Ok(RawRecord {
        slug: slug.to_string(),
        title,
        description: jsonld::str_field(&ld, "description"),
        publish_date: jsonld::publish_date(&jsonld::str_field(&ld, "datePublished")),
        cover_image_url: http::resolve_href(page_url, &jsonld::image_url(&ld)),
        source_url: page_url.to_string(),
        origin_url,
        meal_types: jsonld::string_list(ld.get("recipeCategory")),
        categories,
        food_groups: Vec::new(),
        duration_minutes,
        ingredients,
        steps: jsonld::instruction_steps(&ld),
        warnings: Vec::new(),
    })
}

#[async_trait]
impl SourceConnector for MyPlateConnector {
    fn name(&self) -> &str {
        "myplate_gov"
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "MyPlate Kitchen (USDA)".into(),
            base_url: self.listing_url(),
            note: "USDA MyPlate Kitchen recipes. Keep source_url for attribution.".into(),
        }
    }

    async fn list_record_slugs(&self, page_budget: u32) -> Result<Vec<String>> {
        let roots = vec![
            format!("{}/sitemap.xml", self.base),
            format!("{}/sitemap_index.xml", self.base),
        ];
        let cap = page_budget.max(1) as usize * SLUGS_PER_PAGE;
        let slugs =
            sitemap::collect_slugs(&self.session, &roots, &self.base, &self.recipe_prefix(), cap)
                .await;

        if !slugs.is_empty() {
            debug!(count = slugs.len(), "slugs from sitemap");
            return Ok(slugs);
        }

        info!("sitemap yielded no recipes, falling back to listing pages");
        self.list_from_pages(page_budget).await
    }

    async fn fetch_record(&self, slug: &str) -> Result<RawRecord> {
        let page_url = format!("{}{slug}", self.recipe_prefix());
        let html = self.session.get_text(&page_url).await?;
        parse_recipe_page(&html, slug, &page_url)
    }

    fn map_tags(&self, raw: &RawRecord) -> Vec<String> {
        TAGS.map(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use recipefeed_shared::HttpConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn detail_page(page_url: &str) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">
{{"@context": "https://schema.org", "@graph": [
  {{"@type": "WebPage", "name": "ignored"}},
  {{"@type": "Recipe", "name": "Veggie Quesadillas",
    "datePublished": "2022-11-30T08:00:00-05:00",
    "description": "Cheesy and quick.",
    "image": ["https://img.example/q.jpg"],
    "totalTime": "PT25M",
    "recipeIngredient": ["2 tortillas", "1/2 cup cheese"],
    "recipeInstructions": [{{"@type": "HowToStep", "text": "Fill."}}, {{"@type": "HowToStep", "text": "Toast."}}],
    "recipeCategory": "Lunch",
    "recipeCuisine": "Mexican",
    "keywords": "Kid-Friendly, Vegetables",
    "mainEntityOfPage": {{"@id": "{page_url}"}}
  }}
]}}
</script></head><body></body></html>"#
        )
    }

    #[test]
    fn parses_json_ld_detail() {
        let url = "https://www.myplate.gov/myplate-kitchen/recipes/veggie-quesadillas";
        let raw = parse_recipe_page(&detail_page(url), "veggie-quesadillas", url).expect("parse");
        assert_eq!(raw.title, "Veggie Quesadillas");
        assert_eq!(raw.publish_date, "2022-11-30");
        assert_eq!(raw.duration_minutes, Some(25));
        assert_eq!(raw.cover_image_url, "https://img.example/q.jpg");
        assert_eq!(raw.ingredients[1], Ingredient::new("1/2 cup cheese", ""));
        assert_eq!(raw.steps, vec!["Fill.", "Toast."]);
        assert_eq!(raw.meal_types, vec!["Lunch"]);
        assert_eq!(raw.categories, vec!["Mexican", "Kid-Friendly", "Vegetables"]);
        assert_eq!(raw.origin_url, "", "self-referential origin is blanked");

        let session = HttpSession::new(&HttpConfig::default()).expect("session");
        let connector = MyPlateConnector::new(session);
        assert_eq!(
            connector.map_tags(&raw),
            vec!["午餐", "Mexican", "儿童友好", "蔬菜"]
        );
    }

    #[test]
    fn missing_json_ld_is_parse_error() {
        let err = parse_recipe_page("<html></html>", "x", "u").unwrap_err();
        assert!(matches!(err, RecipeFeedError::Parse { .. }));
    }

    #[test]
    fn listing_links_are_slugs() {
        let html = r#"<a href="/myplate-kitchen/recipes/apple-crisp">A</a>
            <a href="/myplate-kitchen/recipes/">all</a>
            <a href="/about">about</a>
            <a href="/myplate-kitchen/recipes/bean-dip?x=1">B</a>"#;
        assert_eq!(parse_listing(html), vec!["apple-crisp", "bean-dip"]);
    }

    #[tokio::test]
    async fn lists_from_nested_sitemaps() {
        let server = MockServer::start().await;
        let base = server.uri();
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<sitemapindex><sitemap><loc>{base}/sitemap-recipes.xml</loc></sitemap></sitemapindex>"
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap-recipes.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<urlset><url><loc>{base}/myplate-kitchen/recipes/apple-crisp</loc></url>\
                 <url><loc>{base}/about</loc></url>\
                 <url><loc>{base}/myplate-kitchen/recipes/bean-dip</loc></url></urlset>"
            )))
            .mount(&server)
            .await;

        let session = HttpSession::new(&HttpConfig::default()).expect("session");
        let connector = MyPlateConnector::with_base_url(session, &base);
        let slugs = connector.list_record_slugs(1).await.expect("list");
        assert_eq!(slugs, vec!["apple-crisp", "bean-dip"]);
    }

    #[tokio::test]
    async fn falls_back_to_listing_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/myplate-kitchen/recipes"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a href="/myplate-kitchen/recipes/apple-crisp">A</a>"#,
            ))
            .mount(&server)
            .await;

        let session = HttpSession::new(&HttpConfig::default()).expect("session");
        let connector = MyPlateConnector::with_base_url(session, &server.uri());
        let slugs = connector.list_record_slugs(3).await.expect("list");
        assert_eq!(slugs, vec!["apple-crisp"]);
    }
}
