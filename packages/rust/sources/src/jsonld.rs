//! JSON-LD helpers for schema.org `Recipe` objects.

use std::collections::HashSet;
use std::sync::LazyLock;

use recipefeed_shared::text::{collapse_ws, is_iso_date};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

static ISO8601_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:\d+Y)?(?:\d+M)?(?:\d+D)?T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$")
        .expect("valid regex")
});

static DATE_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"));

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\r?\n)+").expect("valid regex"));

/// Return the first `Recipe` object found in any JSON-LD script of `doc`.
pub fn extract_recipe(doc: &Html) -> Option<Value> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for script in doc.select(&selector) {
        let raw = script.text().collect::<String>();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let Ok(data) = serde_json::from_str::<Value>(&sanitize_json(raw)) else {
            continue;
        };
        if let Some(recipe) = find_recipe(&data) {
            return Some(recipe.clone());
        }
    }
    None
}

/// Escape raw control characters inside JSON strings. Some publishers emit
/// literal newlines in string values.
fn sanitize_json(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    result.push(c);
                }
                '\\' => {
                    escaped = true;
                    result.push(c);
                }
                '"' => {
                    in_string = false;
                    result.push(c);
                }
                '\n' => result.push_str("\\n"),
                '\r' => result.push_str("\\r"),
                '\t' => result.push_str("\\t"),
                c if c.is_control() => {}
                _ => result.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            result.push(c);
        }
    }
    result
}

fn type_is_recipe(value: &Value) -> bool {
    match value {
        Value::String(s) => s == "Recipe" || s.ends_with(":Recipe"),
        Value::Array(items) => items.iter().any(type_is_recipe),
        _ => false,
    }
}

/// Search `@type`, then `@graph`, then `mainEntity`, recursing into arrays.
pub fn find_recipe(data: &Value) -> Option<&Value> {
    match data {
        Value::Array(items) => items.iter().find_map(find_recipe),
        Value::Object(obj) => {
            if obj.get("@type").is_some_and(type_is_recipe) {
                return Some(data);
            }
            obj.get("@graph")
                .and_then(find_recipe)
                .or_else(|| obj.get("mainEntity").and_then(find_recipe))
        }
        _ => None,
    }
}

/// Whitespace-collapsed string field, empty when absent or not a string.
pub fn str_field(recipe: &Value, key: &str) -> String {
    recipe
        .get(key)
        .and_then(Value::as_str)
        .map(collapse_ws)
        .unwrap_or_default()
}

/// First image URL from a string, an object with `url`, or an array of either.
pub fn image_url(recipe: &Value) -> String {
    let url_of = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };

    match recipe.get("image") {
        Some(Value::Array(items)) => items.first().and_then(url_of).unwrap_or_default(),
        Some(other) => url_of(other).unwrap_or_default(),
        None => String::new(),
    }
}

/// Flatten a string, comma-separated string, `{name}` object or array of those.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(value) = value {
        collect_strings(value, &mut out);
    }
    out.retain(|s| !s.is_empty());
    out
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(s.split(',').map(collapse_ws)),
        Value::Object(obj) => {
            if let Some(name) = obj.get("name").and_then(Value::as_str) {
                out.push(collapse_ws(name));
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Convert `PT1H30M`-style durations to whole minutes, rounding seconds.
/// `None` when the value is malformed or does not fit in a `u32`.
pub fn parse_duration_minutes(value: &str) -> Option<u32> {
    let caps = ISO8601_DURATION.captures(value.trim())?;
    let num = |i: usize| -> Option<u32> {
        caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
    };
    let seconds = num(3)?;
    num(1)?
        .checked_mul(60)?
        .checked_add(num(2)?)?
        .checked_add(u32::from(seconds >= 30))
}

/// Pull the first `YYYY-MM-DD` out of a date or datetime string.
pub fn publish_date(value: &str) -> String {
    DATE_IN_TEXT
        .find(value)
        .map(|m| m.as_str().to_string())
        .filter(|d| is_iso_date(d))
        .unwrap_or_default()
}

/// Ingredient lines from `recipeIngredient`.
pub fn ingredient_lines(recipe: &Value) -> Vec<String> {
    recipe
        .get("recipeIngredient")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(collapse_ws)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Step texts from `recipeInstructions`, flattening `HowToSection` and
/// `HowToStep` nesting. Duplicates are dropped, first occurrence kept.
pub fn instruction_steps(recipe: &Value) -> Vec<String> {
    let mut steps = Vec::new();
    if let Some(node) = recipe.get("recipeInstructions") {
        walk_instructions(node, &mut steps);
    }

    let mut seen = HashSet::new();
    steps.retain(|s| seen.insert(s.clone()));
    steps
}

fn walk_instructions(node: &Value, out: &mut Vec<String>) {
    let mut add = |text: &str| {
        let text = collapse_ws(text);
        if !text.is_empty() {
            out.push(text);
        }
    };

    match node {
        Value::String(s) => LINE_BREAKS.split(s).for_each(&mut add),
        Value::Array(items) => items.iter().for_each(|item| walk_instructions(item, out)),
        Value::Object(obj) => {
            let text = obj.get("text").and_then(Value::as_str).unwrap_or_default();
            let is_step = obj.get("@type").and_then(Value::as_str) == Some("HowToStep");
            if !text.is_empty() {
                add(text);
            } else if is_step {
                if let Some(name) = obj.get("name").and_then(Value::as_str) {
                    add(name);
                }
            }

            for key in ["itemListElement", "steps"] {
                if let Some(child) = obj.get(key) {
                    walk_instructions(child, out);
                }
            }
        }
        _ => {}
    }
}
