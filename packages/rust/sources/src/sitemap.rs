//! Sitemap traversal.

use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::http::HttpSession;

static LOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").expect("valid regex"));

/// Maximum number of sitemap documents visited per crawl.
const MAX_SITEMAPS: usize = 20;

/// All `<loc>` values of a sitemap or sitemap index, in document order.
pub fn loc_entries(xml: &str) -> Vec<String> {
    LOC.captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Slug of `href` under `prefix`, without query, fragment or slashes.
pub fn slug_under(href: &str, prefix: &str) -> Option<String> {
    let rest = href.strip_prefix(prefix)?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let slug = rest.trim_matches('/');
    (!slug.is_empty()).then(|| slug.to_string())
}

/// Walk `roots` and any nested sitemaps under `site_base`, collecting slugs
/// of URLs that start with `prefix`. Stops at `cap` slugs. Fetch failures
/// are logged and skipped.
pub async fn collect_slugs(
    session: &HttpSession,
    roots: &[String],
    site_base: &str,
    prefix: &str,
    cap: usize,
) -> Vec<String> {
    let mut to_visit: VecDeque<String> = roots.iter().cloned().collect();
    let mut visited = HashSet::new();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    while let Some(url) = to_visit.pop_front() {
        if visited.len() >= MAX_SITEMAPS || out.len() >= cap {
            break;
        }
        if !visited.insert(url.clone()) {
            continue;
        }

        let xml = match session.get_text(&url).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!(%url, error = %e, "sitemap fetch failed, skipping");
                continue;
            }
        };

        for href in loc_entries(&xml) {
            if href.ends_with(".xml") && href.starts_with(site_base) {
                if !visited.contains(&href) {
                    to_visit.push_back(href);
                }
                continue;
            }
            let Some(slug) = slug_under(&href, prefix) else {
                continue;
            };
            if seen.insert(slug.clone()) {
                out.push(slug);
                if out.len() >= cap {
                    break;
                }
            }
        }
        debug!(%url, slugs = out.len(), "sitemap processed");
    }

    out
}
