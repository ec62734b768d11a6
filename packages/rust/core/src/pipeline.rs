//! End-to-end run: connectors → normalize → merge → localize → diff → write.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use recipefeed_shared::{
    DetailRecord, IndexItem, Manifest, RecipeFeedError, RecipeIndex, Result, RunConfig,
    SourceInfo, TranslationMeta,
};
use recipefeed_sources::{ImageStore, SourceConnector};
use recipefeed_translate::{TranslationCache, Translator, has_cjk};

use crate::artifacts::{self, ArtifactSet, DataLayout};
use crate::change::{self, ChangeSet};
use crate::classify::AgeRules;
use crate::fingerprint::Fingerprint;
use crate::localize::Localizer;
use crate::normalize::normalize;
use crate::reuse::{ReuseDecision, copy_forward, decide_reuse};

/// Number of ids listed in `latest_ids`.
pub const LATEST_COUNT: usize = 10;

/// Name of the manifest `source` entry when several sources contributed.
pub const COMBINED_SOURCE_NAME: &str = "Nutrition.gov + MyPlate Kitchen (USDA)";

const COMBINED_SOURCE_NOTE: &str = "Aggregated from several USDA sites. Keep source_url and origin_url for attribution.";

// ---------------------------------------------------------------------------
// Progress & services
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each record fetch.
    fn record_fetched(&self, source: &str, slug: &str, current: usize, total: usize);
    /// Called after each record has been localized and compared.
    fn record_localized(&self, id: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn record_fetched(&self, _source: &str, _slug: &str, _current: usize, _total: usize) {}
    fn record_localized(&self, _id: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Collaborators owned by the caller for the duration of one run.
pub struct RunServices<'a, 's> {
    pub translator: &'a dyn Translator,
    pub cache: &'a mut TranslationCache<'s>,
    /// Cover image store; `None` keeps remote URLs.
    pub images: Option<&'a dyn ImageStore>,
    pub rules: &'a AgeRules,
}

/// Counters describing one run. Serialized into the run history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub records: usize,
    pub failed_records: usize,
    pub duplicates: usize,
    pub titles_reused: usize,
    pub titles_translated: usize,
    pub translations_reused: usize,
    pub records_translated: usize,
    pub records_untranslated: usize,
    pub new_details: usize,
    pub changed_details: usize,
    pub metadata_only_details: usize,
    pub unchanged_details: usize,
    pub index_changed: bool,
    pub manifest_changed: bool,
    pub files_written: usize,
    pub version: Option<String>,
    pub sample_title: Option<String>,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn written(&self) -> bool {
        self.files_written > 0
    }
}

// ---------------------------------------------------------------------------
// Collection & merge
// ---------------------------------------------------------------------------

/// Normalized output of one connector.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub info: SourceInfo,
    pub items: Vec<IndexItem>,
    pub details: Vec<DetailRecord>,
    /// Records that failed to fetch or parse.
    pub failed: usize,
}

/// All sources combined, de-duplicated, sorted and limited.
#[derive(Debug, Clone, Default)]
pub struct Merged {
    pub items: Vec<IndexItem>,
    pub details: HashMap<String, DetailRecord>,
    pub sources: Vec<SourceInfo>,
    pub duplicates: usize,
}

/// Newest first; titles descending within a date.
pub fn sort_items(items: &mut [IndexItem]) {
    items.sort_by(|a, b| (&b.publish_date, &b.title).cmp(&(&a.publish_date, &a.title)));
}

/// Concatenate batches in order, keep the first record for each id, sort
/// and truncate to `limit`.
pub fn merge_sources(batches: Vec<SourceBatch>, limit: Option<usize>) -> Merged {
    let mut merged = Merged::default();
    let mut seen = HashSet::new();

    for batch in batches {
        for (item, detail) in batch.items.into_iter().zip(batch.details) {
            if !seen.insert(item.id.clone()) {
                warn!(id = %item.id, source = %batch.info.name, "duplicate record id, keeping first source");
                merged.duplicates += 1;
                continue;
            }
            merged.details.insert(item.id.clone(), detail);
            merged.items.push(item);
        }
        merged.sources.push(batch.info);
    }

    sort_items(&mut merged.items);
    if let Some(limit) = limit {
        merged.items.truncate(limit);
        let kept: HashSet<&str> = merged.items.iter().map(|i| i.id.as_str()).collect();
        merged.details.retain(|id, _| kept.contains(id.as_str()));
    }
    merged
}

/// Manifest `source` entry: the only source, or a combined entry.
pub fn combined_source(sources: &[SourceInfo]) -> SourceInfo {
    match sources {
        [only] => only.clone(),
        _ => SourceInfo {
            name: COMBINED_SOURCE_NAME.into(),
            base_url: String::new(),
            note: COMBINED_SOURCE_NOTE.into(),
        },
    }
}

/// Manifest for sorted `items`, with `version` and `updated_at` left blank.
pub fn build_manifest(items: &[IndexItem], sources: Vec<SourceInfo>) -> Manifest {
    Manifest {
        version: String::new(),
        updated_at: String::new(),
        recipe_count: items.len(),
        latest_ids: items.iter().take(LATEST_COUNT).map(|i| i.id.clone()).collect(),
        source: combined_source(&sources),
        sources,
    }
}

async fn collect_source(
    connector: &dyn SourceConnector,
    config: &RunConfig,
    images: Option<&dyn ImageStore>,
    rules: &AgeRules,
    quota: Option<usize>,
    progress: &dyn ProgressReporter,
) -> Result<SourceBatch> {
    let mut slugs = connector.list_record_slugs(config.max_pages).await?;
    if let Some(quota) = quota {
        slugs.truncate(quota);
    }
    info!(source = connector.name(), slugs = slugs.len(), "listing complete");

    let mut batch = SourceBatch {
        info: connector.info(),
        items: Vec::new(),
        details: Vec::new(),
        failed: 0,
    };
    let images = images.filter(|_| config.download_images && !config.dry_run);
    let total = slugs.len();

    for (i, slug) in slugs.iter().enumerate() {
        progress.record_fetched(connector.name(), slug, i + 1, total);

        let mut raw = match connector.fetch_record(slug).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(source = connector.name(), %slug, error = %e, "record fetch failed, skipping");
                batch.failed += 1;
                continue;
            }
        };

        if let Some(store) = images {
            if !raw.cover_image_url.is_empty() {
                match store.store_cover(&raw.cover_image_url).await {
                    Ok(local) => raw.cover_image_url = local,
                    Err(e) => {
                        warn!(url = %raw.cover_image_url, error = %e, "cover download failed, keeping remote url");
                    }
                }
            }
        }

        let tags = connector.map_tags(&raw);
        let (item, detail) = normalize(&raw, &batch.info, tags, rules);
        batch.items.push(item);
        batch.details.push(detail);
    }

    Ok(batch)
}

// ---------------------------------------------------------------------------
// Localization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Localization {
    Reused,
    Translated,
    Untranslated,
}

/// Reuse or translate one record and build its translation metadata.
async fn localize_record(
    localizer: &mut Localizer<'_, '_>,
    detail: &mut DetailRecord,
    old: Option<&DetailRecord>,
    authoritative_title: Option<&str>,
    translate: bool,
) -> (TranslationMeta, Localization) {
    let fingerprint = Fingerprint::of(detail);

    let kind = match (decide_reuse(old, localizer.dest_language, &fingerprint), old) {
        (ReuseDecision::CopyForward, Some(old)) => {
            let stale = copy_forward(old, detail, authoritative_title);
            if stale.is_empty() {
                Localization::Reused
            } else if translate {
                debug!(id = %detail.id, ?stale, "retranslating groups with changed shape");
                if localizer.translate_groups(detail, &stale).await.translated {
                    Localization::Translated
                } else {
                    Localization::Untranslated
                }
            } else {
                Localization::Untranslated
            }
        }
        _ if translate => {
            if localizer.translate_detail(detail, authoritative_title).await.translated {
                Localization::Translated
            } else {
                Localization::Untranslated
            }
        }
        _ => {
            if let Some(title) = authoritative_title {
                detail.title = title.to_string();
            }
            Localization::Untranslated
        }
    };

    let meta = TranslationMeta {
        dest_language: localizer.dest_language.to_string(),
        source_fingerprint: fingerprint.to_string(),
        translated: kind != Localization::Untranslated,
    };
    (meta, kind)
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full pipeline over `connectors`, in order.
///
/// 1. Fetch and normalize each source, honouring the global limit
/// 2. Merge, de-duplicate, sort and truncate
/// 3. Reuse or translate listing titles
/// 4. Reuse or translate each record, then compare with its stored version
/// 5. Write changed documents, or nothing when nothing changed
///
/// A dry run stops after step 2.
#[instrument(skip_all, fields(site = %config.site, limit = ?config.limit, dry_run = config.dry_run))]
pub async fn run_pipeline(
    config: &RunConfig,
    connectors: &[&dyn SourceConnector],
    services: RunServices<'_, '_>,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    config.validate()?;
    if connectors.is_empty() {
        return Err(RecipeFeedError::config("no source connectors selected"));
    }

    let start = Instant::now();
    let now = Utc::now();
    let run_stamp = change::timestamp(now);
    let mut summary = RunSummary {
        dry_run: config.dry_run,
        ..Default::default()
    };

    // --- Fetch ---
    progress.phase("Fetching records");
    let mut batches = Vec::new();
    let mut remaining = config.limit;

    for connector in connectors {
        if remaining == Some(0) {
            debug!(source = connector.name(), "limit reached, skipping source");
            break;
        }
        match collect_source(*connector, config, services.images, services.rules, remaining, progress)
            .await
        {
            Ok(batch) => {
                info!(
                    source = connector.name(),
                    records = batch.items.len(),
                    failed = batch.failed,
                    "source collected"
                );
                summary.failed_records += batch.failed;
                if let Some(left) = remaining.as_mut() {
                    *left = left.saturating_sub(batch.items.len());
                }
                batches.push(batch);
            }
            Err(e) => {
                warn!(source = connector.name(), error = %e, "source failed, skipping");
            }
        }
    }

    // --- Merge ---
    let merged = merge_sources(batches, config.limit);
    if merged.items.is_empty() {
        return Err(RecipeFeedError::validation("no records were fetched from any source"));
    }
    summary.records = merged.items.len();
    summary.duplicates = merged.duplicates;
    summary.sample_title = merged.items.first().map(|i| i.title.clone());

    if config.dry_run {
        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        progress.done(&summary);
        info!(records = summary.records, "dry run complete, nothing written");
        return Ok(summary);
    }

    let layout = DataLayout::new(&config.data_dir);
    let old_manifest = layout.load_manifest();
    let old_index = layout.load_index();

    let mut localizer = Localizer {
        translator: services.translator,
        cache: services.cache,
        dest_language: &config.dest_language,
        min_success_ratio: config.min_success_ratio,
    };

    // --- Titles ---
    progress.phase("Translating titles");
    let old_titles: HashMap<&str, &str> = old_index
        .iter()
        .flat_map(|index| &index.items)
        .filter(|item| has_cjk(&item.title))
        .map(|item| (item.id.as_str(), item.title.as_str()))
        .collect();

    let Merged {
        mut items,
        mut details,
        sources,
        ..
    } = merged;

    for item in &mut items {
        if let Some(title) = old_titles.get(item.id.as_str()) {
            item.title = (*title).to_string();
            summary.titles_reused += 1;
        } else if config.translate {
            if let Some(title) = localizer.translate_title(&item.title).await {
                item.title = title;
                summary.titles_translated += 1;
            }
        }
    }
    sort_items(&mut items);

    // --- Details ---
    progress.phase("Localizing records");
    let mut changes = ChangeSet::default();
    let mut localized = Vec::with_capacity(items.len());
    let total = items.len();

    for (i, item) in items.iter().enumerate() {
        let Some(mut detail) = details.remove(&item.id) else {
            continue;
        };
        let old = layout.load_detail(&detail.id);
        let authoritative = has_cjk(&item.title).then_some(item.title.as_str());

        let (meta, kind) =
            localize_record(&mut localizer, &mut detail, old.as_ref(), authoritative, config.translate)
                .await;
        match kind {
            Localization::Reused => summary.translations_reused += 1,
            Localization::Translated => summary.records_translated += 1,
            Localization::Untranslated => summary.records_untranslated += 1,
        }
        detail.translation = Some(meta);

        let change = change::stamp_detail(old.as_ref(), &mut detail, &run_stamp);
        changes.record(change);
        progress.record_localized(&detail.id, i + 1, total);
        localized.push((detail, change));
    }

    let stats = localizer.cache.stats();
    summary.cache_hits = stats.hits;
    summary.cache_misses = stats.misses;

    // --- Diff ---
    progress.phase("Comparing with previous data");
    let mut items: Vec<IndexItem> = localized.iter().map(|(d, _)| d.to_index_item()).collect();
    sort_items(&mut items);
    let mut manifest = build_manifest(&items, sources);
    let mut index = RecipeIndex {
        version: String::new(),
        items,
    };

    changes.index = change::index_changed(old_index.as_ref(), &index.items);
    changes.manifest = change::manifest_changed(old_manifest.as_ref(), &manifest);
    summary.new_details = changes.new_details;
    summary.changed_details = changes.changed_details;
    summary.metadata_only_details = changes.metadata_only_details;
    summary.unchanged_details = changes.unchanged_details;
    summary.index_changed = changes.index;
    summary.manifest_changed = changes.manifest;

    info!(
        new = changes.new_details,
        changed = changes.changed_details,
        metadata_only = changes.metadata_only_details,
        unchanged = changes.unchanged_details,
        index_changed = changes.index,
        manifest_changed = changes.manifest,
        "change detection complete"
    );

    // --- Write ---
    if changes.any() {
        progress.phase("Writing data");
        let version = change::mint_version(config.version_override.as_deref(), now);
        manifest.version = version.clone();
        manifest.updated_at = run_stamp;
        index.version = version.clone();

        let set = ArtifactSet {
            details: localized
                .iter()
                .filter(|(_, change)| change.needs_write())
                .map(|(detail, _)| detail)
                .collect(),
            index: &index,
            manifest: &manifest,
        };
        summary.files_written = artifacts::commit(&layout, &set)?;
        summary.version = Some(version);
    } else {
        info!("no changes, skipping write");
    }

    summary.elapsed_ms = start.elapsed().as_millis() as u64;
    progress.done(&summary);

    info!(
        records = summary.records,
        files_written = summary.files_written,
        version = summary.version.as_deref().unwrap_or("-"),
        elapsed_ms = summary.elapsed_ms,
        "run complete"
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
