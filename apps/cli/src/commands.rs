//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use recipefeed_core::{AgeRules, ProgressReporter, RunServices, RunSummary, run_pipeline};
use recipefeed_shared::{AppConfig, RunConfig, config_dir, init_config, load_config};
use recipefeed_sources::{HttpSession, ImageStore, LocalImageStore, SourceRegistry};
use recipefeed_storage::{DB_FILE_NAME, Storage};
use recipefeed_translate::{GoogleTranslator, NoopTranslator, TranslationCache, Translator};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// recipefeed: incremental, translated recipe data sets from public sites.
#[derive(Parser)]
#[command(
    name = "recipefeed",
    version,
    about = "Fetch public recipes, translate them, and publish an incremental JSON data set.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch, translate and write the data set.
    Run(RunArgs),

    /// Show recent writing runs.
    Runs {
        /// Number of runs to show.
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Translation cache maintenance.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `recipefeed run`. Unset flags fall back to the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Site to fetch: a connector name or "all".
    #[arg(long)]
    pub site: Option<String>,

    /// Maximum number of records in the data set.
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Listing pages to scan per site.
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Keep remote cover URLs instead of downloading images.
    #[arg(long)]
    pub no_images: bool,

    /// Skip translation and keep source text.
    #[arg(long)]
    pub no_translate: bool,

    /// Fetch and merge only; print a summary and write nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Output directory for the data set.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Target language code.
    #[arg(long)]
    pub dest_language: Option<String>,

    /// Version token to stamp on written documents.
    #[arg(long, env = "DATA_VERSION")]
    pub data_version: Option<String>,
}

impl RunArgs {
    /// Merge flags over the config-derived run settings.
    fn into_run_config(self, config: &AppConfig) -> RunConfig {
        let mut run = RunConfig::from(config);
        if let Some(site) = self.site {
            run.site = site;
        }
        run.limit = self.limit;
        if let Some(max_pages) = self.max_pages {
            run.max_pages = max_pages;
        }
        if self.no_images {
            run.download_images = false;
        }
        if self.no_translate {
            run.translate = false;
        }
        run.dry_run = self.dry_run;
        if let Some(dir) = self.data_dir {
            run.data_dir = dir;
        }
        if let Some(lang) = self.dest_language {
            run.dest_language = lang;
        }
        run.version_override = self.data_version.filter(|v| !v.trim().is_empty());
        run
    }
}

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show the number of cached translations.
    Stats,
    /// Drop cached translations for one language.
    Clear {
        /// Language whose entries are removed.
        #[arg(long)]
        dest_language: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "recipefeed=info",
        1 => "recipefeed=debug",
        _ => "recipefeed=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args).await,
        Command::Runs { limit } => cmd_runs(limit).await,
        Command::Cache { action } => match action {
            CacheAction::Stats => cmd_cache_stats().await,
            CacheAction::Clear { dest_language } => cmd_cache_clear(&dest_language).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

fn database_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(DB_FILE_NAME))
}

/// Open the local database, or continue without it.
async fn open_storage() -> Option<Storage> {
    let path = match database_path() {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "no database location, continuing without history");
            return None;
        }
    };
    match Storage::open(&path).await {
        Ok(storage) => Some(storage),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot open database, continuing without history");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = load_config()?;
    let run_config = args.into_run_config(&config);
    run_config.validate()?;

    let session = HttpSession::new(&config.http)?;
    let registry = SourceRegistry::new(&session);
    let connectors = registry.select(&run_config.site)?;

    let translator: Box<dyn Translator> = if run_config.translate {
        Box::new(GoogleTranslator::new(
            &config.translation.endpoint,
            Duration::from_secs(config.translation.timeout_secs),
            config.translation.max_chars,
        )?)
    } else {
        Box::new(NoopTranslator)
    };

    let storage = if run_config.dry_run {
        None
    } else {
        open_storage().await
    };
    let mut cache = match &storage {
        Some(store) if config.translation.persistent_cache => TranslationCache::with_store(store),
        _ => TranslationCache::in_memory(),
    };

    let image_store = LocalImageStore::new(session.clone(), &run_config.data_dir, &config.images);
    let images = run_config
        .download_images
        .then_some(&image_store as &dyn ImageStore);
    let rules = AgeRules::default();

    info!(
        site = %run_config.site,
        sources = connectors.len(),
        data_dir = %run_config.data_dir.display(),
        translator = translator.name(),
        dry_run = run_config.dry_run,
        "starting run"
    );

    let run_id = match &storage {
        Some(store) => match store.insert_run(&run_config.site).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "cannot record run start");
                None
            }
        },
        None => None,
    };

    let reporter = CliProgress::new();
    let services = RunServices {
        translator: translator.as_ref(),
        cache: &mut cache,
        images,
        rules: &rules,
    };
    let summary = run_pipeline(&run_config, &connectors, services, &reporter).await?;

    if let (Some(store), Some(id)) = (&storage, &run_id) {
        let stats = serde_json::to_string(&summary)?;
        if let Err(e) = store.finish_run(id, summary.version.as_deref(), &stats).await {
            warn!(error = %e, "cannot record run result");
        }
    }

    print_summary(&run_config, &summary);
    Ok(())
}

fn print_summary(config: &RunConfig, summary: &RunSummary) {
    println!();
    if summary.dry_run {
        println!("  Dry run: nothing written.");
        println!("  Records: {}", summary.records);
        if let Some(title) = &summary.sample_title {
            println!("  Sample:  {title}");
        }
    } else if summary.written() {
        println!("  Data set updated!");
        println!("  Version:    {}", summary.version.as_deref().unwrap_or("-"));
        println!("  Records:    {}", summary.records);
        println!("  New:        {}", summary.new_details);
        println!("  Changed:    {}", summary.changed_details);
        println!("  Unchanged:  {}", summary.unchanged_details);
        println!("  Translated: {}", summary.records_translated);
        println!("  Reused:     {}", summary.translations_reused);
        println!("  Files:      {}", summary.files_written);
        println!("  Path:       {}", config.data_dir.display());
    } else {
        println!("  No changes; {} records up to date.", summary.records);
    }
    if summary.failed_records > 0 {
        println!("  Skipped:    {} records failed to fetch", summary.failed_records);
    }
    println!(
        "  Time:       {:.1}s",
        Duration::from_millis(summary.elapsed_ms).as_secs_f64()
    );
    println!();
}

async fn cmd_runs(limit: u32) -> Result<()> {
    let path = database_path()?;
    if !path.exists() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    let storage = Storage::open_readonly(&path).await?;
    let runs = storage.list_runs(limit).await?;
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    for run in runs {
        let status = match (&run.finished_at, &run.version) {
            (None, _) => "unfinished".to_string(),
            (Some(_), Some(version)) => format!("wrote {version}"),
            (Some(_), None) => "no changes".to_string(),
        };
        println!("{}  {:<14} {}", run.started_at, run.site, status);
    }
    Ok(())
}

async fn cmd_cache_stats() -> Result<()> {
    let path = database_path()?;
    if !path.exists() {
        println!("Translation cache is empty.");
        return Ok(());
    }
    let storage = Storage::open_readonly(&path).await?;
    let count = storage.count_translations().await?;
    println!("{count} cached translations in {}", path.display());
    Ok(())
}

async fn cmd_cache_clear(dest_language: &str) -> Result<()> {
    if dest_language.trim().is_empty() {
        return Err(eyre!("--dest-language must not be empty"));
    }
    let storage = Storage::open(&database_path()?).await?;
    let removed = storage.invalidate_translations(dest_language).await?;
    println!("Removed {removed} cached translations for '{dest_language}'.");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn record_fetched(&self, source: &str, slug: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching {source} [{current}/{total}] {slug}"));
    }

    fn record_localized(&self, id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Localizing [{current}/{total}] {id}"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
