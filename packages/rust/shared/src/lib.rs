//! Shared types, error model, and configuration for recipefeed.
//!
//! This crate is the foundation depended on by all other recipefeed crates.
//! It provides:
//! - [`RecipeFeedError`], the unified error type
//! - Domain types ([`RawRecord`], [`IndexItem`], [`DetailRecord`], [`Manifest`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ALL_SITES, AppConfig, DefaultsConfig, HttpConfig, ImagesConfig, RunConfig,
    TranslationConfig, config_dir, config_file_path, expand_home, init_config, load_config,
    load_config_from,
};
pub use error::{RecipeFeedError, Result};
pub use types::{
    DetailRecord, IndexItem, Ingredient, Manifest, RawRecord, RecipeIndex, SourceInfo, Step,
    TranslationMeta, UNKNOWN_PUBLISH_DATE, record_id,
};
