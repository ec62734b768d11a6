//! Run-scoped translation cache.
//!
//! A [`TranslationCache`] is created by the caller for one pipeline run and
//! passed by `&mut` into every translation. It keeps results in memory and,
//! when given a [`Storage`] handle, reads through to and writes back to the
//! durable `translation_cache` table. Storage failures degrade to a miss.
//!
//! Responses are not stored by [`TranslationCache::translate`]. The caller
//! judges a response first and stores accepted ones with
//! [`TranslationCache::remember`], so a rejected response is requested again
//! on the next attempt.

use std::collections::HashMap;

use recipefeed_shared::Result;
use recipefeed_storage::Storage;
use tracing::warn;

use crate::backend::Translator;

/// Hit/miss counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// A translation and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Served from the cache rather than the backend.
    pub cached: bool,
}

pub struct TranslationCache<'s> {
    memory: HashMap<(String, String), String>,
    store: Option<&'s Storage>,
    stats: CacheStats,
}

impl<'s> TranslationCache<'s> {
    /// Cache that forgets everything when the run ends.
    pub fn in_memory() -> Self {
        Self {
            memory: HashMap::new(),
            store: None,
            stats: CacheStats::default(),
        }
    }

    /// Cache backed by the durable store.
    pub fn with_store(store: &'s Storage) -> Self {
        Self {
            store: Some(store),
            ..Self::in_memory()
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    async fn lookup(&mut self, dest_language: &str, text: &str) -> Option<String> {
        let key = (dest_language.to_string(), text.to_string());
        if let Some(hit) = self.memory.get(&key) {
            return Some(hit.clone());
        }

        let store = self.store?;
        match store.get_translation(dest_language, text).await {
            Ok(Some(hit)) => {
                self.memory.insert(key, hit.clone());
                Some(hit)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "translation cache read failed");
                None
            }
        }
    }

    /// Store an accepted translation of `text`. Empty translations are
    /// ignored.
    pub async fn remember(&mut self, dest_language: &str, text: &str, translated: &str) {
        if translated.is_empty() {
            return;
        }
        self.memory.insert(
            (dest_language.to_string(), text.to_string()),
            translated.to_string(),
        );
        if let Some(store) = self.store {
            if let Err(e) = store.set_translation(dest_language, text, translated).await {
                warn!(error = %e, "translation cache write failed");
            }
        }
    }

    /// Serve `text` from the cache, or call the backend on a miss. Backend
    /// responses are returned without being stored; errors propagate.
    pub async fn translate(
        &mut self,
        translator: &dyn Translator,
        text: &str,
        dest_language: &str,
    ) -> Result<Translation> {
        if let Some(hit) = self.lookup(dest_language, text).await {
            self.stats.hits += 1;
            return Ok(Translation {
                text: hit,
                cached: true,
            });
        }

        self.stats.misses += 1;
        let text = translator.translate(text, dest_language).await?;
        Ok(Translation {
            text,
            cached: false,
        })
    }
}
