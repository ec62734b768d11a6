//! Translation primitives for recipefeed.
//!
//! - [`tokens`]: the token-marker batch format
//! - [`script`]: target-script detection
//! - [`backend`]: the [`Translator`] trait and HTTP backend
//! - [`cache`]: the run-scoped [`TranslationCache`]

pub mod backend;
pub mod cache;
pub mod script;
pub mod tokens;

pub use backend::{GoogleTranslator, NoopTranslator, Translator};
pub use cache::{CacheStats, Translation, TranslationCache};
pub use script::{has_cjk, needs_translation};
pub use tokens::{DecodedBatch, FieldToken, Resolved, TokenBatch, parse_tokens};
