//! Token-marker batch format.
//!
//! Many short fragments are sent to a translator as one block:
//!
//! ```text
//! [[BF_TITLE]] Apple Oatmeal
//! [[BF_TIP]] A warm breakfast
//! [[BF_ING_NAME_0]] rolled oats
//! ```
//!
//! The response is split back per token. Tokens are located in assignment
//! order, each one searched for only after the previously located token, so
//! text belonging to an earlier field is never attributed to a later one.
//! A value ends where the next locatable token starts. Tokens that cannot be
//! located, or whose value is empty, fall back to the original fragment as
//! it was pushed, before whitespace collapsing.

use std::collections::HashMap;
use std::fmt;

use recipefeed_shared::text::collapse_ws;

/// Characters skipped between a token and its value in translator output.
const SEPARATORS: &[char] = &[' ', '\t', '\r', '\n', ':', '：', '-', '—', '–'];

/// Marker for one translatable field of a detail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldToken {
    Title,
    Tip,
    IngredientName(usize),
    IngredientAmount(usize),
    Step(usize),
    Warning(usize),
}

impl fmt::Display for FieldToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => write!(f, "[[BF_TITLE]]"),
            Self::Tip => write!(f, "[[BF_TIP]]"),
            Self::IngredientName(i) => write!(f, "[[BF_ING_NAME_{i}]]"),
            Self::IngredientAmount(i) => write!(f, "[[BF_ING_AMOUNT_{i}]]"),
            Self::Step(i) => write!(f, "[[BF_STEP_{i}]]"),
            Self::Warning(i) => write!(f, "[[BF_WARN_{i}]]"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split `translated` into per-token values.
///
/// Returns only the tokens that were located. Values are trimmed and may be
/// empty.
pub fn parse_tokens(translated: &str, tokens: &[String]) -> HashMap<String, String> {
    let mut out = HashMap::new();
    if translated.is_empty() || tokens.is_empty() {
        return out;
    }

    let mut cursor = 0;
    for (i, token) in tokens.iter().enumerate() {
        let Some(found) = translated[cursor..].find(token.as_str()) else {
            continue;
        };
        let mut start = cursor + found + token.len();
        let rest = &translated[start..];
        start += rest.len() - rest.trim_start_matches(SEPARATORS).len();

        let end = tokens[i + 1..]
            .iter()
            .find_map(|next| translated[start..].find(next.as_str()).map(|p| start + p))
            .unwrap_or(translated.len());

        out.insert(token.clone(), translated[start..end].trim().to_string());
        cursor = start;
    }
    out
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// An ordered set of `(token, fragment)` pairs for one translation call.
#[derive(Debug, Clone, Default)]
pub struct TokenBatch {
    entries: Vec<(String, String)>,
    originals: Vec<String>,
}

impl TokenBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Whitespace is collapsed on the wire only.
    pub fn push(&mut self, token: impl fmt::Display, fragment: &str) {
        self.entries.push((token.to_string(), collapse_ws(fragment)));
        self.originals.push(fragment.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(token, wire fragment)` pairs in assignment order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// One `token fragment` line per entry.
    pub fn encode(&self) -> String {
        self.entries
            .iter()
            .map(|(token, fragment)| format!("{token} {fragment}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse a translator response against this batch.
    pub fn decode(&self, translated: &str) -> DecodedBatch {
        let tokens: Vec<String> = self.entries.iter().map(|(t, _)| t.clone()).collect();
        let parsed = parse_tokens(translated, &tokens);
        let values = self
            .entries
            .iter()
            .zip(&self.originals)
            .map(|((token, _), original)| {
                let value = match parsed.get(token) {
                    Some(v) if !v.is_empty() => Resolved::Translated(v.clone()),
                    _ => Resolved::Fallback(original.clone()),
                };
                (token.clone(), value)
            })
            .collect();
        DecodedBatch { values }
    }
}

/// Value of one token after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Text parsed from the translator response.
    Translated(String),
    /// Token missing or empty in the response; the original fragment.
    Fallback(String),
}

impl Resolved {
    pub fn text(&self) -> &str {
        match self {
            Self::Translated(s) | Self::Fallback(s) => s,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self, Self::Translated(_))
    }
}

/// Decoded values keyed by token.
#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    values: HashMap<String, Resolved>,
}

impl DecodedBatch {
    pub fn get(&self, token: impl fmt::Display) -> Option<&Resolved> {
        self.values.get(&token.to_string())
    }

    /// Text for `token`, or `None` if it was never part of the batch.
    pub fn text(&self, token: impl fmt::Display) -> Option<&str> {
        self.get(token).map(Resolved::text)
    }
}
