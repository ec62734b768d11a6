//! Fingerprint of a record's translatable text.
//!
//! The fingerprint covers title, tip, ingredient name/amount pairs, step
//! texts and warnings, in list order. Every string is whitespace-collapsed
//! before hashing, so formatting-only differences upstream never change
//! it. Tags, images, dates and ids are not part of the projection.

use std::fmt;

use recipefeed_shared::DetailRecord;
use recipefeed_shared::text::collapse_ws;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex SHA-256 over the canonical projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(detail: &DetailRecord) -> Self {
        let projection = Projection {
            title: collapse_ws(&detail.title),
            nutrition_tip: collapse_ws(&detail.nutrition_tip),
            ingredients: detail
                .ingredients
                .iter()
                .map(|i| ProjectedIngredient {
                    name: collapse_ws(&i.name),
                    amount: collapse_ws(&i.amount),
                })
                .collect(),
            steps: detail.steps.iter().map(|s| collapse_ws(&s.text)).collect(),
            warnings: detail.warnings.iter().map(|w| collapse_ws(w)).collect(),
        };

        // Struct fields serialize in declaration order.
        let canonical = serde_json::to_vec(&projection).unwrap_or_default();
        Self(format!("{:x}", Sha256::digest(&canonical)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a fingerprint read back from a persisted record.
    pub fn matches(&self, stored: &str) -> bool {
        self.0 == stored
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct Projection {
    title: String,
    nutrition_tip: String,
    ingredients: Vec<ProjectedIngredient>,
    steps: Vec<String>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct ProjectedIngredient {
    name: String,
    amount: String,
}
