//! Minimum-age classification.
//!
//! A keyword heuristic over a record's visible text. Rules are checked in
//! table order and the first rule with a matching keyword wins. Publishers
//! do not provide age data, so the result is a best-effort bucket, not a
//! dietary recommendation.

/// One bucket of the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeRule {
    pub min_age_month: u32,
    /// Lowercase substrings; any match selects this rule.
    pub keywords: Vec<String>,
}

impl AgeRule {
    pub fn new(min_age_month: u32, keywords: &[&str]) -> Self {
        Self {
            min_age_month,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}

/// Ordered rule table plus the bucket used when nothing matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeRules {
    rules: Vec<AgeRule>,
    fallback_month: u32,
}

impl AgeRules {
    pub fn new(rules: Vec<AgeRule>, fallback_month: u32) -> Self {
        Self {
            rules,
            fallback_month,
        }
    }

    /// Classify from the individual record parts. The parts are joined with
    /// spaces and lowercased before matching.
    pub fn classify<'a>(
        &self,
        title: &str,
        description: &str,
        ingredient_names: impl IntoIterator<Item = &'a str>,
        tags: &[String],
    ) -> u32 {
        let ingredients = ingredient_names.into_iter().collect::<Vec<_>>().join(" ");
        let tags = tags.join(" ");
        let haystack = [title, description, ingredients.as_str(), tags.as_str()]
            .join(" ")
            .to_lowercase();
        self.classify_text(&haystack)
    }

    /// Classify already-lowercased text.
    pub fn classify_text(&self, haystack: &str) -> u32 {
        self.rules
            .iter()
            .find(|rule| rule.matches(haystack))
            .map_or(self.fallback_month, |rule| rule.min_age_month)
    }
}

impl Default for AgeRules {
    /// Puree textures first, then soft foods, then family dishes; 12 months
    /// otherwise.
    fn default() -> Self {
        Self::new(
            vec![
                AgeRule::new(6, &["puree", "purée", "mash", "mashed"]),
                AgeRule::new(
                    8,
                    &[
                        "smoothie", "oatmeal", "porridge", "pudding", "yogurt", "dip", "soup",
                        "stew", "broth",
                    ],
                ),
                AgeRule::new(
                    12,
                    &[
                        "salad", "sandwich", "burger", "pizza", "taco", "lasagna", "grilled",
                        "roast", "chops", "steak", "muffin", "cookie", "cake", "sloppy",
                    ],
                ),
            ],
            12,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earlier_rules_win() {
        let rules = AgeRules::default();
        // "mashed" (6) beats "soup" (8)
        assert_eq!(rules.classify("Mashed Potato Soup", "", [], &[]), 6);
        assert_eq!(rules.classify("Apple Oatmeal", "", [], &[]), 8);
        assert_eq!(rules.classify("Turkey Burger", "", [], &[]), 12);
    }

    #[test]
    fn matches_description_ingredients_and_tags() {
        let rules = AgeRules::default();
        assert_eq!(rules.classify("Morning Bowl", "a creamy PORRIDGE", [], &[]), 8);
        assert_eq!(rules.classify("Bowl", "", ["banana purée", "milk"], &[]), 6);
        assert_eq!(rules.classify("Bowl", "", [], &["Smoothie".into()]), 8);
    }

    #[test]
    fn falls_back_when_nothing_matches() {
        assert_eq!(AgeRules::default().classify("Baked Fish", "", ["cod"], &[]), 12);
    }

    #[test]
    fn custom_tables_are_honoured() {
        let rules = AgeRules::new(vec![AgeRule::new(9, &["Finger Food"])], 18);
        assert_eq!(rules.classify_text("soft finger food strips"), 9);
        assert_eq!(rules.classify_text("curry"), 18);
    }
}
