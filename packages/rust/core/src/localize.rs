//! Record-level translation through the token batch format.
//!
//! One record is translated with at most one backend call: every fragment of
//! the requested field groups is packed into a [`TokenBatch`], sent through
//! the run's [`TranslationCache`], and decoded back in place. Fragments the
//! translator lost or blanked keep their original text.

use recipefeed_shared::DetailRecord;
use recipefeed_translate::{
    FieldToken, TokenBatch, TranslationCache, Translator, has_cjk, needs_translation,
};
use tracing::{debug, warn};

/// Translatable parts of a detail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Title,
    Tip,
    Ingredients,
    Steps,
    Warnings,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 5] = [
        FieldGroup::Title,
        FieldGroup::Tip,
        FieldGroup::Ingredients,
        FieldGroup::Steps,
        FieldGroup::Warnings,
    ];
}

/// Translation services and settings for one run.
pub struct Localizer<'a, 's> {
    pub translator: &'a dyn Translator,
    pub cache: &'a mut TranslationCache<'s>,
    pub dest_language: &'a str,
    pub min_success_ratio: f64,
}

/// What happened to one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalizeOutcome {
    pub translated: bool,
    /// Fragments that needed translation.
    pub needed: usize,
    /// Needed fragments that came back containing CJK text.
    pub succeeded: usize,
    /// Whether the backend (or cache) was consulted.
    pub called: bool,
}

/// Minimum number of successful fragments for a record to count as
/// translated: `max(1, ceil(needed * ratio))`.
pub fn success_threshold(needed: usize, ratio: f64) -> usize {
    ((needed as f64 * ratio).ceil() as usize).max(1)
}

/// Pack the fragments of `groups` in canonical field order.
pub fn build_batch(detail: &DetailRecord, groups: &[FieldGroup]) -> TokenBatch {
    let mut batch = TokenBatch::new();
    for group in FieldGroup::ALL.iter().filter(|g| groups.contains(g)) {
        match group {
            FieldGroup::Title => batch.push(FieldToken::Title, &detail.title),
            FieldGroup::Tip => batch.push(FieldToken::Tip, &detail.nutrition_tip),
            FieldGroup::Ingredients => {
                for (i, ing) in detail.ingredients.iter().enumerate() {
                    batch.push(FieldToken::IngredientName(i), &ing.name);
                    batch.push(FieldToken::IngredientAmount(i), &ing.amount);
                }
            }
            FieldGroup::Steps => {
                for (i, step) in detail.steps.iter().enumerate() {
                    batch.push(FieldToken::Step(i), &step.text);
                }
            }
            FieldGroup::Warnings => {
                for (i, warning) in detail.warnings.iter().enumerate() {
                    batch.push(FieldToken::Warning(i), warning);
                }
            }
        }
    }
    batch
}

impl Localizer<'_, '_> {
    /// Translate the given field groups of `detail` in place.
    pub async fn translate_groups(
        &mut self,
        detail: &mut DetailRecord,
        groups: &[FieldGroup],
    ) -> LocalizeOutcome {
        let batch = build_batch(detail, groups);
        // The title is sent along but never counted; the listing title pass
        // owns it.
        let title_token = FieldToken::Title.to_string();
        let needs: Vec<&str> = batch
            .entries()
            .iter()
            .filter(|(token, fragment)| *token != title_token && needs_translation(fragment))
            .map(|(token, _)| token.as_str())
            .collect();

        let mut outcome = LocalizeOutcome {
            needed: needs.len(),
            ..Default::default()
        };
        if needs.is_empty() {
            outcome.translated = true;
            return outcome;
        }

        outcome.called = true;
        let block = batch.encode();
        let response = match self
            .cache
            .translate(self.translator, &block, self.dest_language)
            .await
        {
            Ok(response) if !response.text.trim().is_empty() => response,
            Ok(_) => {
                warn!(id = %detail.id, backend = self.translator.name(), "empty translation, keeping originals");
                return outcome;
            }
            Err(e) => {
                warn!(id = %detail.id, error = %e, "translation failed, keeping originals");
                return outcome;
            }
        };

        let decoded = batch.decode(&response.text);
        apply(detail, groups, |token| decoded.text(token).map(str::to_string));

        outcome.succeeded = needs
            .iter()
            .filter(|token| {
                decoded
                    .get(token)
                    .is_some_and(|r| r.is_translated() && has_cjk(r.text()))
            })
            .count();
        outcome.translated =
            outcome.succeeded >= success_threshold(outcome.needed, self.min_success_ratio);
        if outcome.translated && !response.cached {
            self.cache
                .remember(self.dest_language, &block, &response.text)
                .await;
        }

        debug!(
            id = %detail.id,
            needed = outcome.needed,
            succeeded = outcome.succeeded,
            translated = outcome.translated,
            "record translated"
        );
        outcome
    }

    /// Translate a whole record. When `authoritative_title` is given it
    /// replaces the record title and the title is not sent for translation.
    pub async fn translate_detail(
        &mut self,
        detail: &mut DetailRecord,
        authoritative_title: Option<&str>,
    ) -> LocalizeOutcome {
        let groups: Vec<FieldGroup> = match authoritative_title {
            Some(title) => {
                detail.title = title.to_string();
                FieldGroup::ALL
                    .into_iter()
                    .filter(|g| *g != FieldGroup::Title)
                    .collect()
            }
            None => FieldGroup::ALL.to_vec(),
        };
        self.translate_groups(detail, &groups).await
    }

    /// Translate a listing title on its own. `None` when the title needs no
    /// translation or the backend produced nothing in the target script.
    pub async fn translate_title(&mut self, title: &str) -> Option<String> {
        if !needs_translation(title) {
            return None;
        }
        match self
            .cache
            .translate(self.translator, title, self.dest_language)
            .await
        {
            Ok(response) => {
                let text = response.text.trim();
                if text.is_empty() {
                    return None;
                }
                if !has_cjk(text) {
                    warn!(%title, "title translation not in target script, keeping original");
                    return None;
                }
                if !response.cached {
                    self.cache.remember(self.dest_language, title, text).await;
                }
                Some(text.to_string())
            }
            Err(e) => {
                warn!(%title, error = %e, "title translation failed, keeping original");
                None
            }
        }
    }
}

/// Write resolved values back into the record for the given groups.
fn apply<F>(detail: &mut DetailRecord, groups: &[FieldGroup], resolve: F)
where
    F: Fn(FieldToken) -> Option<String>,
{
    let set = |slot: &mut String, token: FieldToken| {
        if let Some(text) = resolve(token) {
            *slot = text;
        }
    };

    for group in groups {
        match group {
            FieldGroup::Title => set(&mut detail.title, FieldToken::Title),
            FieldGroup::Tip => set(&mut detail.nutrition_tip, FieldToken::Tip),
            FieldGroup::Ingredients => {
                for (i, ing) in detail.ingredients.iter_mut().enumerate() {
                    set(&mut ing.name, FieldToken::IngredientName(i));
                    set(&mut ing.amount, FieldToken::IngredientAmount(i));
                }
            }
            FieldGroup::Steps => {
                for (i, step) in detail.steps.iter_mut().enumerate() {
                    set(&mut step.text, FieldToken::Step(i));
                }
            }
            FieldGroup::Warnings => {
                for (i, warning) in detail.warnings.iter_mut().enumerate() {
                    set(warning, FieldToken::Warning(i));
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use recipefeed_shared::{Ingredient, RecipeFeedError, Result, Step};

    /// Prefixes the text of every `[[TOKEN]] text` line with `译`.
    pub(crate) struct MarkingTranslator {
        pub calls: AtomicUsize,
    }

    impl MarkingTranslator {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Translator for MarkingTranslator {
        fn name(&self) -> &str {
            "marking"
        }

        async fn translate(&self, text: &str, _dest: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let out = text
                .lines()
                .map(|line| match line.split_once("]] ") {
                    Some((token, rest)) => format!("{token}]]: 译{rest}"),
                    None => format!("译{line}"),
                })
                .collect::<Vec<_>>()
                .join("\n");
            Ok(out)
        }
    }

    /// Returns a fixed response regardless of input.
    struct CannedTranslator(&'static str);

    #[async_trait]
    impl Translator for CannedTranslator {
        fn name(&self) -> &str {
            "canned"
        }

        async fn translate(&self, _text: &str, _dest: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        fn name(&self) -> &str {
            "failing"
        }

        async fn translate(&self, _text: &str, _dest: &str) -> Result<String> {
            Err(RecipeFeedError::Translation("HTTP 503".into()))
        }
    }

    pub(crate) fn sample_detail() -> DetailRecord {
        DetailRecord {
            id: "r1".into(),
            title: "Veggie Soup".into(),
            nutrition_tip: "Warm and filling.".into(),
            ingredients: vec![
                Ingredient::new("carrot", "2"),
                Ingredient::new("broth", "4 cups"),
            ],
            steps: vec![
                Step {
                    index: 1,
                    img: String::new(),
                    text: "Chop the carrots.".into(),
                },
                Step {
                    index: 2,
                    img: String::new(),
                    text: "Simmer  in broth.".into(),
                },
            ],
            ..Default::default()
        }
    }

    fn localizer<'a, 's>(
        translator: &'a dyn Translator,
        cache: &'a mut TranslationCache<'s>,
    ) -> Localizer<'a, 's> {
        Localizer {
            translator,
            cache,
            dest_language: "zh-CN",
            min_success_ratio: 0.5,
        }
    }

    #[test]
    fn thresholds() {
        assert_eq!(success_threshold(1, 0.5), 1);
        assert_eq!(success_threshold(3, 0.5), 2);
        assert_eq!(success_threshold(4, 0.5), 2);
        assert_eq!(success_threshold(0, 0.5), 1);
        assert_eq!(success_threshold(10, 1.0), 10);
    }

    #[test]
    fn batch_follows_field_order() {
        let batch = build_batch(
            &sample_detail(),
            &[FieldGroup::Steps, FieldGroup::Title, FieldGroup::Ingredients],
        );
        let tokens: Vec<&str> = batch.entries().iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(
            tokens,
            vec![
                "[[BF_TITLE]]",
                "[[BF_ING_NAME_0]]",
                "[[BF_ING_AMOUNT_0]]",
                "[[BF_ING_NAME_1]]",
                "[[BF_ING_AMOUNT_1]]",
                "[[BF_STEP_0]]",
                "[[BF_STEP_1]]",
            ]
        );
        assert_eq!(batch.entries()[6].1, "Simmer in broth.");
    }

    #[tokio::test]
    async fn translates_every_field_with_one_call() {
        let translator = MarkingTranslator::new();
        let mut cache = TranslationCache::in_memory();
        let mut detail = sample_detail();

        let outcome = localizer(&translator, &mut cache)
            .translate_detail(&mut detail, None)
            .await;

        assert_eq!(translator.calls(), 1);
        assert!(outcome.translated);
        assert_eq!(detail.title, "译Veggie Soup");
        assert_eq!(detail.nutrition_tip, "译Warm and filling.");
        assert_eq!(detail.ingredients[1], Ingredient::new("译broth", "译4 cups"));
        // "2" has no latin letter and the title is never counted
        assert_eq!(outcome.needed, 6);
        assert_eq!(detail.steps[1].text, "译Simmer in broth.");
        assert_eq!(detail.steps[1].index, 2);
    }

    #[tokio::test]
    async fn authoritative_title_is_not_sent() {
        let translator = MarkingTranslator::new();
        let mut cache = TranslationCache::in_memory();
        let mut detail = sample_detail();

        localizer(&translator, &mut cache)
            .translate_detail(&mut detail, Some("蔬菜汤"))
            .await;
        assert_eq!(detail.title, "蔬菜汤");
    }

    #[tokio::test]
    async fn nothing_to_translate_skips_the_call() {
        let translator = MarkingTranslator::new();
        let mut cache = TranslationCache::in_memory();
        let mut detail = DetailRecord {
            title: "蔬菜汤".into(),
            nutrition_tip: "暖胃".into(),
            ingredients: vec![Ingredient::new("胡萝卜", "2")],
            ..Default::default()
        };

        let outcome = localizer(&translator, &mut cache)
            .translate_detail(&mut detail, None)
            .await;
        assert!(outcome.translated);
        assert!(!outcome.called);
        assert_eq!(translator.calls(), 0);
    }

    #[tokio::test]
    async fn dropped_tokens_fall_back_and_count_against_success() {
        // Only the tip and one step survive the round trip.
        let translator = CannedTranslator("[[BF_TIP]] 暖胃\n[[BF_STEP_1]] 用高汤炖");
        let mut cache = TranslationCache::in_memory();
        let mut detail = sample_detail();

        let outcome = localizer(&translator, &mut cache)
            .translate_detail(&mut detail, Some("蔬菜汤"))
            .await;

        assert_eq!(detail.nutrition_tip, "暖胃");
        assert_eq!(detail.steps[1].text, "用高汤炖");
        assert_eq!(detail.steps[0].text, "Chop the carrots.");
        assert_eq!(detail.ingredients[0].name, "carrot");
        // tip, 2 names, 1 amount, 2 steps
        assert_eq!(outcome.needed, 6);
        assert_eq!(outcome.succeeded, 2);
        assert!(!outcome.translated);
    }

    #[tokio::test]
    async fn title_alone_does_not_trigger_a_call() {
        let translator = MarkingTranslator::new();
        let mut cache = TranslationCache::in_memory();
        let mut detail = DetailRecord {
            title: "Veggie Soup".into(),
            nutrition_tip: "暖胃".into(),
            ..Default::default()
        };

        let outcome = localizer(&translator, &mut cache)
            .translate_detail(&mut detail, None)
            .await;
        assert!(outcome.translated);
        assert!(!outcome.called);
        assert_eq!(outcome.needed, 0);
        assert_eq!(detail.title, "Veggie Soup");
    }

    #[tokio::test]
    async fn dropped_fragment_keeps_original_spacing() {
        let translator = CannedTranslator("[[BF_STEP_0]] 切胡萝卜");
        let mut cache = TranslationCache::in_memory();
        let mut detail = sample_detail();

        localizer(&translator, &mut cache)
            .translate_groups(&mut detail, &[FieldGroup::Steps])
            .await;
        assert_eq!(detail.steps[0].text, "切胡萝卜");
        assert_eq!(detail.steps[1].text, "Simmer  in broth.");
    }

    #[tokio::test]
    async fn rejected_batches_are_not_cached() {
        let garbled = CannedTranslator("sorry, something went wrong");
        let mut cache = TranslationCache::in_memory();
        let mut detail = sample_detail();
        let outcome = localizer(&garbled, &mut cache)
            .translate_detail(&mut detail, None)
            .await;
        assert!(!outcome.translated);
        assert!(cache.is_empty());

        let translator = MarkingTranslator::new();
        let mut detail = sample_detail();
        let outcome = localizer(&translator, &mut cache)
            .translate_detail(&mut detail, None)
            .await;
        assert!(outcome.translated);
        assert_eq!(translator.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_originals() {
        let mut cache = TranslationCache::in_memory();
        let mut detail = sample_detail();

        let outcome = localizer(&FailingTranslator, &mut cache)
            .translate_detail(&mut detail, None)
            .await;

        assert!(!outcome.translated);
        assert!(outcome.called);
        assert_eq!(detail, sample_detail());
    }

    #[tokio::test]
    async fn empty_response_keeps_originals() {
        let translator = CannedTranslator("   ");
        let mut cache = TranslationCache::in_memory();
        let mut detail = sample_detail();

        let outcome = localizer(&translator, &mut cache)
            .translate_detail(&mut detail, None)
            .await;
        assert!(!outcome.translated);
        assert_eq!(detail, sample_detail());
    }

    #[tokio::test]
    async fn restricted_groups_leave_others_untouched() {
        let translator = MarkingTranslator::new();
        let mut cache = TranslationCache::in_memory();
        let mut detail = sample_detail();

        let outcome = localizer(&translator, &mut cache)
            .translate_groups(&mut detail, &[FieldGroup::Steps])
            .await;

        assert!(outcome.translated);
        assert_eq!(outcome.needed, 2);
        assert_eq!(detail.title, "Veggie Soup");
        assert_eq!(detail.ingredients[0].name, "carrot");
        assert_eq!(detail.steps[0].text, "译Chop the carrots.");
    }

    #[tokio::test]
    async fn titles_translate_through_the_cache() {
        let translator = MarkingTranslator::new();
        let mut cache = TranslationCache::in_memory();
        let mut loc = localizer(&translator, &mut cache);

        assert_eq!(loc.translate_title("Veggie Soup").await.as_deref(), Some("译Veggie Soup"));
        assert_eq!(loc.translate_title("Veggie Soup").await.as_deref(), Some("译Veggie Soup"));
        assert_eq!(loc.translate_title("蔬菜汤").await, None);
        assert_eq!(translator.calls(), 1);
    }
}
