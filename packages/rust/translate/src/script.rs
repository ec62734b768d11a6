//! Script detection used to decide what needs translating and whether a
//! translation actually landed in the target script.

/// True if `text` contains a CJK unified ideograph (U+4E00..=U+9FFF).
pub fn has_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// A fragment needs translation when it has at least one ASCII Latin letter
/// and no CJK character. Empty text never does.
pub fn needs_translation(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    text.chars().any(|c| c.is_ascii_alphabetic()) && !has_cjk(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cjk() {
        assert!(has_cjk("搅拌均匀"));
        assert!(has_cjk("2 cups 水"));
        assert!(!has_cjk("Mix well"));
        assert!(!has_cjk(""));
    }

    #[test]
    fn latin_without_cjk_needs_translation() {
        assert!(needs_translation("Mix well"));
        assert!(needs_translation("1 cup flour"));
    }

    #[test]
    fn skips_empty_numeric_and_translated() {
        assert!(!needs_translation(""));
        assert!(!needs_translation("1/2"));
        assert!(!needs_translation("350°"));
        assert!(!needs_translation("1 cup 面粉"));
    }
}
