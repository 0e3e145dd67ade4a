//! Arabic text normalization for pronunciation comparison.
//!
//! Recognizers return undecorated text while the practice words carry full
//! vocalization, so both sides are reduced to bare letters and digits before
//! they are compared. Normalization is idempotent.

use std::sync::LazyLock;

use regex::Regex;

/// Arabic tatweel (kashida), the elongation character.
pub const TATWEEL: char = '\u{0640}';

/// Any run of characters that are neither letters nor digits.
static SEPARATOR_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{L}\p{N}]+").expect("separator pattern is a valid regex")
});

/// Whether `c` is an Arabic diacritic or Quranic annotation mark.
///
/// Covers the harakat and tanween block (`U+064B..=U+065F`), the superscript
/// alef (`U+0670`), the honorific signs (`U+0610..=U+061A`) and the small
/// Quranic annotation marks (`U+06D6..=U+06ED`, minus the letter-like and
/// symbol code points in that range).
pub const fn is_diacritic(c: char) -> bool {
    matches!(
        c,
        '\u{0610}'..='\u{061A}'
            | '\u{064B}'..='\u{065F}'
            | '\u{0670}'
            | '\u{06D6}'..='\u{06DC}'
            | '\u{06DF}'..='\u{06E4}'
            | '\u{06E7}'..='\u{06E8}'
            | '\u{06EA}'..='\u{06ED}'
    )
}

/// Normalize Arabic text for comparison.
///
/// Applies the following transformations in order:
/// 1. Strip diacritics (see [`is_diacritic`]) and tatweel
/// 2. Replace every run of non-letter, non-digit characters with one space
/// 3. Trim leading and trailing space
///
/// Step 2 already collapses whitespace runs, so `"السلام   عليكم"` and
/// `"السَّلَامُ، عَلَيْكُمْ"` both normalize to `"السلام عليكم"`.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|&c| c != TATWEEL && !is_diacritic(c))
        .collect();

    SEPARATOR_RUN.replace_all(&stripped, " ").trim().to_string()
}

/// [`normalize`] for optional input; `None` normalizes to the empty string.
pub fn normalize_opt(text: Option<&str>) -> String {
    text.map(normalize).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_combining_mark(s: &str) -> bool {
        Regex::new(r"\p{M}").unwrap().is_match(s)
    }

    #[test]
    fn test_identity_on_bare_text() {
        assert_eq!(normalize("كتاب"), "كتاب");
    }

    #[test]
    fn test_strips_harakat() {
        assert_eq!(normalize("الْعَزِيزُ"), "العزيز");
        assert_eq!(normalize("كِتَابٌ"), "كتاب");
    }

    #[test]
    fn test_strips_tanween_and_shadda() {
        assert_eq!(normalize("مَرْحَبًا"), "مرحبا");
        assert_eq!(normalize("مُحَمَّدٌ"), "محمد");
    }

    #[test]
    fn test_strips_superscript_alef() {
        // Alef wasla is a letter and stays; the dagger alef goes.
        assert_eq!(normalize("ٱلرَّحْمَٰنِ"), "ٱلرحمن");
    }

    #[test]
    fn test_strips_tatweel() {
        assert_eq!(normalize("كـتـاب"), "كتاب");
        assert_eq!(normalize("جمـــيل"), "جميل");
    }

    #[test]
    fn test_punctuation_becomes_space() {
        assert_eq!(normalize("السلام،عليكم"), "السلام عليكم");
        assert_eq!(normalize("مرحبا!"), "مرحبا");
        assert_eq!(normalize("؟ماذا؟"), "ماذا");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(normalize("  السلام   عليكم  "), "السلام عليكم");
        assert_eq!(normalize("السلام\t\nعليكم"), "السلام عليكم");
    }

    #[test]
    fn test_digits_preserved() {
        assert_eq!(normalize("٣ كتب"), "٣ كتب");
        assert_eq!(normalize("42"), "42");
    }

    #[test]
    fn test_empty_and_separator_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("!!! ،،"), "");
        assert_eq!(normalize("ــــ"), "");
        assert_eq!(normalize_opt(None), "");
        assert_eq!(normalize_opt(Some("بَيْت")), "بيت");
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "الْعَزِيزُ",
            "  السَّلَامُ ، عَلَيْكُمْ  ",
            "كـتـابٌ!",
            "ٱلرَّحْمَٰنِ",
            "word, with: punctuation",
            "",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_output_has_no_combining_marks() {
        for input in ["الْعَزِيزُ", "بِسْمِ ٱللَّهِ", "قُرْآنٌ", "café\u{0301}"] {
            let normalized = normalize(input);
            assert!(
                !has_combining_mark(&normalized),
                "combining mark left in {normalized:?}"
            );
        }
    }

    #[test]
    fn test_different_words_do_not_match() {
        assert_ne!(normalize("كَتَبَ"), normalize("مَكْتَب"));
        assert_ne!(normalize("بيت"), normalize("بنت"));
        // Vocalization alone does not distinguish words once stripped.
        assert_eq!(normalize("كَتَبَ"), normalize("كُتُبٌ"));
    }

    #[test]
    fn test_is_diacritic() {
        assert!(is_diacritic('\u{064E}')); // fatha
        assert!(is_diacritic('\u{0651}')); // shadda
        assert!(is_diacritic('\u{0670}')); // superscript alef
        assert!(!is_diacritic('ا'));
        assert!(!is_diacritic(TATWEEL));
    }
}
