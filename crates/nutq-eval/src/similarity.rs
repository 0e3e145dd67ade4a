//! Edit-distance similarity between normalized strings.

/// Levenshtein distance over Unicode scalar values.
///
/// Insertions, deletions and substitutions each cost 1. Distances are counted
/// in characters, not bytes, so a single Arabic letter is one edit.
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Similarity ratio in `0.0..=1.0`.
///
/// Computed as `1 - edit_distance(a, b) / max(len(a), len(b))`, where lengths
/// are character counts.
///
/// * Both empty: `1.0`
/// * Exactly one empty: `0.0`
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }

    1.0 - edit_distance(a, b) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_edit_distance_classic() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("flaw", "lawn"), 2);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", "abc"), 0);
    }

    #[test]
    fn test_edit_distance_counts_characters() {
        // One substituted letter, even though each letter is two UTF-8 bytes.
        assert_eq!(edit_distance("بيت", "بنت"), 1);
        assert_eq!(edit_distance("كتاب", "كتب"), 1);
        assert_eq!(edit_distance("مكتبة", "كتاب"), 3);
    }

    #[test]
    fn test_similarity_identity() {
        for s in ["", "a", "kitten", "العزيز", "السلام عليكم"] {
            assert_eq!(similarity(s, s), 1.0);
        }
    }

    #[test]
    fn test_similarity_empty_cases() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("a", ""), 0.0);
        assert_eq!(similarity("", "كتاب"), 0.0);
    }

    #[test]
    fn test_similarity_symmetric() {
        let pairs = [
            ("kitten", "sitting"),
            ("بيت", "بنت"),
            ("العزيز", "عزيز"),
            ("abc", ""),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    #[test]
    fn test_similarity_values() {
        // 3 edits over 7 characters
        assert!((similarity("kitten", "sitting") - 4.0 / 7.0).abs() < EPSILON);
        // 1 edit over 3 characters
        assert!((similarity("بيت", "بنت") - 2.0 / 3.0).abs() < EPSILON);
        // Completely different strings of the same length
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_similarity_in_unit_range() {
        for (a, b) in [("a", "bcdef"), ("مرحبا", "سلام"), ("x", "x y z")] {
            let s = similarity(a, b);
            assert!((0.0..=1.0).contains(&s), "{s} out of range for {a:?} {b:?}");
        }
    }
}
