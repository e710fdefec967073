/// Property-based tests using proptest
/// Invariants of the scoring response parser
use lead_scoring_api::lead_analysis::{
    clamp_score, coerce_score, fallback_analysis, normalize_classification,
    parse_analysis_response,
};
use lead_scoring_api::models::Classification;
use proptest::prelude::*;
use serde_json::json;

// Property: parsing arbitrary model output never panics and stays in range
proptest! {
    #[test]
    fn parser_never_panics(raw in "\\PC*") {
        let result = parse_analysis_response(&raw);
        prop_assert!((0..=100).contains(&result.score));
        prop_assert!(!result.reason.is_empty());
    }

    #[test]
    fn non_json_text_falls_back(raw in "[a-zA-Z ]{1,40}") {
        prop_assert_eq!(parse_analysis_response(&raw), fallback_analysis());
    }
}

// Property: scores are always clamped into [0, 100]
proptest! {
    #[test]
    fn clamp_is_bounded(raw in any::<f64>()) {
        let score = clamp_score(raw);
        prop_assert!((0..=100).contains(&score));
    }

    #[test]
    fn numeric_scores_are_clamped(raw in -10_000i64..10_000) {
        let score = coerce_score(&json!(raw));
        prop_assert_eq!(score as i64, raw.clamp(0, 100));
    }

    #[test]
    fn string_scores_use_leading_integer(n in 0u32..1000, suffix in "[a-z ]{0,10}") {
        let score = coerce_score(&json!(format!("{}{}", n, suffix)));
        prop_assert_eq!(score, n.min(100) as i32);
    }
}

// Property: classification normalization is total and case-insensitive
proptest! {
    #[test]
    fn classification_never_panics(raw in "\\PC*") {
        let _ = normalize_classification(&raw);
    }

    #[test]
    fn classification_ignores_case(
        word in prop::sample::select(vec!["quente", "morno", "frio", "hot", "cold"]),
        upper in prop::collection::vec(any::<bool>(), 6)
    ) {
        let mixed: String = word
            .chars()
            .zip(upper.iter().cycle())
            .map(|(c, &up)| if up { c.to_ascii_uppercase() } else { c })
            .collect();
        prop_assert_eq!(normalize_classification(&mixed), normalize_classification(word));
    }
}

// Property: fenced output parses exactly like the bare JSON
proptest! {
    #[test]
    fn fenced_equals_plain(
        score in 0i32..=100,
        class in prop::sample::select(vec!["Frio", "Morno", "Quente"]),
        reason in "[a-zA-Z ]{1,30}",
        tagged in any::<bool>()
    ) {
        let plain = json!({ "score": score, "classification": class, "reason": reason }).to_string();
        let fence = if tagged { "```json" } else { "```" };
        let fenced = format!("{}\n{}\n```", fence, plain);

        let from_plain = parse_analysis_response(&plain);
        prop_assert_eq!(parse_analysis_response(&fenced), from_plain.clone());
        prop_assert_eq!(from_plain.score, score);
        prop_assert_eq!(from_plain.classification, class.parse::<Classification>().unwrap());
    }
}
