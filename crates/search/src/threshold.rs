use crate::query_shape::QueryShape;

pub const BASE_THRESHOLD: f64 = 0.70;
pub const MIN_THRESHOLD: f64 = 0.55;
pub const MAX_THRESHOLD: f64 = 0.85;

const SHORT_QUERY_TOKENS: usize = 5;
const LONG_QUERY_TOKENS: usize = 20;
const PURE_CJK_MAX_TOKENS: usize = 10;

const LENGTH_ADJUSTMENT: f64 = 0.05;
const ACRONYM_ADJUSTMENT: f64 = 0.03;
const PURE_CJK_ADJUSTMENT: f64 = 0.03;

/// Query-adaptive cosine similarity threshold for the vector path.
///
/// Short queries carry little signal and get a looser cut; long ones can
/// afford to be strict. Acronyms tighten the cut, short pure-CJK queries
/// loosen it. The result is clamped to `[MIN_THRESHOLD, MAX_THRESHOLD]`.
#[must_use]
pub fn compute_threshold(query: &str, workspace_offset: f64) -> f64 {
    let shape = QueryShape::of(query);
    let mut threshold = BASE_THRESHOLD + workspace_offset;

    if shape.estimated_tokens < SHORT_QUERY_TOKENS {
        threshold -= LENGTH_ADJUSTMENT;
    }
    if shape.estimated_tokens > LONG_QUERY_TOKENS {
        threshold += LENGTH_ADJUSTMENT;
    }
    if shape.has_acronym {
        threshold += ACRONYM_ADJUSTMENT;
    }
    if shape.is_pure_cjk && shape.estimated_tokens < PURE_CJK_MAX_TOKENS {
        threshold -= PURE_CJK_ADJUSTMENT;
    }

    // NaN offsets fall back to the base rather than escaping the clamp.
    if threshold.is_nan() {
        threshold = BASE_THRESHOLD;
    }
    threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn long_plain_query_is_stricter() {
        assert!(approx(compute_threshold(&"a".repeat(100), 0.0), 0.75));
    }

    #[test]
    fn mid_length_query_keeps_base() {
        // 40 chars -> 10 estimated tokens
        let query = "where are invoice pdfs archived nightly?";
        assert_eq!(query.chars().count(), 40);
        assert!(approx(compute_threshold(query, 0.0), 0.70));
    }

    #[test]
    fn short_query_is_looser() {
        assert!(approx(compute_threshold("login", 0.0), 0.65));
    }

    #[test]
    fn acronym_tightens() {
        assert!(approx(compute_threshold("SSO", 0.0), 0.68));
    }

    #[test]
    fn short_pure_cjk_query_is_loosest() {
        assert!(approx(compute_threshold("用户登录", 0.0), 0.62));
    }

    #[test]
    fn whitespace_only_query_counts_as_pure_script() {
        assert!(approx(compute_threshold("   ", 0.0), 0.62));
        assert!(approx(compute_threshold("用户 登录", 0.0), 0.62));
    }

    #[test]
    fn workspace_offset_shifts_and_clamps() {
        let query = "where are invoice pdfs archived nightly?";
        assert!(approx(compute_threshold(query, 0.05), 0.75));
        assert!(approx(compute_threshold(query, 1.0), MAX_THRESHOLD));
        assert!(approx(compute_threshold(query, -1.0), MIN_THRESHOLD));
        assert!(approx(compute_threshold(query, f64::NAN), BASE_THRESHOLD));
    }

    proptest! {
        #[test]
        fn threshold_is_always_bounded(query in "\\PC{0,200}", offset in -5.0f64..5.0) {
            let threshold = compute_threshold(&query, offset);
            prop_assert!((MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold));
        }
    }
}
