use once_cell::sync::Lazy;
use regex::Regex;

static ACRONYM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]{2,}").expect("valid acronym regex"));

/// Cheap, per-query signals used to pick fusion weights and the similarity threshold.
///
/// Derived on every call and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QueryShape {
    /// Whitespace-delimited words.
    pub word_count: usize,
    /// Rough model-token estimate: one token per four characters, rounded up.
    pub estimated_tokens: usize,
    pub has_cjk: bool,
    /// Only CJK characters and whitespace. Blank queries count as pure.
    pub is_pure_cjk: bool,
    /// Contains a run of at least two uppercase ASCII letters.
    pub has_acronym: bool,
}

impl QueryShape {
    #[must_use]
    pub fn of(query: &str) -> Self {
        let char_count = query.chars().count();
        let has_cjk = query.chars().any(is_cjk);
        let is_pure_cjk = query.chars().all(|c| is_cjk(c) || c.is_whitespace());

        Self {
            word_count: query.split_whitespace().count(),
            estimated_tokens: char_count.div_ceil(4),
            has_cjk,
            is_pure_cjk,
            has_acronym: ACRONYM.is_match(query),
        }
    }
}

/// Han ideographs (incl. extension A and compatibility), kana, and Hangul syllables.
#[must_use]
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
    )
}
