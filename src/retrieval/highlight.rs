//! Evidence extraction: persona query, review filtering and highlight snippets.

use crate::constants::{
    HIGHLIGHT_KEYWORDS, MIN_POSITIVE_REVIEWS, MIN_REVIEW_CHARS, POSITIVE_KEYWORDS, POSITIVE_RATING,
    SNIPPET_MAX_CHARS,
};
use crate::domain::{Persona, Review};

/// Builds the retrieval query from persona attributes only.
pub fn build_persona_query(persona: &Persona) -> String {
    [
        ("주요 고민", &persona.skin_type),
        ("가치관", &persona.value_focus),
        ("쇼핑스타일", &persona.shopping_style),
        ("성장 포인트", &persona.growth_point),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(label, value)| format!("{label}: {value}"))
    .collect::<Vec<_>>()
    .join(" | ")
}

pub fn is_positive_review(review: &Review) -> bool {
    if review.rating.is_some_and(|r| r >= POSITIVE_RATING) {
        return true;
    }
    POSITIVE_KEYWORDS.iter().any(|k| review.text.contains(k))
}

/// Positive reviews long enough to be useful, topped up with any long review
/// when fewer than three positive ones exist.
pub fn extract_candidate_texts(reviews: &[Review]) -> Vec<String> {
    let long_enough = |r: &&Review| r.text.trim().chars().count() > MIN_REVIEW_CHARS;

    let mut texts: Vec<String> = reviews
        .iter()
        .filter(|r| is_positive_review(r))
        .filter(long_enough)
        .map(|r| r.text.trim().to_string())
        .collect();

    if texts.len() < MIN_POSITIVE_REVIEWS {
        for review in reviews.iter().filter(long_enough) {
            let text = review.text.trim();
            if !texts.iter().any(|t| t == text) {
                texts.push(text.to_string());
            }
        }
    }
    texts
}

/// First sentence mentioning a highlight keyword, else the text clipped to 200 chars.
pub fn extract_highlight_snippet(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let keyword_sentence = text
        .split(['.', '\n'])
        .find(|sentence| HIGHLIGHT_KEYWORDS.iter().any(|k| sentence.contains(k)));
    if let Some(sentence) = keyword_sentence {
        return sentence.trim().to_string();
    }

    clip_chars(text.trim(), SNIPPET_MAX_CHARS, "...")
}

/// Keeps the first `max` characters, appending `suffix` only when something was cut.
pub fn clip_chars(text: &str, max: usize, suffix: &str) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], suffix),
        None => text.to_string(),
    }
}
