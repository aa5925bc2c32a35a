//! Cross-cutting, shared constants.
//!
//! Prompt-shaping limits live here so the pipeline, the dataset builder and the gateway agree on them.

/// Default number of review highlights (and CRM snippets) retrieved per request.
pub const DEFAULT_TOP_K: usize = 3;

/// Default number of pipeline runs per dataset row.
pub const DEFAULT_NUM_CANDIDATES: usize = 4;

/// Upper bound on `n` for one `/generate` request.
pub const MAX_REPEAT: usize = 32;

/// Reviews shorter than this (in characters) never become retrieval candidates.
pub const MIN_REVIEW_CHARS: usize = 20;

/// Fewer positive reviews than this and every long-enough review is admitted.
pub const MIN_POSITIVE_REVIEWS: usize = 3;

/// Highlight fallback length when no highlight keyword is found.
pub const SNIPPET_MAX_CHARS: usize = 200;

/// How much of the draft is used as the CRM-bucket retrieval query.
pub const DRAFT_QUERY_CHARS: usize = 500;

/// CRM bucket documents are clipped to this many characters before prompting.
pub const CRM_SNIPPET_MAX_CHARS: usize = 800;

/// Style templates injected into the tone-correction prompt.
pub const STYLE_EXAMPLE_LIMIT: usize = 3;

/// Default drafter model (first generation stage).
pub const DEFAULT_DRAFTER_MODEL: &str = "qwen2.5:1.5b-instruct";

/// Default tone-correction model (second generation stage).
pub const DEFAULT_CORRECTOR_MODEL: &str = "exaone3.5:2.4b";

/// Review ratings at or above this count as positive.
pub const POSITIVE_RATING: f64 = 4.0;

/// Substrings marking a review as positive regardless of rating.
pub const POSITIVE_KEYWORDS: &[&str] = &[
    "좋", "만족", "추천", "재구매", "인생템", "효과", "흡수", "보습", "탄력", "광채", "진정", "신뢰",
    "가볍", "리뉴얼",
];

/// Keywords that mark a sentence as a highlight.
pub const HIGHLIGHT_KEYWORDS: &[&str] = &[
    "효과", "성분", "제형", "흡수", "보습", "재구매", "신뢰", "사용감", "탄력", "주름", "진정", "광채",
];

/// Event hooks appended to the tone-correction prompt for event rows.
pub const EVENT_HOOKS: &[&str] = &[
    "A limited-time member event is running this week.",
    "An exclusive gift is included with purchases during the event period.",
    "Event pricing ends soon; mention it once, without numbers.",
    "Early access for members opens before the public event.",
];
