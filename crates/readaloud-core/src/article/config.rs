//! Extraction heuristics configuration.
//!
//! Every density-scoring threshold is a named constant with a matching
//! overridable field on [`ExtractionConfig`].

/// Characters of text worth one point of score.
pub const DEFAULT_CHARS_PER_POINT: f64 = 25.0;

/// Points awarded per direct paragraph child.
pub const DEFAULT_POINTS_PER_PARAGRAPH: f64 = 25.0;

/// Link density above which the score is scaled by `1 - density`.
pub const DEFAULT_LINK_DENSITY_THRESHOLD: f64 = 0.5;

/// Element-child count above which a sparse container is halved.
pub const DEFAULT_CROWDED_CHILD_COUNT: usize = 20;

/// Average characters per child below which a crowded container is sparse.
pub const DEFAULT_CROWDED_MIN_CHARS_PER_CHILD: f64 = 50.0;

/// Flat bonus for semantic containers (`<article>`, `<main>`, `role=main`).
pub const DEFAULT_SEMANTIC_BONUS: f64 = 50.0;

/// Minimum cleaned text length for a scored candidate to win.
pub const DEFAULT_MIN_CANDIDATE_TEXT_LENGTH: usize = 50;

/// Minimum score for a scored candidate to win.
pub const DEFAULT_MIN_CANDIDATE_SCORE: f64 = 20.0;

/// Minimum cleaned text length for the whole-page fallback.
pub const DEFAULT_MIN_PAGE_TEXT_LENGTH: usize = 1;

/// Title candidates this long or longer are skipped.
pub const DEFAULT_MAX_TITLE_CHARS: usize = 200;

/// Tags stripped from the working copy before scoring.
pub const DEFAULT_DENY_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "iframe", "button",
    "svg", "head", "template", "select",
];

/// ARIA roles stripped from the working copy before scoring.
pub const DEFAULT_DENY_ROLES: &[&str] = &[
    "navigation",
    "banner",
    "contentinfo",
    "complementary",
    "menu",
    "menubar",
    "dialog",
];

/// Class/id markers of non-content regions.
pub const DEFAULT_DENY_MARKERS: &[&str] = &[
    "ad",
    "ads",
    "advert",
    "social",
    "share",
    "comment",
    "sidebar",
    "menu",
    "promo",
    "sponsor",
    "related",
    "newsletter",
    "cookie",
    "popup",
];

/// Class/id markers of content regions, tried by the selector fallback.
pub const DEFAULT_CONTENT_MARKERS: &[&str] = &["content", "post", "entry", "article"];

/// Tunable extraction heuristics.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    pub chars_per_point: f64,
    pub points_per_paragraph: f64,
    pub link_density_threshold: f64,
    pub crowded_child_count: usize,
    pub crowded_min_chars_per_child: f64,
    pub semantic_bonus: f64,
    pub min_candidate_text_length: usize,
    pub min_candidate_score: f64,
    pub min_page_text_length: usize,
    pub max_title_chars: usize,
    pub deny_tags: Vec<String>,
    pub deny_roles: Vec<String>,
    pub deny_markers: Vec<String>,
    pub content_markers: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chars_per_point: DEFAULT_CHARS_PER_POINT,
            points_per_paragraph: DEFAULT_POINTS_PER_PARAGRAPH,
            link_density_threshold: DEFAULT_LINK_DENSITY_THRESHOLD,
            crowded_child_count: DEFAULT_CROWDED_CHILD_COUNT,
            crowded_min_chars_per_child: DEFAULT_CROWDED_MIN_CHARS_PER_CHILD,
            semantic_bonus: DEFAULT_SEMANTIC_BONUS,
            min_candidate_text_length: DEFAULT_MIN_CANDIDATE_TEXT_LENGTH,
            min_candidate_score: DEFAULT_MIN_CANDIDATE_SCORE,
            min_page_text_length: DEFAULT_MIN_PAGE_TEXT_LENGTH,
            max_title_chars: DEFAULT_MAX_TITLE_CHARS,
            deny_tags: owned(DEFAULT_DENY_TAGS),
            deny_roles: owned(DEFAULT_DENY_ROLES),
            deny_markers: owned(DEFAULT_DENY_MARKERS),
            content_markers: owned(DEFAULT_CONTENT_MARKERS),
        }
    }
}
