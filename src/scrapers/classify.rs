//! Keyword-based category tagging.
//!
//! Title, summary and URL are lower-cased into one blob and checked against
//! [`CATEGORY_RULES`] in order. The first category with any keyword found
//! as a substring wins, so a headline mentioning both "software" and
//! "football" is technology. Reordering the table changes results.
//!
//! Keywords are plain substrings, not words: "ai" also matches "said".

use crate::models::Category;

/// Ordered (category, keywords) rules, evaluated first-match-wins.
pub const CATEGORY_RULES: &[(Category, &[&str])] = &[
    (
        Category::Technology,
        &[
            "tech",
            "ai",
            "software",
            "app",
            "startup",
            "code",
            "programming",
            "computer",
            "gadget",
            "robot",
            "crypto",
            "blockchain",
        ],
    ),
    (
        Category::Sports,
        &[
            "sport",
            "football",
            "soccer",
            "basketball",
            "tennis",
            "cricket",
            "olympics",
            "championship",
            "match",
            "player",
            "team",
            "goal",
        ],
    ),
    (
        Category::Politics,
        &[
            "politic",
            "election",
            "government",
            "president",
            "minister",
            "parliament",
            "vote",
            "law",
            "senate",
            "congress",
        ],
    ),
    (
        Category::Business,
        &[
            "business", "market", "stock", "economy", "trade", "finance", "bank", "investor",
            "revenue", "profit",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "entertainment",
            "movie",
            "music",
            "celebrity",
            "film",
            "actor",
            "actress",
            "concert",
            "album",
            "show",
        ],
    ),
    (
        Category::Health,
        &[
            "health",
            "medical",
            "doctor",
            "hospital",
            "disease",
            "vaccine",
            "treatment",
            "patient",
            "medicine",
        ],
    ),
];

/// Classify an article, falling back to `default_category` when no rule
/// matches. Pure and deterministic.
pub fn classify(title: &str, summary: &str, url: &str, default_category: &str) -> Category {
    let blob = format!("{title} {summary} {url}").to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| blob.contains(kw)))
        .map(|(category, _)| category.clone())
        .unwrap_or_else(|| Category::Default(default_category.to_string()))
}
