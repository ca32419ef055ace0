//! Core data models used throughout Insight.
//!
//! An [`Analysis`] is one analysed text: the input as submitted plus the
//! summary, person names and category extracted by the model. Rows are
//! write-once; nothing in the crate updates or deletes them.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Closed set of labels the model is asked to choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    News,
    Technology,
    Sports,
    Politics,
    Business,
    Science,
    Entertainment,
    Health,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::News,
        Category::Technology,
        Category::Sports,
        Category::Politics,
        Category::Business,
        Category::Science,
        Category::Entertainment,
        Category::Health,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::News => "News",
            Category::Technology => "Technology",
            Category::Sports => "Sports",
            Category::Politics => "Politics",
            Category::Business => "Business",
            Category::Science => "Science",
            Category::Entertainment => "Entertainment",
            Category::Health => "Health",
            Category::Other => "Other",
        }
    }

    /// Lenient mapping of a model-produced label onto the closed set.
    ///
    /// Matching ignores case, surrounding whitespace, quotes and trailing
    /// punctuation. A label with an explanation attached resolves by its
    /// first recognized word. Anything unrecognized becomes [`Category::Other`].
    pub fn from_label(label: &str) -> Category {
        if let Ok(category) = label.parse::<Category>() {
            return category;
        }
        label
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
            .find_map(|w| w.parse::<Category>().ok())
            .unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
            .trim_end_matches(|c: char| c == '.' || c == ',' || c == ';' || c == '!')
            .trim();
        Category::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(cleaned))
            .copied()
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// Parsed model reply, before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub summary: String,
    pub persons: Vec<String>,
    pub category: Category,
}

impl AnalysisOutcome {
    /// Persons in their stored form: comma-joined.
    pub fn persons_joined(&self) -> String {
        self.persons.join(", ")
    }
}

/// Row to be inserted (everything except the id).
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub original_text: String,
    pub summary: String,
    pub persons: String,
    pub category: String,
}

impl NewAnalysis {
    pub fn from_outcome(original_text: impl Into<String>, outcome: &AnalysisOutcome) -> Self {
        Self {
            original_text: original_text.into(),
            summary: outcome.summary.clone(),
            persons: outcome.persons_joined(),
            category: outcome.category.to_string(),
        }
    }
}

/// A stored analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub id: i64,
    pub original_text: String,
    pub summary: Option<String>,
    pub persons: Option<String>,
    pub category: Option<String>,
}
