//! Keyword expansion applied to queries before they are embedded.
//!
//! Short visitor questions ("how much?") embed poorly. Appending the
//! vocabulary the knowledge base uses for that topic pulls the query vector
//! towards the right chunks. The expansion only affects retrieval; the
//! visitor's own wording is what gets scored and displayed.

/// A topic recognised in queries and the phrase appended for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCategory {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub expansion: &'static str,
}

/// Checked in order; the first category with a matching keyword wins.
pub const QUERY_CATEGORIES: [QueryCategory; 4] = [
    QueryCategory {
        name: "pricing",
        keywords: &["price", "cost", "how much", "pricing"],
        expansion: " pricing cost subscription plan",
    },
    QueryCategory {
        name: "features",
        keywords: &["feature", "what can", "capability", "do"],
        expansion: " features capabilities functions",
    },
    QueryCategory {
        name: "clients",
        keywords: &["client", "customer", "case study", "testimonial"],
        expansion: " clients customers case studies testimonials",
    },
    QueryCategory {
        name: "integration",
        keywords: &["integrate", "api", "connect", "compatible"],
        expansion: " integration api connectivity compatibility",
    },
];

/// First category whose keyword occurs in the already-normalised `query`.
fn match_category(query: &str) -> Option<&'static QueryCategory> {
    QUERY_CATEGORIES
        .iter()
        .find(|category| category.keywords.iter().any(|kw| query.contains(kw)))
}

/// Category the query would be expanded with, if any.
pub fn detect_category(query: &str) -> Option<&'static QueryCategory> {
    match_category(&query.trim().to_lowercase())
}

/// Lower-case and trim `query`, then append at most one expansion phrase.
pub fn enhance(query: &str) -> String {
    let mut enhanced = query.trim().to_lowercase();
    if let Some(category) = match_category(&enhanced) {
        enhanced.push_str(category.expansion);
    }
    enhanced
}
