//! Turns ranked knowledge snippets into the context block handed to the
//! answer generator, and classifies what kind of question a visitor asked.
//!
//! Snippets are grouped into labelled sections so the generator can tell
//! product features apart from pricing or client stories:
//!
//! ```text
//! === PRODUCT FEATURES ===
//! [Relevance: 0.94 | Source: https://example.com/features]
//! Key features: real-time stock levels, wave picking, ...
//!
//! === GENERAL INFORMATION ===
//! [Relevance: 0.41 | Source: docs/company.pdf]
//! Founded in 2009, ...
//! ```
//!
//! ```
//! use salesbot_context::context::{ContextBuilder, ContextEntry};
//!
//! let entries = vec![ContextEntry {
//!     text: "Pricing tiers: Starter, Growth, Enterprise".to_string(),
//!     source: "pricing.html".to_string(),
//!     relevance_score: 0.81,
//! }];
//!
//! let context = ContextBuilder::default().build(&entries);
//! assert!(context.starts_with("=== PRICING INFORMATION ==="));
//! ```
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Returned by [`ContextBuilder::build`] when there is nothing to ground the answer on.
pub const NO_CONTEXT_MESSAGE: &str = "No specific information available for this query.";

static FEATURE_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)feature|capability|function").expect("valid regex"));
static CLIENT_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)client|customer|case study|testimonial").expect("valid regex")
});
static PRICING_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price|cost|pricing|subscription").expect("valid regex"));
static TECHNICAL_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)technical|integration|api|compatible").expect("valid regex")
});

static PRICING_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price|cost|how much|subscription").expect("valid regex"));
static FEATURE_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)feature|what can|capability|does it").expect("valid regex")
});
static SOCIAL_PROOF_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)client|customer|case study|testimonial").expect("valid regex")
});
static TECHNICAL_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)technical|integrate|api|compatible").expect("valid regex")
});
static CONVERSION_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)demo|meeting|talk|contact").expect("valid regex"));

/// One retrieved snippet as the context builder sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub relevance_score: f32,
}

impl ContextEntry {
    /// Render as `[Relevance: 0.87 | Source: ...]` followed by the text.
    pub fn render(&self) -> String {
        format!(
            "[Relevance: {:.2} | Source: {}]\n{}\n",
            self.relevance_score, self.source, self.text
        )
    }
}

/// Section a snippet is filed under. Variants are listed in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Features,
    Clients,
    Pricing,
    Technical,
    General,
}

impl ContentCategory {
    /// All categories in the order their sections appear
    pub const ALL: [ContentCategory; 5] = [
        ContentCategory::Features,
        ContentCategory::Clients,
        ContentCategory::Pricing,
        ContentCategory::Technical,
        ContentCategory::General,
    ];

    /// First category whose keywords occur in `text`; `General` otherwise.
    pub fn classify(text: &str) -> Self {
        if FEATURE_TEXT.is_match(text) {
            ContentCategory::Features
        } else if CLIENT_TEXT.is_match(text) {
            ContentCategory::Clients
        } else if PRICING_TEXT.is_match(text) {
            ContentCategory::Pricing
        } else if TECHNICAL_TEXT.is_match(text) {
            ContentCategory::Technical
        } else {
            ContentCategory::General
        }
    }

    /// Section header line
    pub fn header(&self) -> &'static str {
        match self {
            ContentCategory::Features => "=== PRODUCT FEATURES ===",
            ContentCategory::Clients => "=== CLIENT SUCCESS ===",
            ContentCategory::Pricing => "=== PRICING INFORMATION ===",
            ContentCategory::Technical => "=== TECHNICAL DETAILS ===",
            ContentCategory::General => "=== GENERAL INFORMATION ===",
        }
    }

    /// Default number of snippets kept per section
    pub fn default_limit(&self) -> usize {
        match self {
            ContentCategory::Features | ContentCategory::General => 3,
            ContentCategory::Clients | ContentCategory::Pricing | ContentCategory::Technical => 2,
        }
    }
}

/// Builds the grouped context block from ranked snippets.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    limits: [usize; 5],
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            limits: ContentCategory::ALL.map(|c| c.default_limit()),
        }
    }
}

impl ContextBuilder {
    /// Override how many snippets a section may hold
    pub fn with_limit(mut self, category: ContentCategory, limit: usize) -> Self {
        self.limits[category as usize] = limit;
        self
    }

    /// Snippet cap currently applied to `category`
    pub fn limit(&self, category: ContentCategory) -> usize {
        self.limits[category as usize]
    }

    /// Group entries by category, keep the input order inside each section,
    /// and join the non-empty sections with a blank line.
    pub fn build(&self, entries: &[ContextEntry]) -> String {
        if entries.is_empty() {
            return NO_CONTEXT_MESSAGE.to_string();
        }

        let mut sections: [Vec<String>; 5] = Default::default();
        for entry in entries {
            let category = ContentCategory::classify(&entry.text);
            sections[category as usize].push(entry.render());
        }

        ContentCategory::ALL
            .iter()
            .zip(sections.iter())
            .filter(|(_, items)| !items.is_empty())
            .map(|(category, items)| {
                let kept: Vec<&str> = items
                    .iter()
                    .take(self.limit(*category))
                    .map(String::as_str)
                    .collect();
                format!("{}\n{}", category.header(), kept.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Convenience wrapper for [`ContextBuilder::default`]`.build(entries)`.
pub fn build_context(entries: &[ContextEntry]) -> String {
    ContextBuilder::default().build(entries)
}

/// What a visitor's message is mostly about. Drives the generator's prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InquiryKind {
    #[serde(rename = "pricing_inquiry")]
    Pricing,
    #[serde(rename = "feature_inquiry")]
    Feature,
    #[serde(rename = "social_proof")]
    SocialProof,
    #[serde(rename = "technical_inquiry")]
    Technical,
    #[serde(rename = "conversion_request")]
    Conversion,
    #[serde(rename = "general_inquiry")]
    General,
}

impl InquiryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryKind::Pricing => "pricing_inquiry",
            InquiryKind::Feature => "feature_inquiry",
            InquiryKind::SocialProof => "social_proof",
            InquiryKind::Technical => "technical_inquiry",
            InquiryKind::Conversion => "conversion_request",
            InquiryKind::General => "general_inquiry",
        }
    }
}

impl fmt::Display for InquiryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a visitor message; the first matching kind wins.
pub fn classify_inquiry(message: &str) -> InquiryKind {
    if PRICING_QUESTION.is_match(message) {
        InquiryKind::Pricing
    } else if FEATURE_QUESTION.is_match(message) {
        InquiryKind::Feature
    } else if SOCIAL_PROOF_QUESTION.is_match(message) {
        InquiryKind::SocialProof
    } else if TECHNICAL_QUESTION.is_match(message) {
        InquiryKind::Technical
    } else if CONVERSION_QUESTION.is_match(message) {
        InquiryKind::Conversion
    } else {
        InquiryKind::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, source: &str, relevance_score: f32) -> ContextEntry {
        ContextEntry {
            text: text.to_string(),
            source: source.to_string(),
            relevance_score,
        }
    }

    #[test]
    fn test_empty_context() {
        assert_eq!(build_context(&[]), NO_CONTEXT_MESSAGE);
    }

    #[test]
    fn test_entry_render() {
        let rendered = entry("Hello", "a.html", 0.456).render();
        assert_eq!(rendered, "[Relevance: 0.46 | Source: a.html]\nHello\n");
    }

    #[test]
    fn test_sections_follow_category_order() {
        let entries = vec![
            entry("Founded in 2009 in Dubai.", "about.html", 0.9),
            entry("Subscription plans start monthly.", "pricing.html", 0.8),
            entry("Key features: wave picking.", "features.html", 0.7),
        ];

        let context = build_context(&entries);
        let features = context.find("=== PRODUCT FEATURES ===").unwrap();
        let pricing = context.find("=== PRICING INFORMATION ===").unwrap();
        let general = context.find("=== GENERAL INFORMATION ===").unwrap();

        assert!(features < pricing && pricing < general);
        assert!(!context.contains("=== CLIENT SUCCESS ==="));
        assert!(!context.contains("=== TECHNICAL DETAILS ==="));
        assert!(context.contains("\n\n=== PRICING INFORMATION ===\n[Relevance: 0.80"));
    }

    #[test]
    fn test_first_matching_category_wins() {
        // Mentions both a feature and a price: filed under features.
        assert_eq!(
            ContentCategory::classify("This FEATURE has no extra cost"),
            ContentCategory::Features
        );
        assert_eq!(
            ContentCategory::classify("Works with our REST API"),
            ContentCategory::Technical
        );
        assert_eq!(
            ContentCategory::classify("Opening hours"),
            ContentCategory::General
        );
    }

    #[test]
    fn test_section_limits() {
        let entries: Vec<ContextEntry> = (0..5)
            .map(|i| entry(&format!("Customer story {i}"), "clients.html", 0.5))
            .collect();

        let context = build_context(&entries);
        assert_eq!(context.matches("Customer story").count(), 2);
        assert!(context.contains("Customer story 0"));
        assert!(context.contains("Customer story 1"));

        let wider = ContextBuilder::default()
            .with_limit(ContentCategory::Clients, 4)
            .build(&entries);
        assert_eq!(wider.matches("Customer story").count(), 4);
    }

    #[test]
    fn test_classify_inquiry() {
        assert_eq!(classify_inquiry("How much is it?"), InquiryKind::Pricing);
        assert_eq!(
            classify_inquiry("What can the scanner app do?"),
            InquiryKind::Feature
        );
        assert_eq!(
            classify_inquiry("Any customer testimonials?"),
            InquiryKind::SocialProof
        );
        assert_eq!(
            classify_inquiry("Do you have an API for SAP?"),
            InquiryKind::Technical
        );
        assert_eq!(
            classify_inquiry("Can I book a demo?"),
            InquiryKind::Conversion
        );
        assert_eq!(classify_inquiry("Hello there"), InquiryKind::General);
        // Pricing is checked before everything else.
        assert_eq!(
            classify_inquiry("What does the API subscription cost?"),
            InquiryKind::Pricing
        );
    }

    #[test]
    fn test_inquiry_kind_serialization() {
        let json = serde_json::to_string(&InquiryKind::SocialProof).unwrap();
        assert_eq!(json, "\"social_proof\"");
        assert_eq!(InquiryKind::Conversion.to_string(), "conversion_request");
    }
}
