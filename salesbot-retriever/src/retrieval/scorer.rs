//! Heuristic re-scoring of ranked candidates.
//!
//! Raw cosine similarity narrows the corpus to K candidates; these boosts then
//! reorder that small set. Curated chunks (labeled lists such as
//! `Key features:`) and chunks that literally mention a query word are
//! promoted.

use serde::{Deserialize, Serialize};

pub const DEFAULT_STRUCTURE_BOOST: f32 = 1.3;
pub const DEFAULT_QUERY_MATCH_BOOST: f32 = 1.2;
pub const DEFAULT_STRUCTURAL_MARKERS: [&str; 4] =
    ["key features:", "benefits:", "pricing tiers:", "faq:"];

/// Boost multipliers and the marker phrases that trigger the structure boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub structure_boost: f32,
    pub query_match_boost: f32,
    pub structural_markers: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            structure_boost: DEFAULT_STRUCTURE_BOOST,
            query_match_boost: DEFAULT_QUERY_MATCH_BOOST,
            structural_markers: DEFAULT_STRUCTURAL_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl ScoringConfig {
    pub fn with_structure_boost(mut self, boost: f32) -> Self {
        self.structure_boost = boost;
        self
    }

    pub fn with_query_match_boost(mut self, boost: f32) -> Self {
        self.query_match_boost = boost;
        self
    }

    pub fn with_structural_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.structural_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Multipliers must be finite and positive so the reranking stays an order.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("structure_boost", self.structure_boost),
            ("query_match_boost", self.query_match_boost),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be a positive number, got {value}"));
            }
        }
        Ok(())
    }
}

/// Applies [`ScoringConfig`] to candidate texts.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    structure_boost: f32,
    query_match_boost: f32,
    // Lower-cased once; matching is case-insensitive.
    markers: Vec<String>,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

impl RelevanceScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            structure_boost: config.structure_boost,
            query_match_boost: config.query_match_boost,
            markers: config
                .structural_markers
                .iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// Whether `text` carries one of the structural markers.
    pub fn is_structured(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.markers.iter().any(|m| text.contains(m.as_str()))
    }

    /// Relevance of a candidate: its similarity times every boost that applies.
    ///
    /// `original_query` is the visitor's query before enhancement.
    pub fn score(&self, text: &str, similarity: f32, original_query: &str) -> f32 {
        let text = text.to_lowercase();
        let mut score = similarity;

        if self.markers.iter().any(|m| text.contains(m.as_str())) {
            score *= self.structure_boost;
        }

        let query = original_query.to_lowercase();
        if query.split_whitespace().any(|token| text.contains(token)) {
            score *= self.query_match_boost;
        }

        score
    }
}

/// Sort by relevance, highest first. Equal scores keep their current order.
pub fn sort_by_relevance<T>(items: &mut [T], relevance: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| relevance(b).total_cmp(&relevance(a)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_beats_plain_text_at_equal_similarity() {
        let scorer = RelevanceScorer::default();
        let marked = scorer.score("Key Features: OCR, tagging", 0.5, "zzz");
        let plain = scorer.score("We scan documents", 0.5, "zzz");

        assert!((marked - 0.65).abs() < 1e-6);
        assert!((plain - 0.5).abs() < 1e-6);
        assert!(marked > plain);
    }

    #[test]
    fn test_query_token_boost_is_case_insensitive_substring() {
        let scorer = RelevanceScorer::default();
        // "integrat" inside "Integrations" still counts.
        let score = scorer.score("Integrations with SAP", 0.5, "INTEGRAT please");
        assert!((score - 0.6).abs() < 1e-6);

        let score = scorer.score("Nothing relevant", 0.5, "integration");
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_boosts_multiply() {
        let scorer = RelevanceScorer::default();
        let score = scorer.score("FAQ: how does pricing work?", 1.0, "pricing");
        assert!((score - 1.56).abs() < 1e-5);
    }

    #[test]
    fn test_empty_query_gives_no_query_boost() {
        let scorer = RelevanceScorer::default();
        assert!((scorer.score("anything", 0.4, "   ") - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_custom_config() {
        let config = ScoringConfig::default()
            .with_structure_boost(2.0)
            .with_query_match_boost(1.0)
            .with_structural_markers(["Highlights:"]);
        let scorer = RelevanceScorer::new(&config);

        assert!(scorer.is_structured("highlights: fast"));
        assert!(!scorer.is_structured("Key features: fast"));
        assert!((scorer.score("HIGHLIGHTS: fast", 0.3, "fast") - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_validate() {
        assert!(ScoringConfig::default().validate().is_ok());
        assert!(ScoringConfig::default().with_structure_boost(0.0).validate().is_err());
        assert!(
            ScoringConfig::default()
                .with_query_match_boost(f32::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_sort_by_relevance_is_stable() {
        let mut items = vec![("a", 0.5), ("b", 0.9), ("c", 0.5), ("d", 0.7)];
        sort_by_relevance(&mut items, |(_, s)| *s);
        let order: Vec<&str> = items.iter().map(|(n, _)| *n).collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_config_from_partial_toml() {
        let config: ScoringConfig = toml::from_str("structure_boost = 1.5").unwrap();
        assert_eq!(config.structure_boost, 1.5);
        assert_eq!(config.query_match_boost, DEFAULT_QUERY_MATCH_BOOST);
        assert_eq!(config.structural_markers.len(), 4);
    }
}
