//! Cosine-similarity ranking with partial top-K selection.

use crate::storage::EmbeddingMatrix;
use std::cmp::Ordering;

/// One corpus row selected by similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCandidate {
    /// Position in the store
    pub index: usize,
    /// Cosine similarity to the query, in [-1, 1]
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RankError {
    #[error("query vector has dimension {query}, corpus vectors have {store}")]
    DimensionMismatch { query: usize, store: usize },
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cosine_with_norms(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    let denominator = a_norm * b_norm;
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (dot(a, b) / denominator).clamp(-1.0, 1.0)
}

/// Cosine similarity of two equal-length vectors; 0.0 when either is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norms(a, l2_norm(a), b, l2_norm(b))
}

/// Highest similarity first, lower index first on ties.
fn by_rank(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then(a.index.cmp(&b.index))
}

/// Select the `k` rows of `matrix` most similar to `query`, best first.
///
/// Selection is linear in the corpus size; only the selected `k` are sorted.
pub fn rank(
    query: &[f32],
    matrix: &EmbeddingMatrix,
    k: usize,
) -> Result<Vec<RankedCandidate>, RankError> {
    if matrix.is_empty() || k == 0 {
        return Ok(Vec::new());
    }
    if query.len() != matrix.dimension() {
        return Err(RankError::DimensionMismatch {
            query: query.len(),
            store: matrix.dimension(),
        });
    }

    let query_norm = l2_norm(query);
    let mut candidates: Vec<RankedCandidate> = matrix
        .iter()
        .enumerate()
        .map(|(index, (row, row_norm))| RankedCandidate {
            index,
            similarity: cosine_with_norms(query, query_norm, row, row_norm),
        })
        .collect();

    if k < candidates.len() {
        candidates.select_nth_unstable_by(k - 1, by_rank);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(by_rank);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f32>>) -> EmbeddingMatrix {
        EmbeddingMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-3.0, 0.0]) + 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 5.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_stays_in_bounds() {
        let vectors = [
            vec![1e-3, 3e-3, -2e-3],
            vec![1e3, 1e3, 1e3],
            vec![0.1, 0.7, -0.3],
            vec![-5.0, 0.0, 2.5],
        ];
        for a in &vectors {
            for b in &vectors {
                let s = cosine_similarity(a, b);
                assert!((-1.0..=1.0).contains(&s), "{s} out of range");
            }
        }
    }

    #[test]
    fn test_rank_orders_by_similarity() {
        let m = matrix(vec![
            vec![0.2, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.1],
        ]);
        let ranked = rank(&[1.0, 0.0], &m, 2).unwrap();

        let indices: Vec<usize> = ranked.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(ranked[0].similarity >= ranked[1].similarity);
    }

    #[test]
    fn test_rank_returns_at_most_k() {
        let m = matrix(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]);
        for k in 0..6 {
            let ranked = rank(&[0.3, 0.4], &m, k).unwrap();
            assert_eq!(ranked.len(), k.min(3));
        }
    }

    #[test]
    fn test_ties_keep_index_order() {
        let m = matrix(vec![vec![1.0, 0.0]; 6]);
        let ranked = rank(&[1.0, 0.0], &m, 4).unwrap();
        let indices: Vec<usize> = ranked.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(rank(&[1.0, 0.0], &m, 4).unwrap(), ranked);
    }

    #[test]
    fn test_empty_corpus_and_zero_query() {
        assert!(rank(&[1.0, 0.0], &EmbeddingMatrix::empty(), 5).unwrap().is_empty());

        let m = matrix(vec![vec![1.0, 0.0], vec![0.0, 0.0]]);
        let ranked = rank(&[0.0, 0.0], &m, 2).unwrap();
        assert!(ranked.iter().all(|c| c.similarity == 0.0));
    }

    #[test]
    fn test_dimension_mismatch() {
        let m = matrix(vec![vec![1.0, 0.0, 0.0]]);
        assert_eq!(
            rank(&[1.0, 0.0], &m, 1),
            Err(RankError::DimensionMismatch { query: 2, store: 3 })
        );
    }
}
