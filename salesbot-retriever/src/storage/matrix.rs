//! Dense, row-major embedding matrix with precomputed row norms.

use std::fmt;

/// Why a set of values cannot form an embedding matrix.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatrixError {
    #[error("expected {expected} values for {rows}x{dimension}, got {actual}")]
    Length {
        rows: usize,
        dimension: usize,
        expected: usize,
        actual: usize,
    },
    #[error("row {row} has {actual} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("{rows} rows with zero dimension")]
    ZeroDimension { rows: usize },
    #[error("non-finite value in row {row}")]
    NonFinite { row: usize },
    #[error("{rows}x{dimension} does not fit in memory")]
    TooLarge { rows: usize, dimension: usize },
}

/// `rows` vectors of `dimension` values each, stored contiguously.
#[derive(Clone, Default, PartialEq)]
pub struct EmbeddingMatrix {
    values: Vec<f32>,
    norms: Vec<f32>,
    rows: usize,
    dimension: usize,
}

impl fmt::Debug for EmbeddingMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingMatrix")
            .field("rows", &self.rows)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl EmbeddingMatrix {
    /// Matrix with no rows
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a flat row-major buffer.
    pub fn from_flat(values: Vec<f32>, rows: usize, dimension: usize) -> Result<Self, MatrixError> {
        if rows == 0 {
            return Ok(Self::empty());
        }
        if dimension == 0 {
            return Err(MatrixError::ZeroDimension { rows });
        }
        let expected = rows
            .checked_mul(dimension)
            .ok_or(MatrixError::TooLarge { rows, dimension })?;
        if values.len() != expected {
            return Err(MatrixError::Length {
                rows,
                dimension,
                expected,
                actual: values.len(),
            });
        }

        let mut norms = Vec::with_capacity(rows);
        for (row, vector) in values.chunks_exact(dimension).enumerate() {
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(MatrixError::NonFinite { row });
            }
            norms.push(vector.iter().map(|v| v * v).sum::<f32>().sqrt());
        }

        Ok(Self {
            values,
            norms,
            rows,
            dimension,
        })
    }

    /// Build from one `Vec` per row; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, MatrixError> {
        let Some(first) = rows.first() else {
            return Ok(Self::empty());
        };
        let dimension = first.len();
        let row_count = rows.len();

        let mut values = Vec::with_capacity(row_count.saturating_mul(dimension));
        for (row, vector) in rows.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(MatrixError::RaggedRow {
                    row,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            values.extend(vector);
        }

        Self::from_flat(values, row_count, dimension)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Vector at position `index`
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.dimension;
        Some(&self.values[start..start + self.dimension])
    }

    /// L2 norm of the vector at position `index`
    pub fn norm(&self, index: usize) -> Option<f32> {
        self.norms.get(index).copied()
    }

    /// Iterate `(row vector, row norm)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&[f32], f32)> {
        // chunks_exact panics on a zero size; an empty matrix yields nothing
        // either way.
        let step = self.dimension.max(1);
        self.values
            .chunks_exact(step)
            .zip(self.norms.iter().copied())
    }
}
