use super::matrix::EmbeddingMatrix;
use super::npy::read_npy;
use super::{ChunkRecord, StoreError};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

/// The loaded knowledge base: one embedding row per chunk record.
///
/// Position `i` of the matrix always belongs to record `i`; a store is never
/// constructed from inputs where that cannot hold.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStore {
    matrix: EmbeddingMatrix,
    chunks: Vec<ChunkRecord>,
}

impl EmbeddingStore {
    /// Store with no knowledge
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the corpus, falling back to the empty corpus on any failure.
    pub fn load(embeddings_path: &Path, metadata_path: &Path) -> Self {
        match Self::try_load(embeddings_path, metadata_path) {
            Ok(store) => {
                info!(
                    "Loaded {} knowledge chunks (dimension {})",
                    store.len(),
                    store.dimension()
                );
                store
            }
            Err(e) => {
                warn!("{e}; continuing with an empty knowledge base");
                Self::empty()
            }
        }
    }

    /// Load the corpus, reporting why it could not be loaded.
    pub fn try_load(embeddings_path: &Path, metadata_path: &Path) -> Result<Self, StoreError> {
        let matrix = read_matrix(embeddings_path)?;
        let chunks = read_metadata(metadata_path)?;
        Self::from_parts(matrix, chunks)
    }

    /// Pair an already-built matrix with its records.
    pub fn from_parts(
        matrix: EmbeddingMatrix,
        chunks: Vec<ChunkRecord>,
    ) -> Result<Self, StoreError> {
        if matrix.rows() != chunks.len() {
            return Err(StoreError::Misaligned {
                vectors: matrix.rows(),
                records: chunks.len(),
            });
        }
        Ok(Self { matrix, chunks })
    }

    /// Build from in-memory `(vector, record)` pairs.
    pub fn from_entries(entries: Vec<(Vec<f32>, ChunkRecord)>) -> Result<Self, StoreError> {
        let (rows, chunks): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        let matrix =
            EmbeddingMatrix::from_rows(rows).map_err(|e| StoreError::MalformedResource {
                path: "<memory>".into(),
                reason: e.to_string(),
            })?;
        Self::from_parts(matrix, chunks)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimension, 0 for the empty corpus
    pub fn dimension(&self) -> usize {
        self.matrix.dimension()
    }

    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    pub fn chunks(&self) -> &[ChunkRecord] {
        &self.chunks
    }

    pub fn chunk(&self, index: usize) -> Option<&ChunkRecord> {
        self.chunks.get(index)
    }

    /// Embedding of the chunk at `index`
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        self.matrix.row(index)
    }

    /// Distinct source identifiers in the corpus, sorted
    pub fn sources(&self) -> BTreeSet<&str> {
        self.chunks.iter().map(|c| c.source.as_str()).collect()
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, StoreError> {
    std::fs::read(path).map_err(|source| StoreError::ResourceMissing {
        path: path.to_path_buf(),
        source,
    })
}

fn malformed(path: &Path, reason: impl ToString) -> StoreError {
    StoreError::MalformedResource {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// `.json` files hold an array of arrays; everything else is read as `.npy`.
fn read_matrix(path: &Path) -> Result<EmbeddingMatrix, StoreError> {
    let bytes = read_bytes(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let rows: Vec<Vec<f32>> =
            serde_json::from_slice(&bytes).map_err(|e| malformed(path, e))?;
        EmbeddingMatrix::from_rows(rows).map_err(|e| malformed(path, e))
    } else {
        read_npy(&bytes).map_err(|e| malformed(path, e))
    }
}

fn read_metadata(path: &Path) -> Result<Vec<ChunkRecord>, StoreError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|e| malformed(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::npy::write_npy;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    fn write_fixture(dir: &Path, rows: Vec<Vec<f32>>, records: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let embeddings = dir.join("embeddings.npy");
        let metadata = dir.join("metadata.json");
        let matrix = EmbeddingMatrix::from_rows(rows).unwrap();
        std::fs::write(&embeddings, write_npy(&matrix)).unwrap();
        std::fs::write(&metadata, records).unwrap();
        (embeddings, metadata)
    }

    #[test]
    fn test_load_aligned_corpus() {
        let dir = tempdir().unwrap();
        let (embeddings, metadata) = write_fixture(
            dir.path(),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            r#"[{"text": "Key features: scanning", "source_url": "https://a"},
                {"text": "Pricing tiers: three", "source_file": "b.pdf"}]"#,
        );

        let store = EmbeddingStore::try_load(&embeddings, &metadata).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimension(), 2);
        assert_eq!(store.chunk(1).unwrap().source, "b.pdf");
        assert_eq!(store.row(1), Some(&[0.0, 1.0][..]));
        assert_eq!(store.sources().len(), 2);
    }

    #[test]
    fn test_load_json_matrix() {
        let dir = tempdir().unwrap();
        let embeddings = dir.path().join("embeddings.json");
        let metadata = dir.path().join("metadata.json");
        std::fs::write(&embeddings, "[[0.1, 0.2, 0.3]]").unwrap();
        std::fs::write(&metadata, r#"[{"text": "t", "source": "s"}]"#).unwrap();

        let store = EmbeddingStore::try_load(&embeddings, &metadata).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.dimension(), 3);
    }

    #[test]
    #[traced_test]
    fn test_missing_files_give_empty_corpus() {
        let dir = tempdir().unwrap();
        let embeddings = dir.path().join("nope.npy");
        let metadata = dir.path().join("nope.json");

        assert!(matches!(
            EmbeddingStore::try_load(&embeddings, &metadata),
            Err(StoreError::ResourceMissing { .. })
        ));

        let store = EmbeddingStore::load(&embeddings, &metadata);
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 0);
        assert!(logs_contain("empty knowledge base"));
    }

    #[test]
    fn test_misaligned_lengths_give_empty_corpus() {
        let dir = tempdir().unwrap();
        let (embeddings, metadata) = write_fixture(
            dir.path(),
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            r#"[{"text": "a", "source": "s"}, {"text": "b", "source": "s"}]"#,
        );

        assert!(matches!(
            EmbeddingStore::try_load(&embeddings, &metadata),
            Err(StoreError::Misaligned {
                vectors: 3,
                records: 2
            })
        ));
        assert!(EmbeddingStore::load(&embeddings, &metadata).is_empty());
    }

    #[test]
    fn test_malformed_metadata_gives_empty_corpus() {
        let dir = tempdir().unwrap();
        let (embeddings, metadata) = write_fixture(
            dir.path(),
            vec![vec![1.0, 0.0]],
            r#"[{"source": "record without text"}]"#,
        );

        assert!(matches!(
            EmbeddingStore::try_load(&embeddings, &metadata),
            Err(StoreError::MalformedResource { .. })
        ));
        assert!(EmbeddingStore::load(&embeddings, &metadata).is_empty());

        std::fs::write(&metadata, "{not json").unwrap();
        assert!(EmbeddingStore::load(&embeddings, &metadata).is_empty());
    }

    #[test]
    #[traced_test]
    fn test_oversized_npy_shape_gives_empty_corpus() {
        let dir = tempdir().unwrap();
        let (embeddings, metadata) =
            write_fixture(dir.path(), vec![vec![1.0, 0.0]], r#"[{"text": "a", "source": "s"}]"#);

        let header = "{'descr': '<f4', 'fortran_order': False, 'shape': (4611686018427387904, 4), }\n";
        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        std::fs::write(&embeddings, bytes).unwrap();

        assert!(matches!(
            EmbeddingStore::try_load(&embeddings, &metadata),
            Err(StoreError::MalformedResource { .. })
        ));
        assert!(EmbeddingStore::load(&embeddings, &metadata).is_empty());
        assert!(logs_contain("does not fit in memory"));
    }

    #[test]
    fn test_from_entries_rejects_ragged_vectors() {
        let result = EmbeddingStore::from_entries(vec![
            (vec![1.0, 0.0], ChunkRecord::new("a", "s")),
            (vec![1.0], ChunkRecord::new("b", "s")),
        ]);
        assert!(matches!(result, Err(StoreError::MalformedResource { .. })));
    }
}
