//! Reader for the NumPy `.npy` files the ingestion pipeline writes.
//!
//! Only what an embedding matrix needs is supported: a 2-D (or empty) array
//! of little- or big-endian `f2`/`f4`/`f8` floats in C order. Values are
//! widened or narrowed to `f32`.
//!
//! Layout: the magic string `\x93NUMPY`, a major/minor version byte pair, the
//! header length (u16 for version 1, u32 for versions 2 and 3), a Python dict
//! literal describing the array, then the raw data.

use super::matrix::{EmbeddingMatrix, MatrixError};
use half::f16;
use regex::Regex;
use std::sync::LazyLock;

const MAGIC: &[u8] = b"\x93NUMPY";

static DESCR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'descr'\s*:\s*'([^']*)'").expect("valid regex"));
static FORTRAN_ORDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'fortran_order'\s*:\s*(True|False)").expect("valid regex"));
static SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'shape'\s*:\s*\(([^)]*)\)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NpyError {
    #[error("not an .npy file (bad magic)")]
    BadMagic,
    #[error("unsupported .npy format version {0}")]
    UnsupportedVersion(u8),
    #[error("truncated .npy file")]
    Truncated,
    #[error("invalid .npy header: {0}")]
    Header(String),
    #[error("unsupported dtype '{0}', expected a float type")]
    UnsupportedDtype(String),
    #[error("fortran-ordered arrays are not supported")]
    FortranOrder,
    #[error("expected a 2-D array, got shape {0:?}")]
    Shape(Vec<usize>),
    #[error("data section is {actual} bytes, expected {expected}")]
    DataLength { expected: usize, actual: usize },
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FloatKind {
    F16,
    F32,
    F64,
}

impl FloatKind {
    fn size(&self) -> usize {
        match self {
            FloatKind::F16 => 2,
            FloatKind::F32 => 4,
            FloatKind::F64 => 8,
        }
    }
}

fn parse_descr(descr: &str) -> Result<(Endian, FloatKind), NpyError> {
    let unsupported = || NpyError::UnsupportedDtype(descr.to_string());
    let mut chars = descr.chars();
    let endian = match chars.next() {
        Some('<') | Some('=') => Endian::Little,
        Some('>') => Endian::Big,
        _ => return Err(unsupported()),
    };
    let kind = match chars.as_str() {
        "f2" => FloatKind::F16,
        "f4" => FloatKind::F32,
        "f8" => FloatKind::F64,
        _ => return Err(unsupported()),
    };
    Ok((endian, kind))
}

fn parse_shape(raw: &str) -> Result<Vec<usize>, NpyError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| NpyError::Header(format!("bad shape entry '{part}'")))
        })
        .collect()
}

fn decode(bytes: &[u8], endian: Endian, kind: FloatKind) -> Vec<f32> {
    bytes
        .chunks_exact(kind.size())
        .map(|b| match (kind, endian) {
            (FloatKind::F16, Endian::Little) => f16::from_bits(u16::from_le_bytes([b[0], b[1]])).to_f32(),
            (FloatKind::F16, Endian::Big) => f16::from_bits(u16::from_be_bytes([b[0], b[1]])).to_f32(),
            (FloatKind::F32, Endian::Little) => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            (FloatKind::F32, Endian::Big) => f32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            (FloatKind::F64, endian) => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                let value = match endian {
                    Endian::Little => f64::from_le_bytes(raw),
                    Endian::Big => f64::from_be_bytes(raw),
                };
                value as f32
            }
        })
        .collect()
}

/// Parse an in-memory `.npy` file into an embedding matrix.
pub fn read_npy(bytes: &[u8]) -> Result<EmbeddingMatrix, NpyError> {
    if bytes.len() < MAGIC.len() + 2 || !bytes.starts_with(MAGIC) {
        return Err(NpyError::BadMagic);
    }
    let major = bytes[MAGIC.len()];
    let mut offset = MAGIC.len() + 2;

    let header_len = match major {
        1 => {
            let raw = bytes.get(offset..offset + 2).ok_or(NpyError::Truncated)?;
            offset += 2;
            u16::from_le_bytes([raw[0], raw[1]]) as usize
        }
        2 | 3 => {
            let raw = bytes.get(offset..offset + 4).ok_or(NpyError::Truncated)?;
            offset += 4;
            u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize
        }
        other => return Err(NpyError::UnsupportedVersion(other)),
    };

    let header_bytes = bytes
        .get(offset..offset + header_len)
        .ok_or(NpyError::Truncated)?;
    let header = std::str::from_utf8(header_bytes)
        .map_err(|_| NpyError::Header("header is not valid text".to_string()))?;
    let data = &bytes[offset + header_len..];

    let descr = DESCR
        .captures(header)
        .and_then(|c| c.get(1))
        .ok_or_else(|| NpyError::Header("missing 'descr'".to_string()))?
        .as_str();
    let (endian, kind) = parse_descr(descr)?;

    let fortran = FORTRAN_ORDER
        .captures(header)
        .and_then(|c| c.get(1))
        .ok_or_else(|| NpyError::Header("missing 'fortran_order'".to_string()))?
        .as_str();
    let shape = parse_shape(
        SHAPE
            .captures(header)
            .and_then(|c| c.get(1))
            .ok_or_else(|| NpyError::Header("missing 'shape'".to_string()))?
            .as_str(),
    )?;

    let (rows, dimension) = match shape.as_slice() {
        [rows, dimension] => (*rows, *dimension),
        // `np.save(path, np.array([]))` writes shape (0,)
        [] | [0] => (0, 0),
        _ => return Err(NpyError::Shape(shape)),
    };
    // Fortran order only changes the layout when there is more than one row
    // and column.
    if fortran == "True" && rows > 1 && dimension > 1 {
        return Err(NpyError::FortranOrder);
    }

    let expected = rows
        .checked_mul(dimension)
        .and_then(|values| values.checked_mul(kind.size()))
        .ok_or(MatrixError::TooLarge { rows, dimension })?;
    if data.len() != expected {
        return Err(NpyError::DataLength {
            expected,
            actual: data.len(),
        });
    }

    Ok(EmbeddingMatrix::from_flat(
        decode(data, endian, kind),
        rows,
        dimension,
    )?)
}

/// Serialize a matrix as a version 1.0 `.npy` file of little-endian `f4`.
///
/// Used to produce fixtures; the ingestion pipeline writes the real files.
pub fn write_npy(matrix: &EmbeddingMatrix) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        matrix.rows(),
        matrix.dimension()
    );
    // Pad so the data section starts on a 64-byte boundary, ending in '\n'.
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + matrix.rows() * matrix.dimension() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for (row, _) in matrix.iter() {
        for value in row {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npy_bytes(descr: &str, shape: &str, data: &[u8]) -> Vec<u8> {
        let header = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape}, }}\n");
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_write_then_read() {
        let matrix = EmbeddingMatrix::from_rows(vec![vec![0.5, -1.0, 2.0], vec![3.0, 0.0, 0.25]]).unwrap();
        let bytes = write_npy(&matrix);

        // Header block is padded to a multiple of 64 bytes.
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);

        assert_eq!(read_npy(&bytes).unwrap(), matrix);
    }

    #[test]
    fn test_read_f64_and_f16() {
        let data: Vec<u8> = [1.0f64, 2.0, 3.0, 4.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let matrix = read_npy(&npy_bytes("<f8", "(2, 2)", &data)).unwrap();
        assert_eq!(matrix.row(1), Some(&[3.0, 4.0][..]));

        let data: Vec<u8> = [0.5f32, 1.5]
            .iter()
            .flat_map(|v| f16::from_f32(*v).to_bits().to_le_bytes())
            .collect();
        let matrix = read_npy(&npy_bytes("<f2", "(1, 2)", &data)).unwrap();
        assert_eq!(matrix.row(0), Some(&[0.5, 1.5][..]));
    }

    #[test]
    fn test_read_big_endian() {
        let data: Vec<u8> = [1.0f32, -2.0].iter().flat_map(|v| v.to_be_bytes()).collect();
        let matrix = read_npy(&npy_bytes(">f4", "(1, 2)", &data)).unwrap();
        assert_eq!(matrix.row(0), Some(&[1.0, -2.0][..]));
    }

    #[test]
    fn test_empty_array() {
        let matrix = read_npy(&npy_bytes("<f8", "(0,)", &[])).unwrap();
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(read_npy(b"not numpy"), Err(NpyError::BadMagic));
        assert!(matches!(
            read_npy(&npy_bytes("<i8", "(1, 1)", &[0; 8])),
            Err(NpyError::UnsupportedDtype(_))
        ));
        assert!(matches!(
            read_npy(&npy_bytes("<f4", "(2, 2, 2)", &[0; 32])),
            Err(NpyError::Shape(_))
        ));
        assert!(matches!(
            read_npy(&npy_bytes("<f4", "(2, 2)", &[0; 12])),
            Err(NpyError::DataLength {
                expected: 16,
                actual: 12
            })
        ));

        let mut truncated = npy_bytes("<f4", "(1, 1)", &[0; 4]);
        truncated.truncate(12);
        assert_eq!(read_npy(&truncated), Err(NpyError::Truncated));
    }

    #[test]
    fn test_rejects_shape_beyond_address_space() {
        // rows * dimension overflows
        assert_eq!(
            read_npy(&npy_bytes("<f4", "(4611686018427387904, 4)", &[])),
            Err(NpyError::Matrix(MatrixError::TooLarge {
                rows: 4611686018427387904,
                dimension: 4
            }))
        );
        // rows * dimension fits, the byte count does not
        assert!(matches!(
            read_npy(&npy_bytes("<f8", "(2305843009213693952, 2)", &[0; 16])),
            Err(NpyError::Matrix(MatrixError::TooLarge { .. }))
        ));
        // representable but absent
        assert!(matches!(
            read_npy(&npy_bytes("<f4", "(1000000000, 384)", &[0; 16])),
            Err(NpyError::DataLength { actual: 16, .. })
        ));
    }
}
