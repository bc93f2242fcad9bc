//! Whitespace-separated matrix text: `n` followed by `n * n` integers, row-major.
//!
//! The sentinel is written as its numeric value in input files and as `INF` in result
//! listings.

use crate::apsp_error::ApspError;
use crate::data::matrix::DistanceMatrix;
use crate::sentinel::{Distance, is_sentinel};
use itertools::Itertools;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Marker printed for unreachable cells.
pub const INF_MARKER: &str = "INF";

// upper bound on cells reserved before any are parsed; the header is untrusted
const MAX_PREALLOC: usize = 1 << 20;

/// Parse a matrix from any reader. Tokens past the `n * n`-th are ignored.
pub fn read_matrix<R: Read>(mut reader: R) -> Result<DistanceMatrix, ApspError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let mut tokens = text.split_whitespace();

    let first = tokens.next().ok_or(ApspError::ShortRead {
        expected: 1,
        found: 0,
    })?;
    let n: usize = first.parse().map_err(|_| ApspError::Parse {
        token: first.to_string(),
        position: 0,
    })?;

    let expected = n.checked_mul(n).ok_or_else(|| ApspError::Parse {
        token: first.to_string(),
        position: 0,
    })?;
    let mut data: Vec<Distance> = Vec::with_capacity(expected.min(MAX_PREALLOC));
    for (position, tok) in tokens.by_ref().take(expected).enumerate() {
        let d = tok.parse().map_err(|_| ApspError::Parse {
            token: tok.to_string(),
            position: position + 1,
        })?;
        data.push(d);
    }
    if data.len() < expected {
        return Err(ApspError::ShortRead {
            expected,
            found: data.len(),
        });
    }
    let extra = tokens.count();
    if extra > 0 {
        log::warn!("ignoring {extra} tokens after the {n}x{n} matrix");
    }
    DistanceMatrix::from_vec(n, data)
}

/// Open and parse a matrix file.
pub fn read_matrix_file<P: AsRef<Path>>(path: P) -> Result<DistanceMatrix, ApspError> {
    let path = path.as_ref();
    log::debug!("reading matrix from {}", path.display());
    let file = File::open(path)?;
    read_matrix(BufReader::new(file))
}

fn cell(d: Distance) -> String {
    if is_sentinel(d) {
        INF_MARKER.to_string()
    } else {
        d.to_string()
    }
}

/// Write a result listing: one row per line, tab separated, sentinel cells as `INF`.
pub fn write_matrix<W: Write>(mut w: W, m: &DistanceMatrix) -> Result<(), ApspError> {
    for row in m.rows() {
        writeln!(w, "{}", row.iter().map(|&d| cell(d)).join("\t"))?;
    }
    w.flush()?;
    Ok(())
}

/// [`write_matrix`] into a `String`.
pub fn format_matrix(m: &DistanceMatrix) -> String {
    let mut buf = Vec::new();
    // writing into a Vec cannot fail
    let _ = write_matrix(&mut buf, m);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Write the input format (`n`, then rows of numbers) so the file can be read back.
pub fn write_input<W: Write>(w: W, m: &DistanceMatrix) -> Result<(), ApspError> {
    let mut w = BufWriter::new(w);
    writeln!(w, "{}", m.order())?;
    for row in m.rows() {
        writeln!(w, "{}", row.iter().join(" "))?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel::SENTINEL;

    #[test]
    fn parses_header_then_cells() {
        let m = read_matrix("2\n0 9999\n4 0\n".as_bytes()).unwrap();
        assert_eq!(m.order(), 2);
        assert_eq!(m[(0, 1)], SENTINEL);
        assert_eq!(m[(1, 0)], 4);
    }

    #[test]
    fn short_read_is_reported() {
        let err = read_matrix("3 0 1 2".as_bytes()).unwrap_err();
        assert!(matches!(err, ApspError::ShortRead { expected: 9, found: 3 }));
        let err = read_matrix("".as_bytes()).unwrap_err();
        assert!(matches!(err, ApspError::ShortRead { expected: 1, found: 0 }));
    }

    #[test]
    fn oversized_header_is_rejected() {
        let err = read_matrix("4294967296 0".as_bytes()).unwrap_err();
        match err {
            ApspError::Parse { token, position } => {
                assert_eq!(token, "4294967296");
                assert_eq!(position, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn huge_order_with_short_body() {
        let err = read_matrix("100000 0 1 2".as_bytes()).unwrap_err();
        match err {
            ApspError::ShortRead { expected, found } => {
                assert_eq!(expected, 100_000 * 100_000);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_token_position() {
        let err = read_matrix("2 0 1 x 0".as_bytes()).unwrap_err();
        match err {
            ApspError::Parse { token, position } => {
                assert_eq!(token, "x");
                assert_eq!(position, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            read_matrix("-2 0".as_bytes()),
            Err(ApspError::Parse { position: 0, .. })
        ));
    }

    #[test]
    fn listing_marks_infinity() {
        let m = DistanceMatrix::from_rows(&[[0, SENTINEL], [-3, 0]]).unwrap();
        assert_eq!(format_matrix(&m), "0\tINF\n-3\t0\n");
    }

    #[test]
    fn input_format_reads_back() {
        let m = DistanceMatrix::from_rows(&[[0, SENTINEL, 2], [1, 0, 7], [SENTINEL, 5, 0]]).unwrap();
        let mut buf = Vec::new();
        write_input(&mut buf, &m).unwrap();
        assert_eq!(read_matrix(buf.as_slice()).unwrap(), m);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_matrix_file("/nonexistent/matrix.txt").unwrap_err();
        assert!(matches!(err, ApspError::Io(_)));
    }
}
