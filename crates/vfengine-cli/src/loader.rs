//! Edge list loading.
//!
//! An edge file holds one `src,dst` pair of node ids per row. A leading
//! header row is skipped if its fields are not numbers, blank lines are
//! ignored and rows starting with `#` are comments.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use vfengine_common::NodeId;
use vfengine_core::AdjacencyStore;
use vfengine_core::graph::MAX_NODE_ID;

/// Reads `path` and builds the adjacency store.
///
/// # Errors
///
/// Fails if the file cannot be opened or a row is malformed.
pub fn load_store(path: &Path) -> Result<AdjacencyStore> {
    let file =
        std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let edges = read_edges(file).with_context(|| format!("failed to read {}", path.display()))?;
    tracing::info!(path = %path.display(), edges = edges.len(), "edge list loaded");
    let store = AdjacencyStore::from_edges(edges)
        .with_context(|| format!("failed to index {}", path.display()))?;
    Ok(store)
}

/// Parses edge rows from `reader`.
///
/// # Errors
///
/// Fails on rows without exactly two fields, non-numeric ids past the
/// header, and ids above [`MAX_NODE_ID`].
pub fn read_edges<R: Read>(reader: R) -> Result<Vec<(NodeId, NodeId)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);

    let mut edges = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let line = record.position().map_or(row as u64 + 1, csv::Position::line);
        if record.len() != 2 {
            bail!("line {line}: expected 2 fields, found {}", record.len());
        }
        let parsed = (record[0].parse::<u64>(), record[1].parse::<u64>());
        let (src, dst) = match parsed {
            (Ok(src), Ok(dst)) => (NodeId(src), NodeId(dst)),
            _ if edges.is_empty() && row == 0 => continue,
            _ => bail!("line {line}: node ids must be unsigned integers"),
        };
        let largest = src.as_u64().max(dst.as_u64());
        if largest > MAX_NODE_ID {
            bail!("line {line}: node id {largest} exceeds the largest supported id {MAX_NODE_ID}");
        }
        edges.push((src, dst));
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(edges: &[(NodeId, NodeId)]) -> Vec<(u64, u64)> {
        edges.iter().map(|(s, t)| (s.as_u64(), t.as_u64())).collect()
    }

    #[test]
    fn test_read_with_header() {
        let edges = read_edges("src,dst\n1,2\n1, 3\n".as_bytes()).unwrap();
        assert_eq!(ids(&edges), vec![(1, 2), (1, 3)]);
    }

    #[test]
    fn test_read_without_header() {
        let edges = read_edges("# comment\n4,5\n\n5,6\n".as_bytes()).unwrap();
        assert_eq!(ids(&edges), vec![(4, 5), (5, 6)]);
    }

    #[test]
    fn test_read_rejects_bad_rows() {
        let err = read_edges("1,2\nx,3\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");

        assert!(read_edges("1,2\n3,4\n".as_bytes()).is_ok());
        assert!(read_edges("1,2,3\n".as_bytes()).is_err());
        assert!(read_edges(format!("1,{}\n", u64::MAX).as_bytes()).is_err());
    }

    #[test]
    fn test_read_rejects_sparse_huge_id() {
        let err = read_edges("0,1\n0,18446744073709551614\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
        assert!(err.to_string().contains("exceeds the largest supported id"), "{err}");

        let edges = read_edges(format!("0,{MAX_NODE_ID}\n").as_bytes()).unwrap();
        assert_eq!(ids(&edges), vec![(0, MAX_NODE_ID)]);
    }
}
