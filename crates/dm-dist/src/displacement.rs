use crate::error::{DistError, Result};
use crate::partition::{all_partitions, Partition};

/// One rank's slice of a full `n x n` buffer, in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    pub count: usize,
    pub offset: usize,
}

impl Chunk {
    /// Element range covered by this chunk.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.count
    }
}

/// Per-rank `(count, offset)` pairs for the variable-length scatter and
/// gather of row blocks.
///
/// Both transfers build their table through [`DisplacementTable::build`],
/// so scatter and gather always agree on where each rank's rows live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplacementTable {
    n: usize,
    partitions: Vec<Partition>,
    chunks: Vec<Chunk>,
}

impl DisplacementTable {
    /// Build and validate the table for an `n x n` matrix split across
    /// `size` ranks.
    pub fn build(n: usize, size: usize) -> Result<Self> {
        let partitions = all_partitions(n, size)?;
        let chunks = partitions
            .iter()
            .map(|p| Chunk {
                count: p.local_rows() * n,
                offset: p.start_row * n,
            })
            .collect();
        let table = DisplacementTable {
            n,
            partitions,
            chunks,
        };
        table.validate()?;
        Ok(table)
    }

    /// Check that the chunks tile `[0, n*n)` in rank order with no gaps or
    /// overlaps.
    pub fn validate(&self) -> Result<()> {
        let mut next = 0;
        for (rank, chunk) in self.chunks.iter().enumerate() {
            if chunk.offset != next {
                return Err(DistError::TableMismatch {
                    n: self.n,
                    detail: format!(
                        "rank {} starts at element {} but previous chunk ends at {}",
                        rank, chunk.offset, next
                    ),
                });
            }
            next += chunk.count;
        }
        if next != self.total() {
            return Err(DistError::TableMismatch {
                n: self.n,
                detail: format!("chunks cover {} of {} elements", next, self.total()),
            });
        }
        Ok(())
    }

    /// Matrix dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of ranks described.
    pub fn size(&self) -> usize {
        self.chunks.len()
    }

    /// Total number of elements (`n * n`).
    pub fn total(&self) -> usize {
        self.n * self.n
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, rank: usize) -> Result<Chunk> {
        self.chunks
            .get(rank)
            .copied()
            .ok_or(DistError::InvalidGroup {
                rank,
                size: self.size(),
            })
    }

    pub fn partition(&self, rank: usize) -> Result<Partition> {
        self.partitions
            .get(rank)
            .copied()
            .ok_or(DistError::InvalidGroup {
                rank,
                size: self.size(),
            })
    }

    /// Per-rank element counts, in rank order.
    pub fn counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks.iter().map(|c| c.count)
    }

    /// Per-rank element offsets, in rank order.
    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks.iter().map(|c| c.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uneven_table() {
        let t = DisplacementTable::build(5, 2).unwrap();
        assert_eq!(
            t.chunks(),
            &[
                Chunk { count: 15, offset: 0 },
                Chunk { count: 10, offset: 15 }
            ]
        );
        assert_eq!(t.total(), 25);
        assert_eq!(t.counts().sum::<usize>(), 25);
    }

    #[test]
    fn test_zero_length_chunks() {
        let t = DisplacementTable::build(2, 4).unwrap();
        let counts: Vec<usize> = t.counts().collect();
        let offsets: Vec<usize> = t.offsets().collect();
        assert_eq!(counts, vec![2, 2, 0, 0]);
        assert_eq!(offsets, vec![0, 2, 4, 4]);
        assert!(t.chunk(3).unwrap().range().is_empty());
    }

    #[test]
    fn test_independent_builds_agree() {
        for n in 0..25 {
            for size in 1..10 {
                let scatter_side = DisplacementTable::build(n, size).unwrap();
                let gather_side = DisplacementTable::build(n, size).unwrap();
                assert_eq!(scatter_side, gather_side);
                for rank in 0..size {
                    let p = scatter_side.partition(rank).unwrap();
                    let c = gather_side.chunk(rank).unwrap();
                    assert_eq!(c.count, p.local_rows() * n);
                    assert_eq!(c.offset, p.start_row * n);
                }
            }
        }
    }

    #[test]
    fn test_validate_detects_gap() {
        let mut t = DisplacementTable::build(4, 2).unwrap();
        t.chunks[1].offset += 1;
        assert!(matches!(t.validate(), Err(DistError::TableMismatch { .. })));
    }

    #[test]
    fn test_validate_detects_short_cover() {
        let mut t = DisplacementTable::build(4, 2).unwrap();
        t.chunks[1].count -= 4;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_chunk_out_of_range() {
        let t = DisplacementTable::build(4, 2).unwrap();
        assert!(t.chunk(2).is_err());
        assert!(t.partition(2).is_err());
    }
}
