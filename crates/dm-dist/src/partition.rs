use std::ops::Range;

use crate::error::{DistError, Result};

/// The contiguous half-open row range `[start_row, end_row)` owned by one
/// rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    pub rank: usize,
    pub start_row: usize,
    pub end_row: usize,
}

impl Partition {
    /// Number of rows owned by this rank. Zero when `size > n` and
    /// `rank >= n`.
    pub fn local_rows(&self) -> usize {
        self.end_row - self.start_row
    }

    pub fn is_empty(&self) -> bool {
        self.start_row == self.end_row
    }

    pub fn rows(&self) -> Range<usize> {
        self.start_row..self.end_row
    }
}

/// Compute the row range of `rank` in a group of `size` workers sharing an
/// `n`-row matrix.
///
/// Every rank gets `n / size` rows; the first `n % size` ranks get one
/// extra. The result depends only on the arguments, so any rank can compute
/// any other rank's partition without communicating.
pub fn partition(n: usize, size: usize, rank: usize) -> Result<Partition> {
    if size == 0 || rank >= size {
        return Err(DistError::InvalidGroup { rank, size });
    }

    let base = n / size;
    let rem = n % size;
    let start_row = rank * base + rank.min(rem);
    let end_row = start_row + base + usize::from(rank < rem);

    Ok(Partition {
        rank,
        start_row,
        end_row,
    })
}

/// Partitions of every rank, in rank order.
pub fn all_partitions(n: usize, size: usize) -> Result<Vec<Partition>> {
    (0..size).map(|rank| partition(n, size, rank)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(n: usize, size: usize) -> Vec<(usize, usize)> {
        all_partitions(n, size)
            .unwrap()
            .iter()
            .map(|p| (p.start_row, p.end_row))
            .collect()
    }

    #[test]
    fn test_even_split() {
        assert_eq!(ranges(4, 2), vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn test_remainder_goes_to_low_ranks() {
        assert_eq!(ranges(5, 2), vec![(0, 3), (3, 5)]);
        assert_eq!(ranges(10, 4), vec![(0, 3), (3, 6), (6, 8), (8, 10)]);
    }

    #[test]
    fn test_more_workers_than_rows() {
        let parts = all_partitions(2, 5).unwrap();
        assert_eq!(parts[0].rows(), 0..1);
        assert_eq!(parts[1].rows(), 1..2);
        for p in &parts[2..] {
            assert!(p.is_empty());
            assert_eq!(p.start_row, 2);
        }
    }

    #[test]
    fn test_zero_rows() {
        assert!(all_partitions(0, 3).unwrap().iter().all(Partition::is_empty));
    }

    #[test]
    fn test_coverage_and_fairness() {
        for n in 0..40 {
            for size in 1..12 {
                let parts = all_partitions(n, size).unwrap();
                let mut next = 0;
                for p in &parts {
                    assert_eq!(p.start_row, next, "gap or overlap at n={n} size={size}");
                    next = p.end_row;
                }
                assert_eq!(next, n);
                assert_eq!(parts.iter().map(Partition::local_rows).sum::<usize>(), n);

                let max = parts.iter().map(Partition::local_rows).max().unwrap();
                let min = parts.iter().map(Partition::local_rows).min().unwrap();
                assert!(max - min <= 1, "unfair split at n={n} size={size}");
            }
        }
    }

    #[test]
    fn test_matches_block_formula() {
        // rank < rem starts at rank*(base+1), rank >= rem at rem*(base+1) + (rank-rem)*base
        for n in 0..30 {
            for size in 1..9 {
                let (base, rem) = (n / size, n % size);
                for rank in 0..size {
                    let p = partition(n, size, rank).unwrap();
                    let expected = if rank < rem {
                        rank * (base + 1)
                    } else {
                        rem * (base + 1) + (rank - rem) * base
                    };
                    assert_eq!(p.start_row, expected);
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        assert_eq!(partition(1000, 7, 3).unwrap(), partition(1000, 7, 3).unwrap());
    }

    #[test]
    fn test_invalid_group() {
        assert!(matches!(
            partition(10, 0, 0),
            Err(DistError::InvalidGroup { rank: 0, size: 0 })
        ));
        assert!(partition(10, 2, 2).is_err());
    }
}
