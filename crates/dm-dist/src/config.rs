use std::fmt;
use std::str::FromStr;

use crate::error::{DistError, Result};

pub const DEFAULT_N: usize = 3000;
pub const DEFAULT_SIZE: usize = 4;
pub const DEFAULT_SEED_A: u64 = 123;
pub const DEFAULT_SEED_B: u64 = 42;

/// How every worker obtains the full right-hand matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Replication {
    /// Each worker generates B itself from `seed_b`. No communication; the
    /// seeded generator guarantees bit-identical copies.
    #[default]
    Regenerate,
    /// The coordinator generates B and broadcasts it.
    Broadcast,
}

impl fmt::Display for Replication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replication::Regenerate => write!(f, "regenerate"),
            Replication::Broadcast => write!(f, "broadcast"),
        }
    }
}

impl FromStr for Replication {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regenerate" => Ok(Replication::Regenerate),
            "broadcast" => Ok(Replication::Broadcast),
            other => Err(format!(
                "unknown replication mode '{}' (expected 'regenerate' or 'broadcast')",
                other
            )),
        }
    }
}

/// Parameters of one distributed multiplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Matrix dimension: both operands and the product are `n x n`.
    pub n: usize,
    /// Number of workers, the coordinator included.
    pub size: usize,
    /// Seed of the left operand A, generated at the coordinator only.
    pub seed_a: u64,
    /// Seed of the right operand B, identical on every worker.
    pub seed_b: u64,
    /// How B reaches every worker.
    pub replication: Replication,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            n: DEFAULT_N,
            size: DEFAULT_SIZE,
            seed_a: DEFAULT_SEED_A,
            seed_b: DEFAULT_SEED_B,
            replication: Replication::default(),
        }
    }
}

impl RunConfig {
    /// Default seeds and replication with the given dimension and group size.
    pub fn new(n: usize, size: usize) -> Self {
        RunConfig {
            n,
            size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(DistError::Config("worker count must be at least 1".into()));
        }
        if self.n.checked_mul(self.n).is_none() {
            return Err(DistError::Config(format!(
                "matrix dimension {} overflows the element count",
                self.n
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = RunConfig::default();
        assert_eq!(c.n, 3000);
        assert_eq!(c.size, 4);
        assert_eq!(c.seed_a, 123);
        assert_eq!(c.seed_b, 42);
        assert_eq!(c.replication, Replication::Regenerate);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_new_keeps_default_seeds() {
        let c = RunConfig::new(5, 2);
        assert_eq!((c.n, c.size, c.seed_a), (5, 2, DEFAULT_SEED_A));
    }

    #[test]
    fn test_validate_rejects_empty_group() {
        assert!(matches!(
            RunConfig::new(10, 0).validate(),
            Err(DistError::Config(_))
        ));
    }

    #[test]
    fn test_validate_allows_more_workers_than_rows() {
        assert!(RunConfig::new(2, 8).validate().is_ok());
        assert!(RunConfig::new(0, 1).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overflow() {
        assert!(RunConfig::new(usize::MAX, 1).validate().is_err());
    }

    #[test]
    fn test_replication_parse() {
        assert_eq!("broadcast".parse::<Replication>(), Ok(Replication::Broadcast));
        assert_eq!("Regenerate".parse::<Replication>(), Ok(Replication::Regenerate));
        assert!("scatter".parse::<Replication>().is_err());
        assert_eq!(Replication::Broadcast.to_string(), "broadcast");
    }
}
