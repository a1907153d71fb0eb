//! distmm command-line driver.
//!
//! Multiply two seeded `n x n` matrices across a group of workers:
//! ```sh
//! dm-cli --n 1000 --size 4 --verify
//! RUST_LOG=debug dm-cli --n 8 --size 3 --print
//! mpirun -n 4 dm-cli --transport mpi --n 3000    # built with --features mpi
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::warn;

use dm_dist::config::{DEFAULT_N, DEFAULT_SEED_A, DEFAULT_SEED_B, DEFAULT_SIZE};
use dm_dist::verify::{verify, DEFAULT_TOLERANCE};
use dm_dist::{run_local, Replication, RunConfig, RunReport};
use dm_tensor::{seeded_matrix, ComputeBackend, CpuBackend};

/// Largest dimension for which `--print` dumps matrices.
const PRINT_LIMIT: usize = 10;

#[derive(Parser)]
#[command(name = "dm-cli")]
#[command(about = "Distributed row-block matrix multiplication")]
#[command(version)]
struct Cli {
    /// Matrix dimension (operands and product are n x n).
    #[arg(short, long, env = "DISTMM_N", default_value_t = DEFAULT_N)]
    n: usize,
    /// Number of workers, coordinator included. Ignored with `--transport
    /// mpi`, where the launcher decides.
    #[arg(short, long, env = "DISTMM_SIZE", default_value_t = DEFAULT_SIZE)]
    size: usize,
    /// Seed of the left operand A.
    #[arg(long, env = "DISTMM_SEED_A", default_value_t = DEFAULT_SEED_A)]
    seed_a: u64,
    /// Seed of the right operand B.
    #[arg(long, env = "DISTMM_SEED_B", default_value_t = DEFAULT_SEED_B)]
    seed_b: u64,
    /// How B reaches every worker: "regenerate" or "broadcast".
    #[arg(long, env = "DISTMM_REPLICATION", default_value_t = Replication::Regenerate)]
    replication: Replication,
    /// Worker group implementation.
    #[arg(long, value_enum, env = "DISTMM_TRANSPORT", default_value_t = TransportKind::Local)]
    transport: TransportKind,
    /// Compare the result against a single-process multiply.
    #[arg(long)]
    verify: bool,
    /// Print A, B, and C (only for n <= 10).
    #[arg(long)]
    print: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum TransportKind {
    /// One thread per worker in this process.
    Local,
    /// One MPI process per worker.
    #[cfg(feature = "mpi")]
    Mpi,
}

impl Cli {
    fn config(&self, size: usize) -> RunConfig {
        RunConfig {
            n: self.n,
            size,
            seed_a: self.seed_a,
            seed_b: self.seed_b,
            replication: self.replication,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.transport {
        TransportKind::Local => {
            let config = cli.config(cli.size);
            let backend = CpuBackend::new();
            let report = run_local(&config, &backend).context("distributed multiply failed")?;
            print_report(&cli, &config, &backend, &report)
        }
        #[cfg(feature = "mpi")]
        TransportKind::Mpi => run_mpi(&cli),
    }
}

#[cfg(feature = "mpi")]
fn run_mpi(cli: &Cli) -> Result<()> {
    use dm_dist::transport::mpi::MpiTransport;
    use dm_dist::{run_worker, GroupTransport};

    let universe = mpi::initialize().context("failed to initialize MPI")?;
    let transport = MpiTransport::new(universe.world());
    let config = cli.config(transport.size());
    let backend = CpuBackend::new();
    match run_worker(&transport, &config, &backend)
        .with_context(|| format!("rank {} failed", transport.rank()))?
    {
        Some(report) => print_report(cli, &config, &backend, &report),
        None => Ok(()),
    }
}

fn print_report(
    cli: &Cli,
    config: &RunConfig,
    backend: &dyn ComputeBackend,
    report: &RunReport,
) -> Result<()> {
    println!("==========================================");
    println!("{}", report.metrics);
    println!("==========================================");

    if cli.print {
        if config.n <= PRINT_LIMIT {
            println!("A:\n{}", seeded_matrix(config.n, config.seed_a)?);
            println!("B:\n{}", seeded_matrix(config.n, config.seed_b)?);
            println!("C:\n{}", report.product);
        } else {
            warn!("--print ignored for n={} (limit {})", config.n, PRINT_LIMIT);
        }
    }

    if cli.verify {
        let v = verify(&report.product, config, backend, DEFAULT_TOLERANCE)?;
        println!(
            "Verification: max relative error {:.3e} (tolerance {:.0e})",
            v.max_relative_error, v.tolerance
        );
        if !v.passed() {
            bail!("distributed result does not match the single-process reference");
        }
    }
    Ok(())
}
