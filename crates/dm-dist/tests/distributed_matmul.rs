use approx::assert_relative_eq;
use dm_dist::verify::{reference_product, verify, DEFAULT_TOLERANCE};
use dm_dist::{partition, run_local, DistError, Replication, RunConfig};
use dm_tensor::{ComputeBackend, CpuBackend, TensorError};

fn bits(data: &[f64]) -> Vec<u64> {
    data.iter().map(|v| v.to_bits()).collect()
}

// ============================================================
// Scenarios
// ============================================================

#[test]
fn test_4x4_on_two_workers_is_bit_exact() {
    assert_eq!(partition(4, 2, 0).unwrap().rows(), 0..2);
    assert_eq!(partition(4, 2, 1).unwrap().rows(), 2..4);

    let config = RunConfig::new(4, 2);
    let backend = CpuBackend::new();
    let report = run_local(&config, &backend).unwrap();
    let reference = reference_product(&config, &backend).unwrap();

    assert_eq!(bits(report.product.data()), bits(reference.data()));
}

#[test]
fn test_5x5_on_two_workers_uneven_split() {
    let p0 = partition(5, 2, 0).unwrap();
    let p1 = partition(5, 2, 1).unwrap();
    assert_eq!((p0.start_row, p0.end_row, p0.local_rows()), (0, 3, 3));
    assert_eq!((p1.start_row, p1.end_row, p1.local_rows()), (3, 5, 2));

    let config = RunConfig::new(5, 2);
    let backend = CpuBackend::new();
    let report = run_local(&config, &backend).unwrap();
    let reference = reference_product(&config, &backend).unwrap();
    assert_eq!(bits(report.product.data()), bits(reference.data()));
}

#[test]
fn test_more_workers_than_rows() {
    let config = RunConfig::new(3, 5);
    for rank in 3..5 {
        assert_eq!(partition(3, 5, rank).unwrap().local_rows(), 0);
    }

    let backend = CpuBackend::new();
    let report = run_local(&config, &backend).unwrap();
    let reference = reference_product(&config, &backend).unwrap();
    assert_eq!(report.product, reference);
    assert_eq!(report.metrics.size, 5);
}

#[test]
fn test_empty_matrix() {
    let report = run_local(&RunConfig::new(0, 3), &CpuBackend::new()).unwrap();
    assert!(report.product.is_empty());
    assert_eq!(report.metrics.first, None);
    assert_eq!(report.metrics.gflops(), 0.0);
}

#[test]
fn test_matches_reference_across_group_sizes() {
    let backend = CpuBackend::new();
    for n in [1, 7, 16, 23] {
        let reference = reference_product(&RunConfig::new(n, 1), &backend).unwrap();
        for size in 1..=6 {
            let config = RunConfig::new(n, size);
            let report = run_local(&config, &backend).unwrap();
            for (got, want) in report.product.data().iter().zip(reference.data()) {
                assert_relative_eq!(*got, *want, max_relative = 1e-9);
            }
            let v = verify(&report.product, &config, &backend, DEFAULT_TOLERANCE).unwrap();
            assert!(v.passed(), "n={} size={} err={}", n, size, v.max_relative_error);
        }
    }
}

#[test]
fn test_broadcast_replication_matches_regenerate() {
    let backend = CpuBackend::new();
    let regenerate = run_local(&RunConfig::new(9, 4), &backend).unwrap();
    let config = RunConfig {
        replication: Replication::Broadcast,
        ..RunConfig::new(9, 4)
    };
    let broadcast = run_local(&config, &backend).unwrap();
    assert_eq!(bits(regenerate.product.data()), bits(broadcast.product.data()));
}

#[test]
fn test_report_first_and_last_elements() {
    let config = RunConfig::new(6, 4);
    let backend = CpuBackend::new();
    let report = run_local(&config, &backend).unwrap();
    let reference = reference_product(&config, &backend).unwrap();
    assert_eq!(report.metrics.first, reference.get(0, 0));
    assert_eq!(report.metrics.last, reference.get(5, 5));
}

#[test]
fn test_1000x1000_on_four_workers_reports_throughput() {
    let report = run_local(&RunConfig::new(1000, 4), &CpuBackend::new()).unwrap();
    assert!(report.metrics.elapsed.as_secs_f64() > 0.0);
    let gflops = report.metrics.gflops();
    assert!(gflops > 0.0 && gflops.is_finite(), "gflops = {}", gflops);
}

// ============================================================
// Group-wide failure
// ============================================================

/// Kernel that fails for row blocks of one specific height.
#[derive(Debug)]
struct FailOnRows(usize);

impl ComputeBackend for FailOnRows {
    fn name(&self) -> &str {
        "fail-on-rows"
    }

    fn matmul(&self, a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> dm_tensor::Result<Vec<f64>> {
        if m == self.0 {
            return Err(TensorError::Allocation { elements: m * n });
        }
        CpuBackend::new().matmul(a, b, m, k, n)
    }
}

#[derive(Debug)]
struct PanicOnRows(usize);

impl ComputeBackend for PanicOnRows {
    fn name(&self) -> &str {
        "panic-on-rows"
    }

    fn matmul(&self, a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> dm_tensor::Result<Vec<f64>> {
        if m == self.0 {
            panic!("kernel blew up");
        }
        CpuBackend::new().matmul(a, b, m, k, n)
    }
}

#[test]
fn test_one_failing_worker_aborts_the_run() {
    // n=5 on 2 workers: rank 1 owns 2 rows and fails, rank 0 is left
    // waiting in the gather until the abort reaches it.
    let err = run_local(&RunConfig::new(5, 2), &FailOnRows(2)).unwrap_err();
    assert!(
        matches!(err, DistError::Tensor(TensorError::Allocation { .. })),
        "{:?}",
        err
    );
}

#[test]
fn test_failing_coordinator_aborts_the_run() {
    let err = run_local(&RunConfig::new(5, 2), &FailOnRows(3)).unwrap_err();
    assert!(matches!(err, DistError::Tensor(_)), "{:?}", err);
}

#[test]
fn test_panicking_worker_aborts_the_run() {
    let err = run_local(&RunConfig::new(7, 3), &PanicOnRows(2)).unwrap_err();
    assert!(matches!(err, DistError::WorkerPanicked { .. }), "{:?}", err);
}
