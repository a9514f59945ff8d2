use std::hint::black_box;

use chrono::Duration;
use chrono::NaiveDate;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use rolling_portfolio::MeanVarianceOptimizer;
use rolling_portfolio::OptimizerConfig;
use rolling_portfolio::portfolio::ReturnMatrix;
use rolling_portfolio::portfolio::naive_portfolio;

/// Deterministic staggered universe: instrument `i` starts `i * 5` days in.
fn synthetic_matrix(n_dates: usize, n_instruments: usize) -> ReturnMatrix {
  let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
  let dates = (0..n_dates).map(|t| start + Duration::days(t as i64)).collect();
  let symbols = (0..n_instruments).map(|i| format!("S{i}")).collect();
  let columns = (0..n_instruments)
    .map(|i| {
      (0..n_dates)
        .map(|t| {
          if t <= i * 5 {
            None
          } else {
            let wave = ((t * (i + 3) * 7) % 17) as f64 - 8.0;
            Some(0.0002 * (i as f64 + 1.0) + wave * 0.001)
          }
        })
        .collect()
    })
    .collect();

  ReturnMatrix {
    dates,
    symbols,
    columns,
  }
}

fn bench_rolling_optimizer(c: &mut Criterion) {
  let mut group = c.benchmark_group("rolling_optimizer");
  group.sample_size(10);

  for &(n_dates, n_instruments) in &[(60, 3), (120, 5), (250, 8)] {
    let matrix = synthetic_matrix(n_dates, n_instruments);
    let optimizer = MeanVarianceOptimizer::new(OptimizerConfig::default());
    let id = format!("{n_dates}x{n_instruments}");

    group.bench_with_input(BenchmarkId::new("max_sharpe", &id), &matrix, |b, m| {
      b.iter(|| black_box(optimizer.run(m)))
    });
    group.bench_with_input(BenchmarkId::new("naive", &id), &matrix, |b, m| {
      b.iter(|| black_box(naive_portfolio(m, 4)))
    });
  }

  group.finish();
}

criterion_group!(benches, bench_rolling_optimizer);
criterion_main!(benches);
