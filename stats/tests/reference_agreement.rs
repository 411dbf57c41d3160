//! Agreement between the two-pass/histogram statistics and a full-sort
//! reference over a large random array.

use brainmap_stats::FastStatistics;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Percentile of pre-sorted data with linear interpolation between ranks
fn sorted_percentile(sorted: &[f64], percent: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (percent / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (rank - lower as f64) * (sorted[upper] - sorted[lower])
    }
}

#[test]
fn agrees_with_full_sort_on_a_million_uniform_values() {
    let count = 1 << 20;
    let mut rng = StdRng::seed_from_u64(0x00b7a1);
    let data: Vec<f32> = (0..count)
        .map(|_| rng.random_range(-50.0f32..50.0))
        .collect();

    let mut stats = FastStatistics::new();
    stats.update(&data);

    // full-sort reference in f64
    let mut sorted: Vec<f64> = data.iter().map(|&v| f64::from(v)).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len() as f64;
    let true_min = sorted[0];
    let true_max = *sorted.last().unwrap();
    let true_mean = sorted.iter().sum::<f64>() / n;
    let sum_squares: f64 = sorted.iter().map(|&v| (v - true_mean).powi(2)).sum();
    let true_std_pop = (sum_squares / n).sqrt();
    let true_std_sample = (sum_squares / (n - 1.0)).sqrt();

    // exact aggregates: tight tolerance scaled by the spread
    let tight = 1e-6 * true_std_pop;
    assert!((f64::from(stats.min) - true_min).abs() < tight);
    assert!((f64::from(stats.max) - true_max).abs() < tight);
    assert!((f64::from(stats.mean) - true_mean).abs() < tight);
    assert!((f64::from(stats.std_dev_population) - true_std_pop).abs() < tight);
    assert!((f64::from(stats.std_dev_sample) - true_std_sample).abs() < tight);

    // histogram-approximated order statistics: looser tolerance
    let loose = 0.01 * true_std_pop;
    let true_median = sorted_percentile(&sorted, 50.0);
    let approx_median = f64::from(stats.approximate_median());
    assert!(
        (approx_median - true_median).abs() < loose,
        "median {approx_median} vs {true_median}"
    );

    let mut sorted_positives: Vec<f64> = sorted.iter().copied().filter(|&v| v > 0.0).collect();
    sorted_positives.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let true_p90 = sorted_percentile(&sorted_positives, 90.0);
    let approx_p90 = f64::from(stats.approx_positive_percentile(90.0));
    assert!(
        (approx_p90 - true_p90).abs() < loose,
        "p90 {approx_p90} vs {true_p90}"
    );

    let mut sorted_negatives: Vec<f64> = sorted.iter().copied().filter(|&v| v < 0.0).collect();
    sorted_negatives.sort_by(|a, b| a.partial_cmp(b).unwrap());
    // negative percentiles count by magnitude from zero, so the 90th
    // negative percentile is the 10th percentile of the ascending sort
    let true_neg_p90 = sorted_percentile(&sorted_negatives, 10.0);
    let approx_neg_p90 = f64::from(stats.approx_negative_percentile(90.0));
    assert!(
        (approx_neg_p90 - true_neg_p90).abs() < loose,
        "neg p90 {approx_neg_p90} vs {true_neg_p90}"
    );
}

#[test]
fn class_counts_partition_the_input() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut data: Vec<f32> = (0..10_000)
        .map(|_| rng.random_range(-1.0f32..1.0))
        .collect();
    data.extend_from_slice(&[0.0; 57]);
    data.extend_from_slice(&[f32::NAN, f32::INFINITY, f32::NEG_INFINITY]);

    let mut stats = FastStatistics::new();
    stats.update(&data);

    let total = stats.pos_count
        + stats.neg_count
        + stats.zero_count
        + stats.nan_count
        + stats.inf_count
        + stats.neg_inf_count;
    assert_eq!(total, data.len() as i64);
    assert!(stats.zero_count >= 57);
}
