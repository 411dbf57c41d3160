use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Histogram, PERCENTILE_HISTOGRAM_BUCKETS, is_infinite_f32};

/// Single-pass descriptive statistics over a float array, with approximate
/// order statistics backed by internal percentile histograms.
///
/// `update` makes exactly two linear passes over the data and never sorts:
/// the first pass classifies every value (NaN / ±inf / zero / positive /
/// negative), accumulates the sum, tracks extremes, and siphons positive,
/// negative, and absolute values into side arrays; the second pass
/// accumulates squared deviations from the mean. The side arrays feed three
/// fixed-bucket histograms so percentile queries stay cheap even for
/// multi-million-element maps.
///
/// Zero comparison is exact bit equality (negative zero compares equal):
/// data can carry meaningful near-zero values, so no epsilon is applied.
/// Infinity detection uses `v * 2.0 == v`, which holds only for ±inf among
/// nonzero values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FastStatistics {
    /// Count of finite values greater than zero
    pub pos_count: i64,
    /// Count of exact-zero values
    pub zero_count: i64,
    /// Count of finite values less than zero
    pub neg_count: i64,
    /// Count of +inf values
    pub inf_count: i64,
    /// Count of -inf values
    pub neg_inf_count: i64,
    /// Count of NaN values
    pub nan_count: i64,
    /// Count of finite nonzero values (for absolute-value percentiles)
    pub abs_count: i64,
    /// Mean of the finite values (zeros included)
    pub mean: f32,
    /// Population standard deviation: `sqrt(ss / n)`
    pub std_dev_population: f32,
    /// Sample standard deviation: `sqrt(ss / (n - 1))`, zero when `n <= 1`
    pub std_dev_sample: f32,
    /// Most negative finite value (0.0 when there are no negatives)
    pub most_neg: f32,
    /// Negative finite value closest to zero (0.0 when there are no negatives)
    pub least_neg: f32,
    /// Positive finite value closest to zero (0.0 when there are no positives)
    pub least_pos: f32,
    /// Most positive finite value (0.0 when there are no positives)
    pub most_pos: f32,
    /// Smallest absolute finite nonzero value
    pub least_abs: f32,
    /// Largest absolute finite nonzero value
    pub most_abs: f32,
    /// Minimum over the finite values
    pub min: f32,
    /// Maximum over the finite values
    pub max: f32,
    neg_percent_hist: Histogram,
    pos_percent_hist: Histogram,
    abs_percent_hist: Histogram,
}

impl FastStatistics {
    #[must_use]
    pub fn new() -> Self {
        let mut statistics = Self::default();
        statistics.reset();
        statistics
    }

    /// Build statistics for `data` in one shot
    #[must_use]
    pub fn from_data(data: &[f32]) -> Self {
        let mut statistics = Self::new();
        statistics.update(data);
        statistics
    }

    fn reset(&mut self) {
        self.pos_count = 0;
        self.zero_count = 0;
        self.neg_count = 0;
        self.inf_count = 0;
        self.neg_inf_count = 0;
        self.nan_count = 0;
        self.abs_count = 0;
        self.mean = 0.0;
        self.std_dev_population = 0.0;
        self.std_dev_sample = 0.0;
        self.most_neg = 0.0;
        self.least_neg = -f32::MAX;
        self.least_pos = f32::MAX;
        self.most_pos = 0.0;
        self.least_abs = f32::MAX;
        self.most_abs = 0.0;
        self.min = 0.0;
        self.max = 0.0;
    }

    /// Rebuild all aggregates and percentile histograms from `data`.
    ///
    /// Two linear passes; NaN and ±inf are counted but excluded from the
    /// sum, extremes, and deviation accumulation. A dataset with no finite
    /// values produces the degenerate result (all counts of interest zero,
    /// mean/min/max 0.0) rather than an error.
    pub fn update(&mut self, data: &[f32]) {
        self.reset();
        let mut positives: Vec<f32> = Vec::with_capacity(data.len());
        let mut negatives: Vec<f32> = Vec::with_capacity(data.len());
        let mut absolutes: Vec<f32> = Vec::with_capacity(data.len());
        let mut sum = 0.0f64;
        let mut first = true;
        for &value in data {
            if value.is_nan() {
                self.nan_count += 1;
                continue;
            }
            if value == 0.0 {
                self.zero_count += 1;
            } else if value < 0.0 {
                if value * 2.0 == value {
                    self.neg_inf_count += 1;
                    continue;
                }
                negatives.push(value);
                self.neg_count += 1;
                if value > self.least_neg {
                    self.least_neg = value;
                }
                if value < self.most_neg {
                    self.most_neg = value;
                }
                let absolute = -value;
                absolutes.push(absolute);
                if absolute > self.most_abs {
                    self.most_abs = absolute;
                }
                if absolute < self.least_abs {
                    self.least_abs = absolute;
                }
                self.abs_count += 1;
            } else {
                if value * 2.0 == value {
                    self.inf_count += 1;
                    continue;
                }
                positives.push(value);
                self.pos_count += 1;
                if value > self.most_pos {
                    self.most_pos = value;
                }
                if value < self.least_pos {
                    self.least_pos = value;
                }
                absolutes.push(value);
                if value > self.most_abs {
                    self.most_abs = value;
                }
                if value < self.least_abs {
                    self.least_abs = value;
                }
                self.abs_count += 1;
            }
            if first || value > self.max {
                self.max = value;
            }
            if first || value < self.min {
                self.min = value;
            }
            // two-pass method for numerical stability: only the mean this pass
            sum += f64::from(value);
            first = false;
        }

        self.finish_update(data, sum, &positives, &negatives, &absolutes);
    }

    /// Rebuild aggregates admitting only finite values in
    /// `[min_inclusive, max_inclusive]`.
    ///
    /// Infinities and NaN are counted regardless of the range; finite values
    /// outside it are skipped entirely. Used for threshold-restricted
    /// statistics, computed into a scratch instance so the unrestricted
    /// cached statistics are never disturbed.
    pub fn update_limited(&mut self, data: &[f32], min_inclusive: f32, max_inclusive: f32) {
        self.reset();
        let mut positives: Vec<f32> = Vec::with_capacity(data.len());
        let mut negatives: Vec<f32> = Vec::with_capacity(data.len());
        let mut absolutes: Vec<f32> = Vec::with_capacity(data.len());
        let mut sum = 0.0f64;
        let mut first = true;
        for &value in data {
            if value.is_nan() {
                self.nan_count += 1;
                continue;
            }
            if is_infinite_f32(value) {
                if value < 0.0 {
                    self.neg_inf_count += 1;
                } else {
                    self.inf_count += 1;
                }
                continue;
            }
            if value < min_inclusive || value > max_inclusive {
                continue;
            }
            if value == 0.0 {
                self.zero_count += 1;
            } else if value < 0.0 {
                negatives.push(value);
                self.neg_count += 1;
                if value > self.least_neg {
                    self.least_neg = value;
                }
                if value < self.most_neg {
                    self.most_neg = value;
                }
                absolutes.push(-value);
                self.abs_count += 1;
            } else {
                positives.push(value);
                self.pos_count += 1;
                if value > self.most_pos {
                    self.most_pos = value;
                }
                if value < self.least_pos {
                    self.least_pos = value;
                }
                absolutes.push(value);
                self.abs_count += 1;
            }
            if first || value > self.max {
                self.max = value;
            }
            if first || value < self.min {
                self.min = value;
            }
            sum += f64::from(value);
            first = false;
        }

        self.finish_update(data, sum, &positives, &negatives, &absolutes);
    }

    fn finish_update(
        &mut self,
        data: &[f32],
        sum: f64,
        positives: &[f32],
        negatives: &[f32],
        absolutes: &[f32],
    ) {
        let total_good = self.neg_count + self.zero_count + self.pos_count;
        if total_good > 0 {
            self.mean = (sum / total_good as f64) as f32;
        } else {
            debug!("statistics computed over zero finite values; degenerate result");
            self.mean = 0.0;
        }

        let mut sum_squares = 0.0f64;
        for &value in data {
            if value.is_nan() {
                continue;
            }
            if value < -1.0 && value * 2.0 == value {
                continue;
            }
            if value > 1.0 && value * 2.0 == value {
                continue;
            }
            let deviation = value - self.mean;
            sum_squares += f64::from(deviation) * f64::from(deviation);
        }
        if total_good > 0 {
            self.std_dev_population = (sum_squares / total_good as f64).sqrt() as f32;
            if total_good > 1 {
                self.std_dev_sample = (sum_squares / (total_good - 1) as f64).sqrt() as f32;
            }
        }

        let bucket_count = PERCENTILE_HISTOGRAM_BUCKETS.min(data.len());
        self.neg_percent_hist.update(bucket_count, negatives);
        self.pos_percent_hist.update(bucket_count, positives);
        self.abs_percent_hist.update(bucket_count, absolutes);

        if self.neg_count <= 0 {
            self.least_neg = 0.0;
            self.most_neg = 0.0;
        }
        if self.pos_count <= 0 {
            self.least_pos = 0.0;
            self.most_pos = 0.0;
        }
        if self.abs_count <= 0 {
            self.least_abs = 0.0;
            self.most_abs = 0.0;
        }
    }

    /// Approximate value at the given percentile (0..=100) of the positive
    /// values.
    #[must_use]
    pub fn approx_positive_percentile(&self, percent: f32) -> f32 {
        let rank = percent / 100.0 * self.pos_count as f32;
        if rank <= 0.0 {
            return self.least_pos;
        }
        if rank >= self.pos_count as f32 {
            return self.most_pos;
        }
        Self::interpolate_rank(&self.pos_percent_hist, rank, self.most_pos)
    }

    /// Approximate value at the given percentile (0..=100) of the negative
    /// values, counted by magnitude from zero: 90 means 90 percent of the
    /// negative values lie between the result and zero.
    #[must_use]
    pub fn approx_negative_percentile(&self, percent: f32) -> f32 {
        let mut rank = percent / 100.0 * self.neg_count as f32;
        // negatives run the other direction; the histogram is strictly
        // directional towards positive
        rank = self.neg_count as f32 - rank;
        if rank <= 0.0 {
            return self.most_neg;
        }
        if rank >= self.neg_count as f32 {
            return self.least_neg;
        }
        Self::interpolate_rank(&self.neg_percent_hist, rank, self.most_pos)
    }

    /// Approximate value at the given percentile (0..=100) of the absolute
    /// values of the finite nonzero data.
    #[must_use]
    pub fn approx_absolute_percentile(&self, percent: f32) -> f32 {
        let rank = percent / 100.0 * self.abs_count as f32;
        if rank <= 0.0 {
            return self.least_abs;
        }
        if rank >= self.abs_count as f32 {
            return self.most_abs;
        }
        Self::interpolate_rank(&self.abs_percent_hist, rank, self.most_abs)
    }

    /// Approximate median of the finite values, zeros included.
    ///
    /// When the zero count exceeds the positive/negative imbalance the
    /// median is exactly zero; otherwise the rank is rescaled by the
    /// imbalance and resolved through the negative-percentile query.
    #[must_use]
    pub fn approximate_median(&self) -> f32 {
        let total_good = self.neg_count + self.zero_count + self.pos_count;
        if self.neg_count > self.pos_count {
            if self.zero_count > (self.neg_count - self.pos_count) {
                0.0
            } else {
                self.approx_negative_percentile(
                    (self.neg_count - self.pos_count - self.zero_count) as f32 * 50.0
                        / total_good as f32,
                )
            }
        } else if self.zero_count > (self.pos_count - self.neg_count) {
            0.0
        } else {
            self.approx_negative_percentile(
                (self.pos_count - self.neg_count - self.zero_count) as f32 * 50.0
                    / total_good as f32,
            )
        }
    }

    /// Percent of positive values at or below `value`
    #[must_use]
    pub fn positive_value_percentile(&self, value: f32) -> f32 {
        Self::value_percentile(&self.pos_percent_hist, self.pos_count as f32, false, value)
    }

    /// Percent of negative values at or beyond (more negative than) `value`
    #[must_use]
    pub fn negative_value_percentile(&self, value: f32) -> f32 {
        Self::value_percentile(&self.neg_percent_hist, self.neg_count as f32, true, value)
    }

    /// Percent of absolute values at or below `|value|`
    #[must_use]
    pub fn absolute_value_percentile(&self, value: f32) -> f32 {
        Self::value_percentile(
            &self.abs_percent_hist,
            self.abs_count as f32,
            false,
            value.abs(),
        )
    }

    /// Bisect the cumulative counts for the bucket bracketing `rank`, then
    /// interpolate linearly within that bucket's value range.
    ///
    /// When the bucket immediately left of the bracketing bucket collected
    /// zero values, the interpolation window is widened leftward across the
    /// whole empty run until a nonzero-count bucket is found. This keeps the
    /// percentile curve continuous instead of snapping to the edge of an
    /// empty bin; downstream consumers depend on the exact shape of this
    /// interpolation.
    fn interpolate_rank(histogram: &Histogram, rank: f32, overflow_value: f32) -> f32 {
        let (hist_min, hist_max) = histogram.range();
        let cumulative = histogram.cumulative_counts();
        let bucket_count = cumulative.len() as isize;
        // bisection search; "index" -1 is implicitly valued zero
        let mut low_bound: isize = -1;
        let mut high_bound: isize = bucket_count;
        while high_bound - low_bound > 1 {
            let guess = (low_bound + high_bound) / 2;
            if cumulative[guess as usize] as f32 <= rank {
                low_bound = guess;
            } else {
                high_bound = guess;
            }
        }
        if high_bound == bucket_count {
            // the count mismatched the histogram somehow
            return overflow_value;
        }
        let bucket_size = (hist_max - hist_min) / bucket_count as f32;
        let mut cur_upper = cumulative[high_bound as usize];
        let mut cur_lower = if low_bound > -1 {
            cumulative[low_bound as usize]
        } else {
            0
        };
        if high_bound > 0
            && ((high_bound == 1 && cumulative[0] == 0)
                || (high_bound > 1
                    && cumulative[(high_bound - 1) as usize]
                        == cumulative[(high_bound - 2) as usize]))
        {
            if rank - cur_lower as f32 >= 1.0 {
                // start the low end one higher, continuous with the widening below
                cur_lower += 1;
            } else {
                // the interpolated rank falls left of the bracketing bucket
                high_bound -= 1;
                low_bound -= 1;
                // one added to the right end of the flat spot gives it nonzero slope
                cur_upper = cur_lower + 1;
                while low_bound > 0
                    && cumulative[high_bound as usize] == cumulative[(low_bound - 1) as usize]
                {
                    // slide the left boundary over the flat spot
                    low_bound -= 1;
                }
                if low_bound == 0 && cumulative[0] == 0 {
                    low_bound -= 1;
                }
                cur_lower = if low_bound > -1 {
                    cumulative[low_bound as usize]
                } else {
                    0
                };
            }
        }
        let low_value = hist_min + (low_bound + 1) as f32 * bucket_size;
        let high_value = hist_min + (high_bound + 1) as f32 * bucket_size;
        low_value + (high_value - low_value) * (rank - cur_lower as f32)
            / (cur_upper - cur_lower) as f32
    }

    fn value_percentile(
        histogram: &Histogram,
        value_count: f32,
        negative_data: bool,
        value: f32,
    ) -> f32 {
        let cumulative = histogram.cumulative_counts();
        if value_count <= 0.0 || cumulative.is_empty() {
            return 0.0;
        }
        let (min_value, max_value) = histogram.range();
        if value < min_value {
            return if negative_data { 100.0 } else { 0.0 };
        }
        if value > max_value {
            return if negative_data { 0.0 } else { 100.0 };
        }
        let histogram_range = max_value - min_value;
        if histogram_range <= 0.0 {
            return 0.0;
        }
        let bucket_count = cumulative.len();
        let mut bucket_index = (((value - min_value) / histogram_range) * bucket_count as f32) as isize;
        if bucket_index < 0 {
            bucket_index = 0;
        } else if bucket_index >= bucket_count as isize {
            bucket_index = bucket_count as isize - 1;
        }
        let mut cumulative_value = cumulative[bucket_index as usize] as f32;
        if negative_data {
            cumulative_value = (cumulative[bucket_count - 1] - cumulative[bucket_index as usize]) as f32;
        }
        (cumulative_value / value_count) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_and_special_value_classification() {
        let data = [
            0.0,
            -0.0,
            1.0,
            -1.0,
            f32::NAN,
            f32::INFINITY,
            f32::NEG_INFINITY,
        ];
        let stats = FastStatistics::from_data(&data);

        assert_eq!(stats.zero_count, 2);
        assert_eq!(stats.pos_count, 1);
        assert_eq!(stats.neg_count, 1);
        assert_eq!(stats.nan_count, 1);
        assert_eq!(stats.inf_count, 1);
        assert_eq!(stats.neg_inf_count, 1);
        // mean over the four finite values 0, -0, 1, -1
        assert_relative_eq!(stats.mean, 0.0);
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 1.0);
    }

    #[test]
    fn simple_known_statistics() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = FastStatistics::from_data(&data);

        assert_relative_eq!(stats.mean, 3.0);
        assert_relative_eq!(stats.std_dev_population, 2.0f32.sqrt(), epsilon = 1e-6);
        assert_relative_eq!(stats.std_dev_sample, 2.5f32.sqrt(), epsilon = 1e-6);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.least_pos, 1.0);
        assert_eq!(stats.most_pos, 5.0);
    }

    #[test]
    fn all_nan_is_degenerate_not_a_crash() {
        let data = [f32::NAN; 16];
        let stats = FastStatistics::from_data(&data);

        assert_eq!(stats.nan_count, 16);
        assert_eq!(stats.pos_count + stats.neg_count + stats.zero_count, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std_dev_population, 0.0);
        assert_eq!(stats.approx_positive_percentile(50.0), 0.0);
    }

    #[test]
    fn median_is_exact_zero_when_zeros_dominate() {
        let data = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, -1.0];
        let stats = FastStatistics::from_data(&data);
        assert_eq!(stats.approximate_median(), 0.0);
    }

    #[test]
    fn percentile_widens_across_empty_buckets() {
        // five values in the first bucket and one in the last leave a flat
        // cumulative run; the interpolation window must widen leftward
        // instead of answering from inside an empty bin
        let data = [1.0, 1.0, 1.0, 1.0, 1.0, 10.0];
        let stats = FastStatistics::from_data(&data);

        // six buckets over [1, 10]: counts [5, 0, 0, 0, 0, 1],
        // cumulative [5, 5, 5, 5, 5, 6]; rank 5.4 lands in the final bucket
        // with a flat run to its left, widened back to the first bucket
        let p90 = stats.approx_positive_percentile(90.0);
        assert_relative_eq!(p90, 4.9, epsilon = 1e-5);
    }

    #[test]
    fn restricted_update_skips_out_of_range_values() {
        let data = [-10.0, -1.0, 0.0, 2.0, 3.0, 50.0, f32::NAN, f32::INFINITY];
        let mut stats = FastStatistics::new();
        stats.update_limited(&data, -1.0, 3.0);

        assert_eq!(stats.neg_count, 1);
        assert_eq!(stats.zero_count, 1);
        assert_eq!(stats.pos_count, 2);
        // specials are counted regardless of the range
        assert_eq!(stats.nan_count, 1);
        assert_eq!(stats.inf_count, 1);
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 3.0);
        assert_relative_eq!(stats.mean, 1.0);
    }

    #[test]
    fn value_percentile_round_trip() {
        let data: Vec<f32> = (1..=1000).map(|i| i as f32).collect();
        let stats = FastStatistics::from_data(&data);

        let p90_value = stats.approx_positive_percentile(90.0);
        let recovered = stats.positive_value_percentile(p90_value);
        assert!((recovered - 90.0).abs() < 1.0, "recovered {recovered}");
    }
}
