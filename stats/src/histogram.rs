use serde::{Deserialize, Serialize};

use crate::is_infinite_f32;

/// Restricts which values participate in a histogram rebuild.
///
/// Bounds are inclusive on both ends. Zeros get their own switch because
/// brain maps are frequently zero-filled outside the region of interest,
/// and including those zeros would swamp the interesting buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRangeFilter {
    /// Least value admitted into the buckets (inclusive)
    pub low: f32,
    /// Greatest value admitted into the buckets (inclusive)
    pub high: f32,
    /// Whether exact-zero values are admitted
    pub include_zero: bool,
}

impl ValueRangeFilter {
    /// Filter admitting `[low, high]` with zeros included
    #[must_use]
    pub fn new(low: f32, high: f32) -> Self {
        Self {
            low,
            high,
            include_zero: true,
        }
    }

    /// Filter admitting `[low, high]` with zeros skipped
    #[must_use]
    pub fn excluding_zero(low: f32, high: f32) -> Self {
        Self {
            low,
            high,
            include_zero: false,
        }
    }
}

/// Bucketed frequency counter over a float array.
///
/// A histogram is rebuilt wholesale by [`Histogram::update`] (or the
/// range-restricted [`Histogram::update_limited`]); it is never mutated
/// incrementally. NaN is always skipped and counted, infinities are counted
/// separately and excluded from bucketing, and every remaining finite value
/// lands in one of `bucket_count` equal-width bins spanning the min/max of
/// the included values.
///
/// Conservation invariant for the unrestricted update:
/// `sum(counts) + inf_count + neg_inf_count + nan_count == data.len()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Histogram {
    counts: Vec<i64>,
    cumulative: Vec<i64>,
    display: Vec<f32>,
    range_min: f32,
    range_max: f32,
    /// Count of finite values greater than zero (bucketed)
    pub pos_count: i64,
    /// Count of exact-zero values (negative zero included; bucketed)
    pub zero_count: i64,
    /// Count of finite values less than zero (bucketed)
    pub neg_count: i64,
    /// Count of +inf values (not bucketed)
    pub inf_count: i64,
    /// Count of -inf values (not bucketed)
    pub neg_inf_count: i64,
    /// Count of NaN values (not bucketed)
    pub nan_count: i64,
}

impl Histogram {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the buckets from `data`, admitting every finite value.
    pub fn update(&mut self, bucket_count: usize, data: &[f32]) {
        self.rebuild(bucket_count, data, None);
    }

    /// Rebuild the buckets from `data`, admitting only values passing `filter`.
    ///
    /// Infinities and NaN are counted before the range test is applied, so
    /// their counters are unaffected by the filter; finite values outside
    /// the filter are skipped entirely (they appear in no counter).
    pub fn update_limited(&mut self, bucket_count: usize, data: &[f32], filter: ValueRangeFilter) {
        self.rebuild(bucket_count, data, Some(filter));
    }

    fn rebuild(&mut self, bucket_count: usize, data: &[f32], filter: Option<ValueRangeFilter>) {
        self.reset();

        let mut included: Vec<f32> = Vec::with_capacity(data.len());
        let mut min = 0.0f32;
        let mut max = 0.0f32;
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
            if let Some(filter) = filter {
                if value < filter.low || value > filter.high {
                    continue;
                }
                if value == 0.0 && !filter.include_zero {
                    continue;
                }
            }
            if value == 0.0 {
                self.zero_count += 1;
            } else if value < 0.0 {
                self.neg_count += 1;
            } else {
                self.pos_count += 1;
            }
            if first || value < min {
                min = value;
            }
            if first || value > max {
                max = value;
            }
            first = false;
            included.push(value);
        }

        self.counts = vec![0; bucket_count];
        self.cumulative = vec![0; bucket_count];
        self.display = vec![0.0; bucket_count];
        if included.is_empty() || bucket_count == 0 {
            return;
        }

        self.range_min = min;
        self.range_max = max;
        let span = max - min;
        if span > 0.0 {
            let scale = bucket_count as f32;
            for &value in &included {
                let mut index = (((value - min) / span) * scale) as usize;
                if index >= bucket_count {
                    index = bucket_count - 1;
                }
                self.counts[index] += 1;
            }
        } else {
            // degenerate range: every included value is identical
            self.counts[0] = included.len() as i64;
        }

        let mut running = 0i64;
        for (cumulative, &count) in self.cumulative.iter_mut().zip(self.counts.iter()) {
            running += count;
            *cumulative = running;
        }

        let bin_width = span / bucket_count as f32;
        if bin_width > 0.0 {
            for (display, &count) in self.display.iter_mut().zip(self.counts.iter()) {
                *display = count as f32 / bin_width;
            }
        }
    }

    fn reset(&mut self) {
        self.counts.clear();
        self.cumulative.clear();
        self.display.clear();
        self.range_min = 0.0;
        self.range_max = 0.0;
        self.pos_count = 0;
        self.zero_count = 0;
        self.neg_count = 0;
        self.inf_count = 0;
        self.neg_inf_count = 0;
        self.nan_count = 0;
    }

    /// Per-bucket value counts
    #[must_use]
    pub fn counts(&self) -> &[i64] {
        &self.counts
    }

    /// Prefix sums of the bucket counts; monotone non-decreasing, and the
    /// last entry equals the total bucketed count. Used for binary-search
    /// order-statistic queries.
    #[must_use]
    pub fn cumulative_counts(&self) -> &[i64] {
        &self.cumulative
    }

    /// Density heights: `counts[i] / bin_width`. Unlike raw counts these are
    /// stable across different bucket counts over the same data, which is
    /// what rendering consumers require.
    #[must_use]
    pub fn display_heights(&self) -> &[f32] {
        &self.display
    }

    /// Value range `(min, max)` of the included values; `(0.0, 0.0)` when
    /// nothing was included.
    #[must_use]
    pub fn range(&self) -> (f32, f32) {
        (self.range_min, self.range_max)
    }

    /// Total number of values that landed in a bucket
    #[must_use]
    pub fn bucketed_count(&self) -> i64 {
        self.cumulative.last().copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_conservation_with_special_values() {
        let data = [
            1.0,
            -2.5,
            0.0,
            -0.0,
            f32::NAN,
            f32::INFINITY,
            f32::NEG_INFINITY,
            3.5,
            7.25,
        ];
        let mut histogram = Histogram::new();
        histogram.update(4, &data);

        let bucketed: i64 = histogram.counts().iter().sum();
        assert_eq!(
            bucketed + histogram.inf_count + histogram.neg_inf_count + histogram.nan_count,
            data.len() as i64
        );
        assert_eq!(histogram.zero_count, 2);
        assert_eq!(histogram.neg_count, 1);
        assert_eq!(histogram.pos_count, 3);
    }

    #[test]
    fn cumulative_counts_are_monotone() {
        let data = [5.0, 1.0, 3.0, 3.0, 2.0, 4.0, 4.5, 0.5];
        let mut histogram = Histogram::new();
        histogram.update(5, &data);

        let cumulative = histogram.cumulative_counts();
        for pair in cumulative.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(
            *cumulative.last().unwrap(),
            histogram.counts().iter().sum::<i64>()
        );
    }

    #[test]
    fn empty_input_is_degenerate_not_a_crash() {
        let mut histogram = Histogram::new();
        histogram.update(100, &[]);

        assert!(histogram.counts().iter().all(|&c| c == 0));
        assert_eq!(histogram.range(), (0.0, 0.0));
        assert_eq!(histogram.bucketed_count(), 0);
    }

    #[test]
    fn identical_values_land_in_one_bucket() {
        let data = [4.0; 7];
        let mut histogram = Histogram::new();
        histogram.update(10, &data);

        assert_eq!(histogram.counts()[0], 7);
        assert_eq!(histogram.range(), (4.0, 4.0));
        // degenerate bin width must not divide by zero
        assert!(histogram.display_heights().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn display_heights_are_density() {
        let data = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let mut histogram = Histogram::new();
        histogram.update(4, &data);

        let bin_width = 7.0 / 4.0;
        for (&height, &count) in histogram
            .display_heights()
            .iter()
            .zip(histogram.counts().iter())
        {
            assert!((height - count as f32 / bin_width).abs() < 1e-6);
        }
    }

    #[test]
    fn range_filter_restricts_bucketing() {
        let data = [-5.0, -1.0, 0.0, 1.0, 2.0, 5.0, f32::INFINITY];
        let mut histogram = Histogram::new();
        histogram.update_limited(4, &data, ValueRangeFilter::excluding_zero(-1.0, 2.0));

        // -5.0, 5.0, and the zero are all skipped; the infinity is still counted
        assert_eq!(histogram.counts().iter().sum::<i64>(), 3);
        assert_eq!(histogram.zero_count, 0);
        assert_eq!(histogram.inf_count, 1);
        assert_eq!(histogram.range(), (-1.0, 2.0));
    }

    #[test]
    fn values_at_range_max_land_in_last_bucket() {
        let data = [0.0, 10.0];
        let mut histogram = Histogram::new();
        histogram.update(5, &data);

        assert_eq!(histogram.counts()[0], 1);
        assert_eq!(histogram.counts()[4], 1);
    }
}
