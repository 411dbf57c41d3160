pub use fast_statistics::FastStatistics;
pub use histogram::{Histogram, ValueRangeFilter};

pub mod fast_statistics;
pub mod histogram;

/// Number of buckets used by the internal percentile histograms.
/// Large enough to approximate percentiles closely while costing only
/// tens of kilobytes per histogram.
pub const PERCENTILE_HISTOGRAM_BUCKETS: usize = 10_000;

/// Portable infinity test: IEEE754 infinities are the only values for which
/// doubling the value returns the value itself (other than zero, which is
/// classified before this test is applied).
#[inline]
#[must_use]
pub fn is_infinite_f32(value: f32) -> bool {
    value * 2.0 == value && value != 0.0
}
