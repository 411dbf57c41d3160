use std::sync::Arc;

use brainmap_stats::{FastStatistics, Histogram, ValueRangeFilter};
use tracing::{debug, warn};

use crate::coloring;
use crate::label_table::LabelTable;
use crate::map::MapDataKind;
use crate::palette::PaletteColorMapping;

/// Bucket count for per-map display histograms
pub const MAP_HISTOGRAM_BUCKETS: usize = 100;

/// What drives a map's coloring: a shared palette mapping for scalar maps,
/// an owned label table for label maps
#[derive(Debug, Clone)]
enum ColoringSource {
    Palette(Arc<PaletteColorMapping>),
    LabelTable(LabelTable),
}

/// Per-map cached derived state: raw data plus lazily computed statistics,
/// histogram, and RGBA coloring.
///
/// Each cached product is either absent (never computed, or invalidated) or
/// present and current; an accessor invoked while the product is absent
/// computes it synchronously before returning. First access therefore pays
/// the full computation cost — a deliberate contract, not an implementation
/// detail, since a multi-million-value map can take visible time.
///
/// Invalidation is precise and per-map:
/// - replacing the raw data invalidates statistics, histogram, and coloring
/// - replacing the palette mapping or touching the label table invalidates
///   coloring only
/// - nothing here ever invalidates a sibling map's products
///
/// Threshold-restricted statistics/histograms are computed fresh on every
/// call and never stored, so they cannot corrupt the unrestricted cache.
#[derive(Debug, Clone)]
pub struct MapContent {
    data: Vec<f32>,
    rgba: Vec<f32>,
    rgba_valid: bool,
    statistics: Option<FastStatistics>,
    histogram: Option<Histogram>,
    source: ColoringSource,
}

impl MapContent {
    pub(crate) fn new_scalar(data: Vec<f32>, mapping: Arc<PaletteColorMapping>) -> Self {
        Self {
            data,
            rgba: Vec::new(),
            rgba_valid: false,
            statistics: None,
            histogram: None,
            source: ColoringSource::Palette(mapping),
        }
    }

    pub(crate) fn new_label(data: Vec<f32>, table: LabelTable) -> Self {
        Self {
            data,
            rgba: Vec::new(),
            rgba_valid: false,
            statistics: None,
            histogram: None,
            source: ColoringSource::LabelTable(table),
        }
    }

    #[must_use]
    pub fn kind(&self) -> MapDataKind {
        match self.source {
            ColoringSource::Palette(_) => MapDataKind::Scalar,
            ColoringSource::LabelTable(_) => MapDataKind::Label,
        }
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn value(&self, offset: usize) -> Option<f32> {
        self.data.get(offset).copied()
    }

    /// Replace the raw data; every cached product becomes stale
    pub(crate) fn set_data(&mut self, data: Vec<f32>) {
        debug!(values = data.len(), "map data replaced; caches invalidated");
        self.data = data;
        self.statistics = None;
        self.histogram = None;
        self.rgba_valid = false;
    }

    /// Statistics over the raw data, computed on first access
    pub fn statistics(&mut self) -> &FastStatistics {
        let data = &self.data;
        self.statistics.get_or_insert_with(|| {
            debug!(values = data.len(), "computing map statistics");
            FastStatistics::from_data(data)
        })
    }

    /// Display histogram over the raw data, computed on first access
    pub fn histogram(&mut self) -> &Histogram {
        let data = &self.data;
        self.histogram.get_or_insert_with(|| {
            debug!(values = data.len(), "computing map histogram");
            let mut histogram = Histogram::new();
            histogram.update(MAP_HISTOGRAM_BUCKETS, data);
            histogram
        })
    }

    /// Threshold-restricted statistics; fresh every call, never cached
    #[must_use]
    pub fn statistics_limited(&self, min_inclusive: f32, max_inclusive: f32) -> FastStatistics {
        let mut statistics = FastStatistics::new();
        statistics.update_limited(&self.data, min_inclusive, max_inclusive);
        statistics
    }

    /// Range-restricted histogram; fresh every call, never cached
    #[must_use]
    pub fn histogram_limited(&self, bucket_count: usize, filter: ValueRangeFilter) -> Histogram {
        let mut histogram = Histogram::new();
        histogram.update_limited(bucket_count, &self.data, filter);
        histogram
    }

    /// Whether the RGBA buffer is current (false before first coloring and
    /// after any invalidating change)
    #[must_use]
    pub fn coloring_valid(&self) -> bool {
        self.rgba_valid
    }

    pub fn invalidate_coloring(&mut self) {
        self.rgba_valid = false;
    }

    /// The RGBA buffer (4 floats per value), recomputed first if stale
    pub fn rgba(&mut self) -> &[f32] {
        if !self.rgba_valid {
            self.update_coloring();
        }
        &self.rgba
    }

    /// Recompute the RGBA buffer from the current data and coloring source.
    ///
    /// Scalar maps fetch (computing if needed) their statistics first:
    /// palette auto-scaling reads the statistical range, so coloring against
    /// stale statistics is never permitted.
    pub fn update_coloring(&mut self) {
        if matches!(self.source, ColoringSource::Palette(_)) {
            self.statistics();
        }
        match &self.source {
            ColoringSource::Palette(mapping) => {
                if let Some(statistics) = self.statistics.as_ref() {
                    coloring::color_scalars_with_palette(
                        &self.data,
                        statistics,
                        mapping,
                        &mut self.rgba,
                    );
                }
            }
            ColoringSource::LabelTable(table) => {
                coloring::color_labels_with_table(&self.data, table, &mut self.rgba);
            }
        }
        self.rgba_valid = true;
    }

    #[must_use]
    pub fn palette_color_mapping(&self) -> Option<&Arc<PaletteColorMapping>> {
        match &self.source {
            ColoringSource::Palette(mapping) => Some(mapping),
            ColoringSource::LabelTable(_) => None,
        }
    }

    /// Replace the shared palette mapping; invalidates this map's coloring.
    /// A label map has no palette: the call is a defensive no-op.
    pub(crate) fn set_palette_color_mapping(&mut self, mapping: Arc<PaletteColorMapping>) {
        match &mut self.source {
            ColoringSource::Palette(current) => {
                *current = mapping;
                self.rgba_valid = false;
            }
            ColoringSource::LabelTable(_) => {
                debug_assert!(false, "palette mapping set on a label map");
                warn!("palette mapping set on a label map; ignored");
            }
        }
    }

    #[must_use]
    pub fn label_table(&self) -> Option<&LabelTable> {
        match &self.source {
            ColoringSource::LabelTable(table) => Some(table),
            ColoringSource::Palette(_) => None,
        }
    }

    /// Mutable access to the label table. Conservatively invalidates the
    /// coloring, since any edit may change category colors.
    pub fn label_table_mut(&mut self) -> Option<&mut LabelTable> {
        match &mut self.source {
            ColoringSource::LabelTable(table) => {
                self.rgba_valid = false;
                Some(table)
            }
            ColoringSource::Palette(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_content(data: Vec<f32>) -> MapContent {
        MapContent::new_scalar(data, Arc::new(PaletteColorMapping::default()))
    }

    #[test]
    fn statistics_compute_once_and_invalidate_on_data_change() {
        let mut content = scalar_content(vec![1.0, 2.0, 3.0]);
        assert_eq!(content.statistics().mean, 2.0);

        content.set_data(vec![10.0, 20.0, 30.0]);
        // stale mean must not survive the mutation
        assert_eq!(content.statistics().mean, 20.0);
    }

    #[test]
    fn coloring_validity_tracks_invalidation() {
        let mut content = scalar_content(vec![0.5, -0.5, 1.0]);
        assert!(!content.coloring_valid());

        content.update_coloring();
        assert!(content.coloring_valid());

        content.set_palette_color_mapping(Arc::new(PaletteColorMapping::default()));
        assert!(!content.coloring_valid());

        let rgba_len = content.rgba().len();
        assert_eq!(rgba_len, 12);
        assert!(content.coloring_valid());
    }

    #[test]
    fn limited_statistics_do_not_corrupt_the_cache() {
        let mut content = scalar_content(vec![-5.0, 1.0, 2.0, 3.0, 50.0]);
        let unrestricted_mean = content.statistics().mean;

        let restricted = content.statistics_limited(1.0, 3.0);
        assert_eq!(restricted.mean, 2.0);
        // the cached unrestricted statistics are untouched
        assert_eq!(content.statistics().mean, unrestricted_mean);
    }

    #[test]
    fn label_table_access_invalidates_coloring() {
        let mut table = LabelTable::new();
        table.insert(1, "area-1", [1.0, 0.0, 0.0, 1.0]);
        let mut content = MapContent::new_label(vec![0.0, 1.0], table);

        content.update_coloring();
        assert!(content.coloring_valid());

        content
            .label_table_mut()
            .expect("label map")
            .insert(2, "area-2", [0.0, 1.0, 0.0, 1.0]);
        assert!(!content.coloring_valid());
    }
}
