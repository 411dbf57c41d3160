use std::sync::Arc;

use brainmap_stats::{FastStatistics, Histogram, ValueRangeFilter};

use crate::brainordinate::BrainordinateKey;
use crate::composite::CompositeVolumeFile;
use crate::dense::DenseBrainordinateFile;
use crate::error::Result;
use crate::map::{MapInfo, MapMetadata};
use crate::matrix::ParcelMatrixFile;
use crate::palette::PaletteColorMapping;
use crate::volume::VolumetricFile;

/// Capability interface shared by every mappable file variant: map access,
/// palette/label-table coloring, and brainordinate-addressed value lookup.
///
/// Accessors that can fail for routine reasons (no data at a brainordinate,
/// label query on a scalar file) answer `None`. Statistics, histogram, and
/// RGBA accessors take `&mut self` because they fill the per-map cache on
/// first access — callers perceive a query, but the first call per map pays
/// the computation cost inline.
pub trait MappableDataFile {
    /// Short human-readable variant name, used in logs and error messages
    fn file_kind_name(&self) -> &'static str;

    fn number_of_maps(&self) -> usize;

    fn map_info(&self, index: usize) -> Option<&MapInfo>;

    fn map_info_mut(&mut self, index: usize) -> Option<&mut MapInfo>;

    /// Whether this file's maps are colored through a palette (scalar data).
    /// Mutually exclusive with [`Self::is_mapped_with_label_table`].
    fn is_mapped_with_palette(&self) -> bool;

    /// Whether this file's maps are colored through a label table
    /// (categorical data)
    fn is_mapped_with_label_table(&self) -> bool;

    /// Statistics for one map, computed through the per-map cache on first
    /// access
    fn map_statistics(&mut self, index: usize) -> Option<&FastStatistics>;

    /// Display histogram for one map, computed through the per-map cache on
    /// first access
    fn map_histogram(&mut self, index: usize) -> Option<&Histogram>;

    /// Threshold-restricted statistics, computed fresh; never touches the
    /// cached unrestricted statistics
    fn map_statistics_limited(
        &self,
        index: usize,
        min_inclusive: f32,
        max_inclusive: f32,
    ) -> Option<FastStatistics>;

    /// Range-restricted histogram, computed fresh; never touches the cached
    /// unrestricted histogram
    fn map_histogram_limited(
        &self,
        index: usize,
        bucket_count: usize,
        filter: ValueRangeFilter,
    ) -> Option<Histogram>;

    /// Value of one map at a brainordinate; `None` when the brainordinate
    /// carries no data in this file
    fn value_at(&self, key: &BrainordinateKey, map_index: usize) -> Option<f32>;

    /// Label name of one map's value at a brainordinate; `None` for
    /// palette-mapped files
    fn label_name_at(&self, key: &BrainordinateKey, map_index: usize) -> Option<&str> {
        let _ = (key, map_index);
        None
    }

    /// Recompute one map's RGBA buffer (statistics first, then colors)
    fn update_map_coloring(&mut self, index: usize);

    /// One map's RGBA buffer (4 floats per brainordinate), recomputed first
    /// if stale
    fn map_rgba(&mut self, index: usize) -> Option<&[f32]>;

    /// Replace one map's raw data. Invalidates that map's cached statistics,
    /// histogram, and coloring — and nothing belonging to any other map.
    ///
    /// # Errors
    /// Will return `Err` if the data length disagrees with the file's
    /// brainordinate count, or the variant does not support data replacement.
    fn set_map_data(&mut self, index: usize, data: Vec<f32>) -> Result<()>;

    /// Replace one map's shared palette mapping, invalidating that map's
    /// coloring only
    fn set_map_palette_color_mapping(&mut self, index: usize, mapping: Arc<PaletteColorMapping>);

    // ==================== PROVIDED CONVENIENCES ====================

    fn map_name(&self, index: usize) -> Option<&str> {
        self.map_info(index).map(|info| info.name.as_str())
    }

    fn set_map_name(&mut self, index: usize, name: &str) {
        if let Some(info) = self.map_info_mut(index) {
            info.name = name.to_string();
        }
    }

    fn map_metadata(&self, index: usize) -> Option<&MapMetadata> {
        self.map_info(index).map(|info| &info.metadata)
    }

    fn map_metadata_mut(&mut self, index: usize) -> Option<&mut MapMetadata> {
        self.map_info_mut(index).map(|info| &mut info.metadata)
    }

    fn map_unique_id(&self, index: usize) -> Option<&str> {
        self.map_info(index).map(MapInfo::unique_id)
    }
}

/// The closed set of mappable file variants.
///
/// Heterogeneous collections (the open files of one document) hold these;
/// cross-cutting consumers like the chart selector layer match on the
/// variant when an operation only some variants support is needed, and use
/// the [`MappableDataFile`] impl for everything else.
#[derive(Debug)]
pub enum MappableFile {
    Dense(DenseBrainordinateFile),
    ParcelMatrix(ParcelMatrixFile),
    Volume(VolumetricFile),
    CompositeVolume(CompositeVolumeFile),
}

macro_rules! delegate {
    ($self:ident, $file:ident => $body:expr) => {
        match $self {
            MappableFile::Dense($file) => $body,
            MappableFile::ParcelMatrix($file) => $body,
            MappableFile::Volume($file) => $body,
            MappableFile::CompositeVolume($file) => $body,
        }
    };
}

impl MappableDataFile for MappableFile {
    fn file_kind_name(&self) -> &'static str {
        delegate!(self, file => file.file_kind_name())
    }

    fn number_of_maps(&self) -> usize {
        delegate!(self, file => file.number_of_maps())
    }

    fn map_info(&self, index: usize) -> Option<&MapInfo> {
        delegate!(self, file => file.map_info(index))
    }

    fn map_info_mut(&mut self, index: usize) -> Option<&mut MapInfo> {
        delegate!(self, file => file.map_info_mut(index))
    }

    fn is_mapped_with_palette(&self) -> bool {
        delegate!(self, file => file.is_mapped_with_palette())
    }

    fn is_mapped_with_label_table(&self) -> bool {
        delegate!(self, file => file.is_mapped_with_label_table())
    }

    fn map_statistics(&mut self, index: usize) -> Option<&FastStatistics> {
        delegate!(self, file => file.map_statistics(index))
    }

    fn map_histogram(&mut self, index: usize) -> Option<&Histogram> {
        delegate!(self, file => file.map_histogram(index))
    }

    fn map_statistics_limited(
        &self,
        index: usize,
        min_inclusive: f32,
        max_inclusive: f32,
    ) -> Option<FastStatistics> {
        delegate!(self, file => file.map_statistics_limited(index, min_inclusive, max_inclusive))
    }

    fn map_histogram_limited(
        &self,
        index: usize,
        bucket_count: usize,
        filter: ValueRangeFilter,
    ) -> Option<Histogram> {
        delegate!(self, file => file.map_histogram_limited(index, bucket_count, filter))
    }

    fn value_at(&self, key: &BrainordinateKey, map_index: usize) -> Option<f32> {
        delegate!(self, file => file.value_at(key, map_index))
    }

    fn label_name_at(&self, key: &BrainordinateKey, map_index: usize) -> Option<&str> {
        delegate!(self, file => file.label_name_at(key, map_index))
    }

    fn update_map_coloring(&mut self, index: usize) {
        delegate!(self, file => file.update_map_coloring(index))
    }

    fn map_rgba(&mut self, index: usize) -> Option<&[f32]> {
        delegate!(self, file => file.map_rgba(index))
    }

    fn set_map_data(&mut self, index: usize, data: Vec<f32>) -> Result<()> {
        delegate!(self, file => file.set_map_data(index, data))
    }

    fn set_map_palette_color_mapping(&mut self, index: usize, mapping: Arc<PaletteColorMapping>) {
        delegate!(self, file => file.set_map_palette_color_mapping(index, mapping))
    }
}

impl MappableFile {
    #[must_use]
    pub fn as_dense(&self) -> Option<&DenseBrainordinateFile> {
        match self {
            MappableFile::Dense(file) => Some(file),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_parcel_matrix_mut(&mut self) -> Option<&mut ParcelMatrixFile> {
        match self {
            MappableFile::ParcelMatrix(file) => Some(file),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_volume(&self) -> Option<&VolumetricFile> {
        match self {
            MappableFile::Volume(file) => Some(file),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_composite(&self) -> Option<&CompositeVolumeFile> {
        match self {
            MappableFile::CompositeVolume(file) => Some(file),
            _ => None,
        }
    }
}
