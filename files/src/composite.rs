use std::sync::Arc;

use brainmap_stats::{FastStatistics, Histogram, ValueRangeFilter};
use tracing::debug;

use crate::brainordinate::BrainordinateKey;
use crate::error::{FileError, Result};
use crate::map::MapInfo;
use crate::mappable::MappableDataFile;
use crate::palette::PaletteColorMapping;
use crate::volume::{VolumeInterpolation, VolumetricFile};

/// Aggregate of independently loaded volumes presented as one file.
///
/// Constituents must agree on map count (validated when added); sharing a
/// spatial grid is typical but not required. A spatial query walks the
/// constituent list in insertion order and answers from the first volume
/// with a valid value at the coordinate — first match wins. Constituents
/// are assumed non-overlapping; behavior where they overlap is undefined.
///
/// Map names, statistics, and coloring delegate to the first constituent.
#[derive(Debug, Default)]
pub struct CompositeVolumeFile {
    volumes: Vec<VolumetricFile>,
}

impl CompositeVolumeFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constituent volume.
    ///
    /// # Errors
    /// Will return `Err` if the volume's map count disagrees with the
    /// constituents already present.
    pub fn add_volume(&mut self, volume: VolumetricFile) -> Result<()> {
        if let Some(first) = self.volumes.first() {
            if volume.number_of_maps() != first.number_of_maps() {
                return Err(FileError::structural_mismatch(
                    "constituent volume map count",
                    first.number_of_maps(),
                    volume.number_of_maps(),
                ));
            }
        }
        debug!(
            constituents = self.volumes.len() + 1,
            maps = volume.number_of_maps(),
            "volume added to composite"
        );
        self.volumes.push(volume);
        Ok(())
    }

    #[must_use]
    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    #[must_use]
    pub fn volumes(&self) -> &[VolumetricFile] {
        &self.volumes
    }

    /// Value at a spatial coordinate: the first constituent whose grid
    /// contains the coordinate answers
    #[must_use]
    pub fn value_at_coordinate(&self, xyz: [f32; 3], map_index: usize) -> Option<f32> {
        self.volumes.iter().find_map(|volume| {
            volume.interpolate_value(xyz, VolumeInterpolation::EnclosingVoxel, map_index)
        })
    }

    /// All map values at a spatial coordinate, first-match per the
    /// constituent order
    #[must_use]
    pub fn coordinate_row(&self, xyz: [f32; 3]) -> Option<Vec<f32>> {
        (0..self.number_of_maps())
            .map(|map_index| self.value_at_coordinate(xyz, map_index))
            .collect()
    }
}

impl MappableDataFile for CompositeVolumeFile {
    fn file_kind_name(&self) -> &'static str {
        "composite-volume"
    }

    fn number_of_maps(&self) -> usize {
        self.volumes
            .first()
            .map_or(0, MappableDataFile::number_of_maps)
    }

    fn map_info(&self, index: usize) -> Option<&MapInfo> {
        self.volumes.first().and_then(|v| v.map_info(index))
    }

    fn map_info_mut(&mut self, index: usize) -> Option<&mut MapInfo> {
        self.volumes.first_mut().and_then(|v| v.map_info_mut(index))
    }

    fn is_mapped_with_palette(&self) -> bool {
        self.volumes
            .first()
            .is_some_and(MappableDataFile::is_mapped_with_palette)
    }

    fn is_mapped_with_label_table(&self) -> bool {
        self.volumes
            .first()
            .is_some_and(MappableDataFile::is_mapped_with_label_table)
    }

    fn map_statistics(&mut self, index: usize) -> Option<&FastStatistics> {
        self.volumes
            .first_mut()
            .and_then(|v| v.map_statistics(index))
    }

    fn map_histogram(&mut self, index: usize) -> Option<&Histogram> {
        self.volumes
            .first_mut()
            .and_then(|v| v.map_histogram(index))
    }

    fn map_statistics_limited(
        &self,
        index: usize,
        min_inclusive: f32,
        max_inclusive: f32,
    ) -> Option<FastStatistics> {
        self.volumes
            .first()
            .and_then(|v| v.map_statistics_limited(index, min_inclusive, max_inclusive))
    }

    fn map_histogram_limited(
        &self,
        index: usize,
        bucket_count: usize,
        filter: ValueRangeFilter,
    ) -> Option<Histogram> {
        self.volumes
            .first()
            .and_then(|v| v.map_histogram_limited(index, bucket_count, filter))
    }

    /// Voxel keys resolve against the constituents in order; the first
    /// volume whose grid contains the index answers
    fn value_at(&self, key: &BrainordinateKey, map_index: usize) -> Option<f32> {
        self.volumes
            .iter()
            .find_map(|volume| volume.value_at(key, map_index))
    }

    fn label_name_at(&self, key: &BrainordinateKey, map_index: usize) -> Option<&str> {
        self.volumes
            .iter()
            .find_map(|volume| volume.label_name_at(key, map_index))
    }

    fn update_map_coloring(&mut self, index: usize) {
        for volume in &mut self.volumes {
            volume.update_map_coloring(index);
        }
    }

    fn map_rgba(&mut self, index: usize) -> Option<&[f32]> {
        self.volumes.first_mut().and_then(|v| v.map_rgba(index))
    }

    fn set_map_data(&mut self, _index: usize, _data: Vec<f32>) -> Result<()> {
        // constituent volumes own their frames; mutate them directly
        Err(FileError::unsupported("set_map_data", self.file_kind_name()))
    }

    fn set_map_palette_color_mapping(&mut self, index: usize, mapping: Arc<PaletteColorMapping>) {
        for volume in &mut self.volumes {
            volume.set_map_palette_color_mapping(index, Arc::clone(&mapping));
        }
    }
}
