use std::sync::Arc;

use brainmap_stats::{FastStatistics, Histogram, ValueRangeFilter};
use tracing::debug;

use crate::brainordinate::{BrainordinateKey, BrainordinateMappingIndex};
use crate::error::{FileError, Result};
use crate::label_table::LabelTable;
use crate::map::{MapDataKind, MapInfo};
use crate::map_content::MapContent;
use crate::map_table::MapTable;
use crate::mappable::MappableDataFile;
use crate::palette::PaletteColorMapping;

/// Dense brainordinate file: one row per mapped brainordinate, one column
/// per map. Covers per-vertex scalar and label data as well as mixed
/// surface/volume dense layouts, where the mapping index carries both
/// vertex and voxel keys.
///
/// Loading is atomic: either every map's data length agrees with the
/// mapping index and the file is returned fully populated, or construction
/// fails and no file exists.
#[derive(Debug)]
pub struct DenseBrainordinateFile {
    index: BrainordinateMappingIndex,
    table: MapTable,
}

impl DenseBrainordinateFile {
    /// Build a palette-mapped (scalar) dense file from codec output.
    ///
    /// # Errors
    /// Will return `Err` if any map's data length disagrees with the
    /// mapping index, or a map is not scalar-kind.
    pub fn load_palette_mapped(
        index: BrainordinateMappingIndex,
        maps: Vec<(MapInfo, Vec<f32>)>,
        mapping: Arc<PaletteColorMapping>,
    ) -> Result<Self> {
        let mut table = MapTable::new(MapDataKind::Scalar);
        for (info, data) in maps {
            if data.len() != index.len() {
                return Err(FileError::structural_mismatch(
                    format!("data length for map '{}'", info.name),
                    index.len(),
                    data.len(),
                ));
            }
            table.push(info, MapContent::new_scalar(data, Arc::clone(&mapping)))?;
        }
        debug!(
            maps = table.len(),
            brainordinates = index.len(),
            "dense brainordinate file loaded (palette-mapped)"
        );
        Ok(Self { index, table })
    }

    /// Build a label-table-mapped (categorical) dense file from codec
    /// output; each map owns its label table.
    ///
    /// # Errors
    /// Will return `Err` if any map's data length disagrees with the
    /// mapping index, or a map is not label-kind.
    pub fn load_label_mapped(
        index: BrainordinateMappingIndex,
        maps: Vec<(MapInfo, Vec<f32>, LabelTable)>,
    ) -> Result<Self> {
        let mut table = MapTable::new(MapDataKind::Label);
        for (info, data, labels) in maps {
            if data.len() != index.len() {
                return Err(FileError::structural_mismatch(
                    format!("data length for map '{}'", info.name),
                    index.len(),
                    data.len(),
                ));
            }
            table.push(info, MapContent::new_label(data, labels))?;
        }
        debug!(
            maps = table.len(),
            brainordinates = index.len(),
            "dense brainordinate file loaded (label-mapped)"
        );
        Ok(Self { index, table })
    }

    #[must_use]
    pub fn mapping_index(&self) -> &BrainordinateMappingIndex {
        &self.index
    }

    /// Number of mapped brainordinates (row count)
    #[must_use]
    pub fn brainordinate_count(&self) -> usize {
        self.index.len()
    }

    /// All map values at one brainordinate (the "row" charting consumers
    /// plot as a data series); `None` when the brainordinate is not mapped
    #[must_use]
    pub fn brainordinate_row(&self, key: &BrainordinateKey) -> Option<Vec<f32>> {
        let offset = self.index.offset_for(key)?;
        (0..self.table.len())
            .map(|map_index| self.table.content(map_index).and_then(|c| c.value(offset)))
            .collect()
    }

    /// Direct access to one map's cached content (tests, identification)
    #[must_use]
    pub fn map_content(&self, index: usize) -> Option<&MapContent> {
        self.table.content(index)
    }
}

impl MappableDataFile for DenseBrainordinateFile {
    fn file_kind_name(&self) -> &'static str {
        "dense-brainordinate"
    }

    fn number_of_maps(&self) -> usize {
        self.table.len()
    }

    fn map_info(&self, index: usize) -> Option<&MapInfo> {
        self.table.map(index)
    }

    fn map_info_mut(&mut self, index: usize) -> Option<&mut MapInfo> {
        self.table.map_mut(index)
    }

    fn is_mapped_with_palette(&self) -> bool {
        self.table.kind() == MapDataKind::Scalar
    }

    fn is_mapped_with_label_table(&self) -> bool {
        self.table.kind() == MapDataKind::Label
    }

    fn map_statistics(&mut self, index: usize) -> Option<&FastStatistics> {
        self.table.content_mut(index).map(|c| &*c.statistics())
    }

    fn map_histogram(&mut self, index: usize) -> Option<&Histogram> {
        self.table.content_mut(index).map(|c| &*c.histogram())
    }

    fn map_statistics_limited(
        &self,
        index: usize,
        min_inclusive: f32,
        max_inclusive: f32,
    ) -> Option<FastStatistics> {
        self.table
            .content(index)
            .map(|c| c.statistics_limited(min_inclusive, max_inclusive))
    }

    fn map_histogram_limited(
        &self,
        index: usize,
        bucket_count: usize,
        filter: ValueRangeFilter,
    ) -> Option<Histogram> {
        self.table
            .content(index)
            .map(|c| c.histogram_limited(bucket_count, filter))
    }

    fn value_at(&self, key: &BrainordinateKey, map_index: usize) -> Option<f32> {
        let offset = self.index.offset_for(key)?;
        self.table.content(map_index)?.value(offset)
    }

    fn label_name_at(&self, key: &BrainordinateKey, map_index: usize) -> Option<&str> {
        let offset = self.index.offset_for(key)?;
        let content = self.table.content(map_index)?;
        let value = content.value(offset)?;
        if value.is_nan() {
            return None;
        }
        content
            .label_table()
            .map(|table| table.name(value.round() as i32))
    }

    fn update_map_coloring(&mut self, index: usize) {
        if let Some(content) = self.table.content_mut(index) {
            content.update_coloring();
        }
    }

    fn map_rgba(&mut self, index: usize) -> Option<&[f32]> {
        self.table.content_mut(index).map(|c| &*c.rgba())
    }

    fn set_map_data(&mut self, index: usize, data: Vec<f32>) -> Result<()> {
        if data.len() != self.index.len() {
            return Err(FileError::structural_mismatch(
                "map data length",
                self.index.len(),
                data.len(),
            ));
        }
        let count = self.table.len();
        match self.table.content_mut(index) {
            Some(content) => {
                content.set_data(data);
                Ok(())
            }
            None => Err(FileError::InvalidMapIndex { index, count }),
        }
    }

    fn set_map_palette_color_mapping(&mut self, index: usize, mapping: Arc<PaletteColorMapping>) {
        if let Some(content) = self.table.content_mut(index) {
            content.set_palette_color_mapping(mapping);
        }
    }
}
