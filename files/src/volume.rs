use std::sync::Arc;

use brainmap_stats::{FastStatistics, Histogram, ValueRangeFilter};
use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::brainordinate::BrainordinateKey;
use crate::error::{FileError, Result};
use crate::label_table::LabelTable;
use crate::map::{MapDataKind, MapInfo};
use crate::map_content::MapContent;
use crate::map_table::MapTable;
use crate::mappable::MappableDataFile;
use crate::palette::PaletteColorMapping;

/// How a spatial-coordinate query samples the voxel grid
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum VolumeInterpolation {
    /// Value of the voxel whose center is nearest the coordinate
    EnclosingVoxel,
    /// Weighted average of the 2×2×2 neighborhood around the coordinate
    Trilinear,
}

/// A volume's grid geometry: dimensions plus the affine mapping grid
/// indexes to spatial coordinates. The inverse is computed once at
/// construction so per-query coordinate transforms are a multiply.
#[derive(Debug, Clone)]
pub struct VolumeSpace {
    dims: [usize; 3],
    affine: Matrix4<f32>,
    inverse: Matrix4<f32>,
}

impl VolumeSpace {
    /// # Errors
    /// Will return `Err` if any dimension is zero or the affine is singular
    pub fn new(dims: [usize; 3], affine: Matrix4<f32>) -> Result<Self> {
        if dims.iter().any(|&d| d == 0) {
            return Err(FileError::structural_mismatch("volume dimensions", 1, 0));
        }
        let inverse = affine
            .try_inverse()
            .ok_or_else(|| FileError::other("volume affine is not invertible"))?;
        Ok(Self {
            dims,
            affine,
            inverse,
        })
    }

    /// Axis-aligned space: voxel spacing along each axis plus an origin
    ///
    /// # Errors
    /// Will return `Err` if any dimension is zero or any spacing is zero
    pub fn axis_aligned(dims: [usize; 3], spacing: [f32; 3], origin: [f32; 3]) -> Result<Self> {
        let affine = Matrix4::new(
            spacing[0], 0.0, 0.0, origin[0], //
            0.0, spacing[1], 0.0, origin[1], //
            0.0, 0.0, spacing[2], origin[2], //
            0.0, 0.0, 0.0, 1.0,
        );
        Self::new(dims, affine)
    }

    #[must_use]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[must_use]
    pub fn affine(&self) -> &Matrix4<f32> {
        &self.affine
    }

    /// Grid index (continuous) to spatial coordinate
    #[must_use]
    pub fn index_to_space(&self, ijk: [f32; 3]) -> [f32; 3] {
        let out = self.affine * Vector4::new(ijk[0], ijk[1], ijk[2], 1.0);
        [out.x, out.y, out.z]
    }

    /// Spatial coordinate to continuous grid index
    #[must_use]
    pub fn space_to_index(&self, xyz: [f32; 3]) -> [f32; 3] {
        let out = self.inverse * Vector4::new(xyz[0], xyz[1], xyz[2], 1.0);
        [out.x, out.y, out.z]
    }

    /// Grid index of the voxel whose center is nearest the coordinate.
    /// May be outside the grid; check with [`Self::index_valid`].
    #[must_use]
    pub fn enclosing_voxel(&self, xyz: [f32; 3]) -> [i64; 3] {
        let index = self.space_to_index(xyz);
        [
            (index[0] + 0.5).floor() as i64,
            (index[1] + 0.5).floor() as i64,
            (index[2] + 0.5).floor() as i64,
        ]
    }

    #[must_use]
    pub fn index_valid(&self, i: i64, j: i64, k: i64) -> bool {
        i >= 0
            && j >= 0
            && k >= 0
            && (i as usize) < self.dims[0]
            && (j as usize) < self.dims[1]
            && (k as usize) < self.dims[2]
    }

    /// Linear offset of a voxel within a frame (i fastest)
    #[must_use]
    pub fn linear_offset(&self, i: i64, j: i64, k: i64) -> Option<usize> {
        if !self.index_valid(i, j, k) {
            return None;
        }
        let (i, j, k) = (i as usize, j as usize, k as usize);
        Some(i + self.dims[0] * (j + self.dims[1] * k))
    }
}

/// Volumetric file: one data frame per map over a common voxel grid.
///
/// Brainordinate keys are `(i, j, k)` grid indexes; spatial-coordinate
/// queries go through [`VolumetricFile::interpolate_value`], which reports
/// failure for any out-of-bounds or partially out-of-bounds neighborhood
/// instead of substituting a default value.
#[derive(Debug)]
pub struct VolumetricFile {
    space: VolumeSpace,
    table: MapTable,
}

impl VolumetricFile {
    /// Build a palette-mapped (scalar) volume from codec output.
    ///
    /// # Errors
    /// Will return `Err` if any frame's length disagrees with the grid's
    /// voxel count.
    pub fn load_palette_mapped(
        space: VolumeSpace,
        frames: Vec<(MapInfo, Vec<f32>)>,
        mapping: Arc<PaletteColorMapping>,
    ) -> Result<Self> {
        let mut table = MapTable::new(MapDataKind::Scalar);
        for (info, data) in frames {
            if data.len() != space.voxel_count() {
                return Err(FileError::structural_mismatch(
                    format!("frame length for map '{}'", info.name),
                    space.voxel_count(),
                    data.len(),
                ));
            }
            table.push(info, MapContent::new_scalar(data, Arc::clone(&mapping)))?;
        }
        debug!(
            maps = table.len(),
            voxels = space.voxel_count(),
            "volumetric file loaded (palette-mapped)"
        );
        Ok(Self { space, table })
    }

    /// Build a label-table-mapped (categorical) volume from codec output.
    ///
    /// # Errors
    /// Will return `Err` if any frame's length disagrees with the grid's
    /// voxel count.
    pub fn load_label_mapped(
        space: VolumeSpace,
        frames: Vec<(MapInfo, Vec<f32>, LabelTable)>,
    ) -> Result<Self> {
        let mut table = MapTable::new(MapDataKind::Label);
        for (info, data, labels) in frames {
            if data.len() != space.voxel_count() {
                return Err(FileError::structural_mismatch(
                    format!("frame length for map '{}'", info.name),
                    space.voxel_count(),
                    data.len(),
                ));
            }
            table.push(info, MapContent::new_label(data, labels))?;
        }
        debug!(
            maps = table.len(),
            voxels = space.voxel_count(),
            "volumetric file loaded (label-mapped)"
        );
        Ok(Self { space, table })
    }

    #[must_use]
    pub fn space(&self) -> &VolumeSpace {
        &self.space
    }

    /// Value of one map at a grid-aligned voxel
    #[must_use]
    pub fn voxel_value(&self, i: i64, j: i64, k: i64, map_index: usize) -> Option<f32> {
        let offset = self.space.linear_offset(i, j, k)?;
        self.table.content(map_index)?.value(offset)
    }

    /// Sample one map at an arbitrary spatial coordinate.
    ///
    /// Trilinear sampling needs the full 2×2×2 neighborhood on the grid; a
    /// coordinate whose neighborhood is even partially outside answers
    /// `None`. Neighborhood validation allows ±0.01 of index-space rounding
    /// error so coordinates on the boundary of the outermost voxel centers
    /// still sample. Volumes thinner than two voxels along any axis fall
    /// back to enclosing-voxel sampling.
    #[must_use]
    pub fn interpolate_value(
        &self,
        xyz: [f32; 3],
        interpolation: VolumeInterpolation,
        map_index: usize,
    ) -> Option<f32> {
        match interpolation {
            VolumeInterpolation::EnclosingVoxel => {
                let [i, j, k] = self.space.enclosing_voxel(xyz);
                self.voxel_value(i, j, k, map_index)
            }
            VolumeInterpolation::Trilinear => {
                let dims = self.space.dims();
                if dims[0] < 2 || dims[1] < 2 || dims[2] < 2 {
                    return self.interpolate_value(
                        xyz,
                        VolumeInterpolation::EnclosingVoxel,
                        map_index,
                    );
                }
                let index = self.space.space_to_index(xyz);
                let low = [
                    (index[0] + 0.01).floor() as i64,
                    (index[1] + 0.01).floor() as i64,
                    (index[2] + 0.01).floor() as i64,
                ];
                let high = [
                    (index[0] - 0.01).ceil() as i64,
                    (index[1] - 0.01).ceil() as i64,
                    (index[2] - 0.01).ceil() as i64,
                ];
                if !self.space.index_valid(low[0], low[1], low[2])
                    || !self.space.index_valid(high[0], high[1], high[2])
                {
                    return None;
                }

                let data = self.table.content(map_index)?.data();
                let sample = |i: i64, j: i64, k: i64| -> Option<f32> {
                    let offset = self.space.linear_offset(i, j, k)?;
                    data.get(offset).copied()
                };

                let i_low = (index[0].floor() as i64).clamp(0, dims[0] as i64 - 2);
                let j_low = (index[1].floor() as i64).clamp(0, dims[1] as i64 - 2);
                let k_low = (index[2].floor() as i64).clamp(0, dims[2] as i64 - 2);
                let (i_high, j_high, k_high) = (i_low + 1, j_low + 1, k_low + 1);

                let x_high_w = index[0] - i_low as f32;
                let x_low_w = 1.0 - x_high_w;
                let x00 = x_low_w * sample(i_low, j_low, k_low)?
                    + x_high_w * sample(i_high, j_low, k_low)?;
                let x10 = x_low_w * sample(i_low, j_high, k_low)?
                    + x_high_w * sample(i_high, j_high, k_low)?;
                let x01 = x_low_w * sample(i_low, j_low, k_high)?
                    + x_high_w * sample(i_high, j_low, k_high)?;
                let x11 = x_low_w * sample(i_low, j_high, k_high)?
                    + x_high_w * sample(i_high, j_high, k_high)?;

                let y_high_w = index[1] - j_low as f32;
                let y_low_w = 1.0 - y_high_w;
                let y0 = y_low_w * x00 + y_high_w * x10;
                let y1 = y_low_w * x01 + y_high_w * x11;

                let z_high_w = index[2] - k_low as f32;
                Some((1.0 - z_high_w) * y0 + z_high_w * y1)
            }
        }
    }

    /// All map values at the voxel enclosing a coordinate
    #[must_use]
    pub fn coordinate_row(&self, xyz: [f32; 3]) -> Option<Vec<f32>> {
        (0..self.table.len())
            .map(|map_index| {
                self.interpolate_value(xyz, VolumeInterpolation::EnclosingVoxel, map_index)
            })
            .collect()
    }
}

impl MappableDataFile for VolumetricFile {
    fn file_kind_name(&self) -> &'static str {
        "volumetric"
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
        match key {
            BrainordinateKey::Voxel { i, j, k } => self.voxel_value(*i, *j, *k, map_index),
            BrainordinateKey::SurfaceVertex { .. } => None,
        }
    }

    fn label_name_at(&self, key: &BrainordinateKey, map_index: usize) -> Option<&str> {
        let value = self.value_at(key, map_index)?;
        if value.is_nan() {
            return None;
        }
        self.table
            .content(map_index)?
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
        if data.len() != self.space.voxel_count() {
            return Err(FileError::structural_mismatch(
                "frame length",
                self.space.voxel_count(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_space(dims: [usize; 3]) -> VolumeSpace {
        VolumeSpace::axis_aligned(dims, [1.0, 1.0, 1.0], [0.0, 0.0, 0.0]).expect("space")
    }

    /// 4x4x4 volume whose value at (i,j,k) is i + 10j + 100k
    fn ramp_volume() -> VolumetricFile {
        let space = unit_space([4, 4, 4]);
        let mut data = vec![0.0; space.voxel_count()];
        for k in 0..4_i64 {
            for j in 0..4_i64 {
                for i in 0..4_i64 {
                    let offset = space.linear_offset(i, j, k).expect("offset");
                    data[offset] = i as f32 + 10.0 * j as f32 + 100.0 * k as f32;
                }
            }
        }
        VolumetricFile::load_palette_mapped(
            space,
            vec![(MapInfo::new("ramp", MapDataKind::Scalar), data)],
            Arc::new(PaletteColorMapping::default()),
        )
        .expect("volume")
    }

    #[test]
    fn affine_transforms_round_trip() {
        let space =
            VolumeSpace::axis_aligned([8, 8, 8], [2.0, 2.0, 2.0], [-8.0, -8.0, -8.0]).expect("space");
        let xyz = space.index_to_space([3.0, 1.0, 5.0]);
        assert_eq!(xyz, [-2.0, -6.0, 2.0]);
        let back = space.space_to_index(xyz);
        assert_relative_eq!(back[0], 3.0, epsilon = 1e-5);
        assert_relative_eq!(back[1], 1.0, epsilon = 1e-5);
        assert_relative_eq!(back[2], 5.0, epsilon = 1e-5);
    }

    #[test]
    fn enclosing_voxel_rounds_to_nearest_center() {
        let space = unit_space([4, 4, 4]);
        assert_eq!(space.enclosing_voxel([1.4, 1.5, 2.6]), [1, 2, 3]);
    }

    #[test]
    fn trilinear_interpolates_linearly_on_a_ramp() {
        let volume = ramp_volume();
        // halfway between voxel centers along each axis
        let value = volume
            .interpolate_value([1.5, 1.5, 1.5], VolumeInterpolation::Trilinear, 0)
            .expect("value");
        assert_relative_eq!(value, 1.5 + 15.0 + 150.0, epsilon = 1e-4);

        // at an exact voxel center both modes agree
        let exact = volume
            .interpolate_value([2.0, 1.0, 3.0], VolumeInterpolation::Trilinear, 0)
            .expect("value");
        assert_relative_eq!(exact, 2.0 + 10.0 + 300.0, epsilon = 1e-4);
    }

    #[test]
    fn out_of_bounds_neighborhood_reports_failure() {
        let volume = ramp_volume();
        // far outside the grid
        assert_eq!(
            volume.interpolate_value([40.0, 0.0, 0.0], VolumeInterpolation::Trilinear, 0),
            None
        );
        // partially outside: neighborhood needs index -1
        assert_eq!(
            volume.interpolate_value([-0.6, 1.0, 1.0], VolumeInterpolation::Trilinear, 0),
            None
        );
        assert_eq!(
            volume.interpolate_value([-0.6, 1.0, 1.0], VolumeInterpolation::EnclosingVoxel, 0),
            None
        );
    }

    #[test]
    fn voxel_keys_resolve_and_vertex_keys_do_not() {
        let volume = ramp_volume();
        assert_eq!(
            volume.value_at(&BrainordinateKey::voxel(1, 2, 3), 0),
            Some(1.0 + 20.0 + 300.0)
        );
        assert_eq!(
            volume.value_at(
                &BrainordinateKey::vertex(crate::structure::Structure::CortexLeft, 1),
                0
            ),
            None
        );
    }

    #[test]
    fn mismatched_frame_length_aborts_the_load() {
        let space = unit_space([2, 2, 2]);
        let result = VolumetricFile::load_palette_mapped(
            space,
            vec![(MapInfo::new("bad", MapDataKind::Scalar), vec![0.0; 7])],
            Arc::new(PaletteColorMapping::default()),
        );
        assert!(matches!(result, Err(FileError::StructuralMismatch { .. })));
    }
}
