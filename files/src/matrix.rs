use std::sync::Arc;

use brainmap_stats::{FastStatistics, Histogram, ValueRangeFilter};
use ndarray::Array2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::brainordinate::BrainordinateKey;
use crate::error::{FileError, Result};
use crate::map::{MapDataKind, MapInfo};
use crate::map_content::MapContent;
use crate::map_table::MapTable;
use crate::mappable::MappableDataFile;
use crate::palette::PaletteColorMapping;

/// Random access into a matrix too large to hold in memory.
///
/// The codec layer implements this over its on-disk layout; row and column
/// fetches are the only operations the matrix file needs, and each returns
/// an owned buffer so the source is free to read lazily. An index past the
/// matrix dimensions answers `None`.
pub trait MatrixSource: Send + Sync {
    fn row_count(&self) -> usize;
    fn column_count(&self) -> usize;
    fn row(&self, index: usize) -> Option<Vec<f32>>;
    fn column(&self, index: usize) -> Option<Vec<f32>>;
}

impl std::fmt::Debug for dyn MatrixSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MatrixSource({} x {})",
            self.row_count(),
            self.column_count()
        )
    }
}

/// Fully in-memory matrix source, used by tests and for small matrices
#[derive(Debug, Clone)]
pub struct InMemoryMatrix {
    values: Array2<f32>,
}

impl InMemoryMatrix {
    #[must_use]
    pub fn new(values: Array2<f32>) -> Self {
        Self { values }
    }
}

impl MatrixSource for InMemoryMatrix {
    fn row_count(&self) -> usize {
        self.values.nrows()
    }

    fn column_count(&self) -> usize {
        self.values.ncols()
    }

    fn row(&self, index: usize) -> Option<Vec<f32>> {
        (index < self.values.nrows()).then(|| self.values.row(index).to_vec())
    }

    fn column(&self, index: usize) -> Option<Vec<f32>> {
        (index < self.values.ncols()).then(|| self.values.column(index).to_vec())
    }
}

/// Which axis the loaded slice came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceKind {
    Row,
    Column,
}

/// An aggregated group of brainordinates treated as one row/column of a
/// parcellated matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub name: String,
    pub members: Vec<BrainordinateKey>,
}

impl Parcel {
    #[must_use]
    pub fn new(name: impl Into<String>, members: Vec<BrainordinateKey>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }
}

/// Parcellated connectivity matrix file.
///
/// Rows and columns are parcels, not individual brainordinates; a parcel
/// membership index resolves a brainordinate to its parcel. The matrix
/// itself stays behind a [`MatrixSource`] because it is typically far too
/// large to materialize — exactly one row *or* column is held in memory at
/// a time, in the file's single map. Loading any slice evicts the previous
/// one: this is a single-slot cache, not an LRU, and the slot is the one
/// piece of mutable state in the file.
#[derive(Debug)]
pub struct ParcelMatrixFile {
    parcels: Vec<Parcel>,
    membership: FxHashMap<BrainordinateKey, usize>,
    source: Box<dyn MatrixSource>,
    loaded: Option<(SliceKind, usize)>,
    table: MapTable,
}

impl ParcelMatrixFile {
    /// Build a parcellated matrix file from codec output.
    ///
    /// The matrix must be square over the parcel list (parcels on both
    /// axes), and no brainordinate may belong to two parcels.
    ///
    /// # Errors
    /// Will return `Err` if the source dimensions disagree with the parcel
    /// count or a brainordinate appears in more than one parcel.
    pub fn load(
        parcels: Vec<Parcel>,
        source: Box<dyn MatrixSource>,
        mapping: Arc<PaletteColorMapping>,
    ) -> Result<Self> {
        if source.row_count() != parcels.len() {
            return Err(FileError::structural_mismatch(
                "matrix row count vs parcels",
                parcels.len(),
                source.row_count(),
            ));
        }
        if source.column_count() != parcels.len() {
            return Err(FileError::structural_mismatch(
                "matrix column count vs parcels",
                parcels.len(),
                source.column_count(),
            ));
        }

        let mut membership = FxHashMap::default();
        for (parcel_index, parcel) in parcels.iter().enumerate() {
            for member in &parcel.members {
                if membership.insert(*member, parcel_index).is_some() {
                    return Err(FileError::DuplicateBrainordinate {
                        offset: parcel_index,
                    });
                }
            }
        }

        // the single map holds the loaded slice; zero-filled until a load
        let mut table = MapTable::new(MapDataKind::Scalar);
        table.push(
            MapInfo::new("loaded slice", MapDataKind::Scalar),
            MapContent::new_scalar(vec![0.0; parcels.len()], mapping),
        )?;

        debug!(
            parcels = parcels.len(),
            brainordinates = membership.len(),
            "parcel matrix file loaded"
        );
        Ok(Self {
            parcels,
            membership,
            source,
            loaded: None,
            table,
        })
    }

    #[must_use]
    pub fn parcel_count(&self) -> usize {
        self.parcels.len()
    }

    #[must_use]
    pub fn parcels(&self) -> &[Parcel] {
        &self.parcels
    }

    /// Parcel index a brainordinate belongs to; `None` when uncovered
    #[must_use]
    pub fn parcel_for(&self, key: &BrainordinateKey) -> Option<usize> {
        self.membership.get(key).copied()
    }

    /// Load one matrix row into the slot, evicting whatever was loaded.
    ///
    /// # Errors
    /// Will return `Err` if the row index is outside the matrix.
    pub fn load_row(&mut self, row: usize) -> Result<()> {
        let data = self.source.row(row).ok_or(FileError::InvalidSliceIndex {
            index: row,
            count: self.source.row_count(),
        })?;
        self.store_slice(SliceKind::Row, row, data);
        Ok(())
    }

    /// Load one matrix column into the slot, evicting whatever was loaded.
    ///
    /// # Errors
    /// Will return `Err` if the column index is outside the matrix.
    pub fn load_column(&mut self, column: usize) -> Result<()> {
        let data = self
            .source
            .column(column)
            .ok_or(FileError::InvalidSliceIndex {
                index: column,
                count: self.source.column_count(),
            })?;
        self.store_slice(SliceKind::Column, column, data);
        Ok(())
    }

    /// Load the row for the parcel containing a brainordinate.
    /// `None` when the brainordinate is not in any parcel.
    pub fn load_row_for_brainordinate(&mut self, key: &BrainordinateKey) -> Option<usize> {
        let parcel = self.parcel_for(key)?;
        self.load_row(parcel).ok()?;
        Some(parcel)
    }

    fn store_slice(&mut self, kind: SliceKind, index: usize, data: Vec<f32>) {
        debug!(?kind, index, evicted = ?self.loaded, "matrix slice loaded");
        if let Some(content) = self.table.content_mut(0) {
            content.set_data(data);
        }
        self.loaded = Some((kind, index));
    }

    /// Which slice currently occupies the slot
    #[must_use]
    pub fn loaded_slice(&self) -> Option<(SliceKind, usize)> {
        self.loaded
    }

    /// The loaded slice's values (one per parcel); `None` before any load
    #[must_use]
    pub fn loaded_data(&self) -> Option<&[f32]> {
        self.loaded?;
        self.table.content(0).map(MapContent::data)
    }
}

impl MappableDataFile for ParcelMatrixFile {
    fn file_kind_name(&self) -> &'static str {
        "parcel-matrix"
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
        true
    }

    fn is_mapped_with_label_table(&self) -> bool {
        false
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

    /// Value for the parcel containing the brainordinate, read from the
    /// loaded slice; `None` before any load or for uncovered brainordinates
    fn value_at(&self, key: &BrainordinateKey, map_index: usize) -> Option<f32> {
        let parcel = self.parcel_for(key)?;
        self.loaded?;
        self.table.content(map_index)?.value(parcel)
    }

    fn update_map_coloring(&mut self, index: usize) {
        if let Some(content) = self.table.content_mut(index) {
            content.update_coloring();
        }
    }

    fn map_rgba(&mut self, index: usize) -> Option<&[f32]> {
        self.table.content_mut(index).map(|c| &*c.rgba())
    }

    fn set_map_data(&mut self, _index: usize, _data: Vec<f32>) -> Result<()> {
        // the slot is fed exclusively by load_row/load_column
        Err(FileError::unsupported("set_map_data", self.file_kind_name()))
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
    use crate::structure::Structure;
    use ndarray::array;

    fn two_parcel_file() -> ParcelMatrixFile {
        let parcels = vec![
            Parcel::new(
                "front",
                vec![
                    BrainordinateKey::vertex(Structure::CortexLeft, 0),
                    BrainordinateKey::vertex(Structure::CortexLeft, 1),
                ],
            ),
            Parcel::new(
                "back",
                vec![BrainordinateKey::vertex(Structure::CortexLeft, 2)],
            ),
        ];
        let matrix = InMemoryMatrix::new(array![[1.0, 2.0], [3.0, 4.0]]);
        ParcelMatrixFile::load(
            parcels,
            Box::new(matrix),
            Arc::new(PaletteColorMapping::default()),
        )
        .expect("file")
    }

    #[test]
    fn loading_a_new_slice_evicts_the_previous_one() {
        let mut file = two_parcel_file();
        file.load_row(0).expect("row 0");
        assert_eq!(file.loaded_data(), Some(&[1.0, 2.0][..]));
        assert_eq!(file.loaded_slice(), Some((SliceKind::Row, 0)));

        file.load_row(1).expect("row 1");
        // only row 1 is retrievable now
        assert_eq!(file.loaded_data(), Some(&[3.0, 4.0][..]));
        assert_eq!(file.loaded_slice(), Some((SliceKind::Row, 1)));

        file.load_column(0).expect("column 0");
        assert_eq!(file.loaded_data(), Some(&[1.0, 3.0][..]));
        assert_eq!(file.loaded_slice(), Some((SliceKind::Column, 0)));
    }

    #[test]
    fn value_lookup_needs_a_loaded_slice() {
        let mut file = two_parcel_file();
        let key = BrainordinateKey::vertex(Structure::CortexLeft, 2);
        assert_eq!(file.value_at(&key, 0), None);

        file.load_row(0).expect("row 0");
        // vertex 2 is in parcel "back" (column 1 of the loaded row)
        assert_eq!(file.value_at(&key, 0), Some(2.0));

        let uncovered = BrainordinateKey::vertex(Structure::CortexRight, 0);
        assert_eq!(file.value_at(&uncovered, 0), None);
    }

    #[test]
    fn slice_statistics_follow_the_loaded_slice() {
        let mut file = two_parcel_file();
        file.load_row(0).expect("row 0");
        let mean_row0 = file.map_statistics(0).expect("stats").mean;
        assert_eq!(mean_row0, 1.5);

        file.load_row(1).expect("row 1");
        // the eviction invalidated the cached statistics
        let mean_row1 = file.map_statistics(0).expect("stats").mean;
        assert_eq!(mean_row1, 3.5);
    }

    #[test]
    fn out_of_range_slice_index_is_an_error() {
        let mut file = two_parcel_file();
        assert!(matches!(
            file.load_row(9),
            Err(FileError::InvalidSliceIndex { .. })
        ));
        // the slot is untouched by the failed load
        assert_eq!(file.loaded_slice(), None);
    }

    #[test]
    fn overlapping_parcels_are_rejected() {
        let shared = BrainordinateKey::vertex(Structure::CortexLeft, 0);
        let parcels = vec![
            Parcel::new("a", vec![shared]),
            Parcel::new("b", vec![shared]),
        ];
        let matrix = InMemoryMatrix::new(array![[0.0, 0.0], [0.0, 0.0]]);
        let result = ParcelMatrixFile::load(
            parcels,
            Box::new(matrix),
            Arc::new(PaletteColorMapping::default()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_row_for_brainordinate_resolves_the_parcel() {
        let mut file = two_parcel_file();
        let key = BrainordinateKey::vertex(Structure::CortexLeft, 1);
        let parcel = file.load_row_for_brainordinate(&key);
        assert_eq!(parcel, Some(0));
        assert_eq!(file.loaded_slice(), Some((SliceKind::Row, 0)));
    }
}
