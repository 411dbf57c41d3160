use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{FileError, Result};
use crate::structure::Structure;

/// An addressable unit of brain data: a surface vertex within an anatomical
/// structure, or a volume voxel by IJK grid index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrainordinateKey {
    SurfaceVertex { structure: Structure, vertex: usize },
    Voxel { i: i64, j: i64, k: i64 },
}

impl BrainordinateKey {
    #[must_use]
    pub fn vertex(structure: Structure, vertex: usize) -> Self {
        Self::SurfaceVertex { structure, vertex }
    }

    #[must_use]
    pub fn voxel(i: i64, j: i64, k: i64) -> Self {
        Self::Voxel { i, j, k }
    }
}

/// Bidirectional sparse mapping between brainordinates and linear data-array
/// offsets within a matrix-shaped file.
///
/// Built once when the file's structural metadata is parsed and read-only
/// thereafter; re-reading the file is the only way to rebuild it. Offsets are
/// dense over `[0, len)`, so the reverse direction is a plain vector lookup
/// and the forward direction a hash lookup — both constant time, which
/// matters because the consuming identification layer queries per mouse
/// interaction over indexes holding millions of entries.
///
/// A key absent from the index is an expected, frequent condition (a vertex
/// not covered by a parcellation, a voxel outside the region of interest):
/// lookups answer `None`, never an error.
#[derive(Debug, Clone, Default)]
pub struct BrainordinateMappingIndex {
    forward: FxHashMap<BrainordinateKey, usize>,
    reverse: Vec<BrainordinateKey>,
    structure_vertex_counts: FxHashMap<Structure, usize>,
}

impl BrainordinateMappingIndex {
    /// Build the index from codec-supplied structural metadata.
    ///
    /// `structure_vertex_counts` gives the total vertex count of every
    /// surface structure referenced by the pairs; `pairs` maps each covered
    /// brainordinate to its dense data offset.
    ///
    /// # Errors
    /// Will return `Err` if:
    /// - an offset is outside `[0, pairs.len())` or appears twice
    /// - a brainordinate key appears twice
    /// - a surface vertex exceeds its structure's declared vertex count,
    ///   or references an undeclared structure
    pub fn from_parts(
        structure_vertex_counts: FxHashMap<Structure, usize>,
        pairs: impl IntoIterator<Item = (BrainordinateKey, usize)>,
    ) -> Result<Self> {
        let pairs: Vec<(BrainordinateKey, usize)> = pairs.into_iter().collect();
        let count = pairs.len();
        let mut forward =
            FxHashMap::with_capacity_and_hasher(count, rustc_hash::FxBuildHasher::default());
        let mut reverse: Vec<Option<BrainordinateKey>> = vec![None; count];

        for (key, offset) in pairs {
            if let BrainordinateKey::SurfaceVertex { structure, vertex } = key {
                let declared = structure_vertex_counts.get(&structure).copied().ok_or_else(
                    || FileError::structural_mismatch(format!("vertex count for {structure}"), 1, 0),
                )?;
                if vertex >= declared {
                    return Err(FileError::structural_mismatch(
                        format!("vertex index for {structure}"),
                        declared,
                        vertex,
                    ));
                }
            }
            if offset >= count {
                return Err(FileError::structural_mismatch(
                    "brainordinate data offset",
                    count,
                    offset,
                ));
            }
            if reverse[offset].is_some() {
                return Err(FileError::DuplicateBrainordinate { offset });
            }
            if forward.insert(key, offset).is_some() {
                return Err(FileError::DuplicateBrainordinate { offset });
            }
            reverse[offset] = Some(key);
        }

        // unique in-range offsets over a vector of matching length fill it
        let reverse: Vec<BrainordinateKey> = reverse.into_iter().flatten().collect();
        if reverse.len() != count {
            return Err(FileError::structural_mismatch(
                "brainordinate offsets",
                count,
                reverse.len(),
            ));
        }

        Ok(Self {
            forward,
            reverse,
            structure_vertex_counts,
        })
    }

    /// Number of mapped brainordinates (== the file's row count)
    #[must_use]
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// Data offset for a brainordinate; `None` when the brainordinate has no
    /// data (expected during normal use, not an error)
    #[must_use]
    pub fn offset_for(&self, key: &BrainordinateKey) -> Option<usize> {
        self.forward.get(key).copied()
    }

    /// Brainordinate at a data offset; `None` for offsets past the end
    #[must_use]
    pub fn key_for(&self, offset: usize) -> Option<BrainordinateKey> {
        self.reverse.get(offset).copied()
    }

    /// Convenience: offset for a surface vertex
    #[must_use]
    pub fn vertex_offset(&self, structure: Structure, vertex: usize) -> Option<usize> {
        self.offset_for(&BrainordinateKey::vertex(structure, vertex))
    }

    /// Convenience: offset for a voxel
    #[must_use]
    pub fn voxel_offset(&self, i: i64, j: i64, k: i64) -> Option<usize> {
        self.offset_for(&BrainordinateKey::voxel(i, j, k))
    }

    /// Declared vertex count of a surface structure, if mapped
    #[must_use]
    pub fn structure_vertex_count(&self, structure: Structure) -> Option<usize> {
        self.structure_vertex_counts.get(&structure).copied()
    }

    /// Structures with surface coverage in this index
    pub fn surface_structures(&self) -> impl Iterator<Item = Structure> + '_ {
        self.structure_vertex_counts.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cortex_counts(count: usize) -> FxHashMap<Structure, usize> {
        let mut counts = FxHashMap::default();
        counts.insert(Structure::CortexLeft, count);
        counts
    }

    #[test]
    fn offsets_round_trip_through_both_directions() {
        // every other vertex is covered, mirroring a sparse parcellation
        let pairs: Vec<(BrainordinateKey, usize)> = (0..50)
            .map(|offset| {
                (
                    BrainordinateKey::vertex(Structure::CortexLeft, offset * 2),
                    offset,
                )
            })
            .collect();
        let index = BrainordinateMappingIndex::from_parts(cortex_counts(100), pairs).expect("index");

        for offset in 0..index.len() {
            let key = index.key_for(offset).expect("key");
            assert_eq!(index.offset_for(&key), Some(offset));
        }
    }

    #[test]
    fn uncovered_brainordinate_is_none_not_an_error() {
        let pairs = vec![(BrainordinateKey::vertex(Structure::CortexLeft, 0), 0)];
        let index = BrainordinateMappingIndex::from_parts(cortex_counts(10), pairs).expect("index");

        assert_eq!(index.vertex_offset(Structure::CortexLeft, 5), None);
        assert_eq!(index.vertex_offset(Structure::CortexRight, 0), None);
        assert_eq!(index.key_for(17), None);
    }

    #[test]
    fn duplicate_offsets_are_rejected() {
        let pairs = vec![
            (BrainordinateKey::vertex(Structure::CortexLeft, 0), 0),
            (BrainordinateKey::vertex(Structure::CortexLeft, 1), 0),
        ];
        let result = BrainordinateMappingIndex::from_parts(cortex_counts(10), pairs);
        assert!(matches!(
            result,
            Err(FileError::DuplicateBrainordinate { .. })
        ));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let pairs = vec![
            (BrainordinateKey::vertex(Structure::CortexLeft, 3), 0),
            (BrainordinateKey::vertex(Structure::CortexLeft, 3), 1),
        ];
        let result = BrainordinateMappingIndex::from_parts(cortex_counts(10), pairs);
        assert!(result.is_err());
    }

    #[test]
    fn sparse_offsets_are_rejected() {
        // offset 2 with only two pairs leaves offset 1 unfilled
        let pairs = vec![
            (BrainordinateKey::vertex(Structure::CortexLeft, 0), 0),
            (BrainordinateKey::vertex(Structure::CortexLeft, 1), 2),
        ];
        let result = BrainordinateMappingIndex::from_parts(cortex_counts(10), pairs);
        assert!(result.is_err());
    }

    #[test]
    fn vertex_beyond_declared_count_is_structural() {
        let pairs = vec![(BrainordinateKey::vertex(Structure::CortexLeft, 99), 0)];
        let result = BrainordinateMappingIndex::from_parts(cortex_counts(10), pairs);
        assert!(matches!(
            result,
            Err(FileError::StructuralMismatch { .. })
        ));
    }

    #[test]
    fn voxel_keys_index_alongside_vertices() {
        let mut pairs = vec![
            (BrainordinateKey::vertex(Structure::CortexLeft, 0), 0),
            (BrainordinateKey::vertex(Structure::CortexLeft, 1), 1),
        ];
        pairs.push((BrainordinateKey::voxel(3, 4, 5), 2));
        let index = BrainordinateMappingIndex::from_parts(cortex_counts(2), pairs).expect("index");

        assert_eq!(index.voxel_offset(3, 4, 5), Some(2));
        assert_eq!(index.voxel_offset(5, 4, 3), None);
    }
}
