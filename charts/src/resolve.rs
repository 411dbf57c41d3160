use brainmap_files::{BrainordinateKey, MappableDataFile, MappableFile};
use tracing::debug;

use crate::selector::DataSelector;

/// Resolve a selector against a file, producing the selected data array.
///
/// Every file variant interprets the subset of selector kinds that make
/// sense for it:
/// - dense brainordinate files answer vertex and vertex-average selectors
///   with the per-map values at that brainordinate;
/// - parcel matrix files answer row/column selectors (through their
///   single-slot cache, so a resolve replaces the loaded slice) and vertex
///   selectors covered by the parcellation;
/// - volumetric and composite files answer volume coordinate selectors,
///   which carry the grid geometry needed to place a spatial coordinate.
///
/// Any (selector, variant) pair outside that table answers `None` — never
/// an error, because selectors are broadcast against heterogeneous files.
#[must_use]
pub fn resolve(selector: &DataSelector, file: &mut MappableFile) -> Option<Vec<f32>> {
    let resolved = match (selector, &mut *file) {
        (DataSelector::RowIndex(row), MappableFile::ParcelMatrix(matrix)) => {
            matrix.load_row(*row).ok()?;
            matrix.loaded_data().map(<[f32]>::to_vec)
        }
        (DataSelector::ColumnIndex(column), MappableFile::ParcelMatrix(matrix)) => {
            matrix.load_column(*column).ok()?;
            matrix.loaded_data().map(<[f32]>::to_vec)
        }
        (
            DataSelector::SurfaceVertex {
                structure,
                vertex_count,
                vertex,
            },
            MappableFile::Dense(dense),
        ) => {
            // a selector made on a different tessellation is stale, not wrong
            if dense.mapping_index().structure_vertex_count(*structure) != Some(*vertex_count) {
                return None;
            }
            dense.brainordinate_row(&BrainordinateKey::vertex(*structure, *vertex))
        }
        (
            DataSelector::SurfaceVertexAverage {
                structure,
                vertex_count,
                vertices,
            },
            MappableFile::Dense(dense),
        ) => {
            if dense.mapping_index().structure_vertex_count(*structure) != Some(*vertex_count) {
                return None;
            }
            average_rows(vertices.iter().filter_map(|&vertex| {
                dense.brainordinate_row(&BrainordinateKey::vertex(*structure, vertex))
            }))
        }
        (
            DataSelector::SurfaceVertex {
                structure, vertex, ..
            },
            MappableFile::ParcelMatrix(matrix),
        ) => {
            let key = BrainordinateKey::vertex(*structure, *vertex);
            matrix.load_row_for_brainordinate(&key)?;
            matrix.loaded_data().map(<[f32]>::to_vec)
        }
        (DataSelector::VolumeXyz(xyz), MappableFile::Volume(volume)) => {
            volume.coordinate_row(*xyz)
        }
        (DataSelector::VolumeXyz(xyz), MappableFile::CompositeVolume(composite)) => {
            composite.coordinate_row(*xyz)
        }
        _ => None,
    };

    debug!(
        selector = selector.kind_name(),
        file = file.file_kind_name(),
        resolved = resolved.is_some(),
        "selector resolved"
    );
    resolved
}

/// Element-wise mean of equally long rows; `None` when no rows survive
fn average_rows(rows: impl Iterator<Item = Vec<f32>>) -> Option<Vec<f32>> {
    let mut sum: Option<Vec<f32>> = None;
    let mut count = 0usize;
    for row in rows {
        match &mut sum {
            None => sum = Some(row),
            Some(sum) => {
                if sum.len() != row.len() {
                    return None;
                }
                for (accumulated, value) in sum.iter_mut().zip(row) {
                    *accumulated += value;
                }
            }
        }
        count += 1;
    }
    let mut sum = sum?;
    let scale = 1.0 / count as f32;
    for value in &mut sum {
        *value *= scale;
    }
    Some(sum)
}
