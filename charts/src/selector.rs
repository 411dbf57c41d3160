use brainmap_files::Structure;
use serde::{Deserialize, Serialize};

/// A semantically-typed selection of data within a mappable file.
///
/// Selectors are generated generically — from chart axes, identification
/// events, script bindings — and tested against heterogeneous open files.
/// Each file variant answers the selector kinds it can interpret and
/// declines the rest; a declined selector is routine, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataSelector {
    /// One matrix column by index
    ColumnIndex(usize),
    /// One matrix row by index
    RowIndex(usize),
    /// One surface vertex. `vertex_count` is the vertex count of the
    /// surface the selection was made on; files mapped to a different
    /// tessellation of the structure decline the selector.
    SurfaceVertex {
        structure: Structure,
        vertex_count: usize,
        vertex: usize,
    },
    /// The element-wise average over several vertices of one surface
    SurfaceVertexAverage {
        structure: Structure,
        vertex_count: usize,
        vertices: Vec<usize>,
    },
    /// A spatial coordinate inside a volume
    VolumeXyz([f32; 3]),
}

impl DataSelector {
    #[must_use]
    pub fn surface_vertex(structure: Structure, vertex_count: usize, vertex: usize) -> Self {
        Self::SurfaceVertex {
            structure,
            vertex_count,
            vertex,
        }
    }

    /// Short name for logs
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            DataSelector::ColumnIndex(_) => "column-index",
            DataSelector::RowIndex(_) => "row-index",
            DataSelector::SurfaceVertex { .. } => "surface-vertex",
            DataSelector::SurfaceVertexAverage { .. } => "surface-vertex-average",
            DataSelector::VolumeXyz(_) => "volume-xyz",
        }
    }
}
