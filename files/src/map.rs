use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MapUniqueId;

/// Key/value metadata attached to a map (acquisition parameters, provenance,
/// free-form annotations from the source file)
pub type MapMetadata = FxHashMap<String, String>;

/// What one map's values mean: continuous scalars colored through a palette,
/// or integer keys into a label table. Mutually exclusive per file — every
/// map in a file shares the file's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapDataKind {
    Scalar,
    Label,
}

impl MapDataKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MapDataKind::Scalar => "palette",
            MapDataKind::Label => "label-table",
        }
    }
}

/// Descriptive attributes of one map (one named column of brainordinate-
/// aligned data within a file).
///
/// Owned by the parent file and destroyed with it. Name and metadata are
/// mutable; the unique id is fixed at creation so scenes and selections can
/// keep referring to the map across renames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapInfo {
    pub name: String,
    pub metadata: MapMetadata,
    unique_id: MapUniqueId,
    pub kind: MapDataKind,
}

impl MapInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MapDataKind) -> Self {
        Self {
            name: name.into(),
            metadata: MapMetadata::default(),
            unique_id: Uuid::new_v4().to_string(),
            kind,
        }
    }

    /// Attach metadata during construction
    #[must_use]
    pub fn with_metadata(mut self, metadata: MapMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }
}
