pub use brainordinate::{BrainordinateKey, BrainordinateMappingIndex};
pub use composite::CompositeVolumeFile;
pub use dense::DenseBrainordinateFile;
pub use error::{FileError, Result};
pub use label_table::{Label, LabelTable};
pub use map::{MapDataKind, MapInfo, MapMetadata};
pub use map_content::MapContent;
pub use map_table::MapTable;
pub use mappable::{MappableDataFile, MappableFile};
pub use matrix::{InMemoryMatrix, MatrixSource, Parcel, ParcelMatrixFile, SliceKind};
pub use palette::{
    Palette, PaletteColorMapping, PaletteColorMappingBuilder, ScaleMode, ThresholdTest,
    ThresholdType, palette_by_name,
};
pub use structure::Structure;
pub use volume::{VolumeInterpolation, VolumeSpace, VolumetricFile};

pub mod brainordinate;
pub mod coloring;
pub mod composite;
pub mod dense;
pub mod error;
pub mod label_table;
pub mod map;
pub mod map_content;
pub mod map_table;
pub mod mappable;
pub mod matrix;
pub mod palette;
pub mod structure;
pub mod volume;

/// Map unique-id type; generated with UUID v4 at map creation
pub type MapUniqueId = String;
/// Red/green/blue/alpha components in `[0.0, 1.0]`
pub type Rgba = [f32; 4];
