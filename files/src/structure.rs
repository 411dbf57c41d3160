use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Anatomical partition a surface vertex belongs to.
///
/// Vertex indices restart at zero within every structure, so a vertex index
/// alone is ambiguous; pairing it with a structure disambiguates across the
/// separate surfaces of one brain.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Structure {
    CortexLeft,
    CortexRight,
    Cerebellum,
    AccumbensLeft,
    AccumbensRight,
    AmygdalaLeft,
    AmygdalaRight,
    BrainStem,
    CaudateLeft,
    CaudateRight,
    DiencephalonVentralLeft,
    DiencephalonVentralRight,
    HippocampusLeft,
    HippocampusRight,
    PallidumLeft,
    PallidumRight,
    PutamenLeft,
    PutamenRight,
    ThalamusLeft,
    ThalamusRight,
    Other,
}

impl Structure {
    /// Whether this structure is a cortical surface
    #[must_use]
    pub fn is_cortex(&self) -> bool {
        matches!(self, Structure::CortexLeft | Structure::CortexRight)
    }
}
