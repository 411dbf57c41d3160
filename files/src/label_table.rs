use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Rgba;

/// One named, colored category in a label table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: Rgba,
}

/// Discrete integer-key → (name, color) mapping for categorical maps.
///
/// Every table carries an "unassigned" entry; values that decode to a key
/// with no label resolve to it, so categorical lookups always produce a
/// printable name and a color (the unassigned color is fully transparent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelTable {
    labels: FxHashMap<i32, Label>,
    unassigned_key: i32,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelTable {
    pub const UNASSIGNED_NAME: &'static str = "???";

    #[must_use]
    pub fn new() -> Self {
        let mut labels = FxHashMap::default();
        labels.insert(
            0,
            Label {
                name: Self::UNASSIGNED_NAME.to_string(),
                color: [0.0, 0.0, 0.0, 0.0],
            },
        );
        Self {
            labels,
            unassigned_key: 0,
        }
    }

    /// Insert or replace a label. Replacing the unassigned key's label is
    /// allowed but logged, since codecs normally leave it alone.
    pub fn insert(&mut self, key: i32, name: impl Into<String>, color: Rgba) {
        if key == self.unassigned_key {
            warn!(key, "replacing the unassigned label entry");
        }
        self.labels.insert(
            key,
            Label {
                name: name.into(),
                color,
            },
        );
    }

    #[must_use]
    pub fn label(&self, key: i32) -> Option<&Label> {
        self.labels.get(&key)
    }

    /// Label name for a key, falling back to the unassigned entry
    #[must_use]
    pub fn name(&self, key: i32) -> &str {
        match self.labels.get(&key) {
            Some(label) => &label.name,
            None => Self::UNASSIGNED_NAME,
        }
    }

    /// Label color for a key, falling back to the unassigned entry's
    /// transparent color
    #[must_use]
    pub fn color(&self, key: i32) -> Rgba {
        match self.labels.get(&key).or_else(|| self.labels.get(&self.unassigned_key)) {
            Some(label) => label.color,
            None => [0.0, 0.0, 0.0, 0.0],
        }
    }

    #[must_use]
    pub fn unassigned_key(&self) -> i32 {
        self.unassigned_key
    }

    #[must_use]
    pub fn contains(&self, key: i32) -> bool {
        self.labels.contains_key(&key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Keys in ascending order (stable iteration for display and tests)
    #[must_use]
    pub fn sorted_keys(&self) -> Vec<i32> {
        self.labels.keys().copied().sorted().collect()
    }
}
