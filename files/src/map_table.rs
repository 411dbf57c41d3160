use tracing::warn;

use crate::error::{FileError, Result};
use crate::map::{MapDataKind, MapInfo};
use crate::map_content::MapContent;

/// The maps of one file with their cached content, kept in lock-step.
///
/// Every file variant composes one of these instead of re-implementing map
/// bookkeeping: `maps[i]` describes the same map whose data and caches live
/// in `contents[i]`, and both vectors always have identical length. The
/// table also pins the file's data kind — a file is palette-mapped or
/// label-table-mapped for all of its maps, never a mixture.
///
/// Out-of-range map indexes are programmer errors: asserted in debug
/// builds, a logged `None`/no-op in release builds.
#[derive(Debug, Clone)]
pub struct MapTable {
    maps: Vec<MapInfo>,
    contents: Vec<MapContent>,
    kind: MapDataKind,
}

impl MapTable {
    pub(crate) fn new(kind: MapDataKind) -> Self {
        Self {
            maps: Vec::new(),
            contents: Vec::new(),
            kind,
        }
    }

    pub(crate) fn push(&mut self, info: MapInfo, content: MapContent) -> Result<()> {
        if info.kind != self.kind {
            return Err(FileError::wrong_data_kind(
                format!("add map '{}'", info.name),
                self.kind.as_str(),
            ));
        }
        if content.kind() != self.kind {
            return Err(FileError::wrong_data_kind(
                format!("add content for map '{}'", info.name),
                self.kind.as_str(),
            ));
        }
        self.maps.push(info);
        self.contents.push(content);
        Ok(())
    }

    #[must_use]
    pub fn kind(&self) -> MapDataKind {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    fn index_ok(&self, index: usize, operation: &str) -> bool {
        if index < self.maps.len() {
            true
        } else {
            debug_assert!(
                false,
                "map index {index} out of range for {operation} ({} maps)",
                self.maps.len()
            );
            warn!(
                index,
                maps = self.maps.len(),
                operation,
                "map index out of range"
            );
            false
        }
    }

    #[must_use]
    pub fn map(&self, index: usize) -> Option<&MapInfo> {
        self.index_ok(index, "map info").then(|| &self.maps[index])
    }

    #[must_use]
    pub fn map_mut(&mut self, index: usize) -> Option<&mut MapInfo> {
        if self.index_ok(index, "map info") {
            Some(&mut self.maps[index])
        } else {
            None
        }
    }

    #[must_use]
    pub fn content(&self, index: usize) -> Option<&MapContent> {
        self.index_ok(index, "map content")
            .then(|| &self.contents[index])
    }

    #[must_use]
    pub fn content_mut(&mut self, index: usize) -> Option<&mut MapContent> {
        if self.index_ok(index, "map content") {
            Some(&mut self.contents[index])
        } else {
            None
        }
    }

    pub fn maps(&self) -> impl Iterator<Item = &MapInfo> {
        self.maps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label_table::LabelTable;
    use crate::palette::PaletteColorMapping;
    use std::sync::Arc;

    #[test]
    fn kinds_must_match_the_table() {
        let mut table = MapTable::new(MapDataKind::Scalar);
        let info = MapInfo::new("labels", MapDataKind::Label);
        let content = MapContent::new_label(vec![0.0], LabelTable::new());
        assert!(table.push(info, content).is_err());

        let info = MapInfo::new("scalars", MapDataKind::Scalar);
        let content =
            MapContent::new_scalar(vec![0.0], Arc::new(PaletteColorMapping::default()));
        assert!(table.push(info, content).is_ok());
        assert_eq!(table.len(), 1);
    }
}
