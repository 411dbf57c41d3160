//! RGBA buffer generation for scalar (palette) and label (table) maps.
//!
//! These functions fill a `4 × len` float buffer in place. Values that should
//! not be drawn (NaN, thresholded out, sign classes the mapping hides,
//! unassigned label keys) get alpha 0.0 so renderers can skip them without
//! re-deriving the masking rules.

use brainmap_stats::FastStatistics;
use rayon::prelude::*;
use tracing::warn;

use crate::label_table::LabelTable;
use crate::palette::{Palette, PaletteColorMapping, palette_by_name};

/// Color one scalar map through its palette mapping.
///
/// The display bounds come from the map's statistics (auto-scale modes), so
/// callers must hand in current statistics — stale statistics would color
/// against a stale range.
pub fn color_scalars_with_palette(
    data: &[f32],
    statistics: &FastStatistics,
    mapping: &PaletteColorMapping,
    rgba: &mut Vec<f32>,
) {
    rgba.clear();
    rgba.resize(data.len() * 4, 0.0);

    let Some(palette) = palette_by_name(&mapping.palette_name) else {
        warn!(palette = %mapping.palette_name, "unknown palette; leaving map transparent");
        return;
    };
    let bounds = mapping.display_bounds(statistics);

    rgba.par_chunks_mut(4)
        .zip(data.par_iter())
        .for_each(|(out, &value)| {
            let color = scalar_color(value, palette, mapping, bounds);
            out.copy_from_slice(&color);
        });
}

fn scalar_color(
    value: f32,
    palette: &Palette,
    mapping: &PaletteColorMapping,
    bounds: (f32, f32, f32, f32),
) -> [f32; 4] {
    if value.is_nan() {
        return [0.0, 0.0, 0.0, 0.0];
    }
    let visible = if value > 0.0 {
        mapping.display_positive
    } else if value < 0.0 {
        mapping.display_negative
    } else {
        mapping.display_zero
    };
    if !visible || !mapping.value_passes_threshold(value) {
        return [0.0, 0.0, 0.0, 0.0];
    }
    let normalized = normalize_into_palette_range(value, bounds);
    let rgb = palette.color_at(normalized);
    [rgb[0], rgb[1], rgb[2], 1.0]
}

/// Map a raw value into the palette's normalized `[-1.0, 1.0]` range using
/// the four display bounds `(most_neg, least_neg, least_pos, most_pos)`.
fn normalize_into_palette_range(value: f32, bounds: (f32, f32, f32, f32)) -> f32 {
    let (most_neg, least_neg, least_pos, most_pos) = bounds;
    if value > 0.0 {
        let span = most_pos - least_pos;
        if span > 0.0 {
            ((value - least_pos) / span).clamp(0.0, 1.0)
        } else {
            1.0
        }
    } else if value < 0.0 {
        let span = most_neg - least_neg;
        if span < 0.0 {
            -(((value - least_neg) / span).clamp(0.0, 1.0))
        } else {
            -1.0
        }
    } else {
        0.0
    }
}

/// Color one label map through its label table.
///
/// Keys with no table entry take the unassigned entry's color with alpha
/// forced to zero, so unannotated regions disappear instead of painting a
/// misleading category color.
pub fn color_labels_with_table(data: &[f32], table: &LabelTable, rgba: &mut Vec<f32>) {
    rgba.clear();
    rgba.resize(data.len() * 4, 0.0);

    rgba.par_chunks_mut(4)
        .zip(data.par_iter())
        .for_each(|(out, &value)| {
            if value.is_nan() {
                return;
            }
            let key = value.round() as i32;
            let color = if table.contains(key) {
                table.color(key)
            } else {
                let mut unassigned = table.color(table.unassigned_key());
                unassigned[3] = 0.0;
                unassigned
            };
            out.copy_from_slice(&color);
        });
}
