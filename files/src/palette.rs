use brainmap_stats::FastStatistics;
use derive_builder::Builder;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// A continuous color ramp for rendering scalar data.
///
/// Control points pair a normalized scalar in `[-1.0, 1.0]` with an RGB
/// color; lookups interpolate linearly between the bracketing points.
/// Distinct from a label table, which is discrete and keyed by integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub name: String,
    control_points: Vec<(f32, [f32; 3])>,
}

impl Palette {
    /// Build a palette from `(normalized scalar, rgb)` control points.
    /// Points are sorted by scalar; callers may supply them in any order.
    #[must_use]
    pub fn new(name: impl Into<String>, mut control_points: Vec<(f32, [f32; 3])>) -> Self {
        control_points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            name: name.into(),
            control_points,
        }
    }

    /// Interpolated color for a normalized value, clamped to `[-1.0, 1.0]`
    #[must_use]
    pub fn color_at(&self, normalized: f32) -> [f32; 3] {
        if self.control_points.is_empty() {
            return [0.0, 0.0, 0.0];
        }
        let value = normalized.clamp(-1.0, 1.0);
        let first = &self.control_points[0];
        if value <= first.0 {
            return first.1;
        }
        let last = &self.control_points[self.control_points.len() - 1];
        if value >= last.0 {
            return last.1;
        }
        for pair in self.control_points.windows(2) {
            let (low_scalar, low_color) = pair[0];
            let (high_scalar, high_color) = pair[1];
            if value <= high_scalar {
                let span = high_scalar - low_scalar;
                if span <= 0.0 {
                    return high_color;
                }
                let t = (value - low_scalar) / span;
                return [
                    low_color[0] + t * (high_color[0] - low_color[0]),
                    low_color[1] + t * (high_color[1] - low_color[1]),
                    low_color[2] + t * (high_color[2] - low_color[2]),
                ];
            }
        }
        last.1
    }
}

/// Built-in palette presets, constructed on first use
static BUILTIN_PALETTES: Lazy<Vec<Palette>> = Lazy::new(|| {
    vec![
        // signature orange-to-blue ramp used as the default for functional data
        Palette::new(
            "roy-big-bl",
            vec![
                (-1.0, [0.0, 0.0, 0.6]),
                (-0.5, [0.0, 0.4, 1.0]),
                (-0.05, [0.0, 1.0, 1.0]),
                (0.0, [0.0, 0.0, 0.0]),
                (0.05, [1.0, 1.0, 0.0]),
                (0.5, [1.0, 0.4, 0.0]),
                (1.0, [0.6, 0.0, 0.0]),
            ],
        ),
        Palette::new(
            "psych",
            vec![
                (-1.0, [0.0, 0.0, 1.0]),
                (-0.01, [0.0, 1.0, 1.0]),
                (0.0, [0.0, 0.0, 0.0]),
                (0.01, [1.0, 0.0, 0.0]),
                (1.0, [1.0, 1.0, 0.0]),
            ],
        ),
        Palette::new(
            "gray-interp",
            vec![(-1.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 1.0])],
        ),
        Palette::new(
            "red-yellow",
            vec![(-1.0, [1.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 0.0])],
        ),
        Palette::new(
            "blue-lightblue",
            vec![(-1.0, [0.0, 0.0, 1.0]), (1.0, [0.5, 0.8, 1.0])],
        ),
    ]
});

/// Look up a built-in palette preset by name
#[must_use]
pub fn palette_by_name(name: &str) -> Option<&'static Palette> {
    BUILTIN_PALETTES.iter().find(|palette| palette.name == name)
}

/// How raw scalar values map onto the palette's normalized range
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum ScaleMode {
    /// Span the data's full min/max
    AutoScale,
    /// Span approximate percentiles of the positive and negative values
    AutoScalePercentage,
    /// Span approximate percentiles of the absolute values, symmetric
    /// about zero
    AutoScaleAbsolutePercentage,
    /// Span user-supplied bounds
    UserScale,
}

/// Whether thresholding is applied to the coloring
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum ThresholdType {
    Off,
    Normal,
}

/// Which side of the threshold interval stays visible
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum ThresholdTest {
    /// Show values inside `[minimum, maximum]`
    ShowInside,
    /// Show values outside `[minimum, maximum]`
    ShowOutside,
}

/// Palette selection, scaling, and threshold settings for one scalar map.
///
/// Supplied by the application and shared into the map's content cache;
/// replacing a map's mapping invalidates that map's cached coloring and
/// nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct PaletteColorMapping {
    #[builder(default = "\"roy-big-bl\".to_string()")]
    pub palette_name: String,
    #[builder(default = "ScaleMode::AutoScale")]
    pub scale_mode: ScaleMode,

    /// User-scale display bounds (most negative, least negative,
    /// least positive, most positive)
    #[builder(default = "-100.0")]
    pub user_scale_most_negative: f32,
    #[builder(default = "0.0")]
    pub user_scale_least_negative: f32,
    #[builder(default = "0.0")]
    pub user_scale_least_positive: f32,
    #[builder(default = "100.0")]
    pub user_scale_most_positive: f32,

    /// Percentile bounds for AutoScalePercentage
    #[builder(default = "98.0")]
    pub auto_scale_percentage_negative_maximum: f32,
    #[builder(default = "2.0")]
    pub auto_scale_percentage_negative_minimum: f32,
    #[builder(default = "2.0")]
    pub auto_scale_percentage_positive_minimum: f32,
    #[builder(default = "98.0")]
    pub auto_scale_percentage_positive_maximum: f32,

    /// Percentile bounds for AutoScaleAbsolutePercentage
    #[builder(default = "2.0")]
    pub auto_scale_absolute_percentage_minimum: f32,
    #[builder(default = "98.0")]
    pub auto_scale_absolute_percentage_maximum: f32,

    #[builder(default = "ThresholdType::Off")]
    pub threshold_type: ThresholdType,
    #[builder(default = "ThresholdTest::ShowInside")]
    pub threshold_test: ThresholdTest,
    #[builder(default = "-100.0")]
    pub threshold_minimum: f32,
    #[builder(default = "100.0")]
    pub threshold_maximum: f32,

    #[builder(default = "true")]
    pub display_positive: bool,
    #[builder(default = "true")]
    pub display_negative: bool,
    #[builder(default = "false")]
    pub display_zero: bool,
}

impl Default for PaletteColorMapping {
    fn default() -> Self {
        PaletteColorMappingBuilder::default()
            .build()
            .expect("builder defaults cover every field")
    }
}

impl PaletteColorMapping {
    /// Resolve the display bounds `(most_negative, least_negative,
    /// least_positive, most_positive)` for the current scale mode.
    ///
    /// Auto modes read the map's statistics, which is why coloring must
    /// fetch/recompute statistics before mapping values onto the palette.
    #[must_use]
    pub fn display_bounds(&self, statistics: &FastStatistics) -> (f32, f32, f32, f32) {
        match self.scale_mode {
            ScaleMode::AutoScale => (statistics.min.min(0.0), 0.0, 0.0, statistics.max.max(0.0)),
            ScaleMode::AutoScalePercentage => (
                statistics
                    .approx_negative_percentile(self.auto_scale_percentage_negative_maximum),
                statistics
                    .approx_negative_percentile(self.auto_scale_percentage_negative_minimum),
                statistics
                    .approx_positive_percentile(self.auto_scale_percentage_positive_minimum),
                statistics
                    .approx_positive_percentile(self.auto_scale_percentage_positive_maximum),
            ),
            ScaleMode::AutoScaleAbsolutePercentage => {
                let most = statistics
                    .approx_absolute_percentile(self.auto_scale_absolute_percentage_maximum);
                let least = statistics
                    .approx_absolute_percentile(self.auto_scale_absolute_percentage_minimum);
                (-most, -least, least, most)
            }
            ScaleMode::UserScale => (
                self.user_scale_most_negative,
                self.user_scale_least_negative,
                self.user_scale_least_positive,
                self.user_scale_most_positive,
            ),
        }
    }

    /// Whether a value survives the threshold settings
    #[must_use]
    pub fn value_passes_threshold(&self, value: f32) -> bool {
        match self.threshold_type {
            ThresholdType::Off => true,
            ThresholdType::Normal => {
                let inside = value >= self.threshold_minimum && value <= self.threshold_maximum;
                match self.threshold_test {
                    ThresholdTest::ShowInside => inside,
                    ThresholdTest::ShowOutside => !inside,
                }
            }
        }
    }
}
