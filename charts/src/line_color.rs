use serde::{Deserialize, Serialize};

/// Default chart-line color table: distinguishable hues ordered so that
/// consecutive series contrast well
const DEFAULT_LINE_COLORS: [[f32; 3]; 8] = [
    [0.855, 0.145, 0.114], // red
    [0.122, 0.467, 0.706], // blue
    [0.173, 0.627, 0.173], // green
    [1.000, 0.498, 0.055], // orange
    [0.580, 0.404, 0.741], // purple
    [0.549, 0.337, 0.294], // brown
    [0.890, 0.467, 0.761], // pink
    [0.498, 0.498, 0.498], // gray
];

/// Hands out default colors for new chart lines.
///
/// An explicit, owned generator: each chart model holds its own sequence,
/// so adding lines to one chart never perturbs the colors another chart
/// would assign. There is deliberately no process-wide counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineColorSequence {
    next: usize,
}

impl LineColorSequence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The next color in the cycle
    pub fn next_color(&mut self) -> [f32; 3] {
        let color = DEFAULT_LINE_COLORS[self.next % DEFAULT_LINE_COLORS.len()];
        self.next += 1;
        color
    }

    /// Restart the cycle (e.g. when a chart is cleared)
    pub fn reset(&mut self) {
        self.next = 0;
    }
}
