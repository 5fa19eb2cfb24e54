//! Price sparkline for inline visualization

/// Block characters for different price levels (8 levels)
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A one-line sparkline scaled between the series minimum and maximum
pub struct Sparkline<'a> {
    /// Values in time order
    values: &'a [f64],
    min: f64,
    max: f64,
}

impl<'a> Sparkline<'a> {
    pub fn new(values: &'a [f64]) -> Self {
        let (min, max) = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        Self { values, min, max }
    }

    fn value_to_block(&self, value: f64) -> char {
        let range = self.max - self.min;
        if !value.is_finite() || !range.is_finite() || range <= 0.0 {
            return BLOCKS[3];
        }
        let normalized = ((value - self.min) / range).clamp(0.0, 1.0);
        let index = ((normalized * 7.0).round() as usize).min(7);
        BLOCKS[index]
    }

    /// Renders at most `width` characters, averaging values into buckets
    pub fn render(&self, width: usize) -> String {
        if width == 0 || self.values.is_empty() {
            return String::new();
        }

        let buckets = width.min(self.values.len());
        (0..buckets)
            .map(|i| {
                let start = i * self.values.len() / buckets;
                let end = ((i + 1) * self.values.len() / buckets).max(start + 1);
                let slice = &self.values[start..end];
                let mean = slice.iter().sum::<f64>() / slice.len() as f64;
                self.value_to_block(mean)
            })
            .collect()
    }
}
