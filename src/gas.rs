//! Running gas-resistance range.

/// Smallest and largest gas resistance seen since boot.
///
/// Empty until the first reading. Only ever widens, so every value passed
/// to [`GasRange::update`] stays inside it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GasRange {
    bounds: Option<(f32, f32)>,
}

impl GasRange {
    pub const fn new() -> Self {
        GasRange { bounds: None }
    }

    pub fn min(&self) -> Option<f32> {
        self.bounds.map(|(min, _)| min)
    }

    pub fn max(&self) -> Option<f32> {
        self.bounds.map(|(_, max)| max)
    }

    /// The range after observing `value`. NaN readings are ignored.
    #[must_use]
    pub fn widened(self, value: f32) -> Self {
        if value.is_nan() {
            return self;
        }
        let bounds = match self.bounds {
            None => (value, value),
            Some((min, max)) => (min.min(value), max.max(value)),
        };
        GasRange {
            bounds: Some(bounds),
        }
    }

    pub fn update(&mut self, value: f32) {
        *self = self.widened(value);
    }

    pub fn contains(&self, value: f32) -> bool {
        self.bounds
            .is_some_and(|(min, max)| min <= value && value <= max)
    }

    /// Where `value` sits in the range, 0 at the minimum and 1 at the maximum.
    ///
    /// `None` while the range is empty or a single point.
    pub fn fraction(&self, value: f32) -> Option<f32> {
        let (min, max) = self.bounds?;
        if min == max {
            return None;
        }
        Some(((value - min) / (max - min)).clamp(0.0, 1.0))
    }
}
