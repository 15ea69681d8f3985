//! Fitting text into a width budget.
//!
//! Two strategies: [`shrink_to_fit`] lowers the font scale until the text
//! fits, [`truncate_to_width`] keeps the scale and drops trailing characters.
//! Both only need a way to measure rendered width, see [`TextMeasure`].

/// A font scale that can be stepped down towards a floor.
pub trait Scale: Copy + PartialOrd {
    /// The next smaller scale, never below `floor`
    fn step_down(self, step: Self, floor: Self) -> Self;

    fn is_positive(self) -> bool;
}

impl Scale for f32 {
    fn step_down(self, step: Self, floor: Self) -> Self {
        let next = self - step;
        if next < floor {
            floor
        } else {
            next
        }
    }

    fn is_positive(self) -> bool {
        self > 0.0
    }
}

impl Scale for u8 {
    fn step_down(self, step: Self, floor: Self) -> Self {
        self.saturating_sub(step).max(floor)
    }

    fn is_positive(self) -> bool {
        self > 0
    }
}

/// Rendered text width in pixels at a given scale.
pub trait TextMeasure {
    type Scale: Scale;

    fn measure(&self, text: &str, scale: Self::Scale) -> u32;
}

/// Start, floor and decrement for [`shrink_to_fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShrinkPolicy<S> {
    pub start: S,
    pub floor: S,
    pub step: S,
}

/// Fine steps for the vector font used by the display name
pub const NAME_SHRINK: ShrinkPolicy<f32> = ShrinkPolicy {
    start: 2.0,
    floor: 0.1,
    step: 0.01,
};

/// Whole steps for the bitmap font used by the handle line
pub const HANDLE_SHRINK: ShrinkPolicy<u8> = ShrinkPolicy {
    start: 4,
    floor: 1,
    step: 1,
};

/// Whole steps for the bitmap font used by the pronouns line
pub const PRONOUNS_SHRINK: ShrinkPolicy<u8> = ShrinkPolicy {
    start: 3,
    floor: 1,
    step: 1,
};

/// The scale [`shrink_to_fit`] settled on and the width measured at it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fit<S> {
    pub scale: S,
    pub width: u32,
}

impl<S> Fit<S> {
    pub fn fits(&self, budget: u32) -> bool {
        self.width <= budget
    }
}

/// Finds the largest scale in `[policy.floor, policy.start]` at which `text`
/// is no wider than `budget`, stepping down by `policy.step`.
///
/// If nothing fits, the floor scale is returned together with its
/// (overflowing) width.
pub fn shrink_to_fit<M: TextMeasure>(
    font: &M,
    text: &str,
    policy: ShrinkPolicy<M::Scale>,
    budget: u32,
) -> Fit<M::Scale> {
    debug_assert!(policy.start >= policy.floor);
    let mut scale = policy.start;
    let mut width = font.measure(text, scale);
    while width > budget && scale > policy.floor && policy.step.is_positive() {
        scale = scale.step_down(policy.step, policy.floor);
        width = font.measure(text, scale);
    }
    Fit { scale, width }
}

/// Drops trailing characters from `text` until it is no wider than `budget`
/// at `scale`.
///
/// Returns `text` untouched when it already fits. A zero-width measurement
/// counts as fitting, so a font that cannot measure never loops forever.
pub fn truncate_to_width<'a, M: TextMeasure>(
    font: &M,
    text: &'a str,
    scale: M::Scale,
    budget: u32,
) -> &'a str {
    let mut kept = text;
    loop {
        let width = font.measure(kept, scale);
        if width == 0 || width <= budget {
            return kept;
        }
        // Cut on a char boundary
        let end = kept.char_indices().next_back().map_or(0, |(i, _)| i);
        kept = &kept[..end];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{Bitmap8, Sans};

    /// 10px per byte at scale 1
    struct Fixed;

    impl TextMeasure for Fixed {
        type Scale = u8;

        fn measure(&self, text: &str, scale: u8) -> u32 {
            text.len() as u32 * 10 * u32::from(scale)
        }
    }

    /// Reports zero width for everything
    struct Blind;

    impl TextMeasure for Blind {
        type Scale = u8;

        fn measure(&self, _text: &str, _scale: u8) -> u32 {
            0
        }
    }

    #[test]
    fn shrink_keeps_start_scale_when_it_fits() {
        let fit = shrink_to_fit(&Fixed, "abc", HANDLE_SHRINK, 200);
        assert_eq!(fit.scale, 4);
        assert_eq!(fit.width, 120);
    }

    #[test]
    fn shrink_picks_largest_fitting_scale() {
        // 10 bytes: 400 at 4, 300 at 3, 200 at 2
        let fit = shrink_to_fit(&Fixed, "0123456789", HANDLE_SHRINK, 250);
        assert_eq!(fit.scale, 2);
        assert!(fit.fits(250));
    }

    #[test]
    fn shrink_returns_floor_when_nothing_fits() {
        let fit = shrink_to_fit(&Fixed, "0123456789", HANDLE_SHRINK, 50);
        assert_eq!(fit.scale, 1);
        assert_eq!(fit.width, 100);
        assert!(!fit.fits(50));
    }

    #[test]
    fn shrink_stays_within_policy_range_for_fine_steps() {
        for text in ["H. Badger", "A much longer display name than usual", ""] {
            for budget in [1, 50, 150, 274, 1000] {
                let fit = shrink_to_fit(&Sans, text, NAME_SHRINK, budget);
                assert!(fit.scale >= NAME_SHRINK.floor && fit.scale <= NAME_SHRINK.start);
                if Sans.measure(text, NAME_SHRINK.floor) <= budget {
                    assert!(fit.fits(budget), "{text:?} at {budget}");
                } else {
                    assert_eq!(fit.scale, NAME_SHRINK.floor);
                }
            }
        }
    }

    #[test]
    fn shrink_with_zero_step_does_not_spin() {
        let policy = ShrinkPolicy { start: 4, floor: 1, step: 0 };
        let fit = shrink_to_fit(&Fixed, "0123456789", policy, 10);
        assert_eq!(fit.scale, 4);
    }

    #[test]
    fn truncate_leaves_fitting_text_alone() {
        assert_eq!(truncate_to_width(&Fixed, "mustelid", 1, 80), "mustelid");
    }

    #[test]
    fn truncate_returns_fitting_prefix() {
        let text = "mustelid inc";
        let kept = truncate_to_width(&Fixed, text, 1, 55);
        assert_eq!(kept, "muste");
        assert!(text.starts_with(kept));
        assert!(Fixed.measure(kept, 1) <= 55);
    }

    #[test]
    fn truncate_can_empty_the_string() {
        assert_eq!(truncate_to_width(&Fixed, "abc", 1, 5), "");
    }

    #[test]
    fn truncate_respects_multibyte_boundaries() {
        let kept = truncate_to_width(&Bitmap8, "café société", 1, 30);
        assert!("café société".starts_with(kept));
        assert!(Bitmap8.measure(kept, 1) <= 30);
    }

    #[test]
    fn truncate_treats_zero_width_as_fitting() {
        assert_eq!(truncate_to_width(&Blind, "anything", 1, 0), "anything");
    }

    #[test]
    fn truncate_prefix_property_over_budgets() {
        let text = "mustelid inc";
        for budget in 0..120 {
            let kept = truncate_to_width(&Bitmap8, text, 3, budget);
            assert!(text.starts_with(kept));
            let width = Bitmap8.measure(kept, 3);
            assert!(width <= budget || width == 0);
        }
    }
}
