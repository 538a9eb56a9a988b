//! Transforming STMPE610 measurements into output coordinates.
//!
//! The STMPE610 ADC produces 12-bit X and Y measurements, but the usable
//! range of a real panel is narrower than 0..4096 and differs per axis
//! because the two resistive layers are driven differently. Each axis
//! therefore has a fixed [`AxisCalibration`] window. Measurements outside
//! the window are clamped to it and the window is then rescaled linearly to
//! the configured [`Dimensions`].
//!
//! The [`Orientation`] flags are applied in this order:
//!
//! 1. `FLIP_X` / `FLIP_Y` mirror each individual raw sample as `4096 - v`
//!    while the FIFO is drained (see [`crate::sample`]). The calibration
//!    window of a flipped axis is mirrored the same way so the panel edges
//!    still land on the output edges.
//! 2. `SWAP_XY` exchanges the averaged X and Y measurements, together with
//!    their calibration windows.
//! 3. Both axes are rescaled into `0..=max_x` and `0..=max_y`.

use embedded_graphics::geometry::Size;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Full scale of a 12-bit measurement, the base used when mirroring an axis.
pub const ADC_FULL_SCALE: u16 = 4096;

/// Largest 12-bit measurement.
pub const ADC_MAX: u16 = ADC_FULL_SCALE - 1;

/// Usable window of the raw X measurement.
pub const X_CALIBRATION: AxisCalibration = AxisCalibration::new(250, 3800);

/// Usable window of the raw Y measurement.
pub const Y_CALIBRATION: AxisCalibration = AxisCalibration::new(150, 3700);

bitflags::bitflags! {
    /// Axis flip and swap flags applied to raw measurements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Orientation: u8 {
        /// Mirror the X axis.
        const FLIP_X = 0x01;
        /// Mirror the Y axis.
        const FLIP_Y = 0x02;
        /// Exchange the X and Y axes.
        const SWAP_XY = 0x04;
    }
}

#[cfg(feature = "defmt")]
impl Format for Orientation {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Orientation({=u8:#x})", self.bits())
    }
}

/// Largest coordinate reported on each output axis.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub max_x: u16,
    pub max_y: u16,
}

impl Dimensions {
    pub const fn new(max_x: u16, max_y: u16) -> Self {
        Self { max_x, max_y }
    }
}

impl Default for Dimensions {
    /// The full 12-bit range on both axes.
    fn default() -> Self {
        Self::new(ADC_MAX, ADC_MAX)
    }
}

impl From<Size> for Dimensions {
    /// Covers a display of `size` pixels, so the largest coordinate on each
    /// axis is the last pixel index.
    fn from(size: Size) -> Self {
        let last = |pixels: u32| u16::try_from(pixels.saturating_sub(1)).unwrap_or(u16::MAX);
        Self::new(last(size.width), last(size.height))
    }
}

/// Window of raw measurements that covers the panel along one axis.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisCalibration {
    pub min: u16,
    pub max: u16,
}

impl AxisCalibration {
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    /// The same window seen through a mirrored axis.
    pub const fn flipped(self) -> Self {
        Self::new(flip(self.max), flip(self.min))
    }

    /// Rescales `raw` from this window into `0..=out_max`.
    pub fn map(self, raw: u16, out_max: u16) -> u16 {
        map_axis(raw, self.min, self.max, 0, out_max)
    }
}

/// Mirrors a 12-bit measurement.
pub const fn flip(value: u16) -> u16 {
    ADC_FULL_SCALE.saturating_sub(value)
}

/// Clamps `raw` into `in_min..=in_max` and rescales it linearly into
/// `out_min..=out_max`, truncating.
///
/// A degenerate input window (`in_max <= in_min`) maps everything to
/// `out_min`, as does an inverted output window.
pub fn map_axis(raw: u16, in_min: u16, in_max: u16, out_min: u16, out_max: u16) -> u16 {
    if in_max <= in_min {
        return out_min;
    }
    let clamped = u32::from(raw.clamp(in_min, in_max));
    let in_span = u32::from(in_max - in_min);
    let out_span = u32::from(out_max.saturating_sub(out_min));
    let scaled = (clamped - u32::from(in_min)) * out_span / in_span;
    // scaled <= out_span, so the sum never exceeds out_max.
    out_min + scaled as u16
}

/// Transforms an averaged measurement, whose samples have already been
/// flipped per `orientation`, into output coordinates.
pub fn map_point(x: u16, y: u16, orientation: Orientation, dimensions: Dimensions) -> (u16, u16) {
    let mut x_axis = (x, X_CALIBRATION);
    let mut y_axis = (y, Y_CALIBRATION);
    if orientation.contains(Orientation::FLIP_X) {
        x_axis.1 = x_axis.1.flipped();
    }
    if orientation.contains(Orientation::FLIP_Y) {
        y_axis.1 = y_axis.1.flipped();
    }
    if orientation.contains(Orientation::SWAP_XY) {
        core::mem::swap(&mut x_axis, &mut y_axis);
    }
    (
        x_axis.1.map(x_axis.0, dimensions.max_x),
        y_axis.1.map(y_axis.0, dimensions.max_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_axis_clamps_below_window() {
        assert_eq!(map_axis(0, 150, 3700, 0, 4095), map_axis(150, 150, 3700, 0, 4095));
        assert_eq!(map_axis(0, 150, 3700, 0, 4095), 0);
    }

    #[test]
    fn map_axis_clamps_above_window() {
        assert_eq!(map_axis(4095, 250, 3800, 0, 4095), 4095);
        assert_eq!(map_axis(3801, 250, 3800, 10, 20), 20);
    }

    #[test]
    fn map_axis_scales_linearly() {
        // (204 - 150) * 4095 / 3550 = 62.29
        assert_eq!(map_axis(204, 150, 3700, 0, 4095), 62);
        assert_eq!(map_axis(1925, 150, 3700, 0, 320), 160);
        assert_eq!(map_axis(500, 0, 1000, 100, 200), 150);
    }

    #[test]
    fn map_axis_inverse_round_trips_within_rounding() {
        for raw in (250..=3800).step_by(37) {
            let out = map_axis(raw, 250, 3800, 0, 4095);
            let back = map_axis(out, 0, 4095, 250, 3800);
            assert!(raw.abs_diff(back) <= 1, "raw {} came back as {}", raw, back);
        }
    }

    #[test]
    fn map_axis_degenerate_windows() {
        assert_eq!(map_axis(1000, 500, 500, 7, 100), 7);
        assert_eq!(map_axis(1000, 0, 4095, 100, 7), 100);
    }

    #[test]
    fn flip_mirrors_around_full_scale() {
        assert_eq!(flip(1000), 3096);
        assert_eq!(flip(0), 4096);
        assert_eq!(X_CALIBRATION.flipped(), AxisCalibration::new(296, 3846));
    }

    #[test]
    fn orientation_from_raw_flags() {
        let orientation = Orientation::from_bits_truncate(0x01 | 0x04 | 0x80);
        assert!(orientation.contains(Orientation::FLIP_X));
        assert!(orientation.contains(Orientation::SWAP_XY));
        assert!(!orientation.contains(Orientation::FLIP_Y));
        assert_eq!(Orientation::default(), Orientation::empty());
    }

    #[test]
    fn map_point_default_orientation() {
        assert_eq!(map_point(104, 204, Orientation::empty(), Dimensions::default()), (0, 62));
    }

    #[test]
    fn map_point_swap_keeps_axis_windows() {
        let dimensions = Dimensions::new(319, 239);
        // Raw Y at its window minimum becomes output X = 0, raw X at its
        // window maximum becomes output Y = max.
        assert_eq!(map_point(3800, 150, Orientation::SWAP_XY, dimensions), (0, 239));
    }

    #[test]
    fn map_point_flipped_edges_reach_output_edges() {
        let dimensions = Dimensions::new(239, 319);
        let orientation = Orientation::FLIP_X | Orientation::FLIP_Y;
        assert_eq!(map_point(flip(250), flip(150), orientation, dimensions), (239, 319));
        assert_eq!(map_point(flip(3800), flip(3700), orientation, dimensions), (0, 0));
    }

    #[test]
    fn dimensions_from_display_size() {
        assert_eq!(Dimensions::from(Size::new(240, 320)), Dimensions::new(239, 319));
        assert_eq!(Dimensions::from(Size::new(0, 100_000)), Dimensions::new(0, u16::MAX));
    }
}
