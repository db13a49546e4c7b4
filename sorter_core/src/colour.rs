//! HSV colour state for the LED strip.
//!
//! Colours are held normalized (`0.0..=1.0` on every axis). The UI talks in
//! slider units: hue `0..=180`, saturation and value `0..=100`.

use sorter_traits::Rgb;

pub const HUE_SLIDER_MAX: f32 = 180.0;
pub const PERCENT_SLIDER_MAX: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsv {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

impl Hsv {
    pub fn new(hue: f32, saturation: f32, value: f32) -> Self {
        Self {
            hue: unit(hue),
            saturation: unit(saturation),
            value: unit(value),
        }
    }

    pub fn from_sliders(hue: f32, saturation: f32, value: f32) -> Self {
        Self::new(
            hue / HUE_SLIDER_MAX,
            saturation / PERCENT_SLIDER_MAX,
            value / PERCENT_SLIDER_MAX,
        )
    }

    pub fn to_sliders(self) -> (f32, f32, f32) {
        (
            self.hue * HUE_SLIDER_MAX,
            self.saturation * PERCENT_SLIDER_MAX,
            self.value * PERCENT_SLIDER_MAX,
        )
    }

    /// Replace every axis present in `change`, keep the others.
    pub fn merge(self, change: ColourChange) -> Self {
        Self {
            hue: change.hue.map_or(self.hue, |h| unit(h / HUE_SLIDER_MAX)),
            saturation: change
                .saturation
                .map_or(self.saturation, |s| unit(s / PERCENT_SLIDER_MAX)),
            value: change
                .value
                .map_or(self.value, |v| unit(v / PERCENT_SLIDER_MAX)),
        }
    }

    pub fn to_rgb(self) -> Rgb {
        let (r, g, b) = hsv_to_rgb(self.hue, self.saturation, self.value);
        Rgb::new(channel(r), channel(g), channel(b))
    }
}

/// A partial colour update in slider units. Absent axes are left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColourChange {
    pub hue: Option<f32>,
    pub saturation: Option<f32>,
    pub value: Option<f32>,
}

impl ColourChange {
    pub fn hue(hue: f32) -> Self {
        Self {
            hue: Some(hue),
            ..Self::default()
        }
    }

    pub fn saturation(saturation: f32) -> Self {
        Self {
            saturation: Some(saturation),
            ..Self::default()
        }
    }

    pub fn value(value: f32) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hue.is_none() && self.saturation.is_none() && self.value.is_none()
    }
}

#[inline]
fn unit(x: f32) -> f32 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

#[inline]
fn channel(x: f32) -> u8 {
    (unit(x) * 255.0) as u8
}

/// Six-sector HSV to RGB, all components in `0.0..=1.0`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (v, v, v);
    }
    let scaled = h * 6.0;
    let sector = scaled.floor();
    let f = scaled - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i32).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Rainbow sweep frame: pixel `i` of `out` gets hue
/// `((i * 256 / len) + step) mod 256 / 256` at full saturation and value.
pub fn rainbow_frame(step: f32, out: &mut [Rgb]) {
    let len = out.len().max(1);
    for (i, px) in out.iter_mut().enumerate() {
        let wheel = ((i * 256 / len) as f32 + step).rem_euclid(256.0);
        *px = Hsv::new(wheel / 256.0, 1.0, 1.0).to_rgb();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, Rgb::new(255, 0, 0))]
    #[case(1.0 / 3.0, Rgb::new(0, 255, 0))]
    #[case(2.0 / 3.0, Rgb::new(0, 0, 255))]
    #[case(1.0, Rgb::new(255, 0, 0))]
    fn primaries(#[case] hue: f32, #[case] expected: Rgb) {
        assert_eq!(Hsv::new(hue, 1.0, 1.0).to_rgb(), expected);
    }

    #[test]
    fn zero_saturation_is_grey() {
        assert_eq!(Hsv::new(0.7, 0.0, 0.5).to_rgb(), Rgb::new(127, 127, 127));
    }

    #[test]
    fn merge_keeps_absent_axes() {
        let start = Hsv::from_sliders(90.0, 50.0, 100.0);
        let merged = start.merge(ColourChange::value(25.0));
        assert_eq!(merged.hue, start.hue);
        assert_eq!(merged.saturation, start.saturation);
        assert_eq!(merged.value, 0.25);
    }

    #[test]
    fn sliders_are_clamped() {
        let hsv = Hsv::default().merge(ColourChange {
            hue: Some(400.0),
            saturation: Some(-3.0),
            value: Some(f32::NAN),
        });
        assert_eq!(hsv, Hsv::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn rainbow_starts_red_and_wraps() {
        let mut frame = [Rgb::OFF; 4];
        rainbow_frame(0.0, &mut frame);
        assert_eq!(frame[0], Rgb::new(255, 0, 0));
        let mut shifted = [Rgb::OFF; 4];
        rainbow_frame(256.0, &mut shifted);
        assert_eq!(frame, shifted);
    }
}
