//! Status lights: boot animation, colour merging and the status pixel.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sorter_core::{ColourChange, Hsv, LightsCfg, StatusLights, StripFactory, SystemStatus};
use sorter_hardware::SimStrip;
use sorter_traits::Rgb;
use sorter_traits::clock::test_clock::TestClock;

const LEN: usize = 8;

fn factory(strip: &SimStrip) -> StripFactory {
    let strip = strip.clone();
    Box::new(move || Ok(Box::new(strip.clone()) as Box<dyn sorter_traits::PixelStrip>))
}

fn lights(strip: &SimStrip) -> StatusLights {
    StatusLights::new(
        factory(strip),
        LightsCfg::default(),
        Arc::new(TestClock::new()),
    )
    .unwrap()
}

#[test]
fn boot_animation_ends_on_idle_colour() {
    let strip = SimStrip::new(LEN);
    let lights = lights(&strip);
    lights.wait_boot();
    assert!(!lights.is_animating());
    assert!(strip.shown().iter().all(|px| *px == Rgb::new(255, 197, 143)));
    // one show per frame plus the idle fill
    assert_eq!(strip.shows(), 128 + 1);
}

#[test]
fn status_pixel_is_last_and_survives_fills() {
    let strip = SimStrip::new(LEN);
    let lights = lights(&strip);
    lights.set_status_light(SystemStatus::Working).unwrap();
    lights.change_colour(ColourChange::value(100.0)).unwrap();
    lights.shutdown();

    let shown = strip.shown();
    assert_eq!(shown[LEN - 1], SystemStatus::Working.lamp());
    assert!(shown[..LEN - 1].iter().all(|px| *px == Rgb::new(255, 255, 255)));
}

#[test]
fn status_light_is_written_synchronously() {
    let strip = SimStrip::new(LEN);
    let lights = lights(&strip);
    lights.wait_boot();
    lights.set_status_light(SystemStatus::Ready).unwrap();
    assert_eq!(strip.shown()[LEN - 1], Rgb::new(0, 255, 0));
    lights.set_status_light(SystemStatus::Busy).unwrap();
    assert_eq!(strip.shown()[LEN - 1], Rgb::new(255, 0, 0));
    assert_eq!(strip.shown()[0], Rgb::new(255, 197, 143));
}

#[test]
fn colour_changes_merge_per_axis() {
    let strip = SimStrip::new(LEN);
    let lights = lights(&strip);
    lights.change_colour(ColourChange::value(100.0)).unwrap();
    lights.change_colour(ColourChange::saturation(100.0)).unwrap();
    let rgb = lights.change_colour(ColourChange::hue(60.0)).unwrap();
    // hue 60/180 = 1/3 turn
    assert_eq!(rgb, Rgb::new(0, 255, 0));
    assert_eq!(lights.colour(), Hsv::from_sliders(60.0, 100.0, 100.0));

    let rgb = lights.change_colour(ColourChange::value(0.0)).unwrap();
    assert_eq!(rgb, Rgb::OFF);
    assert_eq!(lights.colour().hue, Hsv::from_sliders(60.0, 0.0, 0.0).hue);
    lights.shutdown();
}

#[test]
fn colour_change_stops_the_boot_animation() {
    let strip = SimStrip::new(LEN);
    let lights = lights(&strip);
    let rgb = lights
        .change_colour(ColourChange {
            hue: Some(0.0),
            saturation: Some(100.0),
            value: Some(100.0),
        })
        .unwrap();
    assert!(!lights.is_animating());
    lights.shutdown();
    assert_eq!(rgb, Rgb::new(255, 0, 0));
    assert_eq!(strip.shown()[0], Rgb::new(255, 0, 0));
}

#[test]
fn reset_reopens_strip_and_keeps_colour() {
    let strip = SimStrip::new(LEN);
    let opened = Arc::new(AtomicUsize::new(0));
    let factory: StripFactory = {
        let strip = strip.clone();
        let opened = Arc::clone(&opened);
        Box::new(move || {
            opened.fetch_add(1, Ordering::AcqRel);
            Ok(Box::new(strip.clone()) as Box<dyn sorter_traits::PixelStrip>)
        })
    };
    let lights = StatusLights::new(factory, LightsCfg::default(), Arc::new(TestClock::new())).unwrap();
    lights.change_colour(ColourChange::hue(90.0)).unwrap();
    let before = lights.colour();

    lights.reset().unwrap();
    lights.wait_boot();
    assert_eq!(opened.load(Ordering::Acquire), 2);
    assert_eq!(lights.colour(), before);
    assert!(!lights.is_animating());
}
