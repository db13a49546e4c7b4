use sorter_config::load_toml;
use rstest::rstest;

const PINS: &str = r#"
[pins]
belt_dir = 20
belt_step = 21
sweeper_dir = 23
sweeper_step = 24
limit_switch = 26
beam_break = 17
"#;

fn with(section: &str) -> String {
    format!("{PINS}\n{section}\n")
}

#[rstest]
#[case("[belt]\ndistance_multiplier = 0.0", "belt.distance_multiplier must be > 0")]
#[case("[belt]\nduty_cycle = 1.5", "belt.duty_cycle")]
#[case("[belt]\nmax_speed = 5\ndefault_sort_speed = 6", "belt.default_sort_speed")]
#[case("[belt]\ndefault_sort_speed = 0", "belt.default_sort_speed")]
#[case("[sweeper]\nmax_position = 0", "sweeper.max_position must be > 0")]
#[case("[sweeper]\nstep_half_period_us = 0", "sweeper.step_half_period_us")]
#[case(
    "[sweeper]\nstep_half_period_us = 500\nhoming_half_period_us = 100",
    "sweeper.homing_half_period_us"
)]
#[case("[sweeper]\nhome_overtravel_steps = 0", "sweeper.home_overtravel_steps")]
#[case("[lights]\ncount = 0", "lights.count must be >= 1")]
#[case("[sorting]\nclassify_timeout_ms = 0", "sorting.classify_timeout_ms")]
#[case("[sorting]\npoll_ms = 0", "sorting.poll_ms")]
#[case("[bins]\nresistor = 100", "bins must contain \"refuse\"")]
#[case("[bins]\nrefuse = 9000", "bins.refuse = 9000 is outside")]
fn rejects_out_of_range_values(#[case] section: &str, #[case] needle: &str) {
    let cfg = load_toml(&with(section)).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "error {err:?} should mention {needle}"
    );
}

#[rstest]
fn accepts_full_config() {
    let toml = with(
        r#"
[belt]
distance_multiplier = 150.0
frequency_per_speed = 250.0
duty_cycle = 0.5
max_speed = 5
default_sort_speed = -3

[sweeper]
max_position = 6000
step_half_period_us = 80
homing_half_period_us = 800
homing_backoff_steps = 40
home_overtravel_steps = 300
debounce_ms = 50

[lights]
count = 24
idle_colour = [255, 255, 255]

[sorting]
beam_settle_ms = 250
classify_timeout_ms = 3000

[bins]
refuse = 5800
resistor = 300

[logging]
level = "debug"
rotation = "daily"
"#,
    );
    let cfg = load_toml(&toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.belt.default_sort_speed, -3);
    assert_eq!(cfg.lights.idle_colour, [255, 255, 255]);
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
}

#[rstest]
fn missing_pins_fail_to_parse() {
    let err = load_toml("[belt]\nmax_speed = 5\n").expect_err("pins are required");
    assert!(format!("{err}").contains("pins"));
}
