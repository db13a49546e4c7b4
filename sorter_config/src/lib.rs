#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and bin-map parsing for the component sorter.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The bin map can also come from a CSV with strict headers, which then
//!   replaces the `[bins]` table.
use serde::Deserialize;
use std::collections::BTreeMap;

/// Label every bin map must contain; unknown and overflowed parts go here.
pub const REFUSE: &str = "refuse";

/// Bin-map CSV schema.
///
/// Expected headers:
/// label,position
///
/// Example:
/// label,position
/// refuse,7600
/// resistor,400
#[derive(Debug, Deserialize, Clone)]
pub struct BinRow {
    pub label: String,
    pub position: i32,
}

/// BCM pin numbers.
#[derive(Debug, Deserialize)]
pub struct Pins {
    pub belt_dir: u8,
    pub belt_step: u8,
    pub sweeper_dir: u8,
    pub sweeper_step: u8,
    pub limit_switch: u8,
    pub beam_break: u8,
    /// SPI bus driving the LED strip (MOSI of that bus carries the data)
    #[serde(default)]
    pub led_spi_bus: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BeltCfg {
    /// Belt travel in mm per second for each unit of speed
    pub distance_multiplier: f64,
    /// Driver step frequency (Hz) per unit of speed
    pub frequency_per_speed: f64,
    /// Fixed PWM duty while running (0.0..=1.0)
    pub duty_cycle: f64,
    /// Largest accepted |speed|
    pub max_speed: i8,
    /// Speed used to carry a classified part off the sensor
    pub default_sort_speed: i8,
}

impl Default for BeltCfg {
    fn default() -> Self {
        Self {
            distance_multiplier: 200.0,
            frequency_per_speed: 200.0,
            duty_cycle: 0.5,
            max_speed: 5,
            default_sort_speed: 3,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SweeperCfg {
    /// Far end of travel, in steps from home
    pub max_position: i32,
    /// Half of one step period for normal moves (us)
    pub step_half_period_us: u64,
    /// Half of one step period while seeking home (us); slower than normal moves
    pub homing_half_period_us: u64,
    /// Steps driven away from the switch before seeking it
    pub homing_backoff_steps: i32,
    /// Extra steps allowed past the expected home point before giving up
    pub home_overtravel_steps: i32,
    /// Limit switch bounce window (ms)
    pub debounce_ms: u64,
    /// Switch pulls the line to ground when pressed
    pub limit_active_low: bool,
}

impl Default for SweeperCfg {
    fn default() -> Self {
        Self {
            max_position: 8000,
            step_half_period_us: 100,
            homing_half_period_us: 1000,
            homing_backoff_steps: 20,
            home_overtravel_steps: 400,
            debounce_ms: 50,
            limit_active_low: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LightsCfg {
    /// Number of pixels; the last one is the status pixel
    pub count: usize,
    /// Global brightness applied by the strip driver (0..=255)
    pub brightness: u8,
    /// Colour the strip settles on after the boot animation
    pub idle_colour: [u8; 3],
    /// Boot animation length in frames
    pub boot_frames: u32,
    /// Hue advance per frame, in 1/256ths of the wheel
    pub boot_hue_step: f32,
    /// Delay between frames (ms)
    pub frame_ms: u64,
}

impl Default for LightsCfg {
    fn default() -> Self {
        Self {
            count: 17,
            brightness: 255,
            idle_colour: [255, 197, 143],
            boot_frames: 128,
            boot_hue_step: 5.0,
            frame_ms: 20,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SortingCfg {
    /// Let the part come to rest on the sensor before stopping the belt (ms)
    pub beam_settle_ms: u64,
    /// Give up on the classifier after this long and refuse the part (ms)
    pub classify_timeout_ms: u64,
    /// Beam-break bounce window (ms)
    pub beam_debounce_ms: u64,
    /// Belt distance a manually sorted part travels beyond its bin position
    /// (sensor offset plus arm length)
    pub travel_offset: f64,
    /// Poll interval while waiting out a manual sort's belt time budget (ms)
    pub poll_ms: u64,
}

impl Default for SortingCfg {
    fn default() -> Self {
        Self {
            beam_settle_ms: 500,
            classify_timeout_ms: 5000,
            beam_debounce_ms: 50,
            travel_offset: 10_000.0,
            poll_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// Camera frame size handed to the classifier
    pub camera_width: u32,
    pub camera_height: u32,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            camera_width: 640,
            camera_height: 480,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub belt: BeltCfg,
    #[serde(default)]
    pub sweeper: SweeperCfg,
    #[serde(default)]
    pub lights: LightsCfg,
    #[serde(default)]
    pub sorting: SortingCfg,
    /// label -> absolute sweeper position (steps)
    #[serde(default = "default_bins")]
    pub bins: BTreeMap<String, i32>,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub hardware: Hardware,
}

fn default_bins() -> BTreeMap<String, i32> {
    [
        ("resistor", 400),
        ("capacitor", 1200),
        ("ceramic_capacitor", 2000),
        ("inductor", 2800),
        ("diode", 3600),
        ("led", 4400),
        ("transistor", 5200),
        ("mosfet", 6000),
        ("ic", 6800),
        (REFUSE, 7600),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read a bin map from CSV with exact headers `label,position`.
pub fn load_bin_map_csv(path: &std::path::Path) -> eyre::Result<BTreeMap<String, i32>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open bin map CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["label", "position"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "bin map CSV must have headers 'label,position', got: {}",
            actual.join(",")
        );
    }

    let mut bins = BTreeMap::new();
    for (idx, rec) in rdr.deserialize::<BinRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if row.label.is_empty() {
            eyre::bail!("bin map CSV row {} has an empty label", idx + 2);
        }
        if bins.insert(row.label.clone(), row.position).is_some() {
            eyre::bail!("bin map CSV lists label {:?} twice", row.label);
        }
    }
    Ok(bins)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Belt
        if !(self.belt.distance_multiplier.is_finite() && self.belt.distance_multiplier > 0.0) {
            eyre::bail!("belt.distance_multiplier must be > 0");
        }
        if !(self.belt.frequency_per_speed.is_finite() && self.belt.frequency_per_speed > 0.0) {
            eyre::bail!("belt.frequency_per_speed must be > 0");
        }
        if !(self.belt.duty_cycle > 0.0 && self.belt.duty_cycle <= 1.0) {
            eyre::bail!("belt.duty_cycle must be in (0.0, 1.0]");
        }
        if self.belt.max_speed <= 0 {
            eyre::bail!("belt.max_speed must be > 0");
        }
        if self.belt.default_sort_speed == 0
            || self.belt.default_sort_speed.unsigned_abs() > self.belt.max_speed.unsigned_abs()
        {
            eyre::bail!("belt.default_sort_speed must be non-zero and within belt.max_speed");
        }

        // Sweeper
        if self.sweeper.max_position <= 0 {
            eyre::bail!("sweeper.max_position must be > 0");
        }
        if self.sweeper.step_half_period_us == 0 {
            eyre::bail!("sweeper.step_half_period_us must be >= 1");
        }
        if self.sweeper.homing_half_period_us < self.sweeper.step_half_period_us {
            eyre::bail!("sweeper.homing_half_period_us must be >= sweeper.step_half_period_us");
        }
        if self.sweeper.homing_backoff_steps < 0 {
            eyre::bail!("sweeper.homing_backoff_steps must be >= 0");
        }
        if self.sweeper.home_overtravel_steps <= 0 {
            eyre::bail!("sweeper.home_overtravel_steps must be > 0");
        }
        if self.sweeper.debounce_ms > 1000 {
            eyre::bail!("sweeper.debounce_ms is unreasonably large (>1s)");
        }

        // Lights
        if self.lights.count == 0 {
            eyre::bail!("lights.count must be >= 1");
        }
        if !(self.lights.boot_hue_step.is_finite() && self.lights.boot_hue_step >= 0.0) {
            eyre::bail!("lights.boot_hue_step must be >= 0");
        }

        // Sorting
        if self.sorting.classify_timeout_ms == 0 {
            eyre::bail!("sorting.classify_timeout_ms must be >= 1");
        }
        if self.sorting.poll_ms == 0 {
            eyre::bail!("sorting.poll_ms must be >= 1");
        }
        if !(self.sorting.travel_offset.is_finite() && self.sorting.travel_offset >= 0.0) {
            eyre::bail!("sorting.travel_offset must be >= 0");
        }

        // Bins
        validate_bins(&self.bins, self.sweeper.max_position)?;

        Ok(())
    }
}

/// Check a bin map against the sweeper travel. Shared by the `[bins]` table and CSV.
pub fn validate_bins(bins: &BTreeMap<String, i32>, max_position: i32) -> eyre::Result<()> {
    if !bins.contains_key(REFUSE) {
        eyre::bail!("bins must contain \"{REFUSE}\"");
    }
    for (label, pos) in bins {
        if *pos < 0 || *pos > max_position {
            eyre::bail!(
                "bins.{label} = {pos} is outside [0, sweeper.max_position = {max_position}]"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[pins]
belt_dir = 20
belt_step = 21
sweeper_dir = 23
sweeper_step = 24
limit_switch = 26
beam_break = 17
"#;

    #[test]
    fn minimal_config_takes_defaults() {
        let cfg = load_toml(MINIMAL).expect("parse");
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.sweeper.max_position, 8000);
        assert_eq!(cfg.sweeper.debounce_ms, 50);
        assert_eq!(cfg.lights.count, 17);
        assert_eq!(cfg.bins.get(REFUSE), Some(&7600));
    }

    #[test]
    fn explicit_bins_replace_defaults() {
        let toml = format!("{MINIMAL}\n[bins]\nrefuse = 100\nresistor = 200\n");
        let cfg = load_toml(&toml).expect("parse");
        assert_eq!(cfg.bins.len(), 2);
        cfg.validate().expect("valid");
    }
}
