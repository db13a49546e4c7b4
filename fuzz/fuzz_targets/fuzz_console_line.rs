#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|line: &str| {
    if let Ok(Some(cmd)) = sorter_ui::parse_line(line) {
        // numeric arguments never escape their slider ranges
        match cmd {
            sorter_ui::UiCommand::Hue { hue } => assert!(hue <= 180),
            sorter_ui::UiCommand::Saturation { saturation } => assert!(saturation <= 100),
            sorter_ui::UiCommand::Value { value } => assert!(value <= 100),
            _ => {}
        }
    }
});
