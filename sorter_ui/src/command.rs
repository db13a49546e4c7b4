//! Console command grammar.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    cmd: UiCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// Allow automatic sorting and belt commands
    Enable,
    /// Stop the belt and ignore beam breaks
    Disable,
    /// Run the belt at SPEED (negative reverses, 0 stops)
    #[command(alias = "belt")]
    Speed {
        #[arg(allow_negative_numbers = true)]
        speed: i8,
    },
    /// Strip hue slider (0..=180)
    Hue {
        #[arg(value_parser = clap::value_parser!(u16).range(0..=180))]
        hue: u16,
    },
    /// Strip saturation slider (0..=100)
    #[command(alias = "sat")]
    Saturation {
        #[arg(value_parser = clap::value_parser!(u16).range(0..=100))]
        saturation: u16,
    },
    /// Strip brightness slider (0..=100)
    #[command(alias = "val")]
    Value {
        #[arg(value_parser = clap::value_parser!(u16).range(0..=100))]
        value: u16,
    },
    /// Re-open the LED strip and replay the boot animation
    ResetStrip,
    /// Home the sweeper against the limit switch
    Home,
    /// Move the sweeper by STEPS (negative is toward home)
    Move {
        #[arg(allow_negative_numbers = true)]
        steps: i32,
    },
    /// Sort the part on the belt into LABEL's bin
    Sort { label: String },
    /// Simulate a beam break
    Beam,
    /// Print system status
    Status,
    /// Leave the console
    #[command(alias = "exit")]
    Quit,
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<UiCommand>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    Line::try_parse_from(words).map(|l| Some(l.cmd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("enable", UiCommand::Enable)]
    #[case("  disable  ", UiCommand::Disable)]
    #[case("speed 3", UiCommand::Speed { speed: 3 })]
    #[case("belt -2", UiCommand::Speed { speed: -2 })]
    #[case("hue 180", UiCommand::Hue { hue: 180 })]
    #[case("sat 40", UiCommand::Saturation { saturation: 40 })]
    #[case("value 0", UiCommand::Value { value: 0 })]
    #[case("reset-strip", UiCommand::ResetStrip)]
    #[case("home", UiCommand::Home)]
    #[case("move -250", UiCommand::Move { steps: -250 })]
    #[case("sort ceramic_capacitor", UiCommand::Sort { label: "ceramic_capacitor".into() })]
    #[case("beam", UiCommand::Beam)]
    #[case("status", UiCommand::Status)]
    #[case("exit", UiCommand::Quit)]
    fn parses(#[case] line: &str, #[case] expected: UiCommand) {
        assert_eq!(parse_line(line).unwrap(), Some(expected));
    }

    #[rstest]
    #[case("hue 181")]
    #[case("saturation 101")]
    #[case("speed fast")]
    #[case("speed 300")]
    #[case("sort")]
    #[case("launch")]
    fn rejects(#[case] line: &str) {
        assert!(parse_line(line).is_err(), "{line} should not parse");
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse_line("   ").unwrap(), None);
    }
}
