//! System-wide status shown on the status pixel and the UI.

use sorter_traits::{Level, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    Ready,
    Busy,
    Working,
    Disabled,
    EmergencyStop,
}

impl SystemStatus {
    /// Colour of the reserved status pixel.
    pub fn lamp(self) -> Rgb {
        match self {
            SystemStatus::Ready => Rgb::new(0, 255, 0),
            SystemStatus::Busy | SystemStatus::EmergencyStop => Rgb::new(255, 0, 0),
            SystemStatus::Working => Rgb::new(255, 255, 0),
            SystemStatus::Disabled => Rgb::new(0, 0, 255),
        }
    }

    /// Automatic (beam-break) sorting is off in these states.
    pub fn suppresses_sorting(self) -> bool {
        matches!(self, SystemStatus::Disabled | SystemStatus::EmergencyStop)
    }

    pub fn level(self) -> Level {
        match self {
            SystemStatus::Ready => Level::Ok,
            SystemStatus::Busy | SystemStatus::Working => Level::Warn,
            SystemStatus::Disabled => Level::Info,
            SystemStatus::EmergencyStop => Level::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SystemStatus::Ready => "ready",
            SystemStatus::Busy => "busy",
            SystemStatus::Working => "working",
            SystemStatus::Disabled => "disabled",
            SystemStatus::EmergencyStop => "emergency stop",
        }
    }
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
