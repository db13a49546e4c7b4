//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "sorter", version, about = "Conveyor component sorter")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/sorter.toml")]
    pub config: PathBuf,

    /// Optional bin map CSV (strict `label,position` header); replaces [bins]
    #[arg(long, value_name = "FILE")]
    pub bins: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable real-time mode for the step-pulse threads (SCHED_FIFO, affinity, mlockall)
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on Linux builds with the `rt` feature.\n\nApplies SCHED_FIFO to the main thread before any worker is spawned (workers inherit it), optionally pins to --rt-cpu, and locks the address space with mlockall. Needs CAP_SYS_NICE / CAP_IPC_LOCK or root; failures are logged and the run continues."
    )]
    pub rt: bool,

    /// SCHED_FIFO priority for --rt (1..=99)
    #[arg(long, global = true, value_name = "PRIO", default_value_t = 50)]
    pub rt_prio: i32,

    /// CPU index to pin to for --rt
    #[arg(long, global = true, value_name = "CPU")]
    pub rt_cpu: Option<usize>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve beam breaks and the operator console until Ctrl-C or `quit`
    Run {
        /// Home the sweeper before accepting parts
        #[arg(long, action = ArgAction::SetTrue)]
        home: bool,
        /// Start enabled (otherwise type `enable` at the console)
        #[arg(long, action = ArgAction::SetTrue)]
        enable: bool,
    },
    /// Home the sweeper against the limit switch
    Home,
    /// Home, then move the sweeper by a relative number of steps
    Move {
        /// Steps to move (negative is toward home)
        #[arg(long, allow_negative_numbers = true)]
        steps: i32,
    },
    /// Home, then sort the part on the belt into a bin
    Sort {
        /// Class label; unknown labels go to the refuse bin
        #[arg(long)]
        label: String,
    },
    /// Set the strip fill colour (slider units)
    Colour {
        /// Hue, 0..=180
        #[arg(long, value_parser = clap::value_parser!(u16).range(0..=180))]
        hue: Option<u16>,
        /// Saturation, 0..=100
        #[arg(long, value_parser = clap::value_parser!(u16).range(0..=100))]
        saturation: Option<u16>,
        /// Value (brightness), 0..=100
        #[arg(long, value_parser = clap::value_parser!(u16).range(0..=100))]
        value: Option<u16>,
    },
    /// Home, visit every bin, and park at refuse
    SelfCheck,
}
