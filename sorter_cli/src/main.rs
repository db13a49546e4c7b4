mod cli;
mod commands;
mod error_fmt;
mod hw;
mod rt;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use sorter_config::{Config, Logging};
use sorter_core::ColourChange;
use sorter_ui::ConsoleSink;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() -> ExitCode {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            let code = u8::try_from(exit_code_for_error(&e)).unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli)?;
    init_tracing(&cli, &cfg.logging);
    rt::setup_rt_once(cli.rt, cli.rt_prio, cli.rt_cpu);

    // in JSON mode stdout carries only command results
    let sink = if cli.json {
        ConsoleSink::new(Box::new(std::io::stderr()))
    } else {
        ConsoleSink::stdout()
    };
    let ctl = hw::assemble(&cfg, Arc::new(sink))?;

    let result = match cli.cmd {
        Commands::Run { home, enable } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Release))
                .wrap_err("install Ctrl-C handler")?;
            commands::run(&ctl, home, enable, &shutdown)
        }
        Commands::Home => commands::home(&ctl, cli.json),
        Commands::Move { steps } => commands::move_by(&ctl, steps, cli.json),
        Commands::Sort { label } => commands::sort(&ctl, &label, cli.json),
        Commands::Colour {
            hue,
            saturation,
            value,
        } => {
            let change = ColourChange {
                hue: hue.map(f32::from),
                saturation: saturation.map(f32::from),
                value: value.map(f32::from),
            };
            commands::colour(&ctl, change, cli.json)
        }
        Commands::SelfCheck => commands::self_check(&ctl, cli.json),
    };
    ctl.shutdown();
    result
}

/// Read and validate the TOML config; `--bins` replaces its `[bins]` table.
fn load_config(cli: &Cli) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(&cli.config)
        .wrap_err_with(|| format!("read config {}", cli.config.display()))?;
    let mut cfg = sorter_config::load_toml(&text).wrap_err("parse config")?;
    if let Some(path) = &cli.bins {
        cfg.bins = sorter_config::load_bin_map_csv(path)
            .wrap_err_with(|| format!("load bin map {}", path.display()))?;
    }
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console logs go to stderr (pretty or JSON). `[logging].file` adds a JSON
/// file sink with optional rotation.
fn init_tracing(cli: &Cli, logging: &Logging) {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    let console = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let file = logging.file.as_deref().and_then(|path| {
        let path = std::path::Path::new(path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = path.file_name()?.to_string_lossy().into_owned();
        let rotation = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::Rotation::DAILY,
            Some("hourly") => tracing_appender::rolling::Rotation::HOURLY,
            _ => tracing_appender::rolling::Rotation::NEVER,
        };
        let appender = match tracing_appender::rolling::RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(name)
            .build(dir)
        {
            Ok(a) => a,
            Err(e) => {
                eprintln!("Warning: log file disabled: {e}");
                return None;
            }
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let level = logging.level.as_deref().unwrap_or("info");
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(level)),
        )
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}
