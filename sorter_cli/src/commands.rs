//! Subcommand execution: the operator console and one-shot commands.

use std::io::BufRead;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::WrapErr;
use serde_json::json;
use sorter_core::{ColourChange, SystemController};
use sorter_ui::{UiCommand, parse_line};

/// How often the console loop checks for Ctrl-C while stdin is quiet.
const CONSOLE_TICK: Duration = Duration::from_millis(100);

/// Print a command result as one JSON line or as plain text.
fn emit(json_mode: bool, value: serde_json::Value, text: impl FnOnce() -> String) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{}", text());
    }
}

/// Serve beam breaks and console commands until `quit`, end of input or Ctrl-C.
pub fn run(
    ctl: &Arc<SystemController>,
    home: bool,
    enable: bool,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<()> {
    if home {
        ctl.home_blocking()?;
    }
    if enable {
        ctl.set_enabled(true);
    }

    let (tx, lines) = xch::bounded::<String>(16);
    thread::Builder::new()
        .name("console-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .wrap_err("spawn console reader")?;

    tracing::info!(status = %ctl.status(), "console ready");
    while !shutdown.load(Ordering::Acquire) {
        xch::select! {
            recv(lines) -> msg => {
                let Ok(line) = msg else {
                    tracing::debug!("console input closed");
                    break;
                };
                match parse_line(&line) {
                    Ok(Some(cmd)) => {
                        if apply(ctl, cmd).is_break() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
            default(CONSOLE_TICK) => {}
        }
    }
    // let commands already handed to task threads finish while still enabled
    ctl.join_tasks();
    Ok(())
}

/// Execute one console command. Long-running work goes to task threads.
pub fn apply(ctl: &Arc<SystemController>, cmd: UiCommand) -> ControlFlow<()> {
    tracing::debug!(?cmd, "console command");
    let result = match cmd {
        UiCommand::Enable => {
            ctl.set_enabled(true);
            Ok(())
        }
        UiCommand::Disable => {
            ctl.set_enabled(false);
            Ok(())
        }
        UiCommand::Speed { speed } => ctl.set_speed(speed),
        UiCommand::Hue { hue } => ctl.set_colour(ColourChange::hue(f32::from(hue))).map(drop),
        UiCommand::Saturation { saturation } => ctl
            .set_colour(ColourChange::saturation(f32::from(saturation)))
            .map(drop),
        UiCommand::Value { value } => ctl
            .set_colour(ColourChange::value(f32::from(value)))
            .map(drop),
        UiCommand::ResetStrip => ctl.reset_strip(),
        UiCommand::Home => {
            ctl.home();
            Ok(())
        }
        UiCommand::Move { steps } => {
            ctl.move_by(steps);
            Ok(())
        }
        UiCommand::Sort { label } => ctl.sort(&label),
        UiCommand::Beam => {
            ctl.on_beam_break();
            Ok(())
        }
        UiCommand::Status => {
            println!("{}", status_line(ctl));
            Ok(())
        }
        UiCommand::Quit => return ControlFlow::Break(()),
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "console command failed");
        eprintln!("error: {e}");
    }
    ControlFlow::Continue(())
}

fn status_line(ctl: &SystemController) -> String {
    let sweeper = ctl.sweeper();
    format!(
        "status: {} enabled={} homed={} position={} belt_speed={} pending={}",
        ctl.status(),
        ctl.is_enabled(),
        sweeper.is_homed(),
        sweeper.position(),
        ctl.belt().speed(),
        ctl.dispatcher().pending(),
    )
}

pub fn home(ctl: &SystemController, json_mode: bool) -> eyre::Result<()> {
    ctl.home_blocking()?;
    let position = ctl.sweeper().position();
    emit(
        json_mode,
        json!({ "command": "home", "homed": true, "position": position }),
        || format!("homed (position {position})"),
    );
    Ok(())
}

pub fn move_by(ctl: &SystemController, steps: i32, json_mode: bool) -> eyre::Result<()> {
    ctl.home_blocking()?;
    ctl.move_by_blocking(steps)?;
    let position = ctl.sweeper().position();
    emit(
        json_mode,
        json!({ "command": "move", "steps": steps, "position": position }),
        || format!("moved {steps} steps (position {position})"),
    );
    Ok(())
}

pub fn sort(ctl: &SystemController, label: &str, json_mode: bool) -> eyre::Result<()> {
    ctl.set_enabled(true);
    ctl.home_blocking()?;
    ctl.sort_blocking(label)?;
    let (bin, target) = ctl.dispatcher().bins().resolve(label);
    let position = ctl.sweeper().position();
    emit(
        json_mode,
        json!({
            "command": "sort",
            "label": label,
            "bin": bin,
            "target": target,
            "position": position,
        }),
        || format!("sorted {label} into {bin} (position {position})"),
    );
    Ok(())
}

pub fn colour(
    ctl: &SystemController,
    change: ColourChange,
    json_mode: bool,
) -> eyre::Result<()> {
    if change.is_empty() {
        eyre::bail!("nothing to change: pass --hue, --saturation or --value");
    }
    let rgb = ctl.set_colour(change)?;
    emit(
        json_mode,
        json!({ "command": "colour", "rgb": [rgb.r, rgb.g, rgb.b] }),
        || format!("fill colour #{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b),
    );
    Ok(())
}

/// Home the sweeper and visit every bin, then come back to refuse.
pub fn self_check(ctl: &SystemController, json_mode: bool) -> eyre::Result<()> {
    ctl.home_blocking().wrap_err("self-check: homing")?;
    let bins = ctl.dispatcher().bins();
    let mut visited = Vec::with_capacity(bins.len());
    for label in bins.labels() {
        let (_, target) = bins.resolve(label);
        ctl.sweeper()
            .move_absolute(target)
            .wrap_err_with(|| format!("self-check: move to bin {label}"))?;
        visited.push(label.to_string());
    }
    ctl.sweeper()
        .move_absolute(bins.refuse())
        .wrap_err("self-check: return to refuse")?;
    let backend = if cfg!(all(feature = "hardware", target_os = "linux")) {
        "hardware"
    } else {
        "sim"
    };
    emit(
        json_mode,
        json!({
            "command": "self-check",
            "ok": true,
            "backend": backend,
            "bins": visited,
            "position": ctl.sweeper().position(),
        }),
        || format!("OK ({backend}, {} bins reachable)", visited.len()),
    );
    Ok(())
}
