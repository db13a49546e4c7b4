//! Human-readable error descriptions and structured JSON error formatting.

use sorter_core::error::{BuildError, EmergencyCause, SorterError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: The sorter could not be assembled ({be}).\nLikely causes: A drive failed to initialize or was not wired into the builder.\nHow to fix: Check the [pins] section and the hardware log lines above."
        );
    }

    if let Some(se) = err.downcast_ref::<SorterError>() {
        return match se {
            SorterError::EmergencyStop(EmergencyCause::UnexpectedLimit) => {
                "What happened: The sweeper hit its limit switch when it was not seeking home.\nLikely causes: Lost steps, a part jammed under the arm, or a bouncing switch.\nHow to fix: Clear the sweeper path, then run `sorter home` before sorting again.".to_string()
            }
            SorterError::EmergencyStop(EmergencyCause::HomingFailed) => {
                "What happened: Homing never reached the limit switch.\nLikely causes: Switch unplugged or wired to the wrong pin, or the carriage is stalled.\nHow to fix: Check pins.limit_switch and sweeper.limit_active_low, free the carriage, and home again.".to_string()
            }
            SorterError::OutOfRange { target, max } => format!(
                "What happened: Target position {target} is outside the sweeper's travel [0, {max}].\nLikely causes: A bin position or manual move beyond sweeper.max_position.\nHow to fix: Use a smaller move or fix the bin map."
            ),
            SorterError::NotHomed => {
                "What happened: The sweeper is not homed.\nLikely causes: No homing since start-up, or an emergency stop cleared the home reference.\nHow to fix: Run `sorter home` (or `home` at the console) first.".to_string()
            }
            SorterError::Disabled => {
                "What happened: The system is disabled.\nLikely causes: The sorter starts disabled.\nHow to fix: Type `enable` at the console or pass --enable to `sorter run`.".to_string()
            }
            SorterError::MoveInProgress => {
                "What happened: The sweeper is already moving.\nLikely causes: A second command arrived during a move.\nHow to fix: Wait for the current move to finish.".to_string()
            }
            SorterError::Timeout => {
                "What happened: The classifier did not answer in time.\nLikely causes: Vision process stalled or sorting.classify_timeout_ms too low.\nHow to fix: Check the vision link and consider raising sorting.classify_timeout_ms.".to_string()
            }
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let chain = format!("{err:#}");
    let lower = chain.to_ascii_lowercase();

    if lower.contains("bin map csv must have headers") {
        return "Invalid headers in bin map CSV. Expected 'label,position'.".to_string();
    }

    if lower.contains("open gpio") || lower.contains("pins") && lower.contains("open") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("invalid configuration")
        || lower.contains("parse config")
        || lower.contains("must be")
        || lower.contains("must contain")
        || lower.contains("is outside")
    {
        return format!(
            "What happened: Configuration is invalid or incomplete ({chain}).\nLikely causes: Missing [pins], or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes for sorter failures; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<SorterError>() {
        Some(SorterError::EmergencyStop(EmergencyCause::UnexpectedLimit)) => 2,
        Some(SorterError::EmergencyStop(EmergencyCause::HomingFailed)) => 3,
        Some(SorterError::OutOfRange { .. }) => 4,
        Some(SorterError::NotHomed) => 5,
        Some(SorterError::MoveInProgress) => 6,
        _ => 1,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<SorterError>() {
        Some(SorterError::EmergencyStop(EmergencyCause::UnexpectedLimit)) => "UnexpectedLimit",
        Some(SorterError::EmergencyStop(EmergencyCause::HomingFailed)) => "HomingFailed",
        Some(SorterError::OutOfRange { .. }) => "OutOfRange",
        Some(SorterError::NotHomed) => "NotHomed",
        Some(SorterError::MoveInProgress) => "MoveInProgress",
        Some(SorterError::Disabled) => "Disabled",
        Some(SorterError::Timeout) => "Timeout",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    match err.downcast_ref::<SorterError>() {
        Some(SorterError::OutOfRange { target, max }) => json!({
            "reason": reason_name(err),
            "details": { "target": target, "max_position": max },
            "message": msg,
        }),
        _ => json!({ "reason": reason_name(err), "message": msg }),
    }
    .to_string()
}
