//! The command grammar: a tagged `Command` enum and the parser that
//! produces it, following this codebase's preference for an explicit plan
//! enum over ad-hoc string matching at the dispatch site (see
//! `daq-experiment`'s `PlanCommand`).
//!
//! Object-key dispatch is tried first and is case-sensitive, matching
//! observed upstream behavior; built-in command names are matched
//! case-insensitively afterward. An object literally named `"wait"` would
//! therefore shadow the sleep command — preserved deliberately, not a bug
//! in this port.

use crate::state::ObjectCatalog;

/// A single interpreted command, ready for exhaustive matching by the
/// interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Track a catalog object by key.
    Track(String),
    /// 5x5 raster scan around a catalog object.
    TrackScanN(String),
    /// Three-position beam-switch around a catalog object.
    TrackBeamSwitch(String),
    /// Sleep for the given number of seconds.
    Sleep(f64),
    /// Return to the configured stow position.
    Stow,
    /// Run a calibration pass.
    Calibrate,
    /// Terminate the daemon after shutdown finalization.
    Quit,
    /// Begin raw-sample recording.
    RecordStart,
    /// Stop raw-sample recording.
    RecordStop,
    /// Set the radio center frequency, in Hz.
    SetFreq(f64),
    /// Set the radio sample rate, in Hz.
    SetSampRate(f64),
    /// Point directly at an azimuth/elevation, degrees.
    ManualPoint(f64, f64),
    /// Overwrite the motor offsets, degrees.
    SetOffset(f64, f64),
    /// A blank line, a comment, or a too-short line: no-op.
    Comment,
    /// A recognized-shape command with unparseable arguments.
    Invalid(String),
    /// A token sequence that matched neither an object key nor a built-in.
    Unknown(String),
}

/// Parses one raw command line against the current object catalog (for the
/// case-sensitive object-key lookup, which takes precedence over built-in
/// names).
pub fn parse(raw: &str, catalog: &ObjectCatalog) -> Command {
    if raw.trim().len() < 2 || raw.starts_with('*') {
        return Command::Comment;
    }

    let body = match raw.strip_prefix(':') {
        Some(rest) => rest.trim(),
        None => raw,
    };

    let parts: Vec<&str> = body.split_whitespace().collect();
    let Some(&first_raw) = parts.first() else {
        return Command::Comment;
    };

    if catalog.contains_key(first_raw) {
        return match parts.get(1) {
            Some(&"n") => Command::TrackScanN(first_raw.to_string()),
            Some(&"b") => Command::TrackBeamSwitch(first_raw.to_string()),
            _ => Command::Track(first_raw.to_string()),
        };
    }

    let name = first_raw.to_lowercase();

    if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
        return match name.parse::<f64>() {
            Ok(secs) => Command::Sleep(secs),
            Err(_) => Command::Invalid(raw.to_string()),
        };
    }

    match name.as_str() {
        "wait" => parse_f64_arg(parts.get(1), raw).map_or_else(
            |invalid| invalid,
            Command::Sleep,
        ),
        "stow" => Command::Stow,
        "calibrate" => Command::Calibrate,
        "quit" => Command::Quit,
        "record" => Command::RecordStart,
        "roff" => Command::RecordStop,
        "freq" => parse_f64_arg(parts.get(1), raw).map_or_else(
            |invalid| invalid,
            |mhz| Command::SetFreq(mhz * 1.0e6),
        ),
        "samp" => parse_f64_arg(parts.get(1), raw).map_or_else(
            |invalid| invalid,
            |mhz| Command::SetSampRate(mhz * 1.0e6),
        ),
        "azel" => match (parts.get(1), parts.get(2)) {
            (Some(az), Some(el)) => match (az.parse::<f64>(), el.parse::<f64>()) {
                (Ok(az), Ok(el)) => Command::ManualPoint(az, el),
                _ => Command::Invalid(raw.to_string()),
            },
            _ => Command::Invalid(raw.to_string()),
        },
        "offset" => match (parts.get(1), parts.get(2)) {
            (Some(d_az), Some(d_el)) => match (d_az.parse::<f64>(), d_el.parse::<f64>()) {
                (Ok(d_az), Ok(d_el)) => Command::SetOffset(d_az, d_el),
                _ => Command::Invalid(raw.to_string()),
            },
            _ => Command::Invalid(raw.to_string()),
        },
        _ => Command::Unknown(raw.to_string()),
    }
}

fn parse_f64_arg(arg: Option<&&str>, raw: &str) -> Result<f64, Command> {
    arg.and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| Command::Invalid(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Pose;

    fn catalog() -> ObjectCatalog {
        let mut c = ObjectCatalog::new();
        c.insert("Sun".to_string(), Pose::new(120.0, 30.0));
        c.insert("wait".to_string(), Pose::new(10.0, 10.0));
        c
    }

    #[test]
    fn short_and_comment_lines_are_no_ops() {
        assert_eq!(parse("", &catalog()), Command::Comment);
        assert_eq!(parse("x", &catalog()), Command::Comment);
        assert_eq!(parse("* a comment", &catalog()), Command::Comment);
    }

    #[test]
    fn leading_colon_is_stripped() {
        assert_eq!(parse(": stow", &catalog()), parse("stow", &catalog()));
    }

    #[test]
    fn object_track_variants_are_recognized() {
        assert_eq!(parse("Sun", &catalog()), Command::Track("Sun".to_string()));
        assert_eq!(
            parse("Sun n", &catalog()),
            Command::TrackScanN("Sun".to_string())
        );
        assert_eq!(
            parse("Sun b", &catalog()),
            Command::TrackBeamSwitch("Sun".to_string())
        );
    }

    #[test]
    fn object_key_lookup_is_case_sensitive() {
        // lowercase "sun" isn't in the catalog (only "Sun" is), so it falls
        // through to the unknown-builtin case.
        assert_eq!(parse("sun", &catalog()), Command::Unknown("sun".to_string()));
    }

    #[test]
    fn object_named_wait_shadows_the_builtin() {
        assert_eq!(parse("wait", &catalog()), Command::Track("wait".to_string()));
    }

    #[test]
    fn integer_seconds_is_a_sleep() {
        assert_eq!(parse("30", &catalog()), Command::Sleep(30.0));
    }

    #[test]
    fn wait_with_float_argument() {
        assert_eq!(parse("wait 2.5", &ObjectCatalog::new()), Command::Sleep(2.5));
    }

    #[test]
    fn freq_and_samp_scale_to_hz() {
        assert_eq!(
            parse("freq 400", &ObjectCatalog::new()),
            Command::SetFreq(400.0e6)
        );
        assert_eq!(
            parse("samp 2.4", &ObjectCatalog::new()),
            Command::SetSampRate(2.4e6)
        );
    }

    #[test]
    fn azel_and_offset_parse_two_floats() {
        assert_eq!(
            parse("azel 180 45", &ObjectCatalog::new()),
            Command::ManualPoint(180.0, 45.0)
        );
        assert_eq!(
            parse("offset -1.5 0.5", &ObjectCatalog::new()),
            Command::SetOffset(-1.5, 0.5)
        );
    }

    #[test]
    fn malformed_numeric_args_are_invalid() {
        assert!(matches!(
            parse("azel notanumber 45", &ObjectCatalog::new()),
            Command::Invalid(_)
        ));
        assert!(matches!(
            parse("freq", &ObjectCatalog::new()),
            Command::Invalid(_)
        ));
    }

    #[test]
    fn unrecognized_command_is_unknown() {
        assert_eq!(
            parse("frobnicate", &ObjectCatalog::new()),
            Command::Unknown("frobnicate".to_string())
        );
    }
}
