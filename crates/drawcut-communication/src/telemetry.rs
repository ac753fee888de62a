//! Console Telemetry Classification
//!
//! Turns raw console lines from the controller into [`CutterEvent`]s. Only
//! non-verbose lines are classified, and the first matching rule wins:
//!
//! 1. any line containing `error` is a console error
//! 2. `[PRB:x,y,z:1]` is a successful probe
//! 3. connection announcements and the firmware welcome are banners
//! 4. the `'$H'|'$X' to unlock` prompt asks for homing
//! 5. `<State|MPos:..|WPos:..>` is a status report

use std::sync::OnceLock;

use drawcut_core::{Position, ProbeTelemetryError};
use regex::Regex;

use crate::event::CutterEvent;

/// Prefix of the line the device layer emits once the port is open.
pub const CONNECTED_BANNER: &str = "**** Connected to ";

const UNLOCK_PROMPT: &str = "'$H'|'$X' to unlock";

fn probe_regex() -> &'static Regex {
    static PROBE_REGEX: OnceLock<Regex> = OnceLock::new();
    PROBE_REGEX.get_or_init(|| {
        Regex::new(r"\[PRB:\s*([-+]?[0-9]*\.?[0-9]+),([-+]?[0-9]*\.?[0-9]+),([-+]?[0-9]*\.?[0-9]+):([01])\]")
            .expect("invalid regex pattern")
    })
}

fn welcome_regex() -> &'static Regex {
    static WELCOME_REGEX: OnceLock<Regex> = OnceLock::new();
    WELCOME_REGEX.get_or_init(|| Regex::new(r"^Grbl \d+\.\d+").expect("invalid regex pattern"))
}

fn status_regex() -> &'static Regex {
    static STATUS_REGEX: OnceLock<Regex> = OnceLock::new();
    STATUS_REGEX.get_or_init(|| Regex::new(r"^<([^>]*)>$").expect("invalid regex pattern"))
}

/// Classify one console line.
///
/// Verbose lines and lines matching no rule yield `None`.
pub fn classify_console_line(line: &str, verbose: bool) -> Option<CutterEvent> {
    if verbose {
        return None;
    }
    let line = line.trim();

    if line.contains("error") {
        return Some(CutterEvent::ConsoleError {
            text: line.to_string(),
        });
    }
    if line.starts_with("[PRB:") {
        return match parse_probe_report(line) {
            Ok(Some(z)) => Some(CutterEvent::ProbeResult { z }),
            Ok(None) => {
                tracing::debug!("Probe without contact: {}", line);
                None
            }
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        };
    }
    if line.contains(CONNECTED_BANNER) || welcome_regex().is_match(line) {
        return Some(CutterEvent::Banner);
    }
    if line.contains(UNLOCK_PROMPT) {
        return Some(CutterEvent::Unlocked);
    }
    parse_status_report(line)
}

/// Z of a probe report, `None` when the probe made no contact.
pub fn parse_probe_report(line: &str) -> Result<Option<f64>, ProbeTelemetryError> {
    let malformed = || ProbeTelemetryError::MalformedReport {
        line: line.to_string(),
    };
    let caps = probe_regex().captures(line).ok_or_else(malformed)?;
    if &caps[4] != "1" {
        return Ok(None);
    }
    caps[3].parse::<f64>().map(Some).map_err(|_| malformed())
}

/// Parse a GRBL status report.
///
/// Either position may be reported directly or derived from the other one
/// and a `WCO` offset. Reports without any position are ignored.
pub fn parse_status_report(line: &str) -> Option<CutterEvent> {
    let caps = status_regex().captures(line.trim())?;
    let mut fields = caps.get(1)?.as_str().split('|');
    let state = fields.next()?.split(':').next()?.to_string();

    let mut machine: Option<Position> = None;
    let mut work: Option<Position> = None;
    let mut offset: Option<Position> = None;
    for field in fields {
        if let Some(value) = field.strip_prefix("MPos:") {
            machine = value.parse().ok();
        } else if let Some(value) = field.strip_prefix("WPos:") {
            work = value.parse().ok();
        } else if let Some(value) = field.strip_prefix("WCO:") {
            offset = value.parse().ok();
        }
    }

    let wco = offset.unwrap_or_default();
    let (machine, work) = match (machine, work) {
        (Some(m), Some(w)) => (m, w),
        (Some(m), None) => (m, Position::new(m.x - wco.x, m.y - wco.y, m.z - wco.z)),
        (None, Some(w)) => (Position::new(w.x + wco.x, w.y + wco.y, w.z + wco.z), w),
        (None, None) => return None,
    };
    Some(CutterEvent::StatusUpdate {
        state,
        machine,
        work,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_wins_over_everything() {
        let event = classify_console_line("error:9", false);
        assert_eq!(
            event,
            Some(CutterEvent::ConsoleError {
                text: "error:9".to_string()
            })
        );
        // Case-sensitive literal.
        assert_eq!(classify_console_line("ERROR", false), None);
        assert!(matches!(
            classify_console_line("[PRB:0.000,0.000,-1.000:1] error", false),
            Some(CutterEvent::ConsoleError { .. })
        ));
    }

    #[test]
    fn test_verbose_lines_are_ignored() {
        assert_eq!(classify_console_line("error:2", true), None);
        assert_eq!(classify_console_line("Grbl 1.1f ['$' for help]", true), None);
    }

    #[test]
    fn test_probe_report() {
        assert_eq!(
            classify_console_line("[PRB:-2.500,-5.000,-84.405:1]", false),
            Some(CutterEvent::ProbeResult { z: -84.405 })
        );
        assert_eq!(classify_console_line("[PRB:-2.500,-5.000,-84.405:0]", false), None);
        assert_eq!(classify_console_line("[PRB:garbage]", false), None);
        assert!(parse_probe_report("[PRB:garbage]").is_err());
    }

    #[test]
    fn test_banners_and_unlock() {
        assert_eq!(
            classify_console_line("**** Connected to /dev/ttyUSB0 @ 115200 baud", false),
            Some(CutterEvent::Banner)
        );
        assert_eq!(
            classify_console_line("Grbl 1.1f ['$' for help]", false),
            Some(CutterEvent::Banner)
        );
        assert_eq!(
            classify_console_line("[MSG:'$H'|'$X' to unlock]", false),
            Some(CutterEvent::Unlocked)
        );
        assert_eq!(
            classify_console_line("['$H'|'$X' to unlock]", false),
            Some(CutterEvent::Unlocked)
        );
        assert_eq!(classify_console_line("ok", false), None);
    }

    #[test]
    fn test_status_report_with_both_positions() {
        let event = classify_console_line(
            "<Idle|MPos:-2.500,-5.000,-84.405|WPos:0.000,0.000,10.000>",
            false,
        );
        assert_eq!(
            event,
            Some(CutterEvent::StatusUpdate {
                state: "Idle".to_string(),
                machine: Position::new(-2.5, -5.0, -84.405),
                work: Position::new(0.0, 0.0, 10.0),
            })
        );
    }

    #[test]
    fn test_status_report_with_offset() {
        let event = parse_status_report("<Hold:0|MPos:10.000,20.000,-5.000|FS:0,0|WCO:1.000,2.000,-3.000>");
        assert_eq!(
            event,
            Some(CutterEvent::StatusUpdate {
                state: "Hold".to_string(),
                machine: Position::new(10.0, 20.0, -5.0),
                work: Position::new(9.0, 18.0, -2.0),
            })
        );
        assert_eq!(parse_status_report("<Idle|FS:0,0>"), None);
        assert_eq!(parse_status_report("Idle|MPos:0,0,0"), None);
    }
}
