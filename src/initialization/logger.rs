//! Logger initialization.
//!
//! The library only emits through the `log` facade. The command line front-end
//! installs an `env_logger` backend here, printing one line per event: either
//! a timestamped console line or a JSON object for log shippers.

use std::io::Write;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use colored::*;
use log::{Level, LevelFilter};

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Installs the process logger.
///
/// `RUST_LOG` is read first, then `level` is applied on top of it for this
/// crate and as the global default, so `--log-level` always wins. HTTP stack
/// internals stay at `info` or quieter.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// # Per-request chatter from the engine, but quiet HTTP internals
/// RUST_LOG=scan_dispatch=debug,hyper=warn scan_dispatch urls.txt
///
/// # JSON lines for a log shipper
/// scan_dispatch urls.txt --log-level debug --log-format json
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);
    builder.filter_module("rustls", LevelFilter::Warn);
    builder.filter_module("scan_dispatch", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                let message = record.args().to_string();
                let line = json_line(Utc::now(), record.level(), record.target(), &message);
                writeln!(buf, "{line}")
            });
        }
        LogFormat::Plain => {
            colored::control::set_override(true);
            builder.format(|buf, record| {
                let message = record.args().to_string();
                let line = plain_line(Local::now(), record.level(), record.target(), &message);
                writeln!(buf, "{line}")
            });
        }
    }

    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}

/// Splits a leading `[dbg-7]` style correlation id off a message.
fn split_debugging_id(message: &str) -> (Option<&str>, &str) {
    message
        .strip_prefix('[')
        .and_then(|rest| rest.split_once("] "))
        .filter(|(id, _)| !id.is_empty() && !id.contains(char::is_whitespace))
        .map_or((None, message), |(id, rest)| (Some(id), rest))
}

/// One JSON object per event. Per-request lines carry their correlation id
/// in a separate `debugging_id` field.
fn json_line(time: DateTime<Utc>, level: Level, target: &str, message: &str) -> String {
    let (debugging_id, message) = split_debugging_id(message);
    let mut event = serde_json::json!({
        "time": time.to_rfc3339_opts(SecondsFormat::Millis, true),
        "level": level.as_str(),
        "module": target,
        "message": message,
    });
    if let Some(id) = debugging_id {
        event["debugging_id"] = serde_json::Value::from(id);
    }
    event.to_string()
}

fn plain_line(time: DateTime<Local>, level: Level, target: &str, message: &str) -> String {
    let level_label = format!("{:<5}", level.as_str());
    let level_label = match level {
        Level::Error => level_label.red().bold(),
        Level::Warn => level_label.yellow(),
        Level::Info => level_label.green(),
        Level::Debug => level_label.blue(),
        Level::Trace => level_label.purple(),
    };

    format!(
        "{} {} {} {}",
        time.format("%H:%M:%S%.3f").to_string().dimmed(),
        level_label,
        format!("{target}:").cyan(),
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_json_line_fields() {
        let line = json_line(at_noon(), Level::Warn, "scan_dispatch::monitor", "Error rate is 42.0%");
        let event: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(event["time"], "2024-05-01T12:00:00.000Z");
        assert_eq!(event["level"], "WARN");
        assert_eq!(event["module"], "scan_dispatch::monitor");
        assert_eq!(event["message"], "Error rate is 42.0%");
        assert!(event.get("debugging_id").is_none());
    }

    #[test]
    fn test_json_line_extracts_debugging_id() {
        let line = json_line(
            at_noon(),
            Level::Debug,
            "scan_dispatch::dispatcher",
            "[dbg-12] GET http://target.test/ (timeout 6.00s)",
        );
        let event: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(event["debugging_id"], "dbg-12");
        assert_eq!(event["message"], "GET http://target.test/ (timeout 6.00s)");
    }

    #[test]
    fn test_json_line_escapes_quotes() {
        let line = json_line(at_noon(), Level::Error, "scan_dispatch", "The last error was \"timeout\".");
        let event: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(event["message"], "The last error was \"timeout\".");
    }

    #[test]
    fn test_split_debugging_id_ignores_other_brackets() {
        assert_eq!(split_debugging_id("[a b] c"), (None, "[a b] c"));
        assert_eq!(split_debugging_id("[] c"), (None, "[] c"));
        assert_eq!(split_debugging_id("no id"), (None, "no id"));
        assert_eq!(split_debugging_id("[x-1] ok"), (Some("x-1"), "ok"));
    }

    #[test]
    fn test_plain_line_layout() {
        colored::control::set_override(false);
        let time = Local.with_ymd_and_hms(2024, 5, 1, 8, 30, 15).unwrap();
        let line = plain_line(time, Level::Info, "scan_dispatch::timeout", "Updated timeout");
        assert_eq!(line, "08:30:15.000 INFO  scan_dispatch::timeout: Updated timeout");
    }

    #[test]
    fn test_init_logger_second_install_fails_gracefully() {
        // Only one logger per process; whichever call comes second must error
        let first = init_logger_with(LevelFilter::Info, LogFormat::Json);
        let second = init_logger_with(LevelFilter::Debug, LogFormat::Json);
        assert!(first.is_err() || second.is_err());
        if let Err(e) = second {
            assert!(e.to_string().starts_with("Logger initialization error"));
        }
    }
}
