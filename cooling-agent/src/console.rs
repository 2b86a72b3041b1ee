//! Line-oriented operator console on stdin

use std::path::PathBuf;
use thermal_control::Command;

pub const HELP: &str = "\
commands:
  profile <silent|balanced|performance>
  fan <0-100>               set manual fan speed
  fan-control <on|off>
  auto <on|off>             auto-optimize fan speed
  thresholds <warn> <crit>  set warning/critical in °C
  quick-cool                one quick-cool press
  status                    print controller state
  export [path]             write history as CSV
  stop | quit";

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Control(Command),
    Export(Option<PathBuf>),
    Status,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((verb, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (verb.to_ascii_lowercase().as_str(), args) {
        ("profile", [name]) => ConsoleCommand::Control(Command::SetProfile { name: name.to_string() }),
        ("fan", [percent]) => ConsoleCommand::Control(Command::SetManualFanSpeed {
            percent: parse_number(percent)?,
        }),
        ("fan-control", [toggle]) => ConsoleCommand::Control(Command::SetFanControlEnabled {
            enabled: parse_toggle(toggle)?,
        }),
        ("auto", [toggle]) => ConsoleCommand::Control(Command::SetAutoOptimize {
            enabled: parse_toggle(toggle)?,
        }),
        ("thresholds", [warning, critical]) => ConsoleCommand::Control(Command::SetThresholds {
            warning_c: parse_number(warning)?,
            critical_c: parse_number(critical)?,
        }),
        ("quick-cool", []) => ConsoleCommand::Control(Command::QuickCoolPress),
        ("export", []) => ConsoleCommand::Export(None),
        ("export", [path]) => ConsoleCommand::Export(Some(PathBuf::from(path))),
        ("status", []) => ConsoleCommand::Status,
        ("help" | "?", _) => ConsoleCommand::Help,
        ("stop" | "quit" | "exit", []) => ConsoleCommand::Quit,
        _ => return Err(format!("unrecognised command '{}' (try 'help')", line.trim())),
    };
    Ok(Some(command))
}

fn parse_number(word: &str) -> Result<f64, String> {
    word.trim_end_matches('%')
        .trim_end_matches("°C")
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", word))
}

fn parse_toggle(word: &str) -> Result<bool, String> {
    match word.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "enable" => Ok(true),
        "off" | "false" | "0" | "disable" => Ok(false),
        _ => Err(format!("expected on or off, got '{}'", word)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control_commands() {
        assert_eq!(
            parse_line("profile silent").unwrap(),
            Some(ConsoleCommand::Control(Command::SetProfile { name: "silent".into() }))
        );
        assert_eq!(
            parse_line("fan 75%").unwrap(),
            Some(ConsoleCommand::Control(Command::SetManualFanSpeed { percent: 75.0 }))
        );
        assert_eq!(
            parse_line("  auto ON ").unwrap(),
            Some(ConsoleCommand::Control(Command::SetAutoOptimize { enabled: true }))
        );
        assert_eq!(
            parse_line("thresholds 42 58").unwrap(),
            Some(ConsoleCommand::Control(Command::SetThresholds { warning_c: 42.0, critical_c: 58.0 }))
        );
        assert_eq!(
            parse_line("quick-cool").unwrap(),
            Some(ConsoleCommand::Control(Command::QuickCoolPress))
        );
    }

    #[test]
    fn test_parse_agent_commands() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("export").unwrap(), Some(ConsoleCommand::Export(None)));
        assert_eq!(
            parse_line("export /tmp/out.csv").unwrap(),
            Some(ConsoleCommand::Export(Some(PathBuf::from("/tmp/out.csv"))))
        );
        assert_eq!(parse_line("quit").unwrap(), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("fan loud").is_err());
        assert!(parse_line("fan-control maybe").is_err());
        assert!(parse_line("thresholds 40").is_err());
        assert!(parse_line("reboot").is_err());
    }
}
