use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a level name or its index (`0` = error .. `4` = trace, `5` also allowed).
fn parse_log_level(level: &str) -> Result<u8, String> {
    if let Ok(parsed) = level.parse::<u8>() {
        return if parsed <= 5 {
            Ok(parsed)
        } else {
            Err(format!("log level out of range: {parsed}"))
        };
    }

    let level = level.to_lowercase();
    LEVELS
        .iter()
        .position(|name| *name == level)
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("invalid log level: {level}"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("WARDEN_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(ValueParser::new(parse_log_level)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_level_names_and_numbers() {
        for (index, name) in LEVELS.iter().enumerate() {
            assert_eq!(parse_log_level(name), u8::try_from(index).map_err(|e| e.to_string()));
        }
        assert_eq!(parse_log_level("DEBUG"), Ok(3));
        assert_eq!(parse_log_level("5"), Ok(5));
        assert!(parse_log_level("6").is_err());
        assert!(parse_log_level("loud").is_err());
    }
}
