//! Argument parsing: argv in, accumulated option values out.

use std::ffi::OsString;
use std::io::{self, Write};

use tracing::debug;

use crate::getopt::{FlagTable, Polarity, Scanner, Token};
use crate::registry::OptionRegistry;
use crate::value::OptionValue;
use crate::{LIBRARY_VERSION, debug as debug_level};

/// Exit status used for help, version, and malformed command lines.
pub const USAGE_EXIT_CODE: i32 = 1;

/// Why a parse did not produce a usable configuration.
///
/// `HelpRequested` and `VersionRequested` are not failures of the command
/// line as such, but they end the parse the same way: nothing is committed
/// and the process is expected to exit after printing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("usage information requested")]
    HelpRequested,

    #[error("version information requested")]
    VersionRequested,

    #[error("unrecognized option '{0}'")]
    UnknownFlag(String),

    #[error("option '{0}' requires an argument")]
    MissingArgument(String),

    #[error("option '{0}' doesn't allow an argument")]
    UnexpectedArgument(String),

    #[error("option '{0}' is ambiguous")]
    AmbiguousFlag(String),

    #[error("expected at least {required} positional argument(s), got {supplied}")]
    MissingPositional { required: usize, supplied: usize },

    #[error("argument '{0}' is not valid UTF-8")]
    InvalidEncoding(String),
}

impl ParseError {
    pub fn exit_code(&self) -> i32 {
        USAGE_EXIT_CODE
    }
}

impl OptionRegistry {
    /// Parse a full argv (program name first, as from [`std::env::args_os`]).
    ///
    /// Flags are applied in command-line order, so repeated flags accumulate
    /// and the last one is what the scalar readers see. Bare tokens are then
    /// handed out by position to options whose `arg_num` matches and that
    /// hold no value yet. Values are only committed when the whole command
    /// line is valid; after a failure the registry is exactly as it was.
    ///
    /// Every token after the program name must be valid UTF-8; anything
    /// else fails the parse with [`ParseError::InvalidEncoding`].
    ///
    /// On success the `debug` option is written through to the process-wide
    /// debug level.
    pub fn parse_args<I, S>(&mut self, args: I) -> Result<(), ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args = args
            .into_iter()
            .skip(1)
            .map(|arg| {
                arg.into()
                    .into_string()
                    .map_err(|raw| ParseError::InvalidEncoding(raw.to_string_lossy().into_owned()))
            })
            .collect::<Result<Vec<String>, _>>()?;

        let table = FlagTable::from_registry(self);
        let required = self.max_required_positional();

        let mut pending: Vec<(String, OptionValue)> = Vec::new();
        let mut positionals: Vec<String> = Vec::new();

        for token in Scanner::new(&table, args) {
            match token? {
                Token::Flag { target, arg } => {
                    if target.polarity == Polarity::On {
                        match target.name.as_str() {
                            "help" => return Err(ParseError::HelpRequested),
                            "version" => return Err(ParseError::VersionRequested),
                            _ => {}
                        }
                    }
                    let value = match (target.polarity, arg) {
                        (Polarity::Off, _) => OptionValue::Int(0),
                        (Polarity::On, Some(arg)) => OptionValue::Str(arg),
                        (Polarity::On, None) => OptionValue::Int(1),
                    };
                    pending.push((target.name, value));
                }
                Token::Positional(arg) => positionals.push(arg),
            }
        }

        if positionals.len() < required {
            return Err(ParseError::MissingPositional {
                required,
                supplied: positionals.len(),
            });
        }

        for (i, arg) in positionals.into_iter().enumerate() {
            let index = i + 1;
            let taker = self
                .iter()
                .find(|(name, d)| {
                    d.arg_num.map(|n| n as usize) == Some(index)
                        && d.values.is_empty()
                        && !pending.iter().any(|(p, _)| p == name)
                })
                .map(|(name, _)| name.to_string());
            match taker {
                Some(name) => pending.push((name, OptionValue::Str(arg))),
                None => debug!(position = index, arg = %arg, "ignoring unexpected argument"),
            }
        }

        for (name, value) in pending {
            if let Ok(descriptor) = self.get_mut(&name) {
                descriptor.values.push(value);
            }
        }

        if let Ok(level) = self.integer("debug") {
            debug_level::set_level(level);
        }
        Ok(())
    }

    /// [`parse_args`](Self::parse_args), printing and exiting on anything
    /// other than success.
    ///
    /// Help goes to stdout; version prints the two-line banner; any other
    /// error is reported on stderr followed by the usage text. All of these
    /// exit with [`USAGE_EXIT_CODE`].
    pub fn parse_args_or_exit<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let Err(err) = self.parse_args(args) else {
            return;
        };

        let mut stdout = io::stdout().lock();
        let _ = match &err {
            ParseError::HelpRequested => self.print_help(&mut stdout),
            ParseError::VersionRequested => self.print_version(&mut stdout),
            other => {
                eprintln!("{}: {other}", self.string("cmd").unwrap_or_default());
                self.print_help(&mut stdout)
            }
        };
        let _ = stdout.flush();
        std::process::exit(err.exit_code());
    }

    /// Two-line version banner: library version, then application version.
    pub fn print_version(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "Library version: {LIBRARY_VERSION}")?;
        writeln!(
            out,
            "Application version: {}",
            self.string("version").unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ArgKind, OptionDescriptor};
    use pretty_assertions::assert_eq;

    fn connector_registry() -> OptionRegistry {
        let mut r = OptionRegistry::new("streamgate-test", "0.0.1");
        r.add_option(
            "listen_port",
            OptionDescriptor::new("TCP port to listen on")
                .short('p')
                .long("port")
                .arg(ArgKind::Integer)
                .default_value(8080),
        );
        r.add_option(
            "listen_interface",
            OptionDescriptor::new("Interface address to listen on")
                .short('i')
                .long("interface")
                .arg(ArgKind::String)
                .default_value("0.0.0.0"),
        );
        r.add_option(
            "daemonize",
            OptionDescriptor::new("Whether or not to daemonize the process after starting.")
                .short('d')
                .long("daemon")
                .short_off('n')
                .long_off("nodaemon")
                .default_value(0),
        );
        r
    }

    #[test]
    fn test_defaults_survive_empty_parse() {
        let mut r = connector_registry();
        r.parse_args(["prog"]).unwrap();
        assert_eq!(r.integer("listen_port").unwrap(), 8080);
        assert_eq!(r.string("listen_interface").unwrap(), "0.0.0.0");
        assert!(!r.boolean("daemonize").unwrap());
    }

    #[test]
    fn test_port_override_keeps_interface_default() {
        let mut r = connector_registry();
        r.parse_args(["prog", "--port", "9000"]).unwrap();
        assert_eq!(r.integer("listen_port").unwrap(), 9000);
        assert_eq!(r.string("listen_interface").unwrap(), "0.0.0.0");
        // History keeps the default underneath the override.
        assert_eq!(
            r.values("listen_port").unwrap(),
            vec![OptionValue::Int(8080), OptionValue::from("9000")]
        );
    }

    #[test]
    fn test_repeated_flags_accumulate() {
        let mut r = OptionRegistry::empty();
        r.add_option("verbose", OptionDescriptor::new("more output").short('d'));
        r.parse_args(["prog", "-d", "-d"]).unwrap();
        assert_eq!(
            r.values("verbose").unwrap(),
            vec![OptionValue::Int(1), OptionValue::Int(1)]
        );
        assert_eq!(r.integer("verbose").unwrap(), 1);
    }

    #[test]
    fn test_repeated_argument_flag_last_wins() {
        let mut r = connector_registry();
        r.parse_args(["prog", "-p", "1", "--port=2", "-p3"]).unwrap();
        assert_eq!(r.integer("listen_port").unwrap(), 3);
        let history: Vec<i64> = r
            .values("listen_port")
            .unwrap()
            .iter()
            .map(OptionValue::as_int)
            .collect();
        assert_eq!(history, vec![8080, 1, 2, 3]);
    }

    #[test]
    fn test_off_flag_appends_zero_and_on_flag_one() {
        let mut r = connector_registry();
        r.parse_args(["prog", "-p", "81", "-d", "--nodaemon"]).unwrap();
        assert_eq!(
            r.values("daemonize").unwrap(),
            vec![OptionValue::Int(0), OptionValue::Int(1), OptionValue::Int(0)]
        );
        assert!(!r.boolean("daemonize").unwrap());

        let mut r = connector_registry();
        r.parse_args(["prog", "-n", "-i", "::", "--daemon"]).unwrap();
        assert_eq!(r.integer("daemonize").unwrap(), 1);
    }

    #[test]
    fn test_missing_positional_fails_without_leaking_state() {
        let mut r = connector_registry();
        r.add_option("file", OptionDescriptor::new("input file").positional(1));

        let err = r.parse_args(["prog", "-p", "9000"]).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingPositional {
                required: 1,
                supplied: 0
            }
        );
        assert_eq!(err.exit_code(), 1);
        // Nothing from the failed attempt was committed.
        assert_eq!(r.values("listen_port").unwrap(), vec![OptionValue::Int(8080)]);

        r.parse_args(["prog", "-p", "9000", "movie.mp4"]).unwrap();
        assert_eq!(r.integer("listen_port").unwrap(), 9000);
        assert_eq!(r.string("file").unwrap(), "movie.mp4");
    }

    #[test]
    fn test_no_arguments_with_required_positional_fails() {
        let mut r = OptionRegistry::new("streamgate-test", "0.0.1");
        r.add_option("file", OptionDescriptor::new("input file").positional(1));
        assert!(matches!(
            r.parse_args(["prog"]),
            Err(ParseError::MissingPositional { .. })
        ));
    }

    #[test_log::test]
    fn test_positionals_assigned_by_index() {
        let mut r = OptionRegistry::empty();
        r.add_option("src", OptionDescriptor::new("source").positional(1));
        r.add_option("dst", OptionDescriptor::new("target").positional(2));
        r.parse_args(["prog", "a.flv", "b.dtsc", "leftover"]).unwrap();
        assert_eq!(r.string("src").unwrap(), "a.flv");
        assert_eq!(r.string("dst").unwrap(), "b.dtsc");
    }

    #[test]
    fn test_flag_takes_precedence_over_positional_slot() {
        let mut r = OptionRegistry::empty();
        r.add_option(
            "stream",
            OptionDescriptor::new("stream name")
                .short('s')
                .arg(ArgKind::String)
                .positional(1),
        );
        r.add_option("other", OptionDescriptor::new("second slot").positional(1));

        // The flag fills "stream", so positional 1 falls to the next taker.
        r.parse_args(["prog", "-s", "live", "vod"]).unwrap();
        assert_eq!(r.values("stream").unwrap(), vec![OptionValue::from("live")]);
        assert_eq!(r.string("other").unwrap(), "vod");
    }

    #[test]
    fn test_positional_with_default_is_not_overwritten() {
        let mut r = OptionRegistry::empty();
        r.add_option(
            "out",
            OptionDescriptor::new("output").positional(1).default_value("-"),
        );
        r.parse_args(["prog", "file.ts"]).unwrap();
        assert_eq!(r.string("out").unwrap(), "-");
    }

    #[test]
    fn test_help_and_version_short_circuit() {
        let mut r = connector_registry();
        assert_eq!(r.parse_args(["prog", "-h"]), Err(ParseError::HelpRequested));
        assert_eq!(
            r.parse_args(["prog", "-p", "1", "--version"]),
            Err(ParseError::VersionRequested)
        );
        assert_eq!(r.integer("listen_port").unwrap(), 8080);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let mut r = connector_registry();
        assert_eq!(
            r.parse_args(["prog", "--bogus"]),
            Err(ParseError::UnknownFlag("--bogus".to_string()))
        );
        assert_eq!(
            r.parse_args(["prog", "-?"]),
            Err(ParseError::UnknownFlag("-?".to_string()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_argument_is_rejected() {
        use std::os::unix::ffi::OsStringExt;

        let mut r = connector_registry();
        let raw = OsString::from_vec(b"f\xffo".to_vec());
        let err = r
            .parse_args([OsString::from("prog"), OsString::from("-i"), raw])
            .unwrap_err();
        assert_eq!(err, ParseError::InvalidEncoding("f\u{fffd}o".to_string()));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(r.string("listen_interface").unwrap(), "0.0.0.0");
    }

    #[test]
    fn test_off_flag_with_argument_consumes_token() {
        let mut r = OptionRegistry::empty();
        r.add_option(
            "limit",
            OptionDescriptor::new("rate limit")
                .short('l')
                .short_off('L')
                .arg(ArgKind::Integer)
                .positional(1)
                .default_value(5),
        );
        r.parse_args(["prog", "-L", "99"]).unwrap();
        assert_eq!(
            r.values("limit").unwrap(),
            vec![OptionValue::Int(5), OptionValue::Int(0)]
        );
    }

    #[test]
    fn test_version_banner() {
        let r = OptionRegistry::new("streamgate-test", "7.7");
        let mut out = Vec::new();
        r.print_version(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            format!("Library version: {LIBRARY_VERSION}\nApplication version: 7.7\n")
        );
    }

    #[test]
    fn test_debug_level_parsed_as_integer() {
        let mut r = OptionRegistry::new("streamgate-test", "0.0.1");
        r.parse_args(["prog", "--debug", "6"]).unwrap();
        assert_eq!(r.integer("debug").unwrap(), 6);
    }
}
