//! Low-level flag scanning in the style of GNU `getopt_long`.
//!
//! The registry is flattened into a short-letter table and a long-name table
//! that both resolve to the same [`FlagTarget`]. [`Scanner`] then walks argv
//! one token at a time, supporting clustered short flags, attached and
//! detached arguments, `--name=value`, unambiguous long prefixes, `--` as an
//! end-of-options marker, and interleaved positionals.

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::parser::ParseError;
use crate::registry::OptionRegistry;

/// Whether a flag switches its option on (or supplies a value) or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Polarity {
    On,
    Off,
}

/// What a flag spelling resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlagTarget {
    pub name: String,
    pub polarity: Polarity,
    pub takes_arg: bool,
}

/// Short and long lookup tables derived from a registry.
#[derive(Debug, Default)]
pub(crate) struct FlagTable {
    short: HashMap<char, FlagTarget>,
    long: Vec<(String, FlagTarget)>,
}

impl FlagTable {
    pub fn from_registry(registry: &OptionRegistry) -> Self {
        let mut table = FlagTable {
            short: HashMap::new(),
            long: Vec::with_capacity(registry.long_count()),
        };

        for (name, d) in registry.iter() {
            let takes_arg = d.arg.is_some();
            let on = FlagTarget {
                name: name.to_string(),
                polarity: Polarity::On,
                takes_arg,
            };
            let off = FlagTarget {
                polarity: Polarity::Off,
                ..on.clone()
            };

            // The first option to claim a letter keeps it.
            if let Some(c) = d.short {
                table.short.entry(c).or_insert_with(|| on.clone());
            }
            if let Some(c) = d.short_off {
                table.short.entry(c).or_insert_with(|| off.clone());
            }
            if let Some(l) = &d.long {
                table.long.push((l.clone(), on));
            }
            if let Some(l) = &d.long_off {
                table.long.push((l.clone(), off));
            }
        }
        table
    }

    fn lookup_short(&self, c: char) -> Option<&FlagTarget> {
        self.short.get(&c)
    }

    fn lookup_long(&self, name: &str) -> Result<&FlagTarget, ParseError> {
        if let Some((_, t)) = self.long.iter().find(|(l, _)| l == name) {
            return Ok(t);
        }

        let mut candidates = self.long.iter().filter(|(l, _)| l.starts_with(name));
        match candidates.next() {
            None => Err(ParseError::UnknownFlag(format!("--{name}"))),
            Some((_, first)) => {
                if candidates.all(|(_, t)| t == first) {
                    Ok(first)
                } else {
                    Err(ParseError::AmbiguousFlag(format!("--{name}")))
                }
            }
        }
    }
}

/// One scanned unit of the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Flag {
        target: FlagTarget,
        arg: Option<String>,
    },
    Positional(String),
}

/// Iterator over the tokens of an argv (without the program name).
pub(crate) struct Scanner<'t> {
    table: &'t FlagTable,
    args: VecDeque<String>,
    /// Remaining letters of a short-flag cluster such as `-dn`.
    cluster: VecDeque<char>,
    options_done: bool,
}

impl<'t> Scanner<'t> {
    pub fn new<I, S>(table: &'t FlagTable, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table,
            args: args.into_iter().map(Into::into).collect(),
            cluster: VecDeque::new(),
            options_done: false,
        }
    }

    fn next_short(&mut self, c: char) -> Result<Token, ParseError> {
        let target = self
            .table
            .lookup_short(c)
            .ok_or_else(|| ParseError::UnknownFlag(format!("-{c}")))?
            .clone();

        if !target.takes_arg {
            return Ok(Token::Flag { target, arg: None });
        }

        // The rest of the cluster is the argument, if there is any.
        let arg = if !self.cluster.is_empty() {
            self.cluster.drain(..).collect()
        } else {
            self.args
                .pop_front()
                .ok_or_else(|| ParseError::MissingArgument(format!("-{c}")))?
        };
        Ok(Token::Flag {
            target,
            arg: Some(arg),
        })
    }

    fn next_long(&mut self, body: &str) -> Result<Token, ParseError> {
        let (name, inline) = match body.split_once('=') {
            Some((n, v)) => (n, Some(v.to_string())),
            None => (body, None),
        };
        let target = self.table.lookup_long(name)?.clone();

        let arg = match (target.takes_arg, inline) {
            (true, Some(v)) => Some(v),
            (true, None) => Some(
                self.args
                    .pop_front()
                    .ok_or_else(|| ParseError::MissingArgument(format!("--{name}")))?,
            ),
            (false, Some(_)) => return Err(ParseError::UnexpectedArgument(format!("--{name}"))),
            (false, None) => None,
        };
        Ok(Token::Flag { target, arg })
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(c) = self.cluster.pop_front() {
            return Some(self.next_short(c));
        }

        let arg = self.args.pop_front()?;
        if self.options_done || arg == "-" || !arg.starts_with('-') {
            return Some(Ok(Token::Positional(arg)));
        }
        if arg == "--" {
            self.options_done = true;
            return self.next();
        }
        if let Some(body) = arg.strip_prefix("--") {
            return Some(self.next_long(body));
        }

        self.cluster.extend(arg.chars().skip(1));
        let c = self.cluster.pop_front()?;
        Some(self.next_short(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ArgKind, OptionDescriptor};
    use pretty_assertions::assert_eq;

    fn registry() -> OptionRegistry {
        let mut r = OptionRegistry::empty();
        r.add_option(
            "listen_port",
            OptionDescriptor::new("port")
                .short('p')
                .long("port")
                .arg(ArgKind::Integer),
        );
        r.add_option(
            "daemonize",
            OptionDescriptor::new("daemon")
                .short('d')
                .long("daemon")
                .short_off('n')
                .long_off("nodaemon"),
        );
        r.add_option("json", OptionDescriptor::new("json").short('j').long("json"));
        r
    }

    fn scan(args: &[&str]) -> Vec<Result<Token, ParseError>> {
        let r = registry();
        let table = FlagTable::from_registry(&r);
        Scanner::new(&table, args.iter().copied()).collect()
    }

    fn flag(name: &str, polarity: Polarity, takes_arg: bool, arg: Option<&str>) -> Token {
        Token::Flag {
            target: FlagTarget {
                name: name.to_string(),
                polarity,
                takes_arg,
            },
            arg: arg.map(str::to_string),
        }
    }

    #[test]
    fn test_short_and_long_resolve_identically() {
        let short = scan(&["-p", "9000"]);
        let long = scan(&["--port", "9000"]);
        let inline = scan(&["--port=9000"]);
        let attached = scan(&["-p9000"]);
        let expected = vec![Ok(flag("listen_port", Polarity::On, true, Some("9000")))];
        assert_eq!(short, expected);
        assert_eq!(long, expected);
        assert_eq!(inline, expected);
        assert_eq!(attached, expected);
    }

    #[test]
    fn test_clustered_flags() {
        let tokens = scan(&["-dnj"]);
        assert_eq!(
            tokens,
            vec![
                Ok(flag("daemonize", Polarity::On, false, None)),
                Ok(flag("daemonize", Polarity::Off, false, None)),
                Ok(flag("json", Polarity::On, false, None)),
            ]
        );
    }

    #[test]
    fn test_cluster_ending_in_argument_flag() {
        let tokens = scan(&["-dp", "81"]);
        assert_eq!(
            tokens,
            vec![
                Ok(flag("daemonize", Polarity::On, false, None)),
                Ok(flag("listen_port", Polarity::On, true, Some("81"))),
            ]
        );
    }

    #[test]
    fn test_positionals_interleave_and_double_dash() {
        let tokens = scan(&["in.dtsc", "-d", "-", "--", "-j"]);
        assert_eq!(
            tokens,
            vec![
                Ok(Token::Positional("in.dtsc".to_string())),
                Ok(flag("daemonize", Polarity::On, false, None)),
                Ok(Token::Positional("-".to_string())),
                Ok(Token::Positional("-j".to_string())),
            ]
        );
    }

    #[test]
    fn test_long_prefix_matching() {
        assert_eq!(
            scan(&["--nod"]),
            vec![Ok(flag("daemonize", Polarity::Off, false, None))]
        );
        assert_eq!(scan(&["--j"]), vec![Ok(flag("json", Polarity::On, false, None))]);
    }

    #[test]
    fn test_ambiguous_prefix() {
        let mut r = registry();
        r.add_option("dump", OptionDescriptor::new("dump").long("dump"));
        let table = FlagTable::from_registry(&r);
        let tokens: Vec<_> = Scanner::new(&table, ["--d"]).collect();
        assert_eq!(tokens, vec![Err(ParseError::AmbiguousFlag("--d".to_string()))]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(scan(&["-x"]), vec![Err(ParseError::UnknownFlag("-x".to_string()))]);
        assert_eq!(
            scan(&["--bogus"]),
            vec![Err(ParseError::UnknownFlag("--bogus".to_string()))]
        );
        assert_eq!(
            scan(&["-p"]),
            vec![Err(ParseError::MissingArgument("-p".to_string()))]
        );
        assert_eq!(
            scan(&["--port"]),
            vec![Err(ParseError::MissingArgument("--port".to_string()))]
        );
        assert_eq!(
            scan(&["--json=1"]),
            vec![Err(ParseError::UnexpectedArgument("--json".to_string()))]
        );
    }

    #[test]
    fn test_first_registered_letter_wins() {
        let mut r = registry();
        r.add_option("other", OptionDescriptor::new("clash").short('j'));
        let table = FlagTable::from_registry(&r);
        let tokens: Vec<_> = Scanner::new(&table, ["-j"]).collect();
        assert_eq!(tokens, vec![Ok(flag("json", Polarity::On, false, None))]);
    }
}
