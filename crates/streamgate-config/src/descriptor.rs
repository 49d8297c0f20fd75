//! Option descriptors: the schema entry for one configurable setting.

use std::fmt;

use serde::Serialize;

use crate::value::OptionValue;

/// Kind of argument a flag consumes from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    Integer,
    String,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::Integer => f.write_str("integer"),
            ArgKind::String => f.write_str("string"),
        }
    }
}

/// Schema for one named option.
///
/// A descriptor may be reachable through an "on" flag pair (`short`/`long`),
/// an "off" flag pair (`short_off`/`long_off`), a positional slot
/// (`arg_num`), or any combination of those. Every hit appends to `values`;
/// readers take the last entry.
///
/// Built with a fluent API:
///
/// ```
/// use streamgate_config::{ArgKind, OptionDescriptor};
///
/// let port = OptionDescriptor::new("TCP port to listen on")
///     .short('p')
///     .long("port")
///     .arg(ArgKind::Integer)
///     .default_value(8080);
/// assert_eq!(port.long.as_deref(), Some("port"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_off: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_off: Option<String>,
    /// Argument consumed by the on (and off) flags, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<ArgKind>,
    /// 1-based index among the bare tokens left after flag processing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg_num: Option<u32>,
    /// Moved into `values` on registration when `values` is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<OptionValue>,
    pub values: Vec<OptionValue>,
    pub help: String,
}

impl OptionDescriptor {
    pub fn new(help: impl Into<String>) -> Self {
        Self {
            help: help.into(),
            ..Self::default()
        }
    }

    pub fn short(mut self, letter: char) -> Self {
        self.short = Some(letter);
        self
    }

    pub fn long(mut self, name: impl Into<String>) -> Self {
        self.long = Some(name.into());
        self
    }

    pub fn short_off(mut self, letter: char) -> Self {
        self.short_off = Some(letter);
        self
    }

    pub fn long_off(mut self, name: impl Into<String>) -> Self {
        self.long_off = Some(name.into());
        self
    }

    pub fn arg(mut self, kind: ArgKind) -> Self {
        self.arg = Some(kind);
        self
    }

    pub fn positional(mut self, index: u32) -> Self {
        self.arg_num = Some(index);
        self
    }

    pub fn default_value(mut self, value: impl Into<OptionValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Pre-populate the value history directly, bypassing `default`.
    pub fn value(mut self, value: impl Into<OptionValue>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Whether any on/off flag addresses this option.
    pub fn has_flags(&self) -> bool {
        self.short.is_some()
            || self.long.is_some()
            || self.short_off.is_some()
            || self.long_off.is_some()
    }

    /// A positional option with nothing pre-populated must be supplied.
    pub fn is_required_positional(&self) -> bool {
        self.arg_num.is_some() && self.values.is_empty()
    }

    /// Number of long-table entries this descriptor contributes.
    pub(crate) fn long_entries(&self) -> usize {
        usize::from(self.long.is_some()) + usize::from(self.long_off.is_some())
    }

    /// Apply the default-to-values move done at registration time.
    pub(crate) fn normalize(mut self) -> Self {
        if self.values.is_empty() {
            if let Some(default) = self.default.take() {
                self.values.push(default);
            }
        } else {
            self.default = None;
        }
        self
    }
}
