//! The option registry: named descriptors plus their accumulated values.

use std::collections::HashMap;

use crate::descriptor::{ArgKind, OptionDescriptor};
use crate::value::OptionValue;
use crate::{ConfigError, LIBRARY_VERSION, debug};

/// Insertion-ordered map of option name to [`OptionDescriptor`].
///
/// Lookups go through a name index; iteration (help output, flag tables,
/// positional matching) follows registration order.
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    entries: Vec<(String, OptionDescriptor)>,
    index: HashMap<String, usize>,
    long_count: usize,
}

impl OptionRegistry {
    /// A registry with no options at all, not even the built-ins.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in `cmd`, `version`, `help` and
    /// `debug` options.
    ///
    /// `cmd` holds the executable name used in usage output; `version`
    /// holds the library version followed by the application version, so
    /// the scalar read yields the application's.
    pub fn new(cmd: impl Into<String>, version: impl Into<String>) -> Self {
        let mut registry = Self::empty();
        registry.add_option("cmd", OptionDescriptor::new("").value(cmd.into()));
        registry.add_option(
            "version",
            OptionDescriptor::new("Display library and application version, then exit.")
                .short('v')
                .long("version")
                .value(LIBRARY_VERSION)
                .value(version.into()),
        );
        registry.add_option(
            "help",
            OptionDescriptor::new("Display usage and version information, then exit.")
                .short('h')
                .long("help"),
        );
        registry.add_option(
            "debug",
            OptionDescriptor::new("The debug level at which messages need to be printed.")
                .short('g')
                .long("debug")
                .arg(ArgKind::Integer)
                .default_value(i64::from(debug::DEFAULT_LEVEL)),
        );
        registry
    }

    /// Register `descriptor` under `name`, replacing any previous entry with
    /// that name (including values it accumulated).
    ///
    /// A `default` with no explicit values becomes the first value.
    pub fn add_option(&mut self, name: impl Into<String>, descriptor: OptionDescriptor) {
        let name = name.into();
        let descriptor = descriptor.normalize();
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = descriptor,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, descriptor));
            }
        }
        self.recount_long();
    }

    /// Unregister `name`, returning its descriptor and accumulated values.
    pub fn remove_option(&mut self, name: &str) -> Option<OptionDescriptor> {
        let i = self.index.remove(name)?;
        let (_, descriptor) = self.entries.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        self.recount_long();
        Some(descriptor)
    }

    fn recount_long(&mut self) {
        self.long_count = self.entries.iter().map(|(_, d)| d.long_entries()).sum();
    }

    /// Number of long-flag spellings (on and off) across all options.
    pub fn long_count(&self) -> usize {
        self.long_count
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The descriptor registered under `name`.
    pub fn get(&self, name: &str) -> Result<&OptionDescriptor, ConfigError> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i].1)
            .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut OptionDescriptor, ConfigError> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.entries[i].1),
            None => Err(ConfigError::UnknownOption(name.to_string())),
        }
    }

    /// All registered options in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionDescriptor)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// The full value history of an option, oldest first.
    ///
    /// An option that holds no values reads as a single null placeholder.
    pub fn values(&self, name: &str) -> Result<Vec<OptionValue>, ConfigError> {
        let descriptor = self.get(name)?;
        if descriptor.values.is_empty() {
            Ok(vec![OptionValue::Null])
        } else {
            Ok(descriptor.values.clone())
        }
    }

    /// The current (last appended) value of an option.
    pub fn value(&self, name: &str) -> Result<OptionValue, ConfigError> {
        let descriptor = self.get(name)?;
        Ok(descriptor.values.last().cloned().unwrap_or_default())
    }

    pub fn string(&self, name: &str) -> Result<String, ConfigError> {
        Ok(self.value(name)?.as_string())
    }

    pub fn integer(&self, name: &str) -> Result<i64, ConfigError> {
        Ok(self.value(name)?.as_int())
    }

    pub fn boolean(&self, name: &str) -> Result<bool, ConfigError> {
        Ok(self.value(name)?.as_bool())
    }

    /// Highest positional index among options that still have no value.
    pub(crate) fn max_required_positional(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, d)| d.is_required_positional())
            .filter_map(|(_, d)| d.arg_num)
            .max()
            .map_or(0, |n| n as usize)
    }
}
