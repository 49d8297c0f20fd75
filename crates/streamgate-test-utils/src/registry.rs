//! Registry builders for tests.
//!
//! Use [`TestRegistryBuilder`] to get a connector-shaped [`OptionRegistry`]
//! without repeating the preset calls and argv plumbing in every test.

use serde_json::{Value, json};
use streamgate_config::{OptionDescriptor, OptionRegistry, ParseError};

/// Fluent builder for [`OptionRegistry`] in tests.
///
/// # Example
///
/// ```
/// use streamgate_test_utils::registry::TestRegistryBuilder;
///
/// let config = TestRegistryBuilder::new("streamgate-test")
///     .connector(8080)
///     .args(["--port", "9000"])
///     .build()
///     .unwrap();
/// assert_eq!(config.integer("listen_port").unwrap(), 9000);
/// ```
pub struct TestRegistryBuilder {
    cmd: String,
    registry: OptionRegistry,
    capabilities: Value,
    args: Vec<String>,
}

impl TestRegistryBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            registry: OptionRegistry::new(cmd, "0.0.1-test"),
            capabilities: json!({}),
            args: Vec::new(),
        }
    }

    /// Seed the capability document, e.g. with a `socket` name.
    pub fn capabilities(mut self, capabilities: Value) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Register the TCP connector preset.
    pub fn connector(mut self, port: u16) -> Self {
        self.registry
            .add_connector_options(port, &mut self.capabilities);
        self
    }

    /// Register the basic connector preset (no TCP options).
    pub fn basic_connector(mut self) -> Self {
        self.registry
            .add_basic_connector_options(&mut self.capabilities);
        self
    }

    pub fn option(mut self, name: &str, descriptor: OptionDescriptor) -> Self {
        self.registry.add_option(name, descriptor);
        self
    }

    /// Arguments to parse, not including the program name.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Parse the collected arguments and return the registry.
    pub fn build(self) -> Result<OptionRegistry, ParseError> {
        self.build_with_capabilities().map(|(registry, _)| registry)
    }

    /// Like [`build`](Self::build), also returning the capability document.
    pub fn build_with_capabilities(mut self) -> Result<(OptionRegistry, Value), ParseError> {
        let argv = std::iter::once(self.cmd).chain(self.args);
        self.registry.parse_args(argv)?;
        Ok((self.registry, self.capabilities))
    }
}
