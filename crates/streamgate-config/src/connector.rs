//! Option presets shared by every connector executable.
//!
//! Each preset registers its options and records a matching entry in the
//! connector's capability document, the JSON a connector prints for
//! `--json` so a controller can discover how to launch it.

use serde_json::{Value, json};

use crate::descriptor::{ArgKind, OptionDescriptor};
use crate::registry::OptionRegistry;
use crate::value::OptionValue;

/// Interface address that means "all interfaces".
pub const ANY_INTERFACE: &str = "0.0.0.0";

/// Username that means "do not drop privileges".
pub const NO_PRIVILEGE_DROP: &str = "root";

fn optional_capability(capabilities: &mut Value, key: &str, entry: Value) {
    if !capabilities.is_object() {
        *capabilities = json!({});
    }
    capabilities["optional"][key] = entry;
}

impl OptionRegistry {
    /// Register the TCP listening options (`listen_port`, `listen_interface`)
    /// plus everything [`add_basic_connector_options`] registers.
    ///
    /// [`add_basic_connector_options`]: Self::add_basic_connector_options
    pub fn add_connector_options(&mut self, port: u16, capabilities: &mut Value) {
        self.add_option(
            "listen_port",
            OptionDescriptor::new("TCP port to listen on")
                .short('p')
                .long("port")
                .arg(ArgKind::Integer)
                .value(port),
        );
        optional_capability(
            capabilities,
            "port",
            json!({
                "name": "TCP port",
                "help": format!("TCP port to listen on - default if unprovided is {port}"),
                "type": "uint",
                "option": "--port",
                "default": port,
            }),
        );

        self.add_option(
            "listen_interface",
            OptionDescriptor::new(
                "Interface address to listen on, or 0.0.0.0 for all available interfaces.",
            )
            .short('i')
            .long("interface")
            .arg(ArgKind::String)
            .value(ANY_INTERFACE),
        );
        optional_capability(
            capabilities,
            "interface",
            json!({
                "name": "Interface",
                "help": "Address of the interface to listen on - default if unprovided is all interfaces",
                "option": "--interface",
                "type": "str",
            }),
        );

        self.add_basic_connector_options(capabilities);
    }

    /// Register `username`, `daemonize` and `json`, plus `socket` when the
    /// capability document names one.
    pub fn add_basic_connector_options(&mut self, capabilities: &mut Value) {
        self.add_option(
            "username",
            OptionDescriptor::new("Username to drop privileges to, or root to not drop privileges.")
                .short('u')
                .long("username")
                .arg(ArgKind::String)
                .value(NO_PRIVILEGE_DROP),
        );
        optional_capability(
            capabilities,
            "username",
            json!({
                "name": "Username",
                "help": "Username to drop privileges to - default if unprovided means do not drop privileges",
                "option": "--username",
                "type": "str",
            }),
        );

        if let Some(socket) = capabilities.get("socket") {
            let socket = OptionValue::from(socket);
            self.add_option(
                "socket",
                OptionDescriptor::new("Socket name that can be connected to for this connector.")
                    .arg(ArgKind::String)
                    .value(socket),
            );
        }

        self.add_option(
            "daemonize",
            OptionDescriptor::new("Whether or not to daemonize the process after starting.")
                .short('d')
                .long("daemon")
                .short_off('n')
                .long_off("nodaemon")
                .value(0),
        );

        self.add_option(
            "json",
            OptionDescriptor::new("Output connector info in JSON format, then exit.")
                .short('j')
                .long("json")
                .value(0),
        );
    }
}
