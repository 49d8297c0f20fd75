#![deny(unsafe_code)]

//! streamgate-echo: reference connector that sends every byte it receives
//! straight back to the client.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::{debug, info};

use streamgate_config::{ArgKind, OptionDescriptor, OptionRegistry, OrExit};
use streamgate_core::{ConcurrencyModel, Connection, build_info, logging, server};

const DEFAULT_PORT: u16 = 4242;

fn capabilities() -> Value {
    json!({
        "name": "Echo",
        "desc": "Echoes every byte received back to the sender.",
        "deps": "",
    })
}

fn build_registry(capabilities: &mut Value) -> OptionRegistry {
    let mut config = OptionRegistry::new("streamgate-echo", build_info::version_string());
    config.add_connector_options(DEFAULT_PORT, capabilities);

    config.add_option(
        "forked",
        OptionDescriptor::new("Handle each connection in its own child process instead of a thread.")
            .short('f')
            .long("fork")
            .value(0),
    );
    capabilities["optional"]["fork"] = json!({
        "name": "Fork per connection",
        "help": "Run each connection in a separate process",
        "option": "--fork",
    });

    config.add_option(
        "logfile",
        OptionDescriptor::new("Append log output to this file instead of stderr.")
            .short('l')
            .long("logfile")
            .arg(ArgKind::String)
            .value(""),
    );
    capabilities["optional"]["logfile"] = json!({
        "name": "Log file",
        "help": "File to append log output to",
        "option": "--logfile",
        "type": "str",
    });

    config
}

fn echo(conn: &mut Connection) -> i32 {
    let mut buf = [0u8; 4096];
    let mut total = 0usize;
    loop {
        let n = match conn.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(peer = %conn.peer(), error = %e, "read failed");
                return 1;
            }
        };
        if let Err(e) = conn.write_all(&buf[..n]) {
            debug!(peer = %conn.peer(), error = %e, "write failed");
            return 1;
        }
        total += n;
    }
    debug!(peer = %conn.peer(), bytes = total, "client disconnected");
    0
}

fn main() -> Result<ExitCode> {
    let mut capabilities = capabilities();
    let mut config = build_registry(&mut capabilities);
    config.parse_args_or_exit(std::env::args_os());

    if config.boolean("json").or_exit() {
        println!("{}", serde_json::to_string_pretty(&capabilities)?);
        return Ok(ExitCode::SUCCESS);
    }

    logging::init_from_registry(&config).context("failed to initialise logging")?;
    info!(version = %build_info::version_string(), "starting streamgate-echo");

    let model = if config.boolean("forked").or_exit() {
        ConcurrencyModel::Forked
    } else {
        ConcurrencyModel::Threaded
    };
    let code = server::serve(&config, model, echo);
    info!(code, "streamgate-echo exiting");
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
