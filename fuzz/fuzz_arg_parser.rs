//! Fuzz target for the command-line parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_arg_parser
//!
//! Splits the input on NUL bytes into an argv and parses it against the
//! connector preset plus one required positional. Looks for panics in flag
//! scanning, prefix matching and positional assignment, and checks that a
//! failed parse leaves the registry untouched.

#![no_main]

use libfuzzer_sys::fuzz_target;
use streamgate_config::{ArgKind, OptionDescriptor, OptionRegistry};

fn registry() -> OptionRegistry {
    let mut config = OptionRegistry::new("fuzz", "0");
    config.add_connector_options(8080, &mut serde_json::json!({ "socket": "fuzz" }));
    config.add_option(
        "input",
        OptionDescriptor::new("input").arg(ArgKind::String).positional(1),
    );
    config
}

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let argv = std::iter::once("fuzz").chain(s.split('\0'));

    let mut config = registry();
    if config.parse_args(argv).is_err() {
        let fresh = registry();
        for (name, descriptor) in fresh.iter() {
            assert_eq!(
                config.values(name).ok(),
                fresh.values(name).ok(),
                "failed parse changed '{name}' ({descriptor:?})"
            );
        }
    }
});
