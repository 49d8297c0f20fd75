//! Usage text rendering.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::descriptor::OptionDescriptor;
use crate::registry::OptionRegistry;

fn flag_label(short: Option<char>, long: Option<&str>) -> Option<String> {
    match (long, short) {
        (Some(l), Some(s)) => Some(format!("--{l}, -{s}")),
        (Some(l), None) => Some(format!("--{l}")),
        (None, Some(s)) => Some(format!("-{s}")),
        (None, None) => None,
    }
}

fn label_width(short: Option<char>, long: Option<&str>) -> usize {
    long.map_or(0, |l| l.len() + 4) + short.map_or(0, |_| 4)
}

fn write_line(
    out: &mut impl Write,
    label: &str,
    width: usize,
    d: &OptionDescriptor,
) -> io::Result<()> {
    match d.arg {
        Some(kind) => writeln!(out, "{label:<width$}({kind}) {}", d.help),
        None => writeln!(out, "{label:<width$}{}", d.help),
    }
}

impl OptionRegistry {
    /// Write the usage synopsis followed by one line per flag pair and
    /// positional slot, in registration order.
    pub fn print_help(&self, out: &mut impl Write) -> io::Result<()> {
        let mut width = 0;
        let mut positionals: BTreeMap<u32, (&str, &OptionDescriptor)> = BTreeMap::new();
        for (name, d) in self.iter() {
            width = width
                .max(label_width(d.short, d.long.as_deref()))
                .max(label_width(d.short_off, d.long_off.as_deref()));
            if let Some(n) = d.arg_num {
                width = width.max(name.len() + 3);
                positionals.insert(n, (name, d));
            }
        }

        write!(
            out,
            "Usage: {} [options]",
            self.string("cmd").unwrap_or_default()
        )?;
        for (name, d) in positionals.values() {
            if d.values.is_empty() {
                write!(out, " {name}")?;
            } else {
                write!(out, " [{name}]")?;
            }
        }
        writeln!(out)?;
        writeln!(out)?;

        for (name, d) in self.iter() {
            if let Some(label) = flag_label(d.short, d.long.as_deref()) {
                write_line(out, &label, width, d)?;
            }
            if let Some(label) = flag_label(d.short_off, d.long_off.as_deref()) {
                write_line(out, &label, width, d)?;
            }
            if d.arg_num.is_some() {
                write_line(out, name, width, d)?;
            }
        }
        Ok(())
    }

    /// The usage text as a string.
    pub fn usage(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.print_help(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
