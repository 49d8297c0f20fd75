//! Scalar values stored in an option's history.
//!
//! Values are kept verbatim as they arrive from the command line (strings)
//! or from registration (defaults), and only converted when read.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single resolved option value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Placeholder for a registered option that was never given a value.
    #[default]
    Null,
    Int(i64),
    Str(String),
}

impl OptionValue {
    /// String view: strings verbatim, integers in decimal, null as `""`.
    pub fn as_string(&self) -> String {
        match self {
            OptionValue::Null => String::new(),
            OptionValue::Int(n) => n.to_string(),
            OptionValue::Str(s) => s.clone(),
        }
    }

    /// Integer view. Strings are read like C `atoll`: leading whitespace, an
    /// optional sign, then as many digits as are present. Anything that does
    /// not start with a number reads as `0`.
    pub fn as_int(&self) -> i64 {
        match self {
            OptionValue::Null => 0,
            OptionValue::Int(n) => *n,
            OptionValue::Str(s) => parse_leading_int(s),
        }
    }

    /// Truthiness: non-zero integers and non-empty strings are `true`.
    pub fn as_bool(&self) -> bool {
        match self {
            OptionValue::Null => false,
            OptionValue::Int(n) => *n != 0,
            OptionValue::Str(s) => !s.is_empty(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, OptionValue::Null)
    }
}

fn parse_leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut acc: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b - b'0');
        acc = match acc.checked_mul(10).and_then(|v| v.checked_add(digit)) {
            Some(v) => v,
            // Saturate like strtoll does on overflow.
            None => return if negative { i64::MIN } else { i64::MAX },
        };
    }
    if negative { -acc } else { acc }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Null => f.write_str("null"),
            OptionValue::Int(n) => write!(f, "{n}"),
            OptionValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self {
        OptionValue::Int(n)
    }
}

impl From<i32> for OptionValue {
    fn from(n: i32) -> Self {
        OptionValue::Int(i64::from(n))
    }
}

impl From<u16> for OptionValue {
    fn from(n: u16) -> Self {
        OptionValue::Int(i64::from(n))
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Int(i64::from(b))
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Str(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Str(s)
    }
}

impl From<&serde_json::Value> for OptionValue {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => OptionValue::Null,
            serde_json::Value::Bool(b) => OptionValue::from(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(OptionValue::Int)
                .unwrap_or_else(|| OptionValue::Str(n.to_string())),
            serde_json::Value::String(s) => OptionValue::Str(s.clone()),
            other => OptionValue::Str(other.to_string()),
        }
    }
}
