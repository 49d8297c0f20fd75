//! Process-wide debug level.
//!
//! A successful argument parse writes the `debug` option here; logging setup
//! reads it back to pick a verbosity.

use std::sync::atomic::{AtomicU8, Ordering};

/// Nothing is printed.
pub const LEVEL_NONE: u8 = 0;
/// Only failures that end the process.
pub const LEVEL_FAIL: u8 = 1;
pub const LEVEL_ERROR: u8 = 2;
pub const LEVEL_WARN: u8 = 3;
/// Default: messages useful while developing and operating a connector.
pub const LEVEL_DEVEL: u8 = 4;
pub const LEVEL_MEDIUM: u8 = 5;
pub const LEVEL_HIGH: u8 = 6;
pub const LEVEL_VERYHIGH: u8 = 7;
pub const LEVEL_EXTREME: u8 = 8;
pub const LEVEL_INSANE: u8 = 9;
pub const LEVEL_DONTEVEN: u8 = 10;

pub const DEFAULT_LEVEL: u8 = LEVEL_DEVEL;

static DEBUG_LEVEL: AtomicU8 = AtomicU8::new(DEFAULT_LEVEL);

/// The current process-wide debug level.
pub fn level() -> u8 {
    DEBUG_LEVEL.load(Ordering::Relaxed)
}

/// Store a new level, clamped to `0..=LEVEL_DONTEVEN`.
pub fn set_level(level: i64) {
    DEBUG_LEVEL.store(clamp_level(level), Ordering::Relaxed);
}

fn clamp_level(level: i64) -> u8 {
    level.clamp(0, i64::from(LEVEL_DONTEVEN)) as u8
}
