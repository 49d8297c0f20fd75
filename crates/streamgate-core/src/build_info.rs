//! Build-time metadata embedded by the build script.

/// `git describe` of the source tree at build time, or `unknown`.
pub const GIT_HASH: &str = env!("STREAMGATE_GIT_HASH");

/// The cargo profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("STREAMGATE_BUILD_PROFILE");

/// Target triple the binary was compiled for.
pub const BUILD_TARGET: &str = env!("STREAMGATE_BUILD_TARGET");

/// The library version, shared by every workspace crate.
pub const VERSION: &str = streamgate_config::LIBRARY_VERSION;

/// Application version reported by `--version` and in startup logs,
/// e.g. `"0.1.0 (abc1234, release, x86_64-unknown-linux-gnu)"`.
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE}, {BUILD_TARGET})")
}
