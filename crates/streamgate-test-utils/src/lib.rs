#![deny(unsafe_code)]

//! Shared test utilities for the streamgate workspace.
//!
//! Provides registry builders, client-side socket helpers, a process-wide
//! test lock, and tracing setup so that individual crate tests stay concise
//! and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! streamgate-test-utils = { workspace = true }
//! ```

pub mod net;
pub mod process;
pub mod registry;
pub mod tracing_setup;
