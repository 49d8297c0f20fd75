//! Log capture for engine tests.

use tracing_subscriber::EnvFilter;

/// Route tracing output through the test harness at `debug` (or `RUST_LOG`),
/// tagging each line with its thread name so events from the `conn-<fd>`
/// handler threads can be told apart from the accept loop. Later calls in
/// the same process are no-ops.
///
/// ```ignore
/// #[test]
/// fn fork_engine() {
///     streamgate_test_utils::tracing_setup::init_test_tracing();
///     tracing::debug!("visible in test output");
/// }
/// ```
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_thread_names(true)
        .with_test_writer()
        .try_init();
}
