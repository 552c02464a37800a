//! Helpers shared by the integration tests.

/// Routes the codec's log records to the test output.
pub fn init_logging() { let _ = env_logger::builder().is_test(true).try_init(); }
