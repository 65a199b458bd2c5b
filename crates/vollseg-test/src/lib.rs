//! vollseg-test - Regression test framework for the vollseg engine
//!
//! This crate provides the regression test harness, plus the synthetic
//! fixtures and logging setup the regression tests share.
//!
//! # Usage
//!
//! ```
//! use vollseg_test::RegParams;
//!
//! let mut rp = RegParams::new("example");
//! rp.compare_values(2.0, 1.0 + 1.0, 0.0);
//! assert!(rp.cleanup());
//! ```
//!
//! # Environment Variables
//!
//! - `REGTEST_MODE`: Set to "compare" (default) or "display"
//! - `RUST_LOG`: Filter for [`init_logging`]

mod error;
pub mod fixtures;
mod params;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};

use tracing_subscriber::EnvFilter;

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG`
///
/// Defaults to `warn` when `RUST_LOG` is unset or invalid. Safe to call from
/// every test; only the first call installs the subscriber.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
