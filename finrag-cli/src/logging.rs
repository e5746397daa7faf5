//! Log output for the command-line front end.
//!
//! Logs go to stderr so command output on stdout stays pipeable. `RUST_LOG`
//! takes precedence over the verbosity flag:
//!
//! ```bash
//! RUST_LOG=finrag=debug finrag search sec_filings "liquidity risk"
//! ```

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `verbosity` is the number of `-v` flags: quiet (`warn`) by default, `info`
/// for one, `debug` for two or more.
pub fn init(verbosity: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbosity {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
