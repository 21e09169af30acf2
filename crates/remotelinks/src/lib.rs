pub mod app;
pub mod domain;
pub mod infra;
pub mod ui;

use tracing::Level;

/// Install the stderr log subscriber. Stdout is reserved for command output.
pub fn init(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}
