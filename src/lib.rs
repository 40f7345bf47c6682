pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::config::LauncherConfig;
pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::launch::{LaunchCommand, RuntimeAssembler, RuntimeEnvironment};

/// Install a `fmt` subscriber honouring `RUST_LOG`, defaulting to
/// `info,launch_core=debug`. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,launch_core=debug")),
        )
        .try_init();
}
