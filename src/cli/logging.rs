use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::io::config_io;
use crate::io::workspace_io::{self, BULK_DIR};

/// Environment variable holding a filter directive, e.g. `BM_LOG=bulkmod=debug`
pub const LOG_ENV: &str = "BM_LOG";

const FALLBACK_LEVEL: &str = "warn";

/// The `[log] level` of the workspace enclosing `start`, if there is one
pub fn configured_level(start: &Path) -> Option<String> {
    let root = workspace_io::discover_workspace(start).ok()?;
    let (config, _) = config_io::read_config(&root.join(BULK_DIR)).ok()?;
    Some(config.log.level)
}

/// Install the stderr subscriber. `BM_LOG` wins over the workspace config.
pub fn init(start: Option<&Path>) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let level = start
            .and_then(configured_level)
            .unwrap_or_else(|| FALLBACK_LEVEL.to_string());
        EnvFilter::new(level)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
