use anyhow::{Context, Result};
use logtree::{DESCEND, Level, LoggerConfig, global, init_global_with, logging, tree_error, tree_info};

fn main() -> Result<()> {
    let config = LoggerConfig::from_env().context("failed to load logger configuration")?;
    logging::init_tracing();

    let file = config.file_path.clone();
    let _guard = init_global_with(config)
        .with_context(|| format!("failed to initialize logger at {}", file.display()))?;
    let logger = global();

    tree_info!(logger, &["foo"], "value {}", 1);
    tree_info!(logger, &["foo", "bar"], "value {}", 2);
    logger.log(&["foo", "bar2"], Level::Warn, "value 3");
    tree_error!(logger, &["foo", "bar", "baz"], "value {}", 4);
    logger.log(&["other"], Level::Critical, "value 5");
    logger.log(&["foo"], Level::Debug, "filtered unless LOGTREE_LEVEL=debug");

    let template = format!("request %s {DESCEND}accepted {DESCEND}status %d");
    logger.log_template(Level::Info, &template, &[&"GET /", &"http", &"responses", &200]);

    logger.dump();
    tracing::info!(
        file = %file.display(),
        records = logger.record_count(),
        "Wrote log tree"
    );
    Ok(())
}
