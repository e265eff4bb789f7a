#![cfg(not(tarpaulin_include))]

use inventory_scanner::app;
use inventory_scanner::config::Config;
use std::env;

/// Main entry point for the inventory web application
///
/// Settings come from `INVENTORY_*` environment variables; the first two
/// positional arguments override the listen address and the store backend.
///
/// # Examples
/// ```text
/// website                       # 127.0.0.1:5000, in-memory sessions
/// website 0.0.0.0:8080 disk     # session files under $INVENTORY_DATA_DIR
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = Config::from_env()?;

    let args: Vec<String> = env::args().collect();
    if let Some(addr) = args.get(1) {
        config.addr = addr.clone();
    }
    if let Some(backend) = args.get(2) {
        config.backend = backend.parse()?;
    }

    app::run(config).await
}
