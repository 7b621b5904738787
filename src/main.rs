use std::path::PathBuf;

use tracing::{debug, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{prelude::*, reload};

pub mod config;
pub mod engines;
pub mod error;
pub mod parse;
pub mod ratelimit;
pub mod web;

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    // start at INFO so loading the config is logged, then switch to DEBUG if
    // the config asks for it
    let (level, level_handle) = reload::Layer::new(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(level)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = config::Config::read_or_create(&config_path)?;

    if config.debug {
        level_handle.modify(|level| *level = LevelFilter::DEBUG)?;
    }

    info!(
        "quickanswer {} ({}) using config at {config_path:?}",
        env!("CARGO_PKG_VERSION"),
        env!("QUICKANSWER_COMMIT")
    );
    if config.debug {
        warn!("Debug logging is on, don't expose this instance publicly");
        debug!("{config:?}");
    }

    web::run(config).await
}
