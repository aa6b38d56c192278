use std::path::PathBuf;

use anyhow::{Context, Result};

use bookshop_search::config::ShopConfig;
use bookshop_search::network::server::QueryServer;
use bookshop_search::storage::path_utils;

/// `serve`: catalog executor on a local socket until SIGINT/SIGTERM or `shutdown`.
pub fn run(socket: Option<&str>) -> Result<()> {
    let config = ShopConfig::load();
    let socket_path = socket
        .map(|s| PathBuf::from(path_utils::expand_tilde(s)))
        .unwrap_or_else(|| config.server.socket_path());

    let server = QueryServer::new(super::query_service(&config, false), &socket_path);

    let stop = server.stop_flag();
    signal_hook::flag::register(signal_hook::consts::SIGINT, stop.clone())
        .context("Failed to install SIGINT handler")?;
    #[cfg(unix)]
    signal_hook::flag::register(signal_hook::consts::SIGTERM, stop)
        .context("Failed to install SIGTERM handler")?;

    println!("Serving catalog queries on {} (Ctrl-C to stop)", socket_path.display());
    server.serve().context("Query server failed")?;
    Ok(())
}
