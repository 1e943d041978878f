//!
//! src/main.rs  Andrew Belles  Oct 12th, 2026
//!
//! Serves the redirect uri registered with spotify so the authorization
//! code can be read off the browser during the one-time consent step
//!

mod config;
mod errors;
mod routes;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::errors::CallbackError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CallbackError> {
    let cfg = config::load_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,auth_callback=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let listener = tokio::net::TcpListener::bind(cfg.address).await?;
    info!(address = %cfg.address, "callback.listen");

    axum::serve(listener, routes::router())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("callback.stop");
        })
        .await?;

    Ok(())
}
