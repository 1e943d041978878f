//!
//! src/auth.rs  Andrew Belles  Oct 12th, 2026
//!
//! Holds the current bearer token and swaps it for a fresh one when
//! spotify rejects it. The refreshed token lives only for this process
//!

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::{SpotifyConfig, SpotifyCredentials};
use crate::errors::EtlError;
use crate::fetch::SpotifyApi;

pub struct TokenProvider {
    api: Arc<dyn SpotifyApi>,
    credentials: SpotifyCredentials,
    current: RwLock<String>,
    // serializes refreshes so the refresh token is exchanged by one caller at a time
    refreshing: Mutex<()>
}

impl TokenProvider {
    pub fn new(api: Arc<dyn SpotifyApi>, cfg: &SpotifyConfig) -> Self {
        Self {
            api,
            credentials: cfg.credentials.clone(),
            current: RwLock::new(cfg.access_token.clone()),
            refreshing: Mutex::new(())
        }
    }

    pub async fn get_token(&self) -> String {
        self.current.read().await.clone()
    }

    /// Exchanges the refresh token and installs the new access token
    pub async fn refresh(&self) -> Result<String, EtlError> {
        let _guard = self.refreshing.lock().await;

        let reply = self.api.exchange_refresh_token(&self.credentials).await?;
        if !reply.is_success() {
            warn!(status = reply.status, "token.refresh.rejected");
            return Err(EtlError::Auth(format!(
                "could not refresh access token (status {}), check refresh token and client credentials",
                reply.status
            )));
        }

        let json: Value = serde_json::from_str(&reply.body)
            .map_err(|e| EtlError::Auth(format!("token response is not json: {e}")))?;
        let token = json.get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EtlError::Auth("token response missing access_token".into()))?
            .to_string();

        *self.current.write().await = token.clone();
        info!("token.refresh.ok");
        Ok(token)
    }
}
