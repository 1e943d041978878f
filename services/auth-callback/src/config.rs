//!
//! src/config.rs  Andrew Belles  Oct 12th, 2026
//!
//! Address the callback server listens on
//!

use std::net::SocketAddr;

use crate::errors::CallbackError;

pub const DEFAULT_CALLBACK_ADDRESS: &str = "127.0.0.1:8888";

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

#[derive(Debug, Clone)]
pub struct CallbackConfig {
    pub address: SocketAddr
}

impl CallbackConfig {
    pub fn from_lookup(env: Lookup) -> Result<Self, CallbackError> {
        let raw = env("CALLBACK_ADDRESS")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CALLBACK_ADDRESS.to_string());
        let address = raw.trim().parse::<SocketAddr>()
            .map_err(|e| CallbackError::Config(format!("CALLBACK_ADDRESS {raw:?}: {e}")))?;
        Ok( Self { address } )
    }
}

pub fn load_config() -> Result<CallbackConfig, CallbackError> {
    dotenvy::dotenv().ok();
    CallbackConfig::from_lookup(&|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_8888() {
        let cfg = CallbackConfig::from_lookup(&|_| None).unwrap();
        assert_eq!(cfg.address.to_string(), "127.0.0.1:8888");
    }

    #[test]
    fn reads_override() {
        let cfg = CallbackConfig::from_lookup(&|k| {
            (k == "CALLBACK_ADDRESS").then(|| "0.0.0.0:9000".to_string())
        }).unwrap();
        assert_eq!(cfg.address.port(), 9000);
    }

    #[test]
    fn rejects_garbage() {
        let err = CallbackConfig::from_lookup(&|_| Some("localhost".into())).unwrap_err();
        assert!(matches!(err, CallbackError::Config(_)));
    }
}
