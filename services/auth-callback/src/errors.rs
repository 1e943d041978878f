//!
//! src/errors.rs  Andrew Belles  Oct 12th, 2026
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}
