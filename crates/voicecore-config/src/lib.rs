//! Layered configuration surface for the voice interaction core (spec §6.6).

mod handle;
mod settings;

pub use handle::SettingsHandle;
pub use settings::{
    AuthSettings, EventSinkSettings, HistorySettings, ModelTierConfig, ModelTiers, ServerSettings,
    Settings, VadSettings,
};

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
