//! Startup and runtime configuration surface (spec §6.6).

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTierConfig {
    pub model_id: String,
    pub max_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTiers {
    pub heavy: ModelTierConfig,
    pub mid: ModelTierConfig,
    pub fast: ModelTierConfig,
}

impl Default for ModelTiers {
    fn default() -> Self {
        Self {
            heavy: ModelTierConfig { model_id: "tier-heavy".into(), max_tokens: 1024 },
            mid: ModelTierConfig { model_id: "tier-mid".into(), max_tokens: 512 },
            fast: ModelTierConfig { model_id: "tier-fast".into(), max_tokens: 256 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadSettings {
    #[serde(default = "default_energy_threshold")]
    pub energy_threshold: f32,
    #[serde(default = "default_start_frames")]
    pub start_frames: u32,
    #[serde(default = "default_end_frames")]
    pub end_frames: u32,
}

fn default_energy_threshold() -> f32 {
    300.0
}
fn default_start_frames() -> u32 {
    2
}
fn default_end_frames() -> u32 {
    10
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            energy_threshold: default_energy_threshold(),
            start_frames: default_start_frames(),
            end_frames: default_end_frames(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
}

fn default_max_turns() -> usize {
    50
}
fn default_max_input_tokens() -> usize {
    8_000
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_input_tokens: default_max_input_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string(), "/ready".to_string(), "/metrics".to_string()]
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self { enabled: false, api_key: None, public_paths: default_public_paths() }
    }
}

/// The telephony ingress/admin HTTP surface (spec §4.2 additions,
/// `voicecore-server`). Not part of the core call-processing pipeline, so
/// it lives in its own sub-struct rather than crowding the top-level
/// fields the pipeline crates read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind_addr: default_bind_addr(), auth: AuthSettings::default(), cors_origins: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSinkSettings {
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_queue_depth() -> usize {
    10_000
}

impl Default for EventSinkSettings {
    fn default() -> Self {
        Self { queue_depth: default_queue_depth() }
    }
}

/// Process-wide startup configuration (spec §6.6). Credentials are required
/// and have no defaults; everything else falls back to the spec's stated
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub stt_api_key: String,
    pub llm_credentials: String,
    pub tts_api_key: String,

    #[serde(default = "default_voice_id")]
    pub default_voice_id: String,
    #[serde(default = "default_fallback_utterance")]
    pub fallback_utterance_text: String,

    #[serde(default = "default_max_call_seconds")]
    pub max_call_seconds: u64,
    #[serde(default = "default_silence_timeout_seconds")]
    pub silence_timeout_seconds: u64,

    #[serde(default = "default_jitter_target_ms")]
    pub jitter_target_ms: u32,
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u32,

    #[serde(default)]
    pub vad: VadSettings,

    #[serde(default)]
    pub model_tiers: ModelTiers,

    #[serde(default)]
    pub history: HistorySettings,

    #[serde(default)]
    pub event_sink: EventSinkSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub stt_endpoint: Option<String>,
    #[serde(default)]
    pub llm_endpoint: Option<String>,
    #[serde(default)]
    pub tts_endpoint: Option<String>,
}

fn default_voice_id() -> String {
    "default".to_string()
}
fn default_fallback_utterance() -> String {
    "I'm having a little trouble with that — could you say it again?".to_string()
}
fn default_max_call_seconds() -> u64 {
    3600
}
fn default_silence_timeout_seconds() -> u64 {
    8
}
fn default_jitter_target_ms() -> u32 {
    50
}
fn default_jitter_max_ms() -> u32 {
    200
}

impl Settings {
    /// Load layered configuration: optional `config/default.toml`, then
    /// environment variables prefixed `VOICECORE_` (double underscore as
    /// the nesting separator, e.g. `VOICECORE_VAD__ENERGY_THRESHOLD`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    pub fn load_from(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        } else {
            builder = builder.add_source(config::File::with_name("config/default").required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("VOICECORE")
                .separator("__")
                .try_parsing(true),
        );
        let built = builder
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        let settings: Settings = built
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stt_api_key.is_empty() {
            return Err(ConfigError::MissingCredential("stt_api_key"));
        }
        if self.llm_credentials.is_empty() {
            return Err(ConfigError::MissingCredential("llm_credentials"));
        }
        if self.tts_api_key.is_empty() {
            return Err(ConfigError::MissingCredential("tts_api_key"));
        }
        if self.jitter_target_ms > self.jitter_max_ms {
            return Err(ConfigError::Invalid(
                "jitter_target_ms must not exceed jitter_max_ms".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_credentials_set() {
        std::env::set_var("VOICECORE_STT_API_KEY", "k1");
        std::env::set_var("VOICECORE_LLM_CREDENTIALS", "k2");
        std::env::set_var("VOICECORE_TTS_API_KEY", "k3");
        let settings = Settings::load_from(Some("nonexistent")).expect("load");
        assert_eq!(settings.max_call_seconds, 3600);
        assert_eq!(settings.silence_timeout_seconds, 8);
        assert_eq!(settings.history.max_turns, 50);
        std::env::remove_var("VOICECORE_STT_API_KEY");
        std::env::remove_var("VOICECORE_LLM_CREDENTIALS");
        std::env::remove_var("VOICECORE_TTS_API_KEY");
    }

    #[test]
    fn validate_rejects_missing_credentials() {
        let settings = Settings {
            stt_api_key: String::new(),
            llm_credentials: "x".into(),
            tts_api_key: "x".into(),
            default_voice_id: default_voice_id(),
            fallback_utterance_text: default_fallback_utterance(),
            max_call_seconds: default_max_call_seconds(),
            silence_timeout_seconds: default_silence_timeout_seconds(),
            jitter_target_ms: default_jitter_target_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            vad: VadSettings::default(),
            model_tiers: ModelTiers::default(),
            history: HistorySettings::default(),
            event_sink: EventSinkSettings::default(),
            server: ServerSettings::default(),
            stt_endpoint: None,
            llm_endpoint: None,
            tts_endpoint: None,
        };
        assert!(settings.validate().is_err());
    }
}
