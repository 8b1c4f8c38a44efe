//! Hot-reloadable settings handle (SPEC_FULL ambient addition, grounded in
//! the teacher's `Arc<RwLock<Settings>>` pattern in `crates/server/src/state.rs`).
//!
//! New calls pick up the latest snapshot at `accept_call`; a call already in
//! progress keeps the snapshot it was created with (spec §5: "configuration
//! snapshots (immutable)").

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{ConfigError, Settings};

#[derive(Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
    source_path: Option<PathBuf>,
}

impl SettingsHandle {
    pub fn new(settings: Settings, source_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
            source_path,
        }
    }

    /// Snapshot the current settings for a new call. Cloning is cheap
    /// relative to call setup and keeps later mutations from leaking into
    /// calls already in flight.
    pub fn snapshot(&self) -> Settings {
        self.inner.read().clone()
    }

    /// Reload from the original source path, replacing the live snapshot
    /// for any future `snapshot()` call. Returns the error without
    /// mutating state if the reload fails, so a bad config push never
    /// degrades a running process.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let path = self
            .source_path
            .as_ref()
            .and_then(|p| p.to_str())
            .ok_or_else(|| ConfigError::Load("no reloadable source path configured".to_string()))?;
        let fresh = Settings::load_from(Some(path))?;
        *self.inner.write() = fresh;
        tracing::info!("settings reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_current_settings() {
        std::env::set_var("VOICECORE_STT_API_KEY", "k1");
        std::env::set_var("VOICECORE_LLM_CREDENTIALS", "k2");
        std::env::set_var("VOICECORE_TTS_API_KEY", "k3");
        let settings = Settings::load_from(Some("nonexistent")).unwrap();
        let handle = SettingsHandle::new(settings, None);
        assert_eq!(handle.snapshot().max_call_seconds, 3600);
        std::env::remove_var("VOICECORE_STT_API_KEY");
        std::env::remove_var("VOICECORE_LLM_CREDENTIALS");
        std::env::remove_var("VOICECORE_TTS_API_KEY");
    }
}
