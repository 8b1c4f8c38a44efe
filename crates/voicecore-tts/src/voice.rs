//! Voice selection with fallback-to-default (spec §4.7).

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub voice_id: String,
}

/// Resolve the voice to use for one sentence. An LLM-suggested override
/// outranks the agent profile's default, but an id the provider doesn't
/// recognize falls back to the default and the caller is told to warn.
pub struct ResolvedVoice {
    pub voice_id: String,
    pub fell_back: bool,
}

pub fn resolve_voice(
    default_voice_id: &str,
    requested_override: Option<&str>,
    known_voice_ids: &[String],
) -> ResolvedVoice {
    match requested_override {
        Some(id) if known_voice_ids.iter().any(|k| k == id) => {
            ResolvedVoice { voice_id: id.to_string(), fell_back: false }
        }
        Some(_unknown) => ResolvedVoice { voice_id: default_voice_id.to_string(), fell_back: true },
        None => ResolvedVoice { voice_id: default_voice_id.to_string(), fell_back: false },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_override_falls_back_to_default_with_warning_flag() {
        let known = vec!["warm-female".to_string()];
        let resolved = resolve_voice("default", Some("nonexistent"), &known);
        assert_eq!(resolved.voice_id, "default");
        assert!(resolved.fell_back);
    }

    #[test]
    fn known_override_is_used_as_is() {
        let known = vec!["warm-female".to_string()];
        let resolved = resolve_voice("default", Some("warm-female"), &known);
        assert_eq!(resolved.voice_id, "warm-female");
        assert!(!resolved.fell_back);
    }

    #[test]
    fn no_override_uses_default() {
        let resolved = resolve_voice("default", None, &[]);
        assert_eq!(resolved.voice_id, "default");
        assert!(!resolved.fell_back);
    }
}
