//! STT session configuration (spec §4.4 "recognized options").

#[derive(Debug, Clone)]
pub struct RedactClass(pub String);

#[derive(Debug, Clone)]
pub struct SttConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Fixed for this core; carried so the handshake payload stays
    /// self-describing to the provider.
    pub encoding: &'static str,
    pub sample_rate: u32,
    pub channels: u8,
    pub interim_results: bool,
    pub utterances: bool,
    pub vad_events: bool,
    pub endpointing_ms: u32,
    pub utterance_end_ms: u32,
    pub smart_format: bool,
    pub numerals: bool,
    pub filler_words: bool,
    pub detect_language: bool,
    pub language_hint: String,
    pub redact: Vec<String>,
}

impl SttConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            encoding: "mulaw",
            sample_rate: 8_000,
            channels: 1,
            interim_results: true,
            utterances: true,
            vad_events: true,
            endpointing_ms: 150,
            utterance_end_ms: 400,
            smart_format: true,
            numerals: true,
            filler_words: true,
            detect_language: true,
            language_hint: "en-US".to_string(),
            redact: vec!["ssn".into(), "pci".into(), "numbers".into()],
        }
    }
}
