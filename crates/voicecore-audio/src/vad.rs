//! Energy/zero-crossing/spectral-centroid VAD with hysteresis (spec §4.3).

use parking_lot::Mutex;
use voicecore_config::VadSettings;
use voicecore_core::audio::AudioFrame;

/// Noise-floor estimate below which the spectral centroid is not trusted.
/// Derived empirically; telephony band μ-law centroid rarely exceeds this
/// for pure comfort noise.
const SPECTRAL_NOISE_FLOOR: f32 = 0.15;
/// Zero-crossing-rate band a voiced telephony frame typically falls within.
const ZCR_VOICED_MIN: f32 = 0.02;
const ZCR_VOICED_MAX: f32 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadMode {
    Silence,
    Voiced,
}

/// Outcome of feeding one frame into the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadTransition {
    /// No mode change.
    None,
    /// K consecutive voiced frames just confirmed speech.
    Started,
    /// M consecutive silent frames just confirmed end of speech.
    Ended,
}

struct VadMutableState {
    mode: VadMode,
    voiced_run: u32,
    silent_run: u32,
}

/// Per-call VAD instance. Not shared across calls; one per Audio Ingress
/// worker.
pub struct VoiceActivityDetector {
    energy_threshold: f32,
    start_frames: u32,
    end_frames: u32,
    state: Mutex<VadMutableState>,
}

impl VoiceActivityDetector {
    pub fn new(settings: &VadSettings) -> Self {
        Self {
            energy_threshold: settings.energy_threshold,
            start_frames: settings.start_frames,
            end_frames: settings.end_frames,
            state: Mutex::new(VadMutableState {
                mode: VadMode::Silence,
                voiced_run: 0,
                silent_run: 0,
            }),
        }
    }

    /// Spectral-centroid proxy: the share of energy carried by the latter
    /// half of the decoded sample sequence within the frame. Cheap substitute
    /// for an FFT-based centroid given 20 ms μ-law frames.
    fn spectral_centroid_proxy(frame: &AudioFrame) -> f32 {
        let samples: Vec<i16> = frame.payload.iter().map(|&b| voicecore_core::audio::mulaw_decode(b)).collect();
        if samples.is_empty() {
            return 0.0;
        }
        let total: f64 = samples.iter().map(|&s| s.unsigned_abs() as f64).sum();
        if total == 0.0 {
            return 0.0;
        }
        let half = samples.len() / 2;
        let upper: f64 = samples[half..].iter().map(|&s| s.unsigned_abs() as f64).sum();
        (upper / total) as f32
    }

    fn frame_is_voiced(&self, frame: &AudioFrame) -> bool {
        let energy = frame.energy_proxy();
        let zcr = frame.zero_crossing_rate();
        let centroid = Self::spectral_centroid_proxy(frame);
        energy > self.energy_threshold
            && (ZCR_VOICED_MIN..=ZCR_VOICED_MAX).contains(&zcr)
            && centroid > SPECTRAL_NOISE_FLOOR
    }

    /// Feed one frame, advancing the hysteresis counters (spec §4.3).
    pub fn process(&self, frame: &AudioFrame) -> VadTransition {
        let voiced = self.frame_is_voiced(frame);
        let mut state = self.state.lock();
        match (state.mode, voiced) {
            (VadMode::Silence, true) => {
                state.voiced_run += 1;
                state.silent_run = 0;
                if state.voiced_run >= self.start_frames {
                    state.mode = VadMode::Voiced;
                    state.voiced_run = 0;
                    VadTransition::Started
                } else {
                    VadTransition::None
                }
            }
            (VadMode::Silence, false) => {
                state.voiced_run = 0;
                VadTransition::None
            }
            (VadMode::Voiced, false) => {
                state.silent_run += 1;
                state.voiced_run = 0;
                if state.silent_run >= self.end_frames {
                    state.mode = VadMode::Silence;
                    state.silent_run = 0;
                    VadTransition::Ended
                } else {
                    VadTransition::None
                }
            }
            (VadMode::Voiced, true) => {
                state.silent_run = 0;
                VadTransition::None
            }
        }
    }

    pub fn mode(&self) -> VadMode {
        self.state.lock().mode
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.mode = VadMode::Silence;
        state.voiced_run = 0;
        state.silent_run = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicecore_core::audio::{Direction, CANONICAL_FRAME_BYTES};

    fn silence_frame(seq: u64) -> AudioFrame {
        AudioFrame::new(seq, vec![0xFF; CANONICAL_FRAME_BYTES], Direction::Inbound)
    }

    fn loud_frame(seq: u64) -> AudioFrame {
        let mut payload = Vec::with_capacity(CANONICAL_FRAME_BYTES);
        for i in 0..CANONICAL_FRAME_BYTES {
            payload.push(if i % 2 == 0 { 0x0F } else { 0x8F });
        }
        AudioFrame::new(seq, payload, Direction::Inbound)
    }

    #[test]
    fn declares_start_after_k_consecutive_voiced_frames() {
        let vad = VoiceActivityDetector::new(&VadSettings::default());
        assert_eq!(vad.process(&loud_frame(0)), VadTransition::None);
        assert_eq!(vad.process(&loud_frame(1)), VadTransition::Started);
        assert_eq!(vad.mode(), VadMode::Voiced);
    }

    #[test]
    fn declares_end_after_m_consecutive_silent_frames() {
        let vad = VoiceActivityDetector::new(&VadSettings::default());
        vad.process(&loud_frame(0));
        vad.process(&loud_frame(1));
        assert_eq!(vad.mode(), VadMode::Voiced);
        for seq in 2..11 {
            assert_eq!(vad.process(&silence_frame(seq)), VadTransition::None);
        }
        assert_eq!(vad.process(&silence_frame(11)), VadTransition::Ended);
        assert_eq!(vad.mode(), VadMode::Silence);
    }

    #[test]
    fn single_silent_frame_does_not_reset_voiced_run_counter_mode() {
        let vad = VoiceActivityDetector::new(&VadSettings::default());
        vad.process(&silence_frame(0));
        assert_eq!(vad.process(&loud_frame(1)), VadTransition::None);
        // a silent frame in Silence mode resets the voiced run
        assert_eq!(vad.process(&silence_frame(2)), VadTransition::None);
        assert_eq!(vad.process(&loud_frame(3)), VadTransition::None);
        assert_eq!(vad.process(&loud_frame(4)), VadTransition::Started);
    }
}
