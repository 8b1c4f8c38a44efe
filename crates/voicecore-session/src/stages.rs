//! Stage-worker restart policy (spec §4.1).
//!
//! Audio Ingress and the Telephony Transport pump are non-restartable:
//! their failure ends the call outright, since there is no channel state
//! left to carry over once either side of the duplex socket or the jitter
//! buffer is gone.
//!
//! The STT client is restartable with state carry-over, but that
//! carry-over already happens one layer down: `voicecore_stt::run` owns
//! its audio/event channel endpoints for its entire lifetime and retries
//! the provider connection internally (bounded by its own reconnect
//! attempt ceiling) without ever handing the channels back. A
//! supervisor-level restart that tried to call `run` again would need a
//! *new* pair of channels, which means rewiring Audio Ingress's and the
//! Turn Controller's ends too — at that point it is a fresh stage, not a
//! restart of the existing one. So the stage worker here is the single
//! `run` call; once it returns with an error, [`stt_failure_reason`] tells
//! the caller to end the call rather than attempting to revive it.

use voicecore_events::CallEndReason;
use voicecore_stt::SttError;

/// Classify a finished STT stage worker's outcome. `None` means it ended
/// cleanly (cancellation asked it to stop); `Some` carries the
/// `CallEndReason` and a cause string for the caller to log/publish before
/// tearing the call down.
pub fn stt_failure_reason(outcome: Result<(), SttError>) -> Option<(CallEndReason, String)> {
    match outcome {
        Ok(()) => None,
        Err(err) => Some((CallEndReason::UnrecoverableFailure, err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_stop_has_no_failure_reason() {
        assert!(stt_failure_reason(Ok(())).is_none());
    }

    #[test]
    fn provider_error_is_unrecoverable() {
        let (reason, cause) = stt_failure_reason(Err(SttError::Auth)).unwrap();
        assert_eq!(reason, CallEndReason::UnrecoverableFailure);
        assert!(!cause.is_empty());
    }
}
