//! Bounded candidate collection.
//!
//! Gathering completion is not always signalled promptly, so collection stops
//! at whichever comes first: the end-of-candidates sentinel or the window.
//! A relay candidate arriving after the window is lost; the peer can still
//! connect over whatever was gathered.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::document::CandidateRecord;
use crate::peer::{GatheringState, PeerConnection};

/// Collect locally discovered candidates for at most `window`.
///
/// Never fails; an empty result is valid. The connection's candidate hook is
/// left inert on return.
pub async fn collect_candidates(
    connection: &dyn PeerConnection,
    window: Duration,
) -> Vec<CandidateRecord> {
    if connection.gathering_state() == GatheringState::Complete {
        debug!("ICE gathering already complete; nothing to collect");
        return Vec::new();
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Option<CandidateRecord>>();
    connection.set_on_candidate(Some(Box::new(move |candidate| {
        let _ = tx.send(candidate);
    })));

    let mut candidates = Vec::new();
    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            next = rx.recv() => match next {
                Some(Some(candidate)) => {
                    debug!(candidate = %candidate.candidate, "local ICE candidate");
                    candidates.push(candidate);
                }
                Some(None) | None => {
                    debug!(count = candidates.len(), "ICE gathering complete");
                    break;
                }
            },
            _ = &mut deadline => {
                debug!(
                    count = candidates.len(),
                    window_ms = window.as_millis() as u64,
                    "ICE gathering window elapsed"
                );
                break;
            }
        }
    }

    // Late candidates must not reach this result or a later collection.
    connection.set_on_candidate(None);
    candidates
}
