//! Offer/answer sequencing for manual signaling.
//!
//! Each flow is a straight pipeline of capability calls. Description and
//! offer/answer failures abort the flow; individual remote candidates that
//! fail to apply are logged and skipped.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::collector::collect_candidates;
use crate::document::{CandidateRecord, SignalingDocument};
use crate::error::{Result, SignalError};
use crate::peer::{OfferOptions, PeerConnection};

/// Default candidate gathering window per document.
pub const DEFAULT_GATHER_WINDOW: Duration = Duration::from_millis(3000);

/// Outcome of applying a remote document's candidates.
#[derive(Debug, Default)]
pub struct CandidateReport {
    pub applied: usize,
    /// Index into the document's candidate list and the rejection.
    pub rejected: Vec<(usize, SignalError)>,
}

impl CandidateReport {
    pub fn total(&self) -> usize {
        self.applied + self.rejected.len()
    }
}

/// Drives negotiation over a connection it does not own.
#[derive(Debug, Clone, Copy)]
pub struct Negotiator {
    gather_window: Duration,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new(DEFAULT_GATHER_WINDOW)
    }
}

impl Negotiator {
    pub fn new(gather_window: Duration) -> Self {
        Self { gather_window }
    }

    pub fn gather_window(&self) -> Duration {
        self.gather_window
    }

    /// Create an offer, commit it locally and package it with the gathered candidates.
    pub async fn produce_offer(
        &self,
        connection: &dyn PeerConnection,
    ) -> Result<SignalingDocument> {
        self.offer_with(connection, OfferOptions::default()).await
    }

    /// Answer `offer` on `connection`.
    ///
    /// Precondition: `offer.kind == SdpKind::Offer`. The session checks this
    /// before calling; the driver trusts its input.
    pub async fn produce_answer(
        &self,
        connection: &dyn PeerConnection,
        offer: &SignalingDocument,
    ) -> Result<SignalingDocument> {
        connection.set_remote_description(offer.description()).await?;
        let report = apply_remote_candidates(connection, &offer.ice_candidates).await;
        debug!(
            applied = report.applied,
            rejected = report.rejected.len(),
            "applied offer candidates"
        );

        let answer = connection.create_answer().await?;
        connection.set_local_description(answer).await?;

        self.package(connection).await
    }

    /// Apply a received answer (or reconnection offer) as the remote side.
    ///
    /// No document is produced; this round of negotiation is complete locally.
    pub async fn finalize(
        &self,
        connection: &dyn PeerConnection,
        document: &SignalingDocument,
    ) -> Result<CandidateReport> {
        connection.set_remote_description(document.description()).await?;
        let report = apply_remote_candidates(connection, &document.ice_candidates).await;
        info!(
            kind = %document.kind,
            applied = report.applied,
            rejected = report.rejected.len(),
            "remote description applied"
        );
        Ok(report)
    }

    /// Produce a reconnection offer via ICE restart.
    ///
    /// Precondition: the connection is disconnected, failed or closed. Calling
    /// it on a healthy connection is a caller error and is not checked here.
    pub async fn renegotiate(&self, connection: &dyn PeerConnection) -> Result<SignalingDocument> {
        info!(state = %connection.connection_state(), "renegotiating with ICE restart");
        self.offer_with(connection, OfferOptions::ice_restart()).await
    }

    async fn offer_with(
        &self,
        connection: &dyn PeerConnection,
        options: OfferOptions,
    ) -> Result<SignalingDocument> {
        let offer = connection.create_offer(options).await?;
        connection.set_local_description(offer).await?;
        self.package(connection).await
    }

    async fn package(&self, connection: &dyn PeerConnection) -> Result<SignalingDocument> {
        let candidates = collect_candidates(connection, self.gather_window).await;
        let local = connection
            .local_description()
            .await
            .ok_or_else(|| SignalError::negotiation("connection has no local description"))?;
        debug!(kind = %local.kind, candidates = candidates.len(), "packaged signaling document");
        Ok(SignalingDocument::new(local, candidates))
    }
}

/// Apply each candidate in order. A failure is recorded and the loop moves on.
pub async fn apply_remote_candidates(
    connection: &dyn PeerConnection,
    candidates: &[CandidateRecord],
) -> CandidateReport {
    let mut report = CandidateReport::default();
    for (index, candidate) in candidates.iter().enumerate() {
        match connection.add_ice_candidate(candidate.clone()).await {
            Ok(()) => {
                debug!(index, candidate = %candidate.candidate, "remote candidate added");
                report.applied += 1;
            }
            Err(e) => {
                let e = if e.is_recoverable() {
                    e
                } else {
                    SignalError::candidate(e)
                };
                warn!(index, candidate = %candidate.candidate, error = %e, "skipping remote candidate");
                report.rejected.push((index, e));
            }
        }
    }
    report
}
