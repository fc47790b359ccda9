//! Capability traits over the underlying peer-connection library.
//!
//! Everything hard (SDP, ICE, DTLS, SCTP) lives behind these traits. The
//! signaling core only sequences calls and moves data between them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{CandidateRecord, SessionDescription};
use crate::error::Result;

/// Candidate-discovered hook. `None` is the end-of-candidates sentinel.
pub type CandidateHook = Box<dyn Fn(Option<CandidateRecord>) + Send + Sync>;

/// Connection-state hook.
pub type StateHook = Box<dyn Fn(ConnectionState) + Send + Sync>;

/// Remote peer announced a data channel.
pub type IncomingChannelHook = Box<dyn Fn(Arc<dyn DataChannel>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatheringState {
    New,
    Gathering,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }

    /// States from which only an ICE restart (or a new connection) recovers.
    pub fn needs_restart(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed | Self::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfferOptions {
    pub ice_restart: bool,
}

impl OfferOptions {
    pub fn ice_restart() -> Self {
        Self { ice_restart: true }
    }
}

/// The four channel hooks. Bound together so both creation paths wire the
/// same behaviour.
pub struct ChannelHooks {
    pub opened: Box<dyn Fn() + Send + Sync>,
    pub message: Box<dyn Fn(String) + Send + Sync>,
    pub closed: Box<dyn Fn() + Send + Sync>,
    pub errored: Box<dyn Fn(String) + Send + Sync>,
}

impl ChannelHooks {
    /// Hooks that ignore every notification.
    pub fn inert() -> Self {
        Self {
            opened: Box::new(|| {}),
            message: Box::new(|_| {}),
            closed: Box::new(|| {}),
            errored: Box::new(|_| {}),
        }
    }
}

impl std::fmt::Debug for ChannelHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChannelHooks")
    }
}

/// A live peer connection.
///
/// Hook setters are single-slot: installing a hook replaces the previous one
/// and `None` makes the slot inert.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription>;
    async fn create_answer(&self) -> Result<SessionDescription>;
    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;
    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;
    async fn add_ice_candidate(&self, candidate: CandidateRecord) -> Result<()>;
    async fn local_description(&self) -> Option<SessionDescription>;
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>>;
    async fn close(&self) -> Result<()>;

    fn gathering_state(&self) -> GatheringState;
    fn connection_state(&self) -> ConnectionState;

    fn set_on_candidate(&self, hook: Option<CandidateHook>);
    fn set_on_state_change(&self, hook: Option<StateHook>);
    fn set_on_incoming_channel(&self, hook: Option<IncomingChannelHook>);
}

/// A data channel on a [`PeerConnection`].
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> String;
    fn ready_state(&self) -> ChannelState;
    fn set_hooks(&self, hooks: ChannelHooks);
    async fn send_text(&self, payload: &str) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Builds fresh connections for a session.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn PeerConnection>>;
}
