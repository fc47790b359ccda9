//! Manual WebRTC signaling for two-peer chat.
//!
//! Each side produces a self-contained JSON document (session description
//! plus gathered ICE candidates) that the user carries to the other side by
//! hand. No signaling server is involved.

#![forbid(unsafe_code)]

pub mod channel;
pub mod collector;
pub mod config;
pub mod document;
pub mod error;
pub mod negotiation;
pub mod peer;
pub mod rtc;
pub mod session;

#[cfg(test)]
mod testing;

pub use collector::collect_candidates;
pub use config::SessionConfig;
pub use document::{CandidateRecord, SdpKind, SessionDescription, SignalingDocument};
pub use error::{Result, SignalError};
pub use negotiation::{apply_remote_candidates, CandidateReport, Negotiator};
pub use peer::{
    ChannelHooks, ChannelState, ConnectionState, Connector, DataChannel, GatheringState,
    OfferOptions, PeerConnection,
};
pub use rtc::{RtcChannel, RtcConnector, RtcPeer};
pub use session::{EventSender, Session, SessionEvent};
