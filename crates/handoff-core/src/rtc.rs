//! webrtc-rs backed peer connection and data channel.
//!
//! webrtc-rs starts gathering inside `set_local_description` and may emit
//! candidates before the collector has installed its hook. Candidates that
//! arrive in that gap are buffered and handed to the next hook, and the
//! connection keeps reporting "gathering" until they have been drained.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gathering_state::RTCIceGatheringState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

use crate::config::SessionConfig;
use crate::document::{CandidateRecord, SdpKind, SessionDescription};
use crate::error::{Result, SignalError};
use crate::peer::{
    CandidateHook, ChannelHooks, ChannelState, ConnectionState, Connector, DataChannel,
    GatheringState, IncomingChannelHook, OfferOptions, PeerConnection, StateHook,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl From<RTCIceCandidateInit> for CandidateRecord {
    fn from(init: RTCIceCandidateInit) -> Self {
        Self {
            candidate: init.candidate,
            sdp_mid: init.sdp_mid,
            sdp_mline_index: init.sdp_mline_index,
            username_fragment: init.username_fragment,
        }
    }
}

impl From<CandidateRecord> for RTCIceCandidateInit {
    fn from(record: CandidateRecord) -> Self {
        Self {
            candidate: record.candidate,
            sdp_mid: record.sdp_mid,
            sdp_mline_index: record.sdp_mline_index,
            username_fragment: record.username_fragment,
        }
    }
}

fn to_rtc_description(description: SessionDescription) -> Result<RTCSessionDescription> {
    let parsed = match description.kind {
        SdpKind::Offer => RTCSessionDescription::offer(description.sdp),
        SdpKind::Answer => RTCSessionDescription::answer(description.sdp),
    };
    parsed.map_err(|e| SignalError::negotiation(format!("invalid session description: {e}")))
}

fn from_rtc_description(description: RTCSessionDescription) -> Result<SessionDescription> {
    let kind = match description.sdp_type {
        RTCSdpType::Offer => SdpKind::Offer,
        RTCSdpType::Answer => SdpKind::Answer,
        other => {
            return Err(SignalError::negotiation(format!(
                "unsupported session description type {other}"
            )))
        }
    };
    Ok(SessionDescription {
        kind,
        sdp: description.sdp,
    })
}

fn connection_state(state: RTCPeerConnectionState) -> ConnectionState {
    match state {
        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => ConnectionState::New,
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
    }
}

fn channel_state(state: RTCDataChannelState) -> ChannelState {
    match state {
        RTCDataChannelState::Unspecified | RTCDataChannelState::Connecting => {
            ChannelState::Connecting
        }
        RTCDataChannelState::Open => ChannelState::Open,
        RTCDataChannelState::Closing => ChannelState::Closing,
        RTCDataChannelState::Closed => ChannelState::Closed,
    }
}

#[derive(Default)]
struct CandidateSlot {
    hook: Option<CandidateHook>,
    pending: Vec<Option<CandidateRecord>>,
    buffering: bool,
}

#[derive(Default)]
struct HookSlots {
    candidate: Mutex<CandidateSlot>,
    state: Mutex<Option<StateHook>>,
    incoming: Mutex<Option<IncomingChannelHook>>,
}

impl HookSlots {
    fn deliver_candidate(&self, candidate: Option<CandidateRecord>) {
        let mut slot = lock(&self.candidate);
        if let Some(hook) = slot.hook.as_ref() {
            hook(candidate);
        } else if slot.buffering {
            slot.pending.push(candidate);
        }
    }

    fn set_candidate_hook(&self, hook: Option<CandidateHook>) {
        let mut slot = lock(&self.candidate);
        match hook {
            Some(hook) => {
                for pending in slot.pending.drain(..) {
                    hook(pending);
                }
                slot.hook = Some(hook);
            }
            None => {
                slot.hook = None;
                slot.pending.clear();
                slot.buffering = false;
            }
        }
    }

    fn start_buffering(&self) {
        let mut slot = lock(&self.candidate);
        slot.pending.clear();
        slot.buffering = true;
    }

    fn has_pending_candidates(&self) -> bool {
        !lock(&self.candidate).pending.is_empty()
    }
}

/// A [`PeerConnection`] over webrtc-rs.
pub struct RtcPeer {
    pc: Arc<RTCPeerConnection>,
    slots: Arc<HookSlots>,
}

impl RtcPeer {
    pub fn new(pc: Arc<RTCPeerConnection>) -> Self {
        let slots = Arc::new(HookSlots::default());

        let candidate_slots = slots.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            match candidate {
                Some(candidate) => match candidate.to_json() {
                    Ok(init) => candidate_slots.deliver_candidate(Some(init.into())),
                    Err(e) => warn!(error = %e, "dropping unserializable local candidate"),
                },
                None => candidate_slots.deliver_candidate(None),
            }
            Box::pin(async {})
        }));

        let state_slots = slots.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let state = connection_state(s);
            info!(%state, "peer connection state changed");
            if let Some(hook) = lock(&state_slots.state).as_ref() {
                hook(state);
            }
            Box::pin(async {})
        }));

        pc.on_ice_connection_state_change(Box::new(move |s: RTCIceConnectionState| {
            debug!(state = %s, "ICE connection state changed");
            Box::pin(async {})
        }));

        let incoming_slots = slots.clone();
        pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            debug!(label = dc.label(), "remote data channel announced");
            let channel: Arc<dyn DataChannel> = Arc::new(RtcChannel::new(dc));
            if let Some(hook) = lock(&incoming_slots.incoming).as_ref() {
                hook(channel);
            }
            Box::pin(async {})
        }));

        Self { pc, slots }
    }
}

#[async_trait]
impl PeerConnection for RtcPeer {
    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription> {
        let options = RTCOfferOptions {
            ice_restart: options.ice_restart,
            ..Default::default()
        };
        let offer = self
            .pc
            .create_offer(Some(options))
            .await
            .map_err(|e| SignalError::negotiation(format!("create offer: {e}")))?;
        from_rtc_description(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| SignalError::negotiation(format!("create answer: {e}")))?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        let description = to_rtc_description(description)?;
        self.slots.start_buffering();
        self.pc
            .set_local_description(description)
            .await
            .map_err(|e| SignalError::negotiation(format!("set local description: {e}")))
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let description = to_rtc_description(description)?;
        self.pc
            .set_remote_description(description)
            .await
            .map_err(|e| SignalError::negotiation(format!("set remote description: {e}")))
    }

    async fn add_ice_candidate(&self, candidate: CandidateRecord) -> Result<()> {
        // webrtc-rs reads an empty string as end-of-candidates and accepts it.
        if candidate.candidate.trim().is_empty() {
            return Err(SignalError::candidate("empty candidate string"));
        }
        self.pc
            .add_ice_candidate(candidate.into())
            .await
            .map_err(SignalError::candidate)
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.pc
            .local_description()
            .await
            .and_then(|d| from_rtc_description(d).ok())
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>> {
        let dc = self
            .pc
            .create_data_channel(label, None)
            .await
            .map_err(SignalError::channel)?;
        Ok(Arc::new(RtcChannel::new(dc)))
    }

    async fn close(&self) -> Result<()> {
        self.set_on_candidate(None);
        self.pc.close().await.map_err(SignalError::negotiation)
    }

    fn gathering_state(&self) -> GatheringState {
        if self.slots.has_pending_candidates() {
            return GatheringState::Gathering;
        }
        match self.pc.ice_gathering_state() {
            RTCIceGatheringState::Unspecified | RTCIceGatheringState::New => GatheringState::New,
            RTCIceGatheringState::Gathering => GatheringState::Gathering,
            RTCIceGatheringState::Complete => GatheringState::Complete,
        }
    }

    fn connection_state(&self) -> ConnectionState {
        connection_state(self.pc.connection_state())
    }

    fn set_on_candidate(&self, hook: Option<CandidateHook>) {
        self.slots.set_candidate_hook(hook);
    }

    fn set_on_state_change(&self, hook: Option<StateHook>) {
        *lock(&self.slots.state) = hook;
    }

    fn set_on_incoming_channel(&self, hook: Option<IncomingChannelHook>) {
        *lock(&self.slots.incoming) = hook;
    }
}

/// A [`DataChannel`] over webrtc-rs.
pub struct RtcChannel {
    dc: Arc<RTCDataChannel>,
}

impl RtcChannel {
    pub fn new(dc: Arc<RTCDataChannel>) -> Self {
        Self { dc }
    }
}

#[async_trait]
impl DataChannel for RtcChannel {
    fn label(&self) -> String {
        self.dc.label().to_string()
    }

    fn ready_state(&self) -> ChannelState {
        channel_state(self.dc.ready_state())
    }

    fn set_hooks(&self, hooks: ChannelHooks) {
        let hooks = Arc::new(hooks);
        // An announced channel can already be open; report that once.
        let opened = Arc::new(AtomicBool::new(false));

        let on_open = hooks.clone();
        let open_once = opened.clone();
        self.dc.on_open(Box::new(move || {
            if !open_once.swap(true, Ordering::SeqCst) {
                (on_open.opened)();
            }
            Box::pin(async {})
        }));
        if self.dc.ready_state() == RTCDataChannelState::Open && !opened.swap(true, Ordering::SeqCst)
        {
            (hooks.opened)();
        }

        let on_message = hooks.clone();
        self.dc.on_message(Box::new(move |msg: DataChannelMessage| {
            (on_message.message)(String::from_utf8_lossy(&msg.data).into_owned());
            Box::pin(async {})
        }));

        let on_close = hooks.clone();
        self.dc.on_close(Box::new(move || {
            (on_close.closed)();
            Box::pin(async {})
        }));

        let on_error = hooks;
        self.dc.on_error(Box::new(move |e: webrtc::Error| {
            (on_error.errored)(e.to_string());
            Box::pin(async {})
        }));
    }

    async fn send_text(&self, payload: &str) -> Result<()> {
        self.dc
            .send_text(payload.to_string())
            .await
            .map(|_| ())
            .map_err(SignalError::channel)
    }

    async fn close(&self) -> Result<()> {
        self.dc.close().await.map_err(SignalError::channel)
    }
}

/// Builds webrtc-rs peer connections from a [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct RtcConnector {
    ice_servers: Vec<String>,
}

impl RtcConnector {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            ice_servers: config.ice_servers.clone(),
        }
    }
}

#[async_trait]
impl Connector for RtcConnector {
    async fn connect(&self) -> Result<Arc<dyn PeerConnection>> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()
            .map_err(|e| SignalError::negotiation(format!("media engine: {e}")))?;
        let api = APIBuilder::new().with_media_engine(m).build();

        let ice_servers = if self.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };
        let config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let pc = api
            .new_peer_connection(config)
            .await
            .map_err(|e| SignalError::negotiation(format!("new peer connection: {e}")))?;
        debug!(ice_servers = ?self.ice_servers, "peer connection created");
        Ok(Arc::new(RtcPeer::new(Arc::new(pc))))
    }
}
