//! Scripted peer-connection double for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::document::{CandidateRecord, SdpKind, SessionDescription};
use crate::error::{Result, SignalError};
use crate::peer::{
    CandidateHook, ChannelHooks, ChannelState, ConnectionState, Connector, DataChannel,
    GatheringState, IncomingChannelHook, OfferOptions, PeerConnection, StateHook,
};

#[derive(Default)]
struct PeerState {
    gathering: Option<GatheringState>,
    connection: Option<ConnectionState>,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    offers: Vec<OfferOptions>,
    applied: Vec<CandidateRecord>,
    script: Option<(Vec<CandidateRecord>, bool)>,
    channels: Vec<Arc<MockChannel>>,
    fail_offers: bool,
    fail_local: bool,
    fail_remote: bool,
    fail_channels: bool,
    closed: bool,
}

#[derive(Default)]
pub struct MockPeer {
    state: Mutex<PeerState>,
    candidate_hook: Arc<Mutex<Option<CandidateHook>>>,
    state_hook: Mutex<Option<StateHook>>,
    incoming_hook: Mutex<Option<IncomingChannelHook>>,
}

impl MockPeer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host_candidate(n: u16) -> CandidateRecord {
        CandidateRecord {
            candidate: format!("candidate:{n} 1 udp 2122260223 192.0.2.{n} {} typ host", 50000 + n),
            sdp_mid: Some("0".into()),
            sdp_mline_index: Some(0),
            username_fragment: Some("mock".into()),
        }
    }

    /// A candidate the double refuses to apply.
    pub fn broken_candidate() -> CandidateRecord {
        CandidateRecord {
            candidate: "garbage".into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }

    /// Candidates emitted once the next candidate hook is installed,
    /// optionally followed by the end-of-candidates sentinel.
    pub fn script_candidates(&self, candidates: Vec<CandidateRecord>, end: bool) {
        self.state.lock().unwrap().script = Some((candidates, end));
    }

    pub fn set_gathering_state(&self, state: GatheringState) {
        self.state.lock().unwrap().gathering = Some(state);
    }

    /// Set the connection state and notify the state hook.
    pub fn set_connection_state(&self, state: ConnectionState) {
        self.state.lock().unwrap().connection = Some(state);
        if let Some(hook) = self.state_hook.lock().unwrap().as_ref() {
            hook(state);
        }
    }

    pub fn has_candidate_hook(&self) -> bool {
        self.candidate_hook.lock().unwrap().is_some()
    }

    /// Deliver a candidate to the installed hook; false if none is installed.
    pub fn emit_candidate(&self, candidate: Option<CandidateRecord>) -> bool {
        match self.candidate_hook.lock().unwrap().as_ref() {
            Some(hook) => {
                hook(candidate);
                true
            }
            None => false,
        }
    }

    /// Announce a remote channel through the incoming-channel hook.
    pub fn announce_channel(&self, channel: Arc<MockChannel>) -> bool {
        match self.incoming_hook.lock().unwrap().as_ref() {
            Some(hook) => {
                hook(channel);
                true
            }
            None => false,
        }
    }

    pub fn local(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().local.clone()
    }

    pub fn remote(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().remote.clone()
    }

    pub fn offer_options(&self) -> Vec<OfferOptions> {
        self.state.lock().unwrap().offers.clone()
    }

    pub fn applied_candidates(&self) -> Vec<CandidateRecord> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn last_channel(&self) -> Option<Arc<MockChannel>> {
        self.state.lock().unwrap().channels.last().cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn fail_offers(&self, fail: bool) {
        self.state.lock().unwrap().fail_offers = fail;
    }

    pub fn fail_local_descriptions(&self, fail: bool) {
        self.state.lock().unwrap().fail_local = fail;
    }

    pub fn fail_remote_descriptions(&self, fail: bool) {
        self.state.lock().unwrap().fail_remote = fail;
    }

    pub fn fail_channels(&self, fail: bool) {
        self.state.lock().unwrap().fail_channels = fail;
    }
}

#[async_trait]
impl PeerConnection for MockPeer {
    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription> {
        let mut state = self.state.lock().unwrap();
        if state.fail_offers || state.closed {
            return Err(SignalError::negotiation("offer rejected"));
        }
        state.offers.push(options);
        let round = state.offers.len();
        let restart = if options.ice_restart { " ice-restart" } else { "" };
        Ok(SessionDescription::offer(format!(
            "v=0\r\no=mock {round} 2 IN IP4 127.0.0.1\r\na=ice-ufrag:round{round}{restart}\r\n"
        )))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let state = self.state.lock().unwrap();
        match &state.remote {
            Some(remote) if remote.kind == SdpKind::Offer => Ok(SessionDescription::answer(
                "v=0\r\no=mock-answer 1 2 IN IP4 127.0.0.1\r\n",
            )),
            _ => Err(SignalError::negotiation("no remote offer to answer")),
        }
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_local {
            return Err(SignalError::negotiation("local description rejected"));
        }
        state.local = Some(description);
        state.gathering = Some(GatheringState::Gathering);
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_remote {
            return Err(SignalError::negotiation("remote description rejected"));
        }
        state.remote = Some(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: CandidateRecord) -> Result<()> {
        if !candidate.candidate.starts_with("candidate:") {
            return Err(SignalError::candidate(format!(
                "malformed candidate {:?}",
                candidate.candidate
            )));
        }
        self.state.lock().unwrap().applied.push(candidate);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local()
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_channels {
            return Err(SignalError::channel("channel creation rejected"));
        }
        let channel = Arc::new(MockChannel::new(label));
        state.channels.push(channel.clone());
        Ok(channel)
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.connection = Some(ConnectionState::Closed);
        Ok(())
    }

    fn gathering_state(&self) -> GatheringState {
        self.state
            .lock()
            .unwrap()
            .gathering
            .unwrap_or(GatheringState::New)
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
            .lock()
            .unwrap()
            .connection
            .unwrap_or(ConnectionState::New)
    }

    fn set_on_candidate(&self, hook: Option<CandidateHook>) {
        let install = hook.is_some();
        *self.candidate_hook.lock().unwrap() = hook;
        if !install {
            return;
        }

        let Some((candidates, end)) = self.state.lock().unwrap().script.take() else {
            return;
        };
        let slot = self.candidate_hook.clone();
        tokio::spawn(async move {
            for candidate in candidates {
                tokio::task::yield_now().await;
                if let Some(hook) = slot.lock().unwrap().as_ref() {
                    hook(Some(candidate));
                }
            }
            if end {
                tokio::task::yield_now().await;
                if let Some(hook) = slot.lock().unwrap().as_ref() {
                    hook(None);
                }
            }
        });
    }

    fn set_on_state_change(&self, hook: Option<StateHook>) {
        *self.state_hook.lock().unwrap() = hook;
    }

    fn set_on_incoming_channel(&self, hook: Option<IncomingChannelHook>) {
        *self.incoming_hook.lock().unwrap() = hook;
    }
}

pub struct MockChannel {
    label: String,
    state: Mutex<ChannelState>,
    sent: Mutex<Vec<String>>,
    hooks: Mutex<Option<ChannelHooks>>,
    fail_sends: Mutex<bool>,
}

impl MockChannel {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            state: Mutex::new(ChannelState::Connecting),
            sent: Mutex::new(Vec::new()),
            hooks: Mutex::new(None),
            fail_sends: Mutex::new(false),
        }
    }

    pub fn set_state(&self, state: ChannelState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock().unwrap() = fail;
    }

    pub fn fire_open(&self) {
        self.set_state(ChannelState::Open);
        if let Some(hooks) = self.hooks.lock().unwrap().as_ref() {
            (hooks.opened)();
        }
    }

    pub fn fire_message(&self, text: &str) {
        if let Some(hooks) = self.hooks.lock().unwrap().as_ref() {
            (hooks.message)(text.to_string());
        }
    }

    pub fn fire_error(&self, error: &str) {
        if let Some(hooks) = self.hooks.lock().unwrap().as_ref() {
            (hooks.errored)(error.to_string());
        }
    }

    pub fn fire_close(&self) {
        self.set_state(ChannelState::Closed);
        if let Some(hooks) = self.hooks.lock().unwrap().as_ref() {
            (hooks.closed)();
        }
    }
}

#[async_trait]
impl DataChannel for MockChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn ready_state(&self) -> ChannelState {
        *self.state.lock().unwrap()
    }

    fn set_hooks(&self, hooks: ChannelHooks) {
        *self.hooks.lock().unwrap() = Some(hooks);
    }

    async fn send_text(&self, payload: &str) -> Result<()> {
        if *self.fail_sends.lock().unwrap() {
            return Err(SignalError::channel("send failed"));
        }
        self.sent.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.set_state(ChannelState::Closed);
        Ok(())
    }
}

/// Hands out fresh [`MockPeer`]s and keeps them for inspection.
#[derive(Default)]
pub struct MockConnector {
    created: Mutex<Vec<Arc<MockPeer>>>,
    script: Mutex<Vec<CandidateRecord>>,
    fail: Mutex<bool>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every new peer emits these candidates and then completes gathering.
    pub fn with_candidates(candidates: Vec<CandidateRecord>) -> Self {
        let connector = Self::default();
        *connector.script.lock().unwrap() = candidates;
        connector
    }

    pub fn fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn created(&self) -> Vec<Arc<MockPeer>> {
        self.created.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Arc<MockPeer>> {
        self.created.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Arc<dyn PeerConnection>> {
        if *self.fail.lock().unwrap() {
            return Err(SignalError::negotiation("connection refused"));
        }
        let peer = Arc::new(MockPeer::new());
        peer.script_candidates(self.script.lock().unwrap().clone(), true);
        self.created.lock().unwrap().push(peer.clone());
        Ok(peer)
    }
}
