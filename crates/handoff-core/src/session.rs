//! Session orchestrator.
//!
//! Owns the one live connection and the one chat channel. Capability hooks
//! never touch the session; they post [`SessionEvent`]s that the owner feeds
//! back through [`Session::handle_event`] between commands.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::channel;
use crate::config::SessionConfig;
use crate::document::{SdpKind, SignalingDocument};
use crate::error::{Result, SignalError};
use crate::negotiation::{CandidateReport, Negotiator};
use crate::peer::{ChannelHooks, ConnectionState, Connector, DataChannel, PeerConnection};

/// Everything the presentation layer needs to render.
pub enum SessionEvent {
    Status(String),
    ConnectionState(ConnectionState),
    /// Consumed by the session itself.
    IncomingChannel(Arc<dyn DataChannel>),
    ChannelOpened,
    Message(String),
    ChannelClosed,
    ChannelError(String),
}

impl std::fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(s) => f.debug_tuple("Status").field(s).finish(),
            Self::ConnectionState(s) => f.debug_tuple("ConnectionState").field(s).finish(),
            Self::IncomingChannel(c) => f.debug_tuple("IncomingChannel").field(&c.label()).finish(),
            Self::ChannelOpened => write!(f, "ChannelOpened"),
            Self::Message(m) => f.debug_tuple("Message").field(m).finish(),
            Self::ChannelClosed => write!(f, "ChannelClosed"),
            Self::ChannelError(e) => f.debug_tuple("ChannelError").field(e).finish(),
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

pub struct Session {
    negotiator: Negotiator,
    channel_label: String,
    connector: Arc<dyn Connector>,
    connection: Option<Arc<dyn PeerConnection>>,
    channel: Option<Arc<dyn DataChannel>>,
    events: EventSender,
}

impl Session {
    pub fn new(config: &SessionConfig, connector: Arc<dyn Connector>, events: EventSender) -> Self {
        Self {
            negotiator: Negotiator::new(config.gather_window()),
            channel_label: config.channel_label.clone(),
            connector,
            connection: None,
            channel: None,
            events,
        }
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.connection.as_ref().map(|c| c.connection_state())
    }

    pub fn channel_state(&self) -> Option<crate::peer::ChannelState> {
        self.channel.as_ref().map(|c| c.ready_state())
    }

    fn status(&self, message: impl Into<String>) {
        let _ = self.events.send(SessionEvent::Status(message.into()));
    }

    /// Generate an offer on a brand-new connection with a locally created channel.
    pub async fn start_offer(&mut self) -> Result<SignalingDocument> {
        self.status("Generating offer...");
        let connection = self.fresh_connection().await?;

        let hooks = self.channel_hooks();
        let chat = channel::attach_outgoing(connection.as_ref(), &self.channel_label, hooks).await?;
        self.channel = Some(chat);

        let offer = self.negotiator.produce_offer(connection.as_ref()).await?;
        info!(candidates = offer.ice_candidates.len(), "offer ready");
        self.status("Offer ready. Copy or save it and send it to your peer.");
        Ok(offer)
    }

    /// Answer an offer pasted or loaded by the user.
    ///
    /// An offer arriving while the current connection is disconnected or
    /// failed is the peer's ICE restart, so it is answered in place.
    pub async fn accept_offer(&mut self, text: &str) -> Result<SignalingDocument> {
        let offer = SignalingDocument::decode_expecting(text, &[SdpKind::Offer])?;
        self.status("Generating answer...");

        let reusable = self
            .connection
            .as_ref()
            .filter(|c| {
                matches!(
                    c.connection_state(),
                    ConnectionState::Disconnected | ConnectionState::Failed
                )
            })
            .cloned();
        let connection = match reusable {
            Some(existing) => {
                info!("answering reconnection offer on the existing connection");
                existing
            }
            None => self.fresh_connection().await?,
        };

        let answer = self
            .negotiator
            .produce_answer(connection.as_ref(), &offer)
            .await?;
        self.status("Answer ready. Copy or save it and send it back to your peer.");
        Ok(answer)
    }

    /// Apply the peer's answer (or reconnection offer) to the current connection.
    pub async fn complete(&mut self, text: &str) -> Result<CandidateReport> {
        let document =
            SignalingDocument::decode_expecting(text, &[SdpKind::Answer, SdpKind::Offer])?;
        let connection = self.connection.clone().ok_or_else(|| {
            SignalError::validation("generate an offer first, or accept a reconnection offer")
        })?;

        self.status("Finalizing connection...");
        let report = self.negotiator.finalize(connection.as_ref(), &document).await?;
        if !report.rejected.is_empty() {
            self.status(format!(
                "{} of {} remote candidates could not be applied",
                report.rejected.len(),
                report.total()
            ));
        }
        self.status("Connecting...");
        Ok(report)
    }

    /// Produce an ICE-restart offer if the connection needs one.
    ///
    /// Returns `Ok(None)` when there is nothing to reconnect.
    pub async fn reconnect(&mut self) -> Result<Option<SignalingDocument>> {
        let connection = match &self.connection {
            Some(c) if c.connection_state().needs_restart() => c.clone(),
            _ => {
                debug!(state = ?self.connection_state(), "reconnect not needed");
                self.status("Reconnection not needed, or no connection yet.");
                return Ok(None);
            }
        };

        self.status("Attempting reconnection (ICE restart)...");
        match self.negotiator.renegotiate(connection.as_ref()).await {
            Ok(offer) => {
                self.status("Reconnection offer ready. Copy or save it and send it to your peer.");
                Ok(Some(offer))
            }
            Err(e) => {
                warn!(error = %e, "reconnection failed");
                self.status("Reconnection attempt failed.");
                Err(e)
            }
        }
    }

    /// Send a chat line. `false` means the channel is missing or not open.
    pub async fn send_chat(&self, text: &str) -> bool {
        let sent = channel::send(self.channel.as_ref(), text).await;
        if !sent {
            self.status("Chat not connected. Try again.");
        }
        sent
    }

    /// Route an event from the hooks. Returns the events the presentation
    /// layer should render.
    pub fn handle_event(&mut self, event: SessionEvent) -> Option<SessionEvent> {
        match event {
            SessionEvent::IncomingChannel(incoming) => {
                self.adopt_channel(incoming);
                None
            }
            SessionEvent::ConnectionState(state) => {
                if matches!(state, ConnectionState::Disconnected | ConnectionState::Failed) {
                    warn!(%state, "peer connection lost; consider reconnecting");
                }
                Some(SessionEvent::ConnectionState(state))
            }
            other => Some(other),
        }
    }

    /// Take over a channel the peer announced. Replaces any previous channel.
    pub fn adopt_channel(&mut self, incoming: Arc<dyn DataChannel>) {
        let hooks = self.channel_hooks();
        self.channel = Some(channel::attach_incoming(incoming, hooks));
    }

    /// Close the channel and the connection.
    pub async fn close(&mut self) {
        if let Some(chat) = self.channel.take() {
            if let Err(e) = chat.close().await {
                debug!(error = %e, "closing data channel");
            }
        }
        if let Some(connection) = self.connection.take() {
            connection.set_on_state_change(None);
            connection.set_on_incoming_channel(None);
            if let Err(e) = connection.close().await {
                debug!(error = %e, "closing peer connection");
            }
        }
    }

    async fn fresh_connection(&mut self) -> Result<Arc<dyn PeerConnection>> {
        self.close().await;

        let connection = self.connector.connect().await?;

        let tx = self.events.clone();
        connection.set_on_state_change(Some(Box::new(move |state| {
            let _ = tx.send(SessionEvent::ConnectionState(state));
        })));

        let tx = self.events.clone();
        connection.set_on_incoming_channel(Some(Box::new(move |incoming| {
            let _ = tx.send(SessionEvent::IncomingChannel(incoming));
        })));

        self.connection = Some(connection.clone());
        Ok(connection)
    }

    fn channel_hooks(&self) -> ChannelHooks {
        let opened = self.events.clone();
        let message = self.events.clone();
        let closed = self.events.clone();
        let errored = self.events.clone();
        ChannelHooks {
            opened: Box::new(move || {
                let _ = opened.send(SessionEvent::ChannelOpened);
            }),
            message: Box::new(move |text| {
                let _ = message.send(SessionEvent::Message(text));
            }),
            closed: Box::new(move || {
                let _ = closed.send(SessionEvent::ChannelClosed);
            }),
            errored: Box::new(move |e| {
                let _ = errored.send(SessionEvent::ChannelError(e));
            }),
        }
    }
}
