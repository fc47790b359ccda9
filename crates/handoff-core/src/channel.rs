//! Data channel bridge.
//!
//! One logical chat channel per session, whether this side created it or the
//! peer announced it. Both paths bind the same four hooks.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::peer::{ChannelHooks, ChannelState, DataChannel, PeerConnection};

/// Create a channel on `connection` and bind `hooks` to it.
pub async fn attach_outgoing(
    connection: &dyn PeerConnection,
    label: &str,
    hooks: ChannelHooks,
) -> Result<Arc<dyn DataChannel>> {
    let channel = connection.create_data_channel(label).await?;
    channel.set_hooks(hooks);
    debug!(label, "outgoing data channel created");
    Ok(channel)
}

/// Bind `hooks` to a channel the remote side announced.
pub fn attach_incoming(channel: Arc<dyn DataChannel>, hooks: ChannelHooks) -> Arc<dyn DataChannel> {
    channel.set_hooks(hooks);
    debug!(label = %channel.label(), "incoming data channel attached");
    channel
}

/// Send `payload` if the channel exists and is open.
///
/// Returns `false` (with a warning) instead of failing when it cannot send.
pub async fn send(channel: Option<&Arc<dyn DataChannel>>, payload: &str) -> bool {
    let Some(channel) = channel else {
        warn!("no data channel; message not sent");
        return false;
    };

    let state = channel.ready_state();
    if state != ChannelState::Open {
        warn!(?state, "data channel not open; message not sent");
        return false;
    }

    match channel.send_text(payload).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "data channel send failed");
            false
        }
    }
}
