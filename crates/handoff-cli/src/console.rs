//! Terminal rendering and the document buffer.

use handoff_core::{ChannelState, ConnectionState, SessionEvent};
use serde_json::Value;

/// Text line for a session event, if it has one.
pub fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Status(message) => Some(message.clone()),
        SessionEvent::ConnectionState(state) => Some(render_connection_state(*state)),
        SessionEvent::ChannelOpened => Some("[chat connected]".to_string()),
        SessionEvent::Message(text) => Some(format!("Peer: {text}")),
        SessionEvent::ChannelClosed => Some("[chat disconnected]".to_string()),
        SessionEvent::ChannelError(e) => Some(format!("[chat error] {e}")),
        SessionEvent::IncomingChannel(_) => None,
    }
}

fn render_connection_state(state: ConnectionState) -> String {
    if state.needs_restart() && state != ConnectionState::Closed {
        format!("Connection state: {state} (use /reconnect to try again)")
    } else {
        format!("Connection state: {state}")
    }
}

pub fn render_status(
    connection: Option<ConnectionState>,
    channel: Option<ChannelState>,
    buffer: &DocumentBuffer,
) -> String {
    let connection = connection.map_or("none", |s| s.as_str());
    let channel = match channel {
        None => "none",
        Some(ChannelState::Connecting) => "connecting",
        Some(ChannelState::Open) => "open",
        Some(ChannelState::Closing) => "closing",
        Some(ChannelState::Closed) => "closed",
    };
    let buffer = match (buffer.get(), buffer.kind()) {
        (None, _) => "empty".to_string(),
        (Some(_), Some(kind)) => format!("{kind} document"),
        (Some(_), None) => "text".to_string(),
    };
    format!("Connection: {connection}, chat: {channel}, buffer: {buffer}")
}

/// The single text area documents flow through: generated documents land
/// here, and answer/connect read from here.
#[derive(Debug, Default)]
pub struct DocumentBuffer {
    text: Option<String>,
}

impl DocumentBuffer {
    pub fn set(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.text = Some(text).filter(|t| !t.trim().is_empty());
    }

    pub fn get(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The `type` field, when the buffer holds a JSON object that has one.
    pub fn kind(&self) -> Option<String> {
        let value: Value = serde_json::from_str(self.text.as_deref()?).ok()?;
        value.get("type")?.as_str().map(str::to_string)
    }
}

/// Collects a multi-line paste until a line holding only `.`.
#[derive(Debug, Default)]
pub struct PasteReader {
    lines: Vec<String>,
}

impl PasteReader {
    /// Feed one line. Returns the pasted text once the terminator arrives.
    pub fn push(&mut self, line: &str) -> Option<String> {
        if line.trim() == "." {
            return Some(std::mem::take(&mut self.lines).join("\n"));
        }
        self.lines.push(line.to_string());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_chat_events() {
        assert_eq!(
            render_event(&SessionEvent::Message("hi".into())).as_deref(),
            Some("Peer: hi")
        );
        assert_eq!(
            render_event(&SessionEvent::ChannelOpened).as_deref(),
            Some("[chat connected]")
        );
        assert_eq!(
            render_event(&SessionEvent::ChannelClosed).as_deref(),
            Some("[chat disconnected]")
        );
    }

    #[test]
    fn test_render_connection_state_hints_reconnect() {
        let failed = render_event(&SessionEvent::ConnectionState(ConnectionState::Failed)).unwrap();
        assert!(failed.starts_with("Connection state: failed"));
        assert!(failed.contains("/reconnect"));

        let connected =
            render_event(&SessionEvent::ConnectionState(ConnectionState::Connected)).unwrap();
        assert_eq!(connected, "Connection state: connected");
    }

    #[test]
    fn test_render_status() {
        let mut buffer = DocumentBuffer::default();
        assert_eq!(
            render_status(None, None, &buffer),
            "Connection: none, chat: none, buffer: empty"
        );

        buffer.set(r#"{"type":"answer","sdp":"v=0"}"#);
        assert_eq!(
            render_status(
                Some(ConnectionState::Connected),
                Some(ChannelState::Open),
                &buffer
            ),
            "Connection: connected, chat: open, buffer: answer document"
        );

        buffer.set("hello");
        assert!(render_status(None, None, &buffer).ends_with("buffer: text"));
    }

    #[test]
    fn test_buffer_kind() {
        let mut buffer = DocumentBuffer::default();
        assert_eq!(buffer.kind(), None);
        buffer.set(r#"{"type":"offer","sdp":"v=0"}"#);
        assert_eq!(buffer.kind().as_deref(), Some("offer"));
        buffer.set("not json");
        assert_eq!(buffer.kind(), None);
        buffer.set("  ");
        assert_eq!(buffer.get(), None);
    }

    #[test]
    fn test_paste_reader() {
        let mut reader = PasteReader::default();
        assert_eq!(reader.push("{"), None);
        assert_eq!(reader.push(r#"  "type": "answer""#), None);
        assert_eq!(reader.push("}"), None);
        assert_eq!(
            reader.push(" . ").as_deref(),
            Some("{\n  \"type\": \"answer\"\n}")
        );
    }
}
