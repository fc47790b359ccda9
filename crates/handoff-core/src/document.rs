//! Signaling document codec.
//!
//! A signaling document is the only thing the two peers ever exchange. It is
//! self-contained: the session description plus every candidate gathered
//! before the document was packaged, so the receiver needs nothing else.
//!
//! ```text
//! { "type": "offer" | "answer",
//!   "sdp": "<session description>",
//!   "iceCandidates": [ { "candidate": "...", "sdpMid": "0", "sdpMLineIndex": 0, "usernameFragment": "..." } ] }
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SignalError};

/// Session-description role carried by a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

impl SdpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
        }
    }
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session description as committed on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A network candidate as produced by the connection capability.
///
/// Transported verbatim; the core never inspects the candidate string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Missing strings decode as empty so a bad entry fails at apply time,
    /// not at document decode time.
    #[serde(default)]
    pub candidate: String,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
    #[serde(
        rename = "usernameFragment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username_fragment: Option<String>,
}

impl CandidateRecord {
    /// Read one `iceCandidates` entry.
    ///
    /// An entry that is not a candidate object keeps its raw JSON as the
    /// candidate string, so it is rejected when applied instead of sinking
    /// the whole document.
    fn from_wire(value: Value) -> Self {
        match Self::deserialize(&value) {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, entry = %value, "malformed candidate entry");
                Self {
                    candidate: value.to_string(),
                    sdp_mid: None,
                    sdp_mline_index: None,
                    username_fragment: None,
                }
            }
        }
    }
}

/// The unit exchanged between peers out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingDocument {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
    #[serde(
        rename = "iceCandidates",
        default,
        deserialize_with = "lenient_candidates"
    )]
    pub ice_candidates: Vec<CandidateRecord>,
}

/// `null` or missing reads as no candidates; bad entries survive decode.
fn lenient_candidates<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<CandidateRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries.into_iter().map(CandidateRecord::from_wire).collect())
}

impl SignalingDocument {
    pub fn new(description: SessionDescription, ice_candidates: Vec<CandidateRecord>) -> Self {
        Self {
            kind: description.kind,
            sdp: description.sdp,
            ice_candidates,
        }
    }

    /// The description half of the document, ready to commit as remote.
    pub fn description(&self) -> SessionDescription {
        SessionDescription {
            kind: self.kind,
            sdp: self.sdp.clone(),
        }
    }

    /// Pretty-printed JSON, two-space indent.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| handoff_common::Error::from(e).into())
    }

    /// Parse a document pasted or loaded by the user.
    pub fn decode(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SignalError::validation("no signaling document provided"));
        }

        let doc: Self = serde_json::from_str(text)
            .map_err(|e| SignalError::validation(format!("not a valid signaling document: {e}")))?;

        if doc.sdp.trim().is_empty() {
            return Err(SignalError::validation(
                "signaling document has an empty session description",
            ));
        }
        Ok(doc)
    }

    /// Parse and require one of the given roles.
    pub fn decode_expecting(text: &str, allowed: &[SdpKind]) -> Result<Self> {
        let doc = Self::decode(text)?;
        doc.expect_kind(allowed)?;
        Ok(doc)
    }

    pub fn expect_kind(&self, allowed: &[SdpKind]) -> Result<()> {
        if allowed.contains(&self.kind) {
            return Ok(());
        }
        let wanted = allowed
            .iter()
            .map(SdpKind::as_str)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(SignalError::validation(format!(
            "expected an {} document, got {}",
            wanted, self.kind
        )))
    }
}
