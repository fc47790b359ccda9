//! Common helper functions for Handoff.

/// Milliseconds since the Unix epoch, saturating to zero on a skewed clock.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// File name for a saved signaling snapshot: `<kind>_<millis>.json`.
///
/// Falls back to `sdp` when the document carries no usable type.
pub fn snapshot_file_name(kind: Option<&str>, millis: u64) -> String {
    let kind = kind
        .map(str::trim)
        .filter(|k| !k.is_empty() && k.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("sdp");
    format!("{}_{}.json", kind, millis)
}
