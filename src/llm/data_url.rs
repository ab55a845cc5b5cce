//! Data URL encoding for inline file transport.
//!
//! Generated images travel to the client inside the text-based event stream,
//! and inbound attachments arrive the same way, so both directions use
//! `data:<media-type>;base64,<payload>` URLs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Build a data URL from a media type and an already base64-encoded payload.
pub fn encode(media_type: &str, base64_data: &str) -> String {
    format!("data:{media_type};base64,{base64_data}")
}

/// Split a data URL into media type and base64 payload.
///
/// Returns `None` for anything that is not a base64 data URL or whose
/// payload does not decode.
pub fn parse(url: &str) -> Option<(String, String)> {
    let rest = url.strip_prefix("data:")?;
    let (media_type, payload) = rest.split_once(";base64,")?;
    if media_type.is_empty() {
        return None;
    }
    STANDARD.decode(payload).ok()?;
    Some((media_type.to_string(), payload.to_string()))
}
