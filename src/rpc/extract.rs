//! Locating the result of one call among decoded chunks.

use serde_json::Value;
use tracing::warn;

use super::framing::{ERROR_FRAME, chunk_frames};

/// First non-null `wrb.fr` payload for `call_id`, decoded from its JSON
/// string form. Absent when nothing matches.
pub fn extract_result(chunks: &[Value], call_id: &str) -> Option<Value> {
    for frame in chunks.iter().flat_map(chunk_frames) {
        if frame.call_id.as_deref() != Some(call_id) {
            continue;
        }
        if frame.frame_kind == ERROR_FRAME {
            warn!(call_id, payload = %frame.payload, "server reported an error frame");
            continue;
        }
        if !frame.is_result() || frame.payload.is_null() {
            continue;
        }
        return Some(frame.decoded_payload());
    }
    None
}

/// Strip one unnamed wrapper level: `[[a, b, c]]` becomes `[a, b, c]`.
///
/// The vendor adds this level inconsistently. Any array whose first element
/// is itself an array is unwrapped, so only apply this where the payload's
/// top level is known to be either a list of records or that list wrapped.
pub fn unwrap_list(value: &Value) -> &Value {
    match value.as_array().and_then(|items| items.first()) {
        Some(first @ Value::Array(_)) => first,
        _ => value,
    }
}
