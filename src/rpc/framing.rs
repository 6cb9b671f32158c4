//! Response framing: anti-hijacking prefix, byte-count headers, frames.
//!
//! The body of every call looks like
//!
//! ```text
//! )]}'
//!
//! 123
//! [["wrb.fr","wXbhsf","[[...]]",null,null,null,"generic"]]
//! 57
//! [["di",91],["af.httprm",90,"-3410958",1]]
//! ```
//!
//! Byte counts are advisory. Real bodies have been observed with counts that
//! do not match the following line, so the framer never checks them.

use serde_json::Value;
use tracing::{debug, trace};

/// Anti-hijacking marker prepended to every response body.
pub const XSSI_PREFIX: &str = ")]}'";

/// Frame kind carrying a call result.
pub const RESULT_FRAME: &str = "wrb.fr";
/// Frame kind carrying a server-side error for one call.
pub const ERROR_FRAME: &str = "er";

/// One `[frame_kind, call_id, inner_payload, ...]` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFrame {
    pub frame_kind: String,
    /// Absent on streamed chat frames.
    pub call_id: Option<String>,
    /// Usually a JSON string that needs a second decode; null on progress frames.
    pub payload: Value,
}

impl ResponseFrame {
    pub fn is_result(&self) -> bool {
        self.frame_kind == RESULT_FRAME
    }

    /// Decode the inner payload. A string that is not valid JSON is returned
    /// as a plain string value; null stays null.
    pub fn decoded_payload(&self) -> Value {
        match &self.payload {
            Value::String(inner) => serde_json::from_str(inner)
                .unwrap_or_else(|_| Value::String(inner.clone())),
            other => other.clone(),
        }
    }
}

pub fn strip_xssi_prefix(text: &str) -> &str {
    text.strip_prefix(XSSI_PREFIX).unwrap_or(text)
}

/// Split a raw body into decoded JSON chunks, in order.
///
/// Never fails: malformed lines are skipped.
pub fn decode_chunks(text: &str) -> Vec<Value> {
    let body = strip_xssi_prefix(text).trim();
    let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());
    let mut chunks = Vec::new();
    let mut skipped = 0usize;

    while let Some(line) = lines.next() {
        let candidate = if line.parse::<i64>().is_ok() {
            match lines.next() {
                Some(next) => next,
                None => break,
            }
        } else {
            line
        };
        match serde_json::from_str::<Value>(candidate) {
            Ok(chunk) => chunks.push(chunk),
            Err(e) => {
                skipped += 1;
                trace!(error = %e, "skipping undecodable chunk");
            }
        }
    }

    if skipped > 0 {
        debug!(decoded = chunks.len(), skipped, "response framing skipped chunks");
    }
    chunks
}

/// Frames contained in one decoded chunk. Entries that are not
/// `[string, ...]` arrays are ignored.
pub fn chunk_frames(chunk: &Value) -> impl Iterator<Item = ResponseFrame> + '_ {
    chunk
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let items = entry.as_array()?;
            let frame_kind = items.first()?.as_str()?.to_string();
            Some(ResponseFrame {
                frame_kind,
                call_id: items.get(1).and_then(Value::as_str).map(str::to_string),
                payload: items.get(2).cloned().unwrap_or(Value::Null),
            })
        })
}

/// All frames of a body, in order.
pub fn parse_frames(text: &str) -> Vec<ResponseFrame> {
    decode_chunks(text).iter().flat_map(chunk_frames).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_prefix_and_reads_counted_chunks() {
        let body = ")]}'\n\n42\n[[\"wrb.fr\",\"abc\",\"[1]\"]]\n25\n[[\"di\",91]]\n";
        let chunks = decode_chunks(body);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], json!([["di", 91]]));
    }

    #[test]
    fn wrong_byte_counts_are_ignored() {
        let body = ")]}'\n9999\n[[\"wrb.fr\",\"a\",\"1\"]]\n1\n[[\"wrb.fr\",\"b\",\"2\"]]\n";
        let frames = parse_frames(body);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].call_id.as_deref(), Some("b"));
    }

    #[test]
    fn bare_json_lines_and_garbage() {
        let body = "[[\"wrb.fr\",\"a\",\"[]\"]]\nnot json at all\n12\n{broken\n[[\"e\",4]]";
        let chunks = decode_chunks(body);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn dangling_count_is_dropped() {
        assert!(decode_chunks(")]}'\n17\n").is_empty());
        assert!(decode_chunks("").is_empty());
    }

    #[test]
    fn decoded_payload_keeps_invalid_json_as_text() {
        let frame = ResponseFrame {
            frame_kind: RESULT_FRAME.into(),
            call_id: None,
            payload: json!("plain words"),
        };
        assert_eq!(frame.decoded_payload(), json!("plain words"));
    }
}
