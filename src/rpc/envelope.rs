//! Outbound request encoding.
//!
//! One [`CallEnvelope`] per logical remote call. The envelope is immutable
//! once built; encoding it yields the form body and the target URL.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};
use url::Url;

use crate::error::{Error, Result};

use super::ids;

/// Increment applied to `_reqid` before every call.
pub const REQUEST_SEQUENCE_STEP: u64 = 100_000;

/// Monotonic `_reqid` counter shared by every call of one client.
#[derive(Debug)]
pub struct RequestSequence {
    current: AtomicU64,
}

impl RequestSequence {
    pub fn new(start: u64) -> Self {
        Self {
            current: AtomicU64::new(start),
        }
    }

    /// Advance by one step and return the new value.
    pub fn advance(&self) -> u64 {
        self.current
            .fetch_add(REQUEST_SEQUENCE_STEP, Ordering::SeqCst)
            + REQUEST_SEQUENCE_STEP
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

impl Default for RequestSequence {
    fn default() -> Self {
        // The web frontend seeds with a small random offset; any value works.
        Self::new(rand::random::<u64>() % 900_000 + 100_000)
    }
}

/// Which vendor wire shape the call uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// `batchexecute`: `[[[call_id, params_json, null, "generic"]]]`.
    Batch,
    /// Streamed chat endpoint: `[null, params_json]`.
    Stream,
}

/// Fixed per-client URL parameters.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub build_label: String,
    pub language: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            base_url: ids::BASE_URL.to_string(),
            build_label: ids::DEFAULT_BUILD_LABEL.to_string(),
            language: "en".to_string(),
        }
    }
}

/// Everything needed to encode one remote call.
#[derive(Debug, Clone)]
pub struct CallEnvelope {
    pub kind: EnvelopeKind,
    pub call_id: String,
    pub params: Value,
    pub request_sequence: u64,
    pub source_path: String,
    pub session_id: Option<String>,
    pub csrf_token: Option<String>,
}

/// Encoded form of a [`CallEnvelope`], ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcRequest {
    pub call_id: String,
    pub url: String,
    pub body: String,
}

impl CallEnvelope {
    /// Build a batch envelope, advancing `sequence`.
    pub fn batch(
        call_id: &str,
        params: Value,
        source_path: &str,
        sequence: &RequestSequence,
    ) -> Self {
        Self {
            kind: EnvelopeKind::Batch,
            call_id: call_id.to_string(),
            params,
            request_sequence: sequence.advance(),
            source_path: source_path.to_string(),
            session_id: None,
            csrf_token: None,
        }
    }

    /// Build a stream (chat) envelope, advancing `sequence`.
    pub fn stream(params: Value, sequence: &RequestSequence) -> Self {
        Self {
            kind: EnvelopeKind::Stream,
            call_id: String::new(),
            params,
            request_sequence: sequence.advance(),
            source_path: "/".to_string(),
            session_id: None,
            csrf_token: None,
        }
    }

    pub fn with_session(mut self, session_id: Option<&str>, csrf_token: Option<&str>) -> Self {
        self.session_id = session_id.filter(|s| !s.is_empty()).map(str::to_string);
        self.csrf_token = csrf_token.filter(|s| !s.is_empty()).map(str::to_string);
        self
    }

    /// The compact JSON placed in `f.req`, before percent-encoding.
    pub fn f_req(&self) -> String {
        let params_json = self.params.to_string();
        let outer = match self.kind {
            EnvelopeKind::Batch => json!([[[self.call_id, params_json, null, "generic"]]]),
            EnvelopeKind::Stream => json!([null, params_json]),
        };
        outer.to_string()
    }

    /// Form body: `f.req=...&at=...&`, trailing `&` always present.
    pub fn body(&self) -> String {
        let mut body = format!("f.req={}&", urlencoding::encode(&self.f_req()));
        if let Some(token) = &self.csrf_token {
            body.push_str("at=");
            body.push_str(&urlencoding::encode(token));
            body.push('&');
        }
        body
    }

    pub fn url(&self, endpoint: &Endpoint) -> Result<String> {
        let path = match self.kind {
            EnvelopeKind::Batch => ids::BATCHEXECUTE_PATH,
            EnvelopeKind::Stream => ids::QUERY_PATH,
        };
        let base = endpoint.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{path}"))
            .map_err(|e| Error::Config(format!("invalid base url {base:?}: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            if self.kind == EnvelopeKind::Batch {
                query.append_pair("rpcids", &self.call_id);
                query.append_pair("source-path", &self.source_path);
            }
            query.append_pair("bl", &endpoint.build_label);
            query.append_pair("hl", &endpoint.language);
            query.append_pair("_reqid", &self.request_sequence.to_string());
            query.append_pair("rt", "c");
            if let Some(sid) = &self.session_id {
                query.append_pair("f.sid", sid);
            }
        }
        Ok(url.into())
    }

    pub fn encode(&self, endpoint: &Endpoint) -> Result<RpcRequest> {
        Ok(RpcRequest {
            call_id: self.call_id.clone(),
            url: self.url(endpoint)?,
            body: self.body(),
        })
    }
}

/// Recover the params from an encoded form body. Inverse of
/// [`CallEnvelope::body`]; used by echo transports and diagnostics.
pub fn decode_body_params(body: &str) -> Option<Value> {
    let raw = body
        .split('&')
        .find_map(|pair| pair.strip_prefix("f.req="))?;
    let decoded = urlencoding::decode(raw).ok()?;
    let outer: Value = serde_json::from_str(&decoded).ok()?;
    let params_json = outer
        .pointer("/0/0/1")
        .or_else(|| outer.get(1))?
        .as_str()?;
    serde_json::from_str(params_json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_steps_by_exactly_one_hundred_thousand() {
        let seq = RequestSequence::new(7);
        assert_eq!(seq.advance(), 100_007);
        assert_eq!(seq.advance(), 200_007);
        assert_eq!(seq.current(), 200_007);
    }

    #[test]
    fn batch_body_shape() {
        let seq = RequestSequence::new(0);
        let env = CallEnvelope::batch("wXbhsf", json!([null, 1, null, [2]]), "/", &seq)
            .with_session(Some("123"), Some("tok:1"));
        assert_eq!(
            env.f_req(),
            r#"[[["wXbhsf","[null,1,null,[2]]",null,"generic"]]]"#
        );
        let body = env.body();
        assert!(body.starts_with("f.req=%5B%5B%5B%22wXbhsf%22"));
        assert!(body.ends_with("&at=tok%3A1&"));
    }

    #[test]
    fn body_without_token_keeps_trailing_ampersand() {
        let seq = RequestSequence::new(0);
        let env = CallEnvelope::stream(json!(["q"]), &seq);
        let body = env.body();
        assert!(body.ends_with('&'));
        assert!(!body.contains("at="));
        assert_eq!(env.f_req(), r#"[null,"[\"q\"]"]"#);
    }

    #[test]
    fn url_parameters() {
        let seq = RequestSequence::new(0);
        let env = CallEnvelope::batch("rLM1Ne", json!([]), "/notebook/abc", &seq)
            .with_session(Some("42"), None);
        let url = Url::parse(&env.url(&Endpoint::default()).unwrap()).unwrap();
        assert_eq!(url.path(), ids::BATCHEXECUTE_PATH);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("rpcids"), Some("rLM1Ne"));
        assert_eq!(get("source-path"), Some("/notebook/abc"));
        assert_eq!(get("_reqid"), Some("100000"));
        assert_eq!(get("rt"), Some("c"));
        assert_eq!(get("hl"), Some("en"));
        assert_eq!(get("f.sid"), Some("42"));
    }

    #[test]
    fn stream_url_has_no_rpcids() {
        let seq = RequestSequence::new(0);
        let env = CallEnvelope::stream(json!([]), &seq);
        let url = env.url(&Endpoint::default()).unwrap();
        assert!(url.contains("GenerateFreeFormStreamed"));
        assert!(!url.contains("rpcids"));
        assert!(!url.contains("f.sid"));
    }

    #[test]
    fn body_decodes_back_to_params() {
        let seq = RequestSequence::new(0);
        let params = json!([[[["src-1"]]], "what & why?", null, [2, null, [1]], "conv"]);
        for env in [
            CallEnvelope::batch("x", params.clone(), "/", &seq),
            CallEnvelope::stream(params.clone(), &seq),
        ] {
            assert_eq!(decode_body_params(&env.body()), Some(params.clone()));
        }
    }
}
