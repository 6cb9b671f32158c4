//! In-process transports and response builders shared by the integration
//! tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use notebooklm_rpc::rpc::{RpcRequest, decode_body_params};
use notebooklm_rpc::{ClientConfig, Credentials, Error, NotebookClient, Result, Transport, TransportResponse};
use serde_json::{Value, json};

pub const COOKIES: &str = "SID=s; HSID=h; SSID=ss; APISID=a; SAPISID=sa";

/// One `wrb.fr` result chunk for `call_id`, with a byte-count header.
pub fn result_chunk(call_id: &str, payload: &Value) -> String {
    let chunk = json!([["wrb.fr", call_id, payload.to_string(), null, null, null, "generic"]]).to_string();
    format!("{}\n{}\n", chunk.len(), chunk)
}

/// A full batch response carrying one result.
pub fn batch_body(call_id: &str, payload: &Value) -> String {
    format!(")]}}'\n\n{}", result_chunk(call_id, payload))
}

/// A streamed chat body: `(text, marker)` pairs in arrival order.
pub fn chat_body(frames: &[(&str, i64)]) -> String {
    let mut out = String::from(")]}'\n");
    for (text, marker) in frames {
        let payload = json!([[text, null, null, null, [null, null, marker]]]);
        let chunk = json!([["wrb.fr", null, payload.to_string()]]).to_string();
        out.push_str(&format!("{}\n{}\n", chunk.len(), chunk));
    }
    out
}

/// Scripted reply for the next call.
pub enum Reply {
    Body(String),
    Timeout,
    Fail(Error),
}

/// Pops one scripted reply per call and records what was sent.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    pub sent: Mutex<Vec<RpcRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<RpcRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Decoded params of every sent request.
    pub fn sent_params(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .map(|r| decode_body_params(&r.body).unwrap_or(Value::Null))
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, request: &RpcRequest, timeout: Duration) -> Result<TransportResponse> {
        self.sent.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Body(body)) => Ok(TransportResponse { status: 200, body }),
            Some(Reply::Timeout) => Err(Error::Timeout(timeout)),
            Some(Reply::Fail(err)) => Err(err),
            None => panic!("unscripted call to {}", request.call_id),
        }
    }
}

/// Answers every batch call with its own params.
#[derive(Debug, Default)]
pub struct EchoTransport;

#[async_trait]
impl Transport for EchoTransport {
    async fn post(&self, request: &RpcRequest, _timeout: Duration) -> Result<TransportResponse> {
        let params = decode_body_params(&request.body).unwrap_or(Value::Null);
        Ok(TransportResponse {
            status: 200,
            body: batch_body(&request.call_id, &params),
        })
    }
}

pub fn credentials() -> Credentials {
    Credentials::from_cookie_header(COOKIES).unwrap()
}

pub fn client(transport: Arc<dyn Transport>) -> NotebookClient {
    NotebookClient::with_transport(ClientConfig::default(), credentials(), transport).unwrap()
}
