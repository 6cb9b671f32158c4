//! `NotebookClient` wires encoder, transport, framer, extractor and the
//! decoders into domain operations.
//!
//! Each operation lives in the submodule for its area and is a thin layer:
//! build positional params, make one call, decode the result. The positional
//! parsing is kept in free functions next to each operation so it can be
//! exercised without a transport.

mod downloads;
mod notebooks;
mod query;
mod research;
mod sharing;
mod sources;
mod studio;

pub use downloads::select_completed;
pub use query::QueryOptions;
pub use studio::StudioRequest;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{CredentialSource, Credentials};
use crate::chat::{AnswerSelector, ChatParser};
use crate::config::ClientConfig;
use crate::conversation::ConversationCache;
use crate::error::{Error, Result};
use crate::rpc::{CallEnvelope, Endpoint, RequestSequence, decode_chunks, extract_result};
use crate::transport::{ReqwestTransport, Transport, TransportResponse};

/// Source path for calls that are not scoped to a notebook.
const ROOT_PATH: &str = "/";

fn notebook_path(notebook_id: &str) -> String {
    format!("/notebook/{notebook_id}")
}

/// Client for one signed-in session.
pub struct NotebookClient {
    transport: Arc<dyn Transport>,
    credentials: RwLock<Credentials>,
    credential_source: Option<Arc<dyn CredentialSource>>,
    config: ClientConfig,
    endpoint: Endpoint,
    sequence: RequestSequence,
    conversations: ConversationCache,
    chat_parser: ChatParser,
    /// Used for artifact downloads, which bypass the RPC transport.
    http: reqwest::Client,
}

impl std::fmt::Debug for NotebookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotebookClient")
            .field("endpoint", &self.endpoint)
            .field("sequence", &self.sequence.current())
            .field("conversations", &self.conversations)
            .finish_non_exhaustive()
    }
}

impl NotebookClient {
    /// Client over HTTP with fixed credentials.
    pub fn new(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        let transport = ReqwestTransport::new(&config, credentials.cookie_header())?;
        Self::with_transport(config, credentials, Arc::new(transport))
    }

    /// Client over any transport; tests use an in-process one.
    pub fn with_transport(
        config: ClientConfig,
        credentials: Credentials,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let missing = credentials.missing_cookies();
        if !missing.is_empty() {
            warn!(?missing, "session is missing required cookies");
        }
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect())
            .build()?;
        Ok(Self {
            transport,
            credentials: RwLock::new(credentials),
            credential_source: None,
            endpoint: config.endpoint(),
            config,
            sequence: RequestSequence::default(),
            conversations: ConversationCache::default(),
            chat_parser: ChatParser::default(),
            http,
        })
    }

    /// Client that asks `source` for credentials now and again whenever the
    /// session turns out to be stale.
    pub async fn connect(config: ClientConfig, source: Arc<dyn CredentialSource>) -> Result<Self> {
        let credentials = source.credentials().await?;
        let mut client = Self::new(config, credentials)?;
        client.credential_source = Some(source);
        Ok(client)
    }

    pub fn with_credential_source(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.credential_source = Some(source);
        self
    }

    pub fn with_answer_selector(mut self, selector: Box<dyn AnswerSelector>) -> Self {
        self.chat_parser = ChatParser::new(selector);
        self
    }

    pub fn with_conversation_cache(mut self, cache: ConversationCache) -> Self {
        self.conversations = cache;
        self
    }

    pub fn with_request_sequence(mut self, sequence: RequestSequence) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn conversations(&self) -> &ConversationCache {
        &self.conversations
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Ask the credential source for fresh session material.
    pub async fn refresh_credentials(&self) -> Result<()> {
        let Some(source) = &self.credential_source else {
            return Err(Error::AuthenticationExpired(
                "no credential source to refresh from".to_string(),
            ));
        };
        let fresh = source.refresh().await?;
        self.transport.update_cookies(&fresh.cookie_header());
        *self.credentials.write().unwrap_or_else(|e| e.into_inner()) = fresh;
        debug!("credentials refreshed");
        Ok(())
    }

    fn session_tokens(&self) -> (Option<String>, Option<String>) {
        let creds = self.credentials.read().unwrap_or_else(|e| e.into_inner());
        (
            creds.session().map(str::to_string),
            creds.csrf().map(str::to_string),
        )
    }

    async fn send(
        &self,
        envelope: CallEnvelope,
        timeout: Duration,
    ) -> Result<TransportResponse> {
        let request = envelope.encode(&self.endpoint)?;
        debug!(
            call_id = %request.call_id,
            reqid = envelope.request_sequence,
            timeout_secs = timeout.as_secs(),
            "encoded call"
        );
        match self.transport.post(&request, timeout).await {
            Err(err) if err.needs_reauth() => {
                // The caller still sees the failure and decides whether to repeat.
                if self.credential_source.is_some() {
                    if let Err(refresh_err) = self.refresh_credentials().await {
                        warn!(error = %refresh_err, "credential refresh failed");
                    }
                }
                Err(err)
            }
            other => other,
        }
    }

    /// One batch call; `None` when the response carries no result for
    /// `call_id`.
    pub async fn call(
        &self,
        call_id: &str,
        params: Value,
        source_path: &str,
        timeout: Duration,
    ) -> Result<Option<Value>> {
        let (session_id, csrf_token) = self.session_tokens();
        let envelope = CallEnvelope::batch(call_id, params, source_path, &self.sequence)
            .with_session(session_id.as_deref(), csrf_token.as_deref());
        let response = self.send(envelope, timeout).await?;
        let chunks = decode_chunks(&response.body);
        let result = extract_result(&chunks, call_id);
        debug!(
            call_id,
            chunks = chunks.len(),
            found = result.is_some(),
            "call finished"
        );
        Ok(result)
    }

    /// [`call`](Self::call) with the default timeout.
    pub(crate) async fn rpc(
        &self,
        call_id: &str,
        params: Value,
        source_path: &str,
    ) -> Result<Option<Value>> {
        self.call(call_id, params, source_path, self.config.timeouts.default_call())
            .await
    }

    /// One streamed (chat) call; returns the raw body for the chat parser.
    pub(crate) async fn stream_call(&self, params: Value, timeout: Duration) -> Result<String> {
        let (session_id, csrf_token) = self.session_tokens();
        let envelope = CallEnvelope::stream(params, &self.sequence)
            .with_session(session_id.as_deref(), csrf_token.as_deref());
        Ok(self.send(envelope, timeout).await?.body)
    }
}

/// `[[[id]], [[id]], ...]`: the source list shape most calls expect.
pub(crate) fn sources_nested(source_ids: &[String]) -> Value {
    Value::Array(
        source_ids
            .iter()
            .map(|id| serde_json::json!([[id]]))
            .collect(),
    )
}

/// `[[id], [id], ...]`
pub(crate) fn sources_simple(source_ids: &[String]) -> Value {
    Value::Array(
        source_ids
            .iter()
            .map(|id| serde_json::json!([id]))
            .collect(),
    )
}
