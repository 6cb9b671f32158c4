//! The HTTP seam. Everything above it deals in [`RpcRequest`] and raw text,
//! so the whole call path can run against an in-process transport.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::auth::looks_like_login_page;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::rpc::{RpcRequest, XSSI_PREFIX};

/// Raw response text of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `request` and return the body. Implementations map a login page
    /// to [`Error::AuthenticationExpired`] and a non-success status to
    /// [`Error::HttpStatus`].
    async fn post(&self, request: &RpcRequest, timeout: Duration) -> Result<TransportResponse>;

    /// New session cookies after a credential refresh.
    fn update_cookies(&self, _cookie_header: &str) {}
}

/// Classify a raw response the way every transport should.
pub fn check_response(url: &str, status: u16, body: &str) -> Result<()> {
    if status == 401 || status == 403 {
        return Err(Error::AuthenticationExpired(format!("HTTP {status}")));
    }
    if !(200..300).contains(&status) {
        return Err(Error::HttpStatus {
            status,
            url: url.to_string(),
        });
    }
    let head = body.trim_start();
    if !head.starts_with(XSSI_PREFIX) {
        let probe = &head.as_bytes()[..head.len().min(2048)];
        if looks_like_login_page(probe) {
            return Err(Error::AuthenticationExpired(
                "received a sign-in page instead of data".to_string(),
            ));
        }
    }
    Ok(())
}

/// reqwest-backed transport carrying the session cookies.
#[derive(Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    cookie_header: RwLock<String>,
    user_agent: String,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig, cookie_header: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect())
            .build()?;
        Ok(Self::with_client(http, config, cookie_header))
    }

    pub fn with_client(
        http: reqwest::Client,
        config: &ClientConfig,
        cookie_header: impl Into<String>,
    ) -> Self {
        Self {
            http,
            cookie_header: RwLock::new(cookie_header.into()),
            user_agent: config.user_agent.clone(),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn cookie_header(&self) -> String {
        self.cookie_header
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: &RpcRequest, timeout: Duration) -> Result<TransportResponse> {
        debug!(
            call_id = %request.call_id,
            body_bytes = request.body.len(),
            "sending call"
        );
        let send = self
            .http
            .post(&request.url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded;charset=UTF-8",
            )
            .header(reqwest::header::COOKIE, self.cookie_header())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ORIGIN, crate::rpc::ids::BASE_URL)
            .body(request.body.clone())
            .send();

        let read = async {
            let response = send.await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(timeout, read).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) if e.is_timeout() => return Err(Error::Timeout(timeout)),
            Ok(Err(e)) => return Err(Error::Transport(e)),
            Err(_) => return Err(Error::Timeout(timeout)),
        };
        debug!(
            call_id = %request.call_id,
            status,
            body_bytes = body.len(),
            "received response"
        );
        check_response(&request.url, status, &body)?;
        Ok(TransportResponse { status, body })
    }

    fn update_cookies(&self, cookie_header: &str) {
        *self.cookie_header.write().unwrap_or_else(|e| e.into_inner()) = cookie_header.to_string();
    }
}
