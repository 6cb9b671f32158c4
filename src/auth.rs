//! Session material and the collaborators that supply it.
//!
//! The crate never logs in. It is handed cookies plus the page tokens by a
//! [`CredentialSource`], and reports [`Error::AuthenticationExpired`] when
//! the vendor answers with a sign-in page instead of data.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Google session cookies without which every call is redirected to sign-in.
pub const REQUIRED_COOKIES: [&str; 5] = ["SID", "HSID", "SSID", "APISID", "SAPISID"];

/// Cookies, CSRF token and session id for one signed-in browser session.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub cookies: BTreeMap<String, String>,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub session_id: String,
    pub extracted_at: DateTime<Utc>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .field("csrf_token", &(!self.csrf_token.is_empty()))
            .field("session_id", &self.session_id)
            .field("extracted_at", &self.extracted_at)
            .finish()
    }
}

impl Credentials {
    pub fn new(cookies: BTreeMap<String, String>) -> Self {
        Self {
            cookies,
            csrf_token: String::new(),
            session_id: String::new(),
            extracted_at: Utc::now(),
        }
    }

    /// Build from a `Cookie:` header copied out of browser dev tools.
    pub fn from_cookie_header(header: &str) -> Result<Self> {
        let cookies = parse_cookie_header(header);
        if cookies.is_empty() {
            return Err(Error::InvalidArgument("no cookies in header".into()));
        }
        Ok(Self::new(cookies))
    }

    /// Fill the CSRF token and session id from the app's page HTML.
    pub fn with_page_tokens(mut self, html: &str) -> Self {
        if let Some(token) = extract_csrf_token(html) {
            self.csrf_token = token;
        }
        if let Some(sid) = extract_session_id(html) {
            self.session_id = sid;
        }
        self
    }

    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn missing_cookies(&self) -> Vec<&'static str> {
        REQUIRED_COOKIES
            .into_iter()
            .filter(|name| !self.cookies.contains_key(*name))
            .collect()
    }

    pub fn csrf(&self) -> Option<&str> {
        Some(self.csrf_token.as_str()).filter(|t| !t.is_empty())
    }

    pub fn session(&self) -> Option<&str> {
        Some(self.session_id.as_str()).filter(|s| !s.is_empty())
    }
}

/// Split `a=1; b=2` into pairs. Values may themselves contain `=`.
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    let header = header.trim();
    let header = header
        .strip_prefix("Cookie:")
        .or_else(|| header.strip_prefix("cookie:"))
        .unwrap_or(header);
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// The `SNlM0e` value embedded in the app page (sent as `at=`).
pub fn extract_csrf_token(html: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r#""SNlM0e":"([^"]+)""#).unwrap());
    re.captures(html).map(|c| c[1].to_string())
}

/// The session id sent as `f.sid`, from whichever marker the page carries.
pub fn extract_session_id(html: &str) -> Option<String> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r#""FdrFJe":"(\d+)""#).unwrap(),
            Regex::new(r#"f\.sid["\s:=]+["']?(\d+)"#).unwrap(),
            Regex::new(r#""cfb2h":"([^"]+)""#).unwrap(),
        ]
    });
    patterns
        .iter()
        .find_map(|re| re.captures(html).map(|c| c[1].to_string()))
}

/// Heuristic for a sign-in page served where data was expected.
pub fn looks_like_login_page(head: &[u8]) -> bool {
    let lower = String::from_utf8_lossy(head).to_lowercase();
    lower.contains("<!doctype html>") || lower.contains("sign in")
}

/// Supplies session material; asked again after an authentication failure.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credentials(&self) -> Result<Credentials>;

    /// Called after [`Error::AuthenticationExpired`]; sources that can
    /// refresh should do so here.
    async fn refresh(&self) -> Result<Credentials> {
        self.credentials().await
    }
}

/// Fixed credentials, e.g. pasted from a browser.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn credentials(&self) -> Result<Credentials> {
        Ok(self.0.clone())
    }
}

/// Places a local file into a notebook. Uploads go through browser
/// automation outside this crate.
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, notebook_id: &str, file: &Path) -> Result<bool>;
}
