//! Streamed artifact downloads with an atomic commit.
//!
//! Bytes go to a temp file created beside the destination and are renamed
//! over it only once the stream has ended cleanly. The temp file is removed
//! on every failure path when its guard drops.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::auth::looks_like_login_page;
use crate::error::{Error, Result};

/// Progress callback: `(bytes_so_far, total_or_zero)`.
pub type Progress<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// A finished transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub source_url: String,
    pub destination_path: PathBuf,
    /// Where the bytes were staged; gone once the task completes.
    pub temp_path: PathBuf,
    pub bytes_transferred: u64,
    /// Zero when the server sent no length.
    pub total_bytes: u64,
}

/// Response metadata and body stream handed to the pipeline.
pub struct DownloadResponse<S> {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: S,
}

fn failure(url: &str, detail: impl Into<String>) -> Error {
    Error::DownloadFailure {
        url: url.to_string(),
        detail: detail.into(),
    }
}

fn staging_file(destination: &Path) -> Result<NamedTempFile> {
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    Ok(tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".part")
        .tempfile_in(dir)?)
}

async fn next_chunk<S, E>(body: &mut S, url: &str, read_timeout: Duration) -> Result<Option<Bytes>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    match tokio::time::timeout(read_timeout, body.next()).await {
        Ok(Some(Ok(chunk))) => Ok(Some(chunk)),
        Ok(Some(Err(e))) => Err(failure(url, format!("stream error: {e}"))),
        Ok(None) => Ok(None),
        Err(_) => Err(failure(
            url,
            format!("no data for {}s, transfer stalled", read_timeout.as_secs()),
        )),
    }
}

/// Stream `response` into `destination`.
///
/// For HTML responses the first chunk is inspected before anything touches
/// the disk; a login page fails with [`Error::AuthenticationExpired`].
pub async fn stream_to_file<S, E>(
    url: &str,
    destination: &Path,
    response: DownloadResponse<S>,
    read_timeout: Duration,
    progress: Option<Progress<'_>>,
) -> Result<DownloadTask>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let DownloadResponse {
        content_type,
        content_length,
        mut body,
    } = response;
    let total = content_length.unwrap_or(0);

    let is_html = content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
    let mut pending = None;
    if is_html {
        let first = next_chunk(&mut body, url, read_timeout).await?;
        if first.as_deref().is_some_and(looks_like_login_page) {
            return Err(Error::AuthenticationExpired(
                "download redirected to a sign-in page".to_string(),
            ));
        }
        pending = first;
    }

    let mut staged = staging_file(destination)
        .map_err(|e| failure(url, format!("could not stage beside destination: {e}")))?;
    let temp_path = staged.path().to_path_buf();
    let mut written = 0u64;

    loop {
        let chunk = match pending.take() {
            Some(chunk) => chunk,
            None => match next_chunk(&mut body, url, read_timeout).await? {
                Some(chunk) => chunk,
                None => break,
            },
        };
        staged
            .write_all(&chunk)
            .map_err(|e| failure(url, format!("write failed: {e}")))?;
        written += chunk.len() as u64;
        if let Some(report) = progress {
            report(written, total);
        }
    }

    staged
        .as_file_mut()
        .sync_all()
        .map_err(|e| failure(url, format!("sync failed: {e}")))?;
    staged
        .persist(destination)
        .map_err(|e| failure(url, format!("could not move into place: {}", e.error)))?;

    info!(
        url,
        destination = %destination.display(),
        bytes = written,
        "download complete"
    );
    Ok(DownloadTask {
        source_url: url.to_string(),
        destination_path: destination.to_path_buf(),
        temp_path,
        bytes_transferred: written,
        total_bytes: total,
    })
}

/// Write fully-formed content (reports, tables, mind maps) with the same
/// never-partial guarantee.
pub fn write_atomic(destination: &Path, content: &[u8]) -> Result<()> {
    let mut staged = staging_file(destination)?;
    staged.write_all(content)?;
    staged.as_file_mut().sync_all()?;
    staged.persist(destination).map_err(|e| Error::Io(e.error))?;
    debug!(destination = %destination.display(), bytes = content.len(), "wrote artifact");
    Ok(())
}

/// Fetch `url` with the session cookies and stream it to `destination`.
pub async fn fetch_to_file(
    http: &reqwest::Client,
    url: &str,
    cookie_header: &str,
    user_agent: &str,
    destination: &Path,
    read_timeout: Duration,
    progress: Option<Progress<'_>>,
) -> Result<DownloadTask> {
    let response = http
        .get(url)
        .header(reqwest::header::COOKIE, cookie_header)
        .header(reqwest::header::USER_AGENT, user_agent)
        .header(reqwest::header::REFERER, format!("{}/", crate::rpc::ids::BASE_URL))
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                failure(url, format!("connect failed: {e}"))
            } else {
                Error::Transport(e)
            }
        })?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::AuthenticationExpired(format!(
            "download returned HTTP {status}"
        )));
    }
    if !status.is_success() {
        return Err(Error::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_length = response.content_length();
    debug!(url, ?content_type, ?content_length, "download response");

    stream_to_file(
        url,
        destination,
        DownloadResponse {
            content_type,
            content_length,
            body: response.bytes_stream(),
        },
        read_timeout,
        progress,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::sync::Mutex;

    fn ok_chunks(parts: &[&'static str]) -> Vec<std::result::Result<Bytes, String>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect()
    }

    #[tokio::test]
    async fn writes_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/out.bin");
        let seen = Mutex::new(Vec::new());
        let report = |done: u64, total: u64| seen.lock().unwrap().push((done, total));

        let task = stream_to_file(
            "https://x/file",
            &dest,
            DownloadResponse {
                content_type: Some("audio/mp4".into()),
                content_length: Some(6),
                body: stream::iter(ok_chunks(&["ab", "cd", "ef"])),
            },
            Duration::from_secs(5),
            Some(&report),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"abcdef");
        assert_eq!(task.bytes_transferred, 6);
        assert!(!task.temp_path.exists());
        assert_eq!(*seen.lock().unwrap(), vec![(2, 6), (4, 6), (6, 6)]);
    }

    #[tokio::test]
    async fn html_that_is_not_a_login_page_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("page.html");
        stream_to_file(
            "https://x/page",
            &dest,
            DownloadResponse {
                content_type: Some("text/html; charset=utf-8".into()),
                content_length: None,
                body: stream::iter(ok_chunks(&["<p>report</p>", "<p>more</p>"])),
            },
            Duration::from_secs(5),
            None,
        )
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "<p>report</p><p>more</p>"
        );
    }

    #[tokio::test]
    async fn stalled_stream_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("stalled.bin");
        let body = stream::iter(ok_chunks(&["a"])).chain(stream::pending());
        let err = stream_to_file(
            "https://x/slow",
            &dest,
            DownloadResponse {
                content_type: None,
                content_length: None,
                body: Box::pin(body),
            },
            Duration::from_millis(20),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::DownloadFailure { .. }));
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("report.md");
        std::fs::write(&dest, "old").unwrap();
        write_atomic(&dest, b"# new").unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "# new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
