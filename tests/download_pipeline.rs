//! Download pipeline: atomic commit, cleanup on failure, login sniffing.

use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream;
use notebooklm_rpc::Error;
use notebooklm_rpc::download::{DownloadResponse, stream_to_file, write_atomic};

type Chunk = Result<Bytes, String>;

fn response(content_type: &str, chunks: Vec<Chunk>) -> DownloadResponse<stream::Iter<std::vec::IntoIter<Chunk>>> {
    DownloadResponse {
        content_type: Some(content_type.to_string()),
        content_length: None,
        body: stream::iter(chunks),
    }
}

fn entries(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_failure_mid_stream_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("audio.mp4");
    let chunks = vec![
        Ok(Bytes::from_static(b"one")),
        Ok(Bytes::from_static(b"two")),
        Ok(Bytes::from_static(b"three")),
        Err("connection reset".to_string()),
        Ok(Bytes::from_static(b"five")),
    ];
    let err = stream_to_file(
        "https://media.example/a",
        &dest,
        response("audio/mp4", chunks),
        Duration::from_secs(5),
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::DownloadFailure { .. }), "{err}");
    assert!(!dest.exists());
    assert!(entries(dir.path()).is_empty(), "{:?}", entries(dir.path()));
}

#[tokio::test]
async fn test_unwritable_destination_is_download_failure() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let dest = blocker.join("out.bin");

    let err = stream_to_file(
        "https://media.example/b",
        &dest,
        response("audio/mp4", vec![Ok(Bytes::from_static(b"data"))]),
        Duration::from_secs(5),
        None,
    )
    .await
    .unwrap_err();

    match err {
        Error::DownloadFailure { url, .. } => assert_eq!(url, "https://media.example/b"),
        other => panic!("expected download failure, got {other}"),
    }
    assert_eq!(std::fs::read(&blocker).unwrap(), b"not a directory");
    assert_eq!(entries(dir.path()), vec!["blocker".to_string()]);
}

#[tokio::test]
async fn test_login_page_is_auth_error_with_no_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("video.mp4");
    let chunks = vec![
        Ok(Bytes::from_static(b"<!DOCTYPE html><html><title>Sign in - Accounts</title>")),
        Ok(Bytes::from_static(b"</html>")),
    ];
    let err = stream_to_file(
        "https://media.example/v",
        &dest,
        response("text/html; charset=utf-8", chunks),
        Duration::from_secs(5),
        None,
    )
    .await
    .unwrap_err();

    assert!(err.needs_reauth(), "{err}");
    assert!(!dest.exists());
    assert!(entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_success_commits_and_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("nested").join("slides.pdf");
    let seen = Mutex::new(Vec::new());
    let progress: &(dyn Fn(u64, u64) + Send + Sync) =
        &|done, total| seen.lock().unwrap().push((done, total));

    let mut response = response(
        "application/pdf",
        vec![Ok(Bytes::from_static(b"%PDF-")), Ok(Bytes::from_static(b"1.7"))],
    );
    response.content_length = Some(8);
    let task = stream_to_file(
        "https://media.example/s",
        &dest,
        response,
        Duration::from_secs(5),
        Some(progress),
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.7");
    assert_eq!(task.bytes_transferred, 8);
    assert!(!task.temp_path.exists());
    assert_eq!(*seen.lock().unwrap(), vec![(5, 8), (8, 8)]);
    assert_eq!(entries(&dir.path().join("nested")), vec!["slides.pdf"]);
}

#[test]
fn test_write_atomic_replaces_existing() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("report.md");
    std::fs::write(&dest, "old").unwrap();
    write_atomic(&dest, b"# New").unwrap();
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "# New");
    assert_eq!(entries(dir.path()), vec!["report.md"]);
}
