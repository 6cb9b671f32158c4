//! Artifact downloads. Media goes through the streaming pipeline; text
//! kinds are rendered in memory and written atomically.

use std::path::Path;

use tracing::info;

use super::NotebookClient;
use crate::artifacts::{
    ArtifactDetails, ArtifactKind, ArtifactRecord, InteractiveFormat, extract_app_data,
    format_interactive, media_path, parse_mind_maps,
};
use crate::download::{DownloadTask, Progress, fetch_to_file, write_atomic};
use crate::error::{Error, Result};
use crate::nav;

const MIND_MAP: &str = "mind_map";

/// Pick the artifact to download: the requested id when given, otherwise
/// the first completed artifact of `kind`.
pub fn select_completed<'a>(
    records: &'a [ArtifactRecord],
    kind: ArtifactKind,
    artifact_id: Option<&str>,
) -> Result<&'a ArtifactRecord> {
    let mut of_kind = records.iter().filter(|r| r.kind() == Some(kind));
    match artifact_id {
        Some(id) => match of_kind.find(|r| r.id == id) {
            Some(record) if record.is_completed() => Ok(record),
            Some(_) => Err(Error::not_ready(kind.as_str(), Some(id))),
            None => Err(Error::ArtifactNotFound {
                kind: kind.as_str().to_string(),
                id: id.to_string(),
            }),
        },
        None => of_kind
            .find(|r| r.is_completed())
            .ok_or_else(|| Error::not_ready(kind.as_str(), None)),
    }
}

impl NotebookClient {
    async fn completed_record(
        &self,
        notebook_id: &str,
        kind: ArtifactKind,
        artifact_id: Option<&str>,
    ) -> Result<ArtifactRecord> {
        let records = self.studio_records(notebook_id).await?;
        select_completed(&records, kind, artifact_id).cloned()
    }

    /// Stream a media artifact (audio, video, infographic or slide deck)
    /// to `destination`.
    pub async fn download_media(
        &self,
        notebook_id: &str,
        kind: ArtifactKind,
        destination: &Path,
        artifact_id: Option<&str>,
        progress: Option<Progress<'_>>,
    ) -> Result<DownloadTask> {
        let record = self.completed_record(notebook_id, kind, artifact_id).await?;
        let details = record.details();
        let Some(url) = details.download_url() else {
            let path = media_path(kind)
                .map(nav::format_path)
                .unwrap_or_else(|| "[2]".to_string());
            return Err(Error::structure(
                kind.as_str(),
                path,
                format!("no media URL in {}", record.id),
            ));
        };
        let cookie_header = self.credentials().cookie_header();
        fetch_to_file(
            &self.http,
            url,
            &cookie_header,
            &self.config.user_agent,
            destination,
            self.config.timeouts.read(),
            progress,
        )
        .await
    }

    pub async fn download_audio(
        &self,
        notebook_id: &str,
        destination: &Path,
        artifact_id: Option<&str>,
        progress: Option<Progress<'_>>,
    ) -> Result<DownloadTask> {
        self.download_media(notebook_id, ArtifactKind::Audio, destination, artifact_id, progress)
            .await
    }

    pub async fn download_video(
        &self,
        notebook_id: &str,
        destination: &Path,
        artifact_id: Option<&str>,
        progress: Option<Progress<'_>>,
    ) -> Result<DownloadTask> {
        self.download_media(notebook_id, ArtifactKind::Video, destination, artifact_id, progress)
            .await
    }

    pub async fn download_infographic(
        &self,
        notebook_id: &str,
        destination: &Path,
        artifact_id: Option<&str>,
        progress: Option<Progress<'_>>,
    ) -> Result<DownloadTask> {
        self.download_media(
            notebook_id,
            ArtifactKind::Infographic,
            destination,
            artifact_id,
            progress,
        )
        .await
    }

    pub async fn download_slide_deck(
        &self,
        notebook_id: &str,
        destination: &Path,
        artifact_id: Option<&str>,
        progress: Option<Progress<'_>>,
    ) -> Result<DownloadTask> {
        self.download_media(
            notebook_id,
            ArtifactKind::SlideDeck,
            destination,
            artifact_id,
            progress,
        )
        .await
    }

    /// Write a report's markdown to `destination`.
    pub async fn download_report(
        &self,
        notebook_id: &str,
        destination: &Path,
        artifact_id: Option<&str>,
    ) -> Result<()> {
        let record = self
            .completed_record(notebook_id, ArtifactKind::Report, artifact_id)
            .await?;
        let ArtifactDetails::Report {
            markdown: Some(markdown),
        } = record.details()
        else {
            return Err(Error::structure("report", "[7]", "no markdown content"));
        };
        write_atomic(destination, markdown.as_bytes())?;
        info!(notebook_id, artifact_id = %record.id, destination = %destination.display(), "report saved");
        Ok(())
    }

    /// Write a data table as CSV.
    pub async fn download_data_table(
        &self,
        notebook_id: &str,
        destination: &Path,
        artifact_id: Option<&str>,
    ) -> Result<()> {
        let record = self
            .completed_record(notebook_id, ArtifactKind::DataTable, artifact_id)
            .await?;
        let table = record.data_table()?;
        write_atomic(destination, table.to_csv().as_bytes())?;
        info!(
            notebook_id,
            artifact_id = %record.id,
            rows = table.rows.len(),
            destination = %destination.display(),
            "data table saved"
        );
        Ok(())
    }

    /// Write a mind map's tree as indented JSON.
    pub async fn download_mind_map(
        &self,
        notebook_id: &str,
        destination: &Path,
        mind_map_id: Option<&str>,
    ) -> Result<()> {
        let listing = self.mind_map_listing(notebook_id).await?;
        let maps = listing.as_ref().map(parse_mind_maps).unwrap_or_default();
        let map = match mind_map_id {
            Some(id) => maps.iter().find(|m| m.id == id).ok_or_else(|| {
                Error::ArtifactNotFound {
                    kind: MIND_MAP.to_string(),
                    id: id.to_string(),
                }
            })?,
            None => maps.first().ok_or_else(|| Error::not_ready(MIND_MAP, None))?,
        };
        write_atomic(destination, map.pretty_json()?.as_bytes())?;
        info!(notebook_id, mind_map_id = %map.id, destination = %destination.display(), "mind map saved");
        Ok(())
    }

    pub async fn download_quiz(
        &self,
        notebook_id: &str,
        destination: &Path,
        artifact_id: Option<&str>,
        format: InteractiveFormat,
    ) -> Result<()> {
        self.download_interactive(notebook_id, destination, artifact_id, format, true)
            .await
    }

    pub async fn download_flashcards(
        &self,
        notebook_id: &str,
        destination: &Path,
        artifact_id: Option<&str>,
        format: InteractiveFormat,
    ) -> Result<()> {
        self.download_interactive(notebook_id, destination, artifact_id, format, false)
            .await
    }

    async fn download_interactive(
        &self,
        notebook_id: &str,
        destination: &Path,
        artifact_id: Option<&str>,
        format: InteractiveFormat,
        is_quiz: bool,
    ) -> Result<()> {
        let label = if is_quiz { "quiz" } else { "flashcards" };
        let record = self
            .completed_record(notebook_id, ArtifactKind::Flashcards, artifact_id)
            .await?;
        let html = self
            .get_interactive_html(notebook_id, &record.id)
            .await?
            .ok_or_else(|| Error::DownloadFailure {
                url: format!("artifact:{}", record.id),
                detail: format!("no HTML content for {label}"),
            })?;
        let app_data = extract_app_data(&html)?;
        let title = if !record.title.is_empty() {
            record.title.as_str()
        } else if is_quiz {
            "Untitled Quiz"
        } else {
            "Untitled Flashcards"
        };
        let content = format_interactive(&app_data, title, format, &html, is_quiz)?;
        write_atomic(destination, content.as_bytes())?;
        info!(notebook_id, artifact_id = %record.id, kind = label, ?format, "interactive artifact saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, type_code: i64, status: i64) -> ArtifactRecord {
        ArtifactRecord::from_raw(&json!([id, "T", type_code, [], status])).unwrap()
    }

    #[test]
    fn first_completed_of_kind() {
        let records = vec![
            record("a1", 1, 1),
            record("v1", 3, 3),
            record("a2", 1, 3),
            record("a3", 1, 3),
        ];
        let chosen = select_completed(&records, ArtifactKind::Audio, None).unwrap();
        assert_eq!(chosen.id, "a2");
    }

    #[test]
    fn explicit_id() {
        let records = vec![record("a1", 1, 1), record("a2", 1, 3)];
        let chosen = select_completed(&records, ArtifactKind::Audio, Some("a2")).unwrap();
        assert_eq!(chosen.id, "a2");

        let err = select_completed(&records, ArtifactKind::Audio, Some("a1")).unwrap_err();
        assert!(matches!(err, Error::ArtifactNotReady { id: Some(ref i), .. } if i == "a1"));

        let err = select_completed(&records, ArtifactKind::Audio, Some("zz")).unwrap_err();
        assert!(matches!(err, Error::ArtifactNotFound { .. }));

        // An id of another kind is not a candidate.
        let records = vec![record("v1", 3, 3)];
        let err = select_completed(&records, ArtifactKind::Audio, Some("v1")).unwrap_err();
        assert!(matches!(err, Error::ArtifactNotFound { .. }));
    }

    #[test]
    fn nothing_completed() {
        let records = vec![record("a1", 1, 1)];
        let err = select_completed(&records, ArtifactKind::Audio, None).unwrap_err();
        assert_eq!(err.to_string(), "audio is not ready");
        assert!(select_completed(&[], ArtifactKind::Report, None).is_err());
    }
}
