use serde_json::{Value, json};
use tracing::{debug, info};

use super::{NotebookClient, ROOT_PATH, notebook_path, sources_nested, sources_simple};
use crate::artifacts::mind_map::mind_map_stamp;
use crate::artifacts::{
    ArtifactKind, ArtifactRecord, ArtifactStatus, MindMap, StudioArtifact, parse_mind_maps,
    parse_records,
};
use crate::error::{Error, Result};
use crate::nav;
use crate::retry::{RetryPolicy, classify_result, retry_with_backoff};
use crate::rpc::ids;
use crate::types::{
    AudioFormat, AudioLength, Difficulty, GeneratedMindMap, InfographicDetail,
    InfographicOrientation, ReportFormat, SlideDeckFormat, SlideDeckLength, StudioCreated,
    VideoFormat, VideoStyle,
};

/// Filter that hides suggested (not yet requested) artifacts.
const STUDIO_FILTER: &str = r#"NOT artifact.status = "ARTIFACT_STATUS_SUGGESTED""#;

/// Flashcard count code; the service offers no other choice yet.
const FLASHCARD_COUNT_DEFAULT: i64 = 2;

/// What to generate. Each kind carries its options at its own offset of
/// the creation record.
#[derive(Debug, Clone, PartialEq)]
pub enum StudioRequest {
    Audio {
        format: AudioFormat,
        length: AudioLength,
        language: String,
        focus: String,
    },
    Video {
        format: VideoFormat,
        style: VideoStyle,
        language: String,
        focus: String,
    },
    Report {
        format: ReportFormat,
        language: String,
    },
    Flashcards {
        difficulty: Difficulty,
    },
    Quiz {
        question_count: i64,
        difficulty: Difficulty,
    },
    Infographic {
        orientation: InfographicOrientation,
        detail: InfographicDetail,
        language: String,
        focus: String,
    },
    SlideDeck {
        format: SlideDeckFormat,
        length: SlideDeckLength,
        language: String,
        focus: String,
    },
    DataTable {
        description: String,
        language: String,
    },
}

fn focus_or_null(focus: &str) -> Value {
    if focus.is_empty() {
        Value::Null
    } else {
        Value::from(focus)
    }
}

impl StudioRequest {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Audio { .. } => ArtifactKind::Audio,
            Self::Video { .. } => ArtifactKind::Video,
            Self::Report { .. } => ArtifactKind::Report,
            Self::Flashcards { .. } | Self::Quiz { .. } => ArtifactKind::Flashcards,
            Self::Infographic { .. } => ArtifactKind::Infographic,
            Self::SlideDeck { .. } => ArtifactKind::SlideDeck,
            Self::DataTable { .. } => ArtifactKind::DataTable,
        }
    }

    /// Offset of the options inside the creation record.
    fn options_offset(&self) -> usize {
        match self {
            Self::Audio { .. } => 6,
            Self::Report { .. } => 7,
            Self::Video { .. } => 8,
            Self::Flashcards { .. } | Self::Quiz { .. } => 9,
            Self::Infographic { .. } => 14,
            Self::SlideDeck { .. } => 16,
            Self::DataTable { .. } => 18,
        }
    }

    fn options(&self, source_ids: &[String]) -> Value {
        let simple = sources_simple(source_ids);
        match self {
            Self::Audio {
                format,
                length,
                language,
                focus,
            } => json!([null, [focus, length.code(), null, simple, language, null, format.code()]]),
            Self::Video {
                format,
                style,
                language,
                focus,
            } => json!([null, null, [simple, language, focus, null, format.code(), style.code()]]),
            Self::Report { format, language } => json!([
                null,
                [format.title(), format.description(), null, simple, language, format.prompt(), null, true]
            ]),
            Self::Flashcards { difficulty } => json!([
                null,
                [1, null, null, null, null, null, [difficulty.code(), FLASHCARD_COUNT_DEFAULT]]
            ]),
            Self::Quiz {
                question_count,
                difficulty,
            } => json!([
                null,
                [2, null, null, null, null, null, null, [question_count, difficulty.code()]]
            ]),
            Self::Infographic {
                orientation,
                detail,
                language,
                focus,
            } => json!([[focus_or_null(focus), language, null, orientation.code(), detail.code()]]),
            Self::SlideDeck {
                format,
                length,
                language,
                focus,
            } => json!([[focus_or_null(focus), language, format.code(), length.code()]]),
            Self::DataTable {
                description,
                language,
            } => json!([null, [description, language]]),
        }
    }

    /// `[null, null, type, sources, null..., options@offset]`
    pub fn content(&self, source_ids: &[String]) -> Value {
        let mut content = vec![Value::Null; self.options_offset() + 1];
        content[2] = json!(self.kind().type_code());
        content[3] = sources_nested(source_ids);
        content[self.options_offset()] = self.options(source_ids);
        Value::Array(content)
    }
}

impl NotebookClient {
    /// Ask the service to generate an artifact from `source_ids`.
    pub async fn create_studio(
        &self,
        notebook_id: &str,
        source_ids: &[String],
        request: &StudioRequest,
    ) -> Result<StudioCreated> {
        let kind = request.kind();
        let params = json!([[2], notebook_id, request.content(source_ids)]);
        let result = self
            .rpc(ids::CREATE_STUDIO, params, &notebook_path(notebook_id))
            .await?;
        let artifact_id = result
            .as_ref()
            .and_then(|r| nav::text_at(r, &[0, 0]))
            .ok_or_else(|| Error::structure(kind.as_str(), "[0][0]", "no artifact id in response"))?;
        let status = ArtifactStatus::from_code(result.as_ref().and_then(|r| nav::i64_at(r, &[0, 4])));
        info!(notebook_id, artifact_id, %kind, status = status.as_str(), "studio generation requested");
        Ok(StudioCreated {
            artifact_id: artifact_id.to_string(),
            notebook_id: notebook_id.to_string(),
            kind,
            status,
        })
    }

    /// Raw studio records of a notebook.
    pub async fn studio_records(&self, notebook_id: &str) -> Result<Vec<ArtifactRecord>> {
        let result = self
            .rpc(
                ids::POLL_STUDIO,
                json!([[2], notebook_id, STUDIO_FILTER]),
                &notebook_path(notebook_id),
            )
            .await?;
        Ok(result.as_ref().map(parse_records).unwrap_or_default())
    }

    /// Every studio artifact with its kind-specific fields decoded.
    pub async fn studio_status(&self, notebook_id: &str) -> Result<Vec<StudioArtifact>> {
        let records = self.studio_records(notebook_id).await?;
        Ok(records.iter().map(StudioArtifact::from_record).collect())
    }

    /// Poll until `artifact_id` completes or `policy` runs out of attempts.
    pub async fn wait_for_artifact(
        &self,
        notebook_id: &str,
        artifact_id: &str,
        policy: &RetryPolicy,
    ) -> Result<StudioArtifact> {
        retry_with_backoff(
            policy,
            |attempt| async move {
                debug!(artifact_id, attempt, "polling studio");
                let records = self.studio_records(notebook_id).await?;
                let record = records
                    .iter()
                    .find(|r| r.id == artifact_id)
                    .ok_or_else(|| Error::ArtifactNotFound {
                        kind: "artifact".to_string(),
                        id: artifact_id.to_string(),
                    })?;
                if !record.is_completed() {
                    let kind = record.kind().map(ArtifactKind::as_str).unwrap_or("artifact");
                    return Err(Error::not_ready(kind, Some(artifact_id)));
                }
                Ok(StudioArtifact::from_record(record))
            },
            classify_result,
            |retry| debug!(artifact_id, delay_ms = retry.delay.as_millis() as u64, "artifact not ready"),
        )
        .await
    }

    /// Delete a studio artifact; with a notebook id, ids that are not studio
    /// artifacts are tried as mind maps.
    pub async fn delete_studio_artifact(
        &self,
        artifact_id: &str,
        notebook_id: Option<&str>,
    ) -> Result<bool> {
        match self
            .rpc(ids::DELETE_STUDIO, json!([[2], artifact_id]), ROOT_PATH)
            .await
        {
            Ok(Some(_)) => return Ok(true),
            Ok(None) => {}
            Err(e) if e.needs_reauth() => return Err(e),
            Err(e) => debug!(artifact_id, error = %e, "studio delete failed, trying mind map"),
        }
        match notebook_id {
            Some(notebook_id) => self.delete_mind_map(notebook_id, artifact_id).await,
            None => Ok(false),
        }
    }

    /// Step one of a mind map: generate the tree from sources.
    pub async fn generate_mind_map(&self, source_ids: &[String]) -> Result<Option<GeneratedMindMap>> {
        let params = json!([
            sources_nested(source_ids),
            null,
            null,
            null,
            null,
            ["interactive_mindmap", [["[CONTEXT]", ""]], ""],
            null,
            [2, null, [1]]
        ]);
        let result = self.rpc(ids::GENERATE_MIND_MAP, params, ROOT_PATH).await?;
        Ok(result.as_ref().and_then(parse_generated))
    }

    /// Step two: store a generated tree in the notebook.
    pub async fn save_mind_map(
        &self,
        notebook_id: &str,
        json: &str,
        source_ids: &[String],
        title: &str,
    ) -> Result<Option<MindMap>> {
        let params = json!([
            notebook_id,
            json,
            [2, null, null, 5, sources_simple(source_ids)],
            null,
            title
        ]);
        let result = self
            .rpc(ids::SAVE_MIND_MAP, params, &notebook_path(notebook_id))
            .await?;
        Ok(result.as_ref().and_then(|r| {
            let saved = match nav::get(r, &[0]) {
                Some(inner @ Value::Array(_)) => inner,
                _ => r,
            };
            Some(MindMap {
                id: nav::text_at(saved, &[0])?.to_string(),
                title: nav::str_at(saved, &[4]).unwrap_or(title).to_string(),
                json: nav::str_at(saved, &[1]).map(str::to_string),
                created_at: None,
            })
        }))
    }

    pub async fn list_mind_maps(&self, notebook_id: &str) -> Result<Vec<MindMap>> {
        let result = self.mind_map_listing(notebook_id).await?;
        Ok(result.as_ref().map(parse_mind_maps).unwrap_or_default())
    }

    pub(crate) async fn mind_map_listing(&self, notebook_id: &str) -> Result<Option<Value>> {
        self.rpc(
            ids::LIST_MIND_MAPS,
            json!([notebook_id]),
            &notebook_path(notebook_id),
        )
        .await
    }

    /// Delete by id, then purge the listing entry with its stamp so the
    /// map does not linger as a tombstone.
    pub async fn delete_mind_map(&self, notebook_id: &str, mind_map_id: &str) -> Result<bool> {
        let path = notebook_path(notebook_id);
        let listing = self.mind_map_listing(notebook_id).await?;
        let stamp = listing.as_ref().and_then(|l| mind_map_stamp(l, mind_map_id));

        self.rpc(
            ids::DELETE_MIND_MAP,
            json!([notebook_id, null, [mind_map_id], [2]]),
            &path,
        )
        .await?;
        if let Some(stamp) = stamp {
            self.rpc(ids::LIST_MIND_MAPS, json!([notebook_id, null, stamp, [2]]), &path)
                .await?;
        }
        Ok(true)
    }

    /// HTML of an interactive (quiz or flashcards) artifact.
    pub async fn get_interactive_html(
        &self,
        notebook_id: &str,
        artifact_id: &str,
    ) -> Result<Option<String>> {
        let result = self
            .rpc(
                ids::GET_INTERACTIVE_HTML,
                json!([artifact_id]),
                &notebook_path(notebook_id),
            )
            .await?;
        Ok(result
            .as_ref()
            .and_then(|r| nav::text_at(r, &[0, 9, 0]))
            .map(str::to_string))
    }
}

/// `[[json, null, [generation_id]]]`
fn parse_generated(result: &Value) -> Option<GeneratedMindMap> {
    let inner = match nav::get(result, &[0]) {
        Some(inner @ Value::Array(_)) => inner,
        _ => result,
    };
    Some(GeneratedMindMap {
        json: nav::str_at(inner, &[0])?.to_string(),
        generation_id: nav::str_at(inner, &[2, 0]).map(str::to_string),
    })
}
