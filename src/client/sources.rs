use std::path::Path;

use serde_json::{Value, json};
use tracing::{info, warn};

use super::notebooks::{notebook_record, project_options};
use super::{NotebookClient, ROOT_PATH, notebook_path};
use crate::auth::FileUploader;
use crate::error::{Error, Result};
use crate::nav;
use crate::rpc::ids;
use crate::types::{
    SourceAddOutcome, SourceContent, SourceDetail, SourceGuide, SourceRef, SourceType,
    SyncedSource, source_type_name,
};

/// What is being added; each variant has its own positional shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NewSource<'a> {
    Url(&'a str),
    Text { title: &'a str, text: &'a str },
    Drive {
        document_id: &'a str,
        title: &'a str,
        mime_type: &'a str,
    },
}

impl NewSource<'_> {
    fn is_youtube(url: &str) -> bool {
        let lower = url.to_lowercase();
        lower.contains("youtube.com") || lower.contains("youtu.be")
    }

    fn to_params(&self) -> Value {
        match self {
            Self::Url(url) if Self::is_youtube(url) => {
                json!([null, null, null, null, null, null, null, [url], null, null, 1])
            }
            Self::Url(url) => json!([null, null, [url], null, null, null, null, null, null, null, 1]),
            Self::Text { title, text } => {
                json!([null, [title, text], null, 2, null, null, null, null, null, null, 1])
            }
            Self::Drive {
                document_id,
                title,
                mime_type,
            } => json!([
                [document_id, mime_type, 1, title],
                null, null, null, null, null, null, null, null, null,
                1
            ]),
        }
    }

    fn fallback_title(&self) -> &str {
        match self {
            Self::Url(_) => "Untitled",
            Self::Text { title, .. } | Self::Drive { title, .. } => title,
        }
    }
}

impl NotebookClient {
    /// Summary and keywords the service generated for one source.
    pub async fn get_source_guide(&self, source_id: &str) -> Result<SourceGuide> {
        let result = self
            .rpc(ids::GET_SOURCE_GUIDE, json!([[[[source_id]]]]), ROOT_PATH)
            .await?;
        Ok(result.as_ref().map(parse_source_guide).unwrap_or_default())
    }

    /// The indexed text of a source, with title, type and URL.
    pub async fn get_source_fulltext(&self, source_id: &str) -> Result<SourceContent> {
        let result = self
            .rpc(ids::GET_SOURCE, json!([[source_id], [2], [2]]), ROOT_PATH)
            .await?;
        Ok(parse_source_content(result.as_ref().unwrap_or(&Value::Null)))
    }

    /// `Some(true)` when a Drive source matches its document, `None` when
    /// the service did not say.
    pub async fn check_source_freshness(&self, source_id: &str) -> Result<Option<bool>> {
        let result = self
            .rpc(ids::CHECK_FRESHNESS, json!([null, [source_id], [2]]), ROOT_PATH)
            .await?;
        Ok(result
            .as_ref()
            .and_then(|r| nav::get(r, &[0, 1]))
            .and_then(Value::as_bool))
    }

    pub async fn sync_drive_source(&self, source_id: &str) -> Result<Option<SyncedSource>> {
        let result = self
            .rpc(ids::SYNC_DRIVE, json!([null, [source_id], [2]]), ROOT_PATH)
            .await?;
        Ok(result.as_ref().and_then(parse_synced))
    }

    /// Permanently remove a source.
    pub async fn delete_source(&self, source_id: &str) -> Result<bool> {
        let result = self
            .rpc(ids::DELETE_SOURCE, json!([[[source_id]], [2]]), ROOT_PATH)
            .await?;
        Ok(result.is_some())
    }

    /// Every source of a notebook with its type, URL and Drive id.
    pub async fn list_sources(&self, notebook_id: &str) -> Result<Vec<SourceDetail>> {
        let notebook = self.get_notebook(notebook_id).await?;
        Ok(notebook.as_ref().map(parse_source_details).unwrap_or_default())
    }

    /// Add a web page or YouTube video.
    pub async fn add_url_source(&self, notebook_id: &str, url: &str) -> Result<SourceAddOutcome> {
        self.add_source(notebook_id, NewSource::Url(url)).await
    }

    pub async fn add_text_source(
        &self,
        notebook_id: &str,
        text: &str,
        title: &str,
    ) -> Result<SourceAddOutcome> {
        self.add_source(notebook_id, NewSource::Text { title, text })
            .await
    }

    pub async fn add_drive_source(
        &self,
        notebook_id: &str,
        document_id: &str,
        title: &str,
        mime_type: &str,
    ) -> Result<SourceAddOutcome> {
        self.add_source(
            notebook_id,
            NewSource::Drive {
                document_id,
                title,
                mime_type,
            },
        )
        .await
    }

    async fn add_source(&self, notebook_id: &str, source: NewSource<'_>) -> Result<SourceAddOutcome> {
        let params = json!([[source.to_params()], notebook_id, [2], project_options()]);
        let timeout = self.config.timeouts.source_add();
        let result = match self
            .call(ids::ADD_SOURCE, params, &notebook_path(notebook_id), timeout)
            .await
        {
            Ok(result) => result,
            Err(Error::Timeout(after)) => {
                warn!(notebook_id, secs = after.as_secs(), "source add timed out, may still complete");
                return Ok(SourceAddOutcome::TimedOut {
                    after_secs: after.as_secs(),
                });
            }
            Err(e) => return Err(e),
        };
        let added = result
            .as_ref()
            .and_then(|r| parse_added_source(r, source.fallback_title()))
            .ok_or_else(|| Error::structure("source", "[0][0][0][0]", "no source id in response"))?;
        info!(notebook_id, source_id = %added.id, "source added");
        Ok(SourceAddOutcome::Added(added))
    }

    /// Hand a local file to the upload automation.
    pub async fn upload_file(
        &self,
        notebook_id: &str,
        file: &Path,
        uploader: &dyn FileUploader,
    ) -> Result<bool> {
        if !file.is_file() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a readable file",
                file.display()
            )));
        }
        uploader.upload(notebook_id, file).await
    }
}

pub(crate) fn parse_source_guide(result: &Value) -> SourceGuide {
    SourceGuide {
        summary: nav::str_at(result, &[0, 0, 1, 0])
            .unwrap_or_default()
            .to_string(),
        keywords: nav::array_at(result, &[0, 0, 2, 0])
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    }
}

/// Every non-empty string under `value`, depth first.
fn collect_text<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) if !s.is_empty() => out.push(s),
        Value::Array(items) => items.iter().for_each(|item| collect_text(item, out)),
        _ => {}
    }
}

/// `[[[id], title, meta], null, null, [[block, ...]]]` where each block is
/// `[start, end, content...]`.
pub(crate) fn parse_source_content(result: &Value) -> SourceContent {
    let mut parts = Vec::new();
    for block in nav::array_at(result, &[3, 0]).into_iter().flatten() {
        if block.is_array() {
            collect_text(block, &mut parts);
        }
    }
    let content = parts.join("\n\n");
    SourceContent {
        char_count: content.chars().count(),
        content,
        title: nav::str_at(result, &[0, 1]).unwrap_or_default().to_string(),
        source_type: match nav::get(result, &[0, 2, 4]) {
            Some(code) => source_type_name(code.as_i64()),
            None => "",
        },
        url: nav::str_at(result, &[0, 2, 7, 0]).map(str::to_string),
    }
}

fn parse_synced(result: &Value) -> Option<SyncedSource> {
    let source = nav::get(result, &[0]).filter(|s| s.as_array().is_some_and(|a| a.len() >= 3))?;
    Some(SyncedSource {
        id: nav::str_at(source, &[0, 0]).map(str::to_string),
        title: nav::str_at(source, &[1]).unwrap_or("Unknown").to_string(),
        synced_at: nav::i64_at(source, &[2, 3, 1, 0]),
    })
}

/// Sources of a get-notebook result: `[[id], title, meta, ...]` with the
/// type at `meta[4]`, Drive id at `meta[0][0]` and URL at `meta[7][0]`.
pub(crate) fn parse_source_details(result: &Value) -> Vec<SourceDetail> {
    nav::array_at(notebook_record(result), &[1])
        .into_iter()
        .flatten()
        .filter(|src| src.as_array().is_some_and(|a| a.len() >= 3))
        .filter_map(|src| {
            let id = nav::str_at(src, &[0, 0])?.to_string();
            let source_type = nav::i64_at(src, &[2, 4]);
            let drive_doc_id = nav::str_at(src, &[2, 0, 0]).map(str::to_string);
            let can_sync = drive_doc_id.is_some()
                && source_type
                    .and_then(SourceType::from_code)
                    .is_some_and(SourceType::is_drive_document);
            Some(SourceDetail {
                id,
                title: nav::str_at(src, &[1]).unwrap_or("Untitled").to_string(),
                source_type,
                source_type_name: source_type_name(source_type),
                url: nav::str_at(src, &[2, 7, 0]).map(str::to_string),
                drive_doc_id,
                can_sync,
            })
        })
        .collect()
}

/// `[[[[id], title, ...]]]` from an add-source call.
fn parse_added_source(result: &Value, fallback_title: &str) -> Option<SourceRef> {
    let source = nav::get(result, &[0, 0])?;
    Some(SourceRef {
        id: nav::text_at(source, &[0, 0])?.to_string(),
        title: nav::str_at(source, &[1])
            .unwrap_or(fallback_title)
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_source_shapes() {
        let yt = NewSource::Url("https://www.YouTube.com/watch?v=x").to_params();
        assert_eq!(yt[7], json!(["https://www.YouTube.com/watch?v=x"]));
        assert_eq!(yt[10], json!(1));
        let web = NewSource::Url("https://example.com").to_params();
        assert_eq!(web[2], json!(["https://example.com"]));
        assert_eq!(web.as_array().unwrap().len(), 11);
        let text = NewSource::Text {
            title: "Notes",
            text: "body",
        }
        .to_params();
        assert_eq!(text[1], json!(["Notes", "body"]));
        assert_eq!(text[3], json!(2));
        let drive = NewSource::Drive {
            document_id: "doc",
            title: "Plan",
            mime_type: "application/vnd.google-apps.document",
        }
        .to_params();
        assert_eq!(drive[0], json!(["doc", "application/vnd.google-apps.document", 1, "Plan"]));
        assert_eq!(drive.as_array().unwrap().len(), 11);
    }

    #[test]
    fn fulltext_collects_nested_strings() {
        let result = json!([
            [["s1"], "Essay", [null, null, null, null, 5, null, null, ["https://e.com"]]],
            null,
            null,
            [[[0, 10, [["Intro", ""], [null, "Body"]]], [10, 20, "Tail"], "stray"]]
        ]);
        let content = parse_source_content(&result);
        assert_eq!(content.content, "Intro\n\nBody\n\nTail");
        assert_eq!(content.char_count, 17);
        assert_eq!(content.title, "Essay");
        assert_eq!(content.source_type, "web_page");
        assert_eq!(content.url.as_deref(), Some("https://e.com"));

        let empty = parse_source_content(&json!(null));
        assert_eq!(empty.content, "");
        assert_eq!(empty.source_type, "");
    }

    #[test]
    fn guide() {
        let result = json!([[[null, ["A summary."], [["rivers", "deltas"]]]]]);
        let guide = parse_source_guide(&result);
        assert_eq!(guide.summary, "A summary.");
        assert_eq!(guide.keywords, vec!["rivers", "deltas"]);
    }

    #[test]
    fn source_details_and_sync_flag() {
        let result = json!([[
            "Notebook",
            [
                [["s1"], "Doc", [["drive-1"], null, null, null, 1]],
                [["s2"], "Site", [null, null, null, null, 5, null, null, ["https://e.com"]]],
                [["s3"], "PDF", [["drive-3"], null, null, null, 3]],
                [["s4"], "short"]
            ],
            "nb"
        ]]);
        let details = parse_source_details(&result);
        assert_eq!(details.len(), 3);
        assert!(details[0].can_sync);
        assert_eq!(details[0].source_type_name, "google_docs");
        assert!(!details[1].can_sync);
        assert_eq!(details[1].url.as_deref(), Some("https://e.com"));
        assert!(!details[2].can_sync);
    }

    #[test]
    fn sync_and_add_results() {
        let synced = parse_synced(&json!([[["s1"], "Doc", [null, null, null, [null, [1767323045]]]]]))
            .unwrap();
        assert_eq!(synced.id.as_deref(), Some("s1"));
        assert_eq!(synced.synced_at, Some(1_767_323_045));

        let added = parse_added_source(&json!([[[["new-id"], "Title"]]]), "x").unwrap();
        assert_eq!(added.id, "new-id");
        assert!(parse_added_source(&json!([[[[""], "Title"]]]), "x").is_none());
    }
}
