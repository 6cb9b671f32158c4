use serde_json::{Value, json};
use tracing::info;

use super::notebooks::parse_source_refs;
use super::{NotebookClient, notebook_path};
use crate::error::{Error, Result};
use crate::nav;
use crate::rpc::ids;
use crate::types::{
    ResearchMode, ResearchResultType, ResearchSource, ResearchSourceResult, ResearchStarted,
    ResearchStatus, ResearchTask, SourceRef,
};

/// `info[2]` of a polled task for deep research.
const DEEP_MODE_CODE: i64 = 5;

pub(crate) fn start_params(
    notebook_id: &str,
    query: &str,
    source: ResearchSource,
    mode: ResearchMode,
) -> Result<(&'static str, Value)> {
    match (mode, source) {
        (ResearchMode::Deep, ResearchSource::Drive) => Err(Error::InvalidArgument(
            "deep research only searches the web; use fast mode for Drive".to_string(),
        )),
        (ResearchMode::Fast, _) => Ok((
            ids::START_FAST_RESEARCH,
            json!([[query, source.code()], null, 1, notebook_id]),
        )),
        (ResearchMode::Deep, _) => Ok((
            ids::START_DEEP_RESEARCH,
            json!([null, [1], [query, source.code()], DEEP_MODE_CODE, notebook_id]),
        )),
    }
}

impl NotebookClient {
    /// Start discovering sources for `query`. Poll with
    /// [`poll_research`](Self::poll_research).
    pub async fn start_research(
        &self,
        notebook_id: &str,
        query: &str,
        source: ResearchSource,
        mode: ResearchMode,
    ) -> Result<Option<ResearchStarted>> {
        let (call_id, params) = start_params(notebook_id, query, source, mode)?;
        let result = self.rpc(call_id, params, &notebook_path(notebook_id)).await?;
        Ok(result.as_ref().and_then(|r| {
            Some(ResearchStarted {
                task_id: nav::text_at(r, &[0])?.to_string(),
                report_id: nav::str_at(r, &[1]).map(str::to_string),
                query: query.to_string(),
                source,
                mode,
            })
        }))
    }

    /// The newest research task, or the one with `task_id`. `None` when
    /// there is no research yet or the task is not listed.
    pub async fn poll_research(
        &self,
        notebook_id: &str,
        task_id: Option<&str>,
    ) -> Result<Option<ResearchTask>> {
        let result = self
            .rpc(
                ids::POLL_RESEARCH,
                json!([null, null, notebook_id]),
                &notebook_path(notebook_id),
            )
            .await?;
        let tasks = result.as_ref().map(parse_research_tasks).unwrap_or_default();
        Ok(match task_id {
            Some(wanted) => tasks.into_iter().find(|t| t.task_id == wanted),
            None => tasks.into_iter().next(),
        })
    }

    /// Import discovered sources. Deep-research reports and results without
    /// a URL are skipped.
    pub async fn import_research_sources(
        &self,
        notebook_id: &str,
        task_id: &str,
        sources: &[ResearchSourceResult],
    ) -> Result<Vec<SourceRef>> {
        let entries = import_entries(sources);
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let count = entries.len();
        let params = json!([null, [1], task_id, notebook_id, entries]);
        let result = self
            .call(
                ids::IMPORT_RESEARCH,
                params,
                &notebook_path(notebook_id),
                self.config.timeouts.import(),
            )
            .await?;
        let imported = result.as_ref().map(parse_imported).unwrap_or_default();
        info!(notebook_id, requested = count, imported = imported.len(), "research sources imported");
        Ok(imported)
    }
}

fn drive_document_id(url: &str) -> Option<&str> {
    let (_, rest) = url.rsplit_once("id=")?;
    Some(rest.split('&').next().unwrap_or(rest)).filter(|id| !id.is_empty())
}

pub(crate) fn import_entries(sources: &[ResearchSourceResult]) -> Vec<Value> {
    sources
        .iter()
        .filter(|s| s.result_type != ResearchResultType::DeepReport.code() && !s.url.is_empty())
        .map(|s| {
            let web = || {
                json!([null, null, [s.url, s.title], null, null, null, null, null, null, null, 2])
            };
            if s.result_type == ResearchResultType::Web.code() {
                return web();
            }
            match drive_document_id(&s.url) {
                Some(doc_id) => {
                    let mime = ResearchResultType::from_code(s.result_type)
                        .map(ResearchResultType::drive_mime)
                        .unwrap_or(crate::types::GOOGLE_DOC_MIME);
                    json!([
                        [doc_id, mime, 1, s.title],
                        null, null, null, null, null, null, null, null, null,
                        2
                    ])
                }
                None => web(),
            }
        })
        .collect()
}

/// `[[source, ...]]` or `[source, ...]` where a source is `[[id], title]`.
fn parse_imported(result: &Value) -> Vec<SourceRef> {
    let list = match nav::get(result, &[0, 0, 0]) {
        Some(Value::Array(_)) => &result[0],
        _ => result,
    };
    parse_source_refs(list)
}

/// Tasks of a poll result, newest first as the service lists them.
///
/// A task is `[task_id, info]` with `info[1] = [query, source]`,
/// `info[2]` the mode, `info[3] = [sources, summary?]` and `info[4]` the
/// status (2 or 6 once done). Timestamp entries in the same list are skipped.
pub(crate) fn parse_research_tasks(result: &Value) -> Vec<ResearchTask> {
    let list = match nav::get(result, &[0, 0]) {
        Some(Value::Array(_)) => &result[0],
        _ => result,
    };
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(parse_task)
        .collect()
}

fn parse_task(entry: &Value) -> Option<ResearchTask> {
    let task_id = nav::str_at(entry, &[0])?.to_string();
    let info = nav::get(entry, &[1]).filter(|i| i.as_array().is_some_and(|a| !a.is_empty()))?;

    let mut report = String::new();
    let sources = nav::array_at(info, &[3, 0])
        .into_iter()
        .flatten()
        .enumerate()
        .filter_map(|(index, src)| {
            let parsed = parse_found_source(index, src)?;
            if let Some(text) = nav::text_at(src, &[6, 0]).filter(|_| src[0].is_null()) {
                report = text.to_string();
            }
            Some(parsed)
        })
        .collect();

    let status = match nav::i64_at(info, &[4]) {
        Some(2) | Some(6) => ResearchStatus::Completed,
        _ => ResearchStatus::InProgress,
    };
    let source = match nav::i64_at(info, &[1, 1]) {
        Some(2) => ResearchSource::Drive,
        _ => ResearchSource::Web,
    };
    let mode = if nav::i64_at(info, &[2]) == Some(DEEP_MODE_CODE) {
        ResearchMode::Deep
    } else {
        ResearchMode::Fast
    };

    Some(ResearchTask {
        task_id,
        status,
        query: nav::str_at(info, &[1, 0]).unwrap_or_default().to_string(),
        source,
        mode,
        sources,
        summary: nav::str_at(info, &[3, 1]).unwrap_or_default().to_string(),
        report,
    })
}

/// Deep results are `[null, title, null, type, null, null, [report]]`,
/// fast results `[url, title, description, type]`.
fn parse_found_source(index: usize, src: &Value) -> Option<ResearchSourceResult> {
    let items = src.as_array().filter(|a| a.len() >= 2)?;
    let text = |i: usize| nav::str_at(src, &[i]).unwrap_or_default().to_string();
    if items[0].is_null() && items[1].is_string() {
        return Some(ResearchSourceResult {
            index,
            url: String::new(),
            title: text(1),
            description: String::new(),
            result_type: nav::i64_at(src, &[3]).unwrap_or(ResearchResultType::DeepReport.code()),
        });
    }
    if items[0].is_string() || items.len() >= 3 {
        return Some(ResearchSourceResult {
            index,
            url: text(0),
            title: text(1),
            description: text(2),
            result_type: nav::i64_at(src, &[3]).unwrap_or(ResearchResultType::Web.code()),
        });
    }
    None
}
