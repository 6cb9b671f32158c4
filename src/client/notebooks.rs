use serde_json::{Value, json};

use super::{NotebookClient, ROOT_PATH, notebook_path};
use crate::artifacts::parse_timestamp;
use crate::error::{Error, Result};
use crate::nav;
use crate::rpc::ids;
use crate::types::{
    ChatGoal, ChatSettings, Notebook, NotebookSummary, SourceRef, SuggestedTopic,
};

/// Longest custom chat prompt the service accepts.
pub const MAX_CUSTOM_PROMPT_CHARS: usize = 10_000;

const OWNERSHIP_MINE: i64 = 1;

/// Trailing project options sent on create and add-source calls.
pub(crate) fn project_options() -> Value {
    json!([1, null, null, null, null, null, null, null, null, null, [1]])
}

impl NotebookClient {
    pub async fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        let result = self
            .rpc(ids::LIST_NOTEBOOKS, json!([null, 1, null, [2]]), ROOT_PATH)
            .await?;
        Ok(result.as_ref().map(parse_notebooks).unwrap_or_default())
    }

    /// The raw notebook record: `[[title, sources, id, emoji, null, meta, ...]]`.
    pub async fn get_notebook(&self, notebook_id: &str) -> Result<Option<Value>> {
        self.rpc(
            ids::GET_NOTEBOOK,
            json!([notebook_id, null, [2], null, 0]),
            &notebook_path(notebook_id),
        )
        .await
    }

    pub async fn get_notebook_summary(&self, notebook_id: &str) -> Result<NotebookSummary> {
        let result = self
            .rpc(
                ids::GET_SUMMARY,
                json!([notebook_id, [2]]),
                &notebook_path(notebook_id),
            )
            .await?;
        Ok(result.as_ref().map(parse_summary).unwrap_or_default())
    }

    pub async fn create_notebook(&self, title: &str) -> Result<Notebook> {
        let params = json!([title, null, null, [2], project_options()]);
        let result = self.rpc(ids::CREATE_NOTEBOOK, params, ROOT_PATH).await?;
        let id = result
            .as_ref()
            .and_then(|r| nav::text_at(r, &[2]))
            .ok_or_else(|| Error::structure("notebook", "[2]", "no id in create response"))?;
        Ok(Notebook {
            id: id.to_string(),
            title: title.to_string(),
            source_count: 0,
            sources: Vec::new(),
            is_owned: true,
            is_shared: false,
            created_at: None,
            modified_at: None,
        })
    }

    pub async fn rename_notebook(&self, notebook_id: &str, new_title: &str) -> Result<bool> {
        let params = json!([notebook_id, [[null, null, null, [null, new_title]]]]);
        let result = self
            .rpc(ids::RENAME_NOTEBOOK, params, &notebook_path(notebook_id))
            .await?;
        Ok(result.is_some())
    }

    /// Set the chat goal and answer length. A custom goal needs a prompt of
    /// at most [`MAX_CUSTOM_PROMPT_CHARS`].
    pub async fn configure_chat(&self, notebook_id: &str, settings: &ChatSettings) -> Result<bool> {
        let settings = chat_settings(settings)?;
        let params = json!([
            notebook_id,
            [[null, null, null, null, null, null, null, settings]]
        ]);
        let result = self
            .rpc(ids::RENAME_NOTEBOOK, params, &notebook_path(notebook_id))
            .await?;
        Ok(result.is_some())
    }

    /// Permanently delete a notebook with all its sources and artifacts.
    pub async fn delete_notebook(&self, notebook_id: &str) -> Result<bool> {
        let result = self
            .rpc(ids::DELETE_NOTEBOOK, json!([[notebook_id], [2]]), ROOT_PATH)
            .await?;
        Ok(result.is_some())
    }

    /// Ids of every source in a notebook.
    pub async fn notebook_source_ids(&self, notebook_id: &str) -> Result<Vec<String>> {
        let notebook = self.get_notebook(notebook_id).await?;
        Ok(notebook.as_ref().map(source_ids_of).unwrap_or_default())
    }
}

pub(crate) fn chat_settings(settings: &ChatSettings) -> Result<Value> {
    let goal = match (settings.goal, settings.custom_prompt.as_deref()) {
        (ChatGoal::Custom, Some(prompt)) if !prompt.trim().is_empty() => {
            let len = prompt.chars().count();
            if len > MAX_CUSTOM_PROMPT_CHARS {
                return Err(Error::InvalidArgument(format!(
                    "custom prompt is {len} characters, limit is {MAX_CUSTOM_PROMPT_CHARS}"
                )));
            }
            json!([settings.goal.code(), prompt])
        }
        (ChatGoal::Custom, _) => {
            return Err(Error::InvalidArgument(
                "a custom chat goal needs a prompt".to_string(),
            ));
        }
        (goal, _) => json!([goal.code()]),
    };
    Ok(json!([goal, [settings.response_length.code()]]))
}

/// `[[notebook, ...]]` or `[notebook, ...]`; a notebook record starts with
/// its title.
pub(crate) fn parse_notebooks(result: &Value) -> Vec<Notebook> {
    let list = match nav::get(result, &[0, 0]) {
        Some(Value::Array(_)) => &result[0],
        _ => result,
    };
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(parse_notebook)
        .collect()
}

fn parse_notebook(entry: &Value) -> Option<Notebook> {
    if entry.as_array()?.len() < 3 {
        return None;
    }
    let id = nav::text_at(entry, &[2])?.to_string();
    let sources = parse_source_refs(nav::get(entry, &[1]).unwrap_or(&Value::Null));
    let meta = nav::array_at(entry, &[5]).filter(|m| !m.is_empty());

    let (is_owned, is_shared, modified_at, created_at) = match meta {
        Some(meta) => (
            meta[0].as_i64() == Some(OWNERSHIP_MINE),
            meta.get(1).is_some_and(truthy),
            meta.get(5).and_then(parse_timestamp),
            meta.get(8).and_then(parse_timestamp),
        ),
        None => (true, false, None, None),
    };

    Some(Notebook {
        id,
        title: nav::str_at(entry, &[0]).unwrap_or("Untitled").to_string(),
        source_count: sources.len(),
        sources,
        is_owned,
        is_shared,
        created_at,
        modified_at,
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// `[[[id], title, meta, ...], ...]`
pub(crate) fn parse_source_refs(sources: &Value) -> Vec<SourceRef> {
    sources
        .as_array()
        .into_iter()
        .flatten()
        .filter(|src| src.as_array().is_some_and(|a| a.len() >= 2))
        .filter_map(|src| {
            let id = nav::str_at(src, &[0, 0]).or_else(|| nav::str_at(src, &[0]))?;
            Some(SourceRef {
                id: id.to_string(),
                title: nav::str_at(src, &[1]).unwrap_or("Untitled").to_string(),
            })
        })
        .collect()
}

/// The notebook record inside a get-notebook result.
pub(crate) fn notebook_record(result: &Value) -> &Value {
    match nav::get(result, &[0]) {
        Some(inner @ Value::Array(_)) => inner,
        _ => result,
    }
}

pub(crate) fn source_ids_of(result: &Value) -> Vec<String> {
    let sources = nav::get(notebook_record(result), &[1]).unwrap_or(&Value::Null);
    parse_source_refs(sources)
        .into_iter()
        .map(|s| s.id)
        .collect()
}

pub(crate) fn parse_summary(result: &Value) -> NotebookSummary {
    let suggested_topics = nav::array_at(result, &[1, 0])
        .into_iter()
        .flatten()
        .filter_map(|topic| {
            Some(SuggestedTopic {
                question: nav::str_at(topic, &[0])?.to_string(),
                prompt: nav::str_at(topic, &[1])?.to_string(),
            })
        })
        .collect();
    NotebookSummary {
        summary: nav::str_at(result, &[0, 0]).unwrap_or_default().to_string(),
        suggested_topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseLength;

    fn listing() -> Value {
        json!([[
            [
                "Research",
                [[["s1"], "Paper A", [null]], [["s2"], "Paper B"]],
                "nb-1",
                "📘",
                null,
                [1, true, true, null, null, [1767323045, 0], null, null, [1767000000, 500]]
            ],
            ["Shared with me", [], "nb-2", null, null, [2, false]],
            ["No metadata", null, "nb-3"],
            ["broken"],
            [null, [], ""]
        ]])
    }

    #[test]
    fn notebooks_from_listing() {
        let notebooks = parse_notebooks(&listing());
        assert_eq!(notebooks.len(), 3);

        let first = &notebooks[0];
        assert_eq!(first.id, "nb-1");
        assert_eq!(first.source_count, 2);
        assert_eq!(first.sources[1].title, "Paper B");
        assert!(first.is_owned && first.is_shared);
        assert_eq!(first.modified_at.unwrap().timestamp(), 1_767_323_045);
        assert_eq!(first.created_at.unwrap().timestamp(), 1_767_000_000);

        assert!(!notebooks[1].is_owned);
        assert!(notebooks[2].is_owned);
        assert_eq!(notebooks[2].source_count, 0);
        assert_eq!(first.url(), "https://notebooklm.google.com/notebook/nb-1");
    }

    #[test]
    fn unwrapped_listing() {
        let flat = listing()[0].clone();
        assert_eq!(parse_notebooks(&flat).len(), 3);
        assert!(parse_notebooks(&json!(null)).is_empty());
    }

    #[test]
    fn summary_and_topics() {
        let result = json!([
            ["A notebook about rivers."],
            [[["Why do rivers meander?", "Explain meandering"], ["bad"]]]
        ]);
        let summary = parse_summary(&result);
        assert_eq!(summary.summary, "A notebook about rivers.");
        assert_eq!(summary.suggested_topics.len(), 1);
        assert_eq!(summary.suggested_topics[0].prompt, "Explain meandering");
        assert_eq!(parse_summary(&json!([])), NotebookSummary::default());
    }

    #[test]
    fn source_ids_from_notebook() {
        let result = json!([["T", [[["a"], "A"], [["b"], "B"]], "nb"]]);
        assert_eq!(source_ids_of(&result), vec!["a", "b"]);
    }

    #[test]
    fn chat_settings_validation() {
        let mut settings = ChatSettings {
            goal: ChatGoal::Custom,
            custom_prompt: Some("Be brief".into()),
            response_length: ResponseLength::Shorter,
        };
        assert_eq!(chat_settings(&settings).unwrap(), json!([[2, "Be brief"], [5]]));

        settings.custom_prompt = Some("x".repeat(MAX_CUSTOM_PROMPT_CHARS + 1));
        assert!(matches!(chat_settings(&settings), Err(Error::InvalidArgument(_))));

        settings.custom_prompt = None;
        assert!(chat_settings(&settings).is_err());

        settings.goal = ChatGoal::LearningGuide;
        settings.response_length = ResponseLength::Default;
        assert_eq!(chat_settings(&settings).unwrap(), json!([[3], [1]]));
    }
}
