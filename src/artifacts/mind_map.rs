//! Mind maps live outside the studio list and have their own record shape:
//! `[id, [id, json_string, [?, ?, [secs, nanos]], null, title]]`, or the
//! tombstone `[id, null, 2]` once deleted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::parse_timestamp;
use crate::error::{Error, Result};
use crate::nav;

const KIND: &str = "mind_map";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MindMap {
    pub id: String,
    pub title: String,
    /// The mind map tree as the vendor stores it: a JSON document in a string.
    pub json: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl MindMap {
    fn from_entry(entry: &Value) -> Option<Self> {
        let id = nav::str_at(entry, &[0])?;
        let details = nav::get(entry, &[1])
            .filter(|d| d.as_array().is_some_and(|items| items.len() >= 5))?;
        Some(Self {
            id: id.to_string(),
            title: nav::str_at(details, &[4]).unwrap_or("Mind Map").to_string(),
            json: nav::str_at(details, &[1]).map(str::to_string),
            created_at: nav::get(details, &[2, 2]).and_then(parse_timestamp),
        })
    }

    /// The tree re-serialised with two-space indentation.
    pub fn pretty_json(&self) -> Result<String> {
        let raw = self
            .json
            .as_deref()
            .ok_or_else(|| Error::structure(KIND, "[1][1]", "no mind map JSON"))?;
        let tree: Value = serde_json::from_str(raw)
            .map_err(|e| Error::structure(KIND, "[1][1]", format!("invalid JSON: {e}")))?;
        Ok(serde_json::to_string_pretty(&tree)?)
    }
}

/// Live mind maps of a list result. Tombstones and malformed entries are
/// skipped.
pub fn parse_mind_maps(result: &Value) -> Vec<MindMap> {
    nav::array_at(result, &[0])
        .into_iter()
        .flatten()
        .filter_map(MindMap::from_entry)
        .collect()
}

/// Raw `[secs, micros]` stamp of one mind map, needed to purge it after
/// deletion.
pub fn mind_map_stamp(result: &Value, mind_map_id: &str) -> Option<Value> {
    nav::array_at(result, &[0])?
        .iter()
        .find(|entry| nav::str_at(entry, &[0]) == Some(mind_map_id))
        .and_then(|entry| nav::get(entry, &[1, 2, 2]))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing() -> Value {
        json!([[
            ["mm-1", ["mm-1", "{\"name\":\"Root\",\"children\":[]}", [2, null, [1_760_000_000, 0]], null, "Topics"]],
            ["mm-gone", null, 2],
            ["mm-2", ["mm-2", "{}", [], null, "Second"]]
        ]])
    }

    #[test]
    fn skips_tombstones() {
        let maps = parse_mind_maps(&listing());
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].title, "Topics");
        assert_eq!(maps[0].created_at.unwrap().timestamp(), 1_760_000_000);
        assert!(maps[1].created_at.is_none());
    }

    #[test]
    fn pretty_prints() {
        let maps = parse_mind_maps(&listing());
        let pretty = maps[0].pretty_json().unwrap();
        assert!(pretty.contains("\n  \"name\": \"Root\""));
    }

    #[test]
    fn stamp_lookup() {
        assert_eq!(mind_map_stamp(&listing(), "mm-1"), Some(json!([1_760_000_000, 0])));
        assert_eq!(mind_map_stamp(&listing(), "mm-gone"), None);
        assert_eq!(parse_mind_maps(&json!(null)), vec![]);
    }
}
