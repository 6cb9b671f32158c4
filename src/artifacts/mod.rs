//! Studio artifacts: records, kinds and per-kind positional decoders.
//!
//! A studio poll returns one positional record per artifact:
//!
//! ```text
//! [id, title, type_code, sources, status_code, ?, audio@6, report@7, video@8,
//!  cards@9, ts@10, ?, slides_pdf@12, ?, infographic@14, ts@15, slides@16,
//!  ts@17, table@18, ...]
//! ```
//!
//! Only the decoder registered for a record's type code interprets its
//! type-specific payload.

pub mod decoders;
pub mod interactive;
pub mod mind_map;
pub mod table;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::nav;

pub use decoders::ArtifactDetails;
pub(crate) use decoders::{decode_details, media_path};
pub use interactive::{InteractiveFormat, extract_app_data, format_interactive};
pub use mind_map::{MindMap, parse_mind_maps};
pub use table::{DataTable, flatten_cell, parse_data_table};

/// Vendor type codes. Quizzes share code 4 with flashcards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Audio,
    Report,
    Video,
    Flashcards,
    Infographic,
    SlideDeck,
    DataTable,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 7] = [
        Self::Audio,
        Self::Report,
        Self::Video,
        Self::Flashcards,
        Self::Infographic,
        Self::SlideDeck,
        Self::DataTable,
    ];

    pub fn type_code(self) -> i64 {
        match self {
            Self::Audio => 1,
            Self::Report => 2,
            Self::Video => 3,
            Self::Flashcards => 4,
            Self::Infographic => 7,
            Self::SlideDeck => 8,
            Self::DataTable => 9,
        }
    }

    pub fn from_type_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Report => "report",
            Self::Video => "video",
            Self::Flashcards => "flashcards",
            Self::Infographic => "infographic",
            Self::SlideDeck => "slide_deck",
            Self::DataTable => "data_table",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    InProgress,
    Completed,
    Unknown,
}

impl ArtifactStatus {
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Self::InProgress,
            Some(3) => Self::Completed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Unknown => "unknown",
        }
    }
}

/// Seconds below this are not creation timestamps.
const MIN_TIMESTAMP_SECS: f64 = 1_700_000_000.0;
const TIMESTAMP_OFFSETS: [usize; 3] = [10, 15, 17];

/// One raw studio record. Rebuilt on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRecord {
    pub id: String,
    pub title: String,
    pub type_code: Option<i64>,
    pub status_code: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    /// The full positional record; type-specific fields live at fixed offsets.
    pub raw: Value,
}

impl ArtifactRecord {
    /// Records shorter than five elements or without a string id are not
    /// artifacts.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let items = raw.as_array().filter(|a| a.len() >= 5)?;
        let id = items[0].as_str()?.to_string();
        Some(Self {
            id,
            title: nav::str_at(raw, &[1]).unwrap_or_default().to_string(),
            type_code: nav::i64_at(raw, &[2]),
            status_code: nav::i64_at(raw, &[4]),
            created_at: find_created_at(raw),
            raw: raw.clone(),
        })
    }

    pub fn kind(&self) -> Option<ArtifactKind> {
        self.type_code.and_then(ArtifactKind::from_type_code)
    }

    pub fn status(&self) -> ArtifactStatus {
        ArtifactStatus::from_code(self.status_code)
    }

    pub fn is_completed(&self) -> bool {
        self.status() == ArtifactStatus::Completed
    }

    /// Type-specific fields, read by the decoder registered for this
    /// record's own type code.
    pub fn details(&self) -> ArtifactDetails {
        self.kind()
            .map(|kind| decode_details(kind, &self.raw))
            .unwrap_or(ArtifactDetails::Unknown)
    }

    /// The table carried by a data-table record.
    pub fn data_table(&self) -> Result<DataTable> {
        match self.kind() {
            Some(ArtifactKind::DataTable) => parse_data_table(&self.raw),
            _ => Err(Error::structure(
                ArtifactKind::DataTable.as_str(),
                "[2]",
                format!("record {} has type code {:?}", self.id, self.type_code),
            )),
        }
    }
}

/// `[seconds, nanos]` to a UTC instant.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let secs = nav::get(value, &[0])?.as_f64()?;
    let nanos = nav::get(value, &[1])
        .and_then(Value::as_u64)
        .unwrap_or(0)
        .min(999_999_999) as u32;
    DateTime::from_timestamp(secs.trunc() as i64, nanos)
}

fn find_created_at(raw: &Value) -> Option<DateTime<Utc>> {
    TIMESTAMP_OFFSETS.iter().find_map(|&offset| {
        let pair = nav::get(raw, &[offset])?;
        nav::get(pair, &[1])?;
        nav::get(pair, &[0])?
            .as_f64()
            .filter(|secs| *secs > MIN_TIMESTAMP_SECS)?;
        parse_timestamp(pair)
    })
}

/// A decoded studio artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudioArtifact {
    pub id: String,
    pub title: String,
    pub kind: Option<ArtifactKind>,
    pub status: ArtifactStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub details: ArtifactDetails,
}

impl StudioArtifact {
    pub fn from_record(record: &ArtifactRecord) -> Self {
        let details = record.details();
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            kind: record.kind(),
            status: record.status(),
            created_at: record.created_at,
            details,
        }
    }
}

/// Records from a studio poll result, skipping anything that is not one.
pub fn parse_records(result: &Value) -> Vec<ArtifactRecord> {
    // `[[record, ...]]` or `[record, ...]`; a record starts with its id string.
    let list = match nav::get(result, &[0, 0]) {
        Some(Value::Array(_)) => &result[0],
        _ => result,
    };
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(ArtifactRecord::from_raw)
        .collect()
}
