//! Domain records returned by the client, and the vendor's small integer
//! code tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactStatus;
use crate::error::Error;

/// Declare a closed enum backed by vendor integer codes, with snake_case
/// names for display and parsing.
macro_rules! code_table {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $code:literal => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn code(self) -> i64 {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == wanted)
                    .ok_or_else(|| {
                        let choices: Vec<&str> = Self::ALL.iter().map(|v| v.name()).collect();
                        Error::InvalidArgument(format!(
                            "unknown {} {s:?}, expected one of: {}",
                            stringify!($name),
                            choices.join(", ")
                        ))
                    })
            }
        }
    };
}

// ── Code tables ─────────────────────────────────────────────────────────────

code_table! {
    SourceType {
        GoogleDocs = 1 => "google_docs",
        GoogleOther = 2 => "google_slides_sheets",
        Pdf = 3 => "pdf",
        PastedText = 4 => "pasted_text",
        WebPage = 5 => "web_page",
        GeneratedText = 8 => "generated_text",
        Youtube = 9 => "youtube",
        UploadedFile = 11 => "uploaded_file",
        Image = 13 => "image",
        WordDoc = 14 => "word_doc",
    }
}

impl SourceType {
    /// Drive-backed documents that can be re-synced.
    pub fn is_drive_document(self) -> bool {
        matches!(self, Self::GoogleDocs | Self::GoogleOther)
    }
}

/// Display name for a raw source type code, `"unknown"` when unmapped.
pub fn source_type_name(code: Option<i64>) -> &'static str {
    code.and_then(SourceType::from_code)
        .map(SourceType::name)
        .unwrap_or("unknown")
}

code_table! {
    ChatGoal {
        Default = 1 => "default",
        Custom = 2 => "custom",
        LearningGuide = 3 => "learning_guide",
    }
}

code_table! {
    ResponseLength {
        Default = 1 => "default",
        Longer = 4 => "longer",
        Shorter = 5 => "shorter",
    }
}

code_table! {
    ShareRole {
        Owner = 1 => "owner",
        Editor = 2 => "editor",
        Viewer = 3 => "viewer",
    }
}

code_table! {
    /// Where a research session looks.
    ResearchSource {
        Web = 1 => "web",
        Drive = 2 => "drive",
    }
}

code_table! {
    /// Kind of a discovered research result.
    ResearchResultType {
        Web = 1 => "web",
        GoogleDoc = 2 => "google_doc",
        GoogleSlides = 3 => "google_slides",
        DeepReport = 5 => "deep_report",
        GoogleSheets = 8 => "google_sheets",
    }
}

impl ResearchResultType {
    /// Drive MIME type used when importing this result.
    pub fn drive_mime(self) -> &'static str {
        match self {
            Self::GoogleSlides => "application/vnd.google-apps.presentation",
            Self::GoogleSheets => "application/vnd.google-apps.spreadsheet",
            _ => GOOGLE_DOC_MIME,
        }
    }
}

pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";

code_table! {
    AudioFormat {
        DeepDive = 1 => "deep_dive",
        Brief = 2 => "brief",
        Critique = 3 => "critique",
        Debate = 4 => "debate",
    }
}

code_table! {
    AudioLength {
        Short = 1 => "short",
        Default = 2 => "default",
        Long = 3 => "long",
    }
}

code_table! {
    VideoFormat {
        Explainer = 1 => "explainer",
        Brief = 2 => "brief",
    }
}

code_table! {
    VideoStyle {
        AutoSelect = 1 => "auto_select",
        Custom = 2 => "custom",
        Classic = 3 => "classic",
        Whiteboard = 4 => "whiteboard",
        Kawaii = 5 => "kawaii",
        Anime = 6 => "anime",
        Watercolor = 7 => "watercolor",
        RetroPrint = 8 => "retro_print",
        Heritage = 9 => "heritage",
        PaperCraft = 10 => "paper_craft",
    }
}

code_table! {
    InfographicOrientation {
        Landscape = 1 => "landscape",
        Portrait = 2 => "portrait",
        Square = 3 => "square",
    }
}

code_table! {
    InfographicDetail {
        Concise = 1 => "concise",
        Standard = 2 => "standard",
        Detailed = 3 => "detailed",
    }
}

code_table! {
    SlideDeckFormat {
        DetailedDeck = 1 => "detailed_deck",
        PresenterSlides = 2 => "presenter_slides",
    }
}

code_table! {
    SlideDeckLength {
        Short = 1 => "short",
        Default = 3 => "default",
    }
}

code_table! {
    Difficulty {
        Easy = 1 => "easy",
        Medium = 2 => "medium",
        Hard = 3 => "hard",
    }
}

/// Built-in report templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    BriefingDoc,
    StudyGuide,
    BlogPost,
    /// "Create Your Own" with a caller-supplied prompt.
    Custom(String),
}

impl ReportFormat {
    pub fn title(&self) -> &'static str {
        match self {
            Self::BriefingDoc => "Briefing Doc",
            Self::StudyGuide => "Study Guide",
            Self::BlogPost => "Blog Post",
            Self::Custom(_) => "Custom Report",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::BriefingDoc => "Key insights and important quotes",
            Self::StudyGuide => "Short-answer quiz, essay questions, glossary",
            Self::BlogPost => "Insightful takeaways in readable article format",
            Self::Custom(_) => "Custom format",
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Self::BriefingDoc => {
                "Create a comprehensive briefing document that includes an Executive Summary, \
                 detailed analysis of key themes, important quotes with context, and actionable \
                 insights."
            }
            Self::StudyGuide => {
                "Create a comprehensive study guide that includes key concepts, short-answer \
                 practice questions, essay prompts for deeper exploration, and a glossary of \
                 important terms."
            }
            Self::BlogPost => {
                "Write an engaging blog post that presents the key insights in an accessible, \
                 reader-friendly format. Include an attention-grabbing introduction, \
                 well-organized sections, and a compelling conclusion with takeaways."
            }
            Self::Custom(prompt) if !prompt.trim().is_empty() => prompt,
            Self::Custom(_) => "Create a report based on the provided sources.",
        }
    }
}

// ── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notebook {
    pub id: String,
    pub title: String,
    pub source_count: usize,
    pub sources: Vec<SourceRef>,
    pub is_owned: bool,
    pub is_shared: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Notebook {
    pub fn url(&self) -> String {
        notebook_url(&self.id)
    }
}

pub fn notebook_url(notebook_id: &str) -> String {
    format!("{}/notebook/{notebook_id}", crate::rpc::ids::BASE_URL)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDetail {
    pub id: String,
    pub title: String,
    pub source_type: Option<i64>,
    pub source_type_name: &'static str,
    pub url: Option<String>,
    pub drive_doc_id: Option<String>,
    pub can_sync: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceContent {
    pub content: String,
    pub title: String,
    pub source_type: &'static str,
    pub url: Option<String>,
    pub char_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SourceGuide {
    pub summary: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedTopic {
    pub question: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NotebookSummary {
    pub summary: String,
    pub suggested_topics: Vec<SuggestedTopic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncedSource {
    pub id: Option<String>,
    pub title: String,
    /// Seconds since the epoch, as reported by the vendor.
    pub synced_at: Option<i64>,
}

/// Adding a source can outlive the call timeout while the vendor keeps
/// ingesting; that case is not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceAddOutcome {
    Added(SourceRef),
    /// The call timed out. The source may still appear; re-list before
    /// retrying.
    TimedOut { after_secs: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSettings {
    pub goal: ChatGoal,
    pub custom_prompt: Option<String>,
    pub response_length: ResponseLength,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub answer: String,
    pub conversation_id: String,
    pub turn_number: usize,
    pub is_follow_up: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchMode {
    Fast,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchStarted {
    pub task_id: String,
    pub report_id: Option<String>,
    pub query: String,
    pub source: ResearchSource,
    pub mode: ResearchMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchSourceResult {
    pub index: usize,
    pub url: String,
    pub title: String,
    pub description: String,
    pub result_type: i64,
}

impl ResearchSourceResult {
    pub fn result_type_name(&self) -> &'static str {
        ResearchResultType::from_code(self.result_type)
            .map(ResearchResultType::name)
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchTask {
    pub task_id: String,
    pub status: ResearchStatus,
    pub query: String,
    pub source: ResearchSource,
    pub mode: ResearchMode,
    pub sources: Vec<ResearchSourceResult>,
    pub summary: String,
    /// Markdown report, deep research only.
    pub report: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collaborator {
    pub email: String,
    pub role: ShareRole,
    pub is_pending: bool,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareStatus {
    pub is_public: bool,
    /// `"public"` or `"restricted"`
    pub access_level: &'static str,
    pub collaborators: Vec<Collaborator>,
    pub public_link: Option<String>,
}

/// Result of a studio creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudioCreated {
    pub artifact_id: String,
    pub notebook_id: String,
    pub kind: crate::artifacts::ArtifactKind,
    pub status: ArtifactStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedMindMap {
    pub json: String,
    pub generation_id: Option<String>,
}
