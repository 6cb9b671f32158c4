//! Remote procedure identifiers and fixed endpoint paths.
//!
//! The vendor names every call with an opaque six-character id. These move
//! occasionally; when one changes the server answers with an empty body for
//! that id rather than an error.

pub const BASE_URL: &str = "https://notebooklm.google.com";
pub const BATCHEXECUTE_PATH: &str = "/_/LabsTailwindUi/data/batchexecute";
pub const QUERY_PATH: &str = "/_/LabsTailwindUi/data/google.internal.labs.tailwind.orchestration.v1.LabsTailwindOrchestrationService/GenerateFreeFormStreamed";
pub const UPLOAD_PATH: &str = "/upload/_/";

/// Build label sent as `bl`; the frontend bumps it on every release.
pub const DEFAULT_BUILD_LABEL: &str = "boq_labs-tailwind-frontend_20260108.06_p0";

// ── Notebooks ───────────────────────────────────────────────────────────────

pub const LIST_NOTEBOOKS: &str = "wXbhsf";
pub const CREATE_NOTEBOOK: &str = "CCqFvf";
pub const GET_NOTEBOOK: &str = "rLM1Ne";
/// Rename and chat configuration share one call.
pub const RENAME_NOTEBOOK: &str = "s0tc2d";
pub const DELETE_NOTEBOOK: &str = "WWINqb";
pub const GET_SUMMARY: &str = "VfAZjd";

// ── Sources ─────────────────────────────────────────────────────────────────

pub const ADD_SOURCE: &str = "izAoDd";
pub const GET_SOURCE: &str = "hizoJc";
pub const DELETE_SOURCE: &str = "tGMBJ";
pub const CHECK_FRESHNESS: &str = "yR9Yof";
pub const SYNC_DRIVE: &str = "FLmJqe";
pub const GET_SOURCE_GUIDE: &str = "tr032e";

// ── Research ────────────────────────────────────────────────────────────────

pub const START_FAST_RESEARCH: &str = "Ljjv0c";
pub const START_DEEP_RESEARCH: &str = "QA9ei";
pub const POLL_RESEARCH: &str = "e3bVqc";
pub const IMPORT_RESEARCH: &str = "LBwxtb";

// ── Studio ──────────────────────────────────────────────────────────────────

pub const CREATE_STUDIO: &str = "R7cb6c";
pub const POLL_STUDIO: &str = "gArtLc";
pub const DELETE_STUDIO: &str = "V5N4be";
pub const GET_INTERACTIVE_HTML: &str = "v9rmvd";

pub const GENERATE_MIND_MAP: &str = "yyryJe";
pub const SAVE_MIND_MAP: &str = "CYK0Xb";
pub const LIST_MIND_MAPS: &str = "cFji9";
pub const DELETE_MIND_MAP: &str = "AH0mwd";

// ── Sharing ─────────────────────────────────────────────────────────────────

pub const GET_SHARE_STATUS: &str = "JFMDGd";
pub const SHARE_NOTEBOOK: &str = "QDyure";
