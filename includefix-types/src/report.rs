use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunInfo,
    pub status: RunStatus,
    pub counts: ReportCounts,

    /// Header names discovered with conflicting content, per candidate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguities: Vec<AmbiguityRecord>,

    /// References that could not be rewritten, by file and line.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<UnresolvedReference>,

    /// Distinct header names referenced but absent from every candidate root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileRecord>,

    pub patch: PatchRecord,

    /// Reason the run stopped early, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
}

impl ReconcileReport {
    pub fn new(tool: ToolInfo, run: RunInfo) -> Self {
        Self {
            schema: crate::schema::INCLUDEFIX_REPORT_V1.to_string(),
            tool,
            run,
            status: RunStatus::Success,
            counts: ReportCounts::default(),
            ambiguities: vec![],
            unresolved: vec![],
            missing: vec![],
            files: vec![],
            patch: PatchRecord::default(),
            halted: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    /// CLI exit code for this status.
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Partial => 1,
            RunStatus::Failed => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub files_scanned: u64,
    pub files_changed: u64,
    pub files_written: u64,
    pub headers_discovered: u64,
    pub duplicate_headers: u64,
    pub ambiguous_names: u64,
    pub missing_names: u64,
    pub unresolved_references: u64,
    pub headers_consolidated: u64,
    pub write_failures: u64,
}

/// One header name claimed by two or more distinct contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbiguityRecord {
    pub name: String,
    pub candidates: Vec<HeaderCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderCandidate {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedReference {
    pub file: String,
    pub line: u64,

    /// The reference path exactly as it appears in the source.
    pub reference: String,

    pub reason: UnresolvedReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// The referenced name resolves to conflicting header contents.
    AmbiguousHeader,
    /// The referenced name was not found under any candidate root.
    MissingHeader,
    /// The reference's path shape matches no known rewrite rule.
    UnrecognizedShape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub written: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_after: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    pub status: PatchStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    /// No build configuration was given; nothing to patch.
    #[default]
    Skipped,
    /// The declaration was rewritten to the canonical include root.
    Patched,
    /// The declaration already points at the canonical include root.
    AlreadyCanonical,
    /// No declaration matching the expected shape was found.
    TargetNotFound,
    /// More than one candidate declaration was found.
    TargetAmbiguous,
}
