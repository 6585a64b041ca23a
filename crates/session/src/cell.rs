//! Cell records: the unit of notebook content and execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Opaque unique cell identifier. Assigned at creation, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(Uuid);

impl CellId {
    pub fn new() -> Self {
        CellId(Uuid::new_v4())
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CellId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CellId(Uuid::parse_str(s)?))
    }
}

/// Closed tag set of cell types. The type picks the renderer and the shape of
/// `content`; the core only cares whether a type is runnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Code,
    Markdown,
    Data,
    Visualization,
    AiChat,
    Sql,
    Drawing,
    Form,
    WebComponent,
    FileBrowser,
    Terminal,
    Embed,
    Timeline,
    Map,
    Audio,
    Video,
}

impl CellType {
    /// Only these types can be executed; everything else is display-only and
    /// the "Run Cell" control is hidden for it.
    pub fn is_runnable(&self) -> bool {
        matches!(
            self,
            CellType::Code | CellType::AiChat | CellType::Sql | CellType::Form
        )
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CellType::Code => "code",
            CellType::Markdown => "markdown",
            CellType::Data => "data",
            CellType::Visualization => "visualization",
            CellType::AiChat => "ai_chat",
            CellType::Sql => "sql",
            CellType::Drawing => "drawing",
            CellType::Form => "form",
            CellType::WebComponent => "web_component",
            CellType::FileBrowser => "file_browser",
            CellType::Terminal => "terminal",
            CellType::Embed => "embed",
            CellType::Timeline => "timeline",
            CellType::Map => "map",
            CellType::Audio => "audio",
            CellType::Video => "video",
        };
        write!(f, "{name}")
    }
}

/// Execution lifecycle state. Transitions:
/// `idle -> queued -> running -> {success | error}`, with `success`/`error`
/// re-entering `running` on the next execute request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    #[default]
    Idle,
    Queued,
    Running,
    Success,
    Error,
}

/// One execution result record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum CellOutput {
    /// Stream text (stdout/stderr style).
    Stream { text: String },
    /// A rendered result value.
    ExecuteResult { data: Value },
    /// An execution error.
    Error { message: String },
}

/// Wall-clock timing of a single execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTiming {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Display/behavior flags plus cell-scoped comments and collaborators.
/// Unknown keys round-trip through `additional`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CellMetadata {
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub hide_code: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub collaborators: Vec<String>,
    #[serde(flatten)]
    pub additional: HashMap<String, Value>,
}

/// One addressable unit of notebook content.
///
/// `id` and `cell_type` are immutable after creation; all mutation goes
/// through the cell store, which never touches either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub cell_type: CellType,
    pub content: Value,
    #[serde(default)]
    pub outputs: Vec<CellOutput>,
    #[serde(default)]
    pub status: CellStatus,
    #[serde(default)]
    pub execution_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<ExecutionTiming>,
    #[serde(default)]
    pub metadata: CellMetadata,
}

impl Cell {
    /// Create a fresh cell: unique id, `idle`, no outputs, count zero.
    pub fn new(cell_type: CellType, content: Value, metadata: Option<CellMetadata>) -> Self {
        Cell {
            id: CellId::new(),
            cell_type,
            content,
            outputs: Vec::new(),
            status: CellStatus::Idle,
            execution_count: 0,
            execution_time: None,
            metadata: metadata.unwrap_or_default(),
        }
    }
}

/// Partial-merge payload for `update`. Absent fields are left untouched;
/// `id` and `cell_type` are deliberately not representable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CellUpdate {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub outputs: Option<Vec<CellOutput>>,
    #[serde(default)]
    pub status: Option<CellStatus>,
    #[serde(default)]
    pub metadata: Option<CellMetadata>,
}
