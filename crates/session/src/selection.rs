//! Ephemeral UI selection state. Never persisted; reset to defaults when a
//! notebook is loaded.

use crate::cell::CellId;
use serde::{Deserialize, Serialize};

/// Sidebar panels a surface can activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SidebarPanel {
    #[default]
    Outline,
    Variables,
    Files,
    Plugins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SelectionState {
    /// At most one active cell, or none.
    pub active_cell_id: Option<CellId>,
    pub command_palette_open: bool,
    pub ai_assistant_open: bool,
    pub global_search_term: String,
    pub active_sidebar_panel: SidebarPanel,
}
