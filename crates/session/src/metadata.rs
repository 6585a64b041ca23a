//! Document-level notebook descriptor, mutated whole or by partial patch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Private,
    Shared,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// One entry of the kernel catalog offered to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub name: String,
    pub display_name: String,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_memory_mb: u32,
    pub max_execution_seconds: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_mb: 2048,
            max_execution_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookMetadata {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub visibility: Visibility,
    /// Collaborators the notebook is shared with.
    #[serde(default)]
    pub shared_with: Vec<String>,
    #[serde(default)]
    pub kernels: Vec<KernelSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_kernel: Option<String>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub resource_limits: ResourceLimits,
    #[serde(default)]
    pub plugins: HashMap<String, Value>,
}

impl Default for NotebookMetadata {
    fn default() -> Self {
        Self {
            title: "Untitled notebook".to_string(),
            author: String::new(),
            visibility: Visibility::default(),
            shared_with: Vec::new(),
            kernels: Vec::new(),
            default_kernel: None,
            theme: Theme::default(),
            resource_limits: ResourceLimits::default(),
            plugins: HashMap::new(),
        }
    }
}

/// Partial patch for the document descriptor; absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotebookMetadataPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub shared_with: Option<Vec<String>>,
    #[serde(default)]
    pub kernels: Option<Vec<KernelSpec>>,
    #[serde(default)]
    pub default_kernel: Option<Option<String>>,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub resource_limits: Option<ResourceLimits>,
    #[serde(default)]
    pub plugins: Option<HashMap<String, Value>>,
}

impl NotebookMetadataPatch {
    pub fn apply(self, metadata: &mut NotebookMetadata) {
        if let Some(title) = self.title {
            metadata.title = title;
        }
        if let Some(author) = self.author {
            metadata.author = author;
        }
        if let Some(visibility) = self.visibility {
            metadata.visibility = visibility;
        }
        if let Some(shared_with) = self.shared_with {
            metadata.shared_with = shared_with;
        }
        if let Some(kernels) = self.kernels {
            metadata.kernels = kernels;
        }
        if let Some(default_kernel) = self.default_kernel {
            metadata.default_kernel = default_kernel;
        }
        if let Some(theme) = self.theme {
            metadata.theme = theme;
        }
        if let Some(resource_limits) = self.resource_limits {
            metadata.resource_limits = resource_limits;
        }
        if let Some(plugins) = self.plugins {
            metadata.plugins = plugins;
        }
    }
}
