use serde::{Deserialize, Serialize};

use super::collection::CollectionSettings;
use super::item::{CollectionId, MAX_DEPTH};

/// Configuration from workspace.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub workspace: WorkspaceInfo,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default: 16
    #[serde(default = "default_max_indent")]
    pub max_indent: u32,
    /// Appended to the name of every duplicated item
    #[serde(default = "default_copy_suffix")]
    pub copy_suffix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_indent: default_max_indent(),
            copy_suffix: default_copy_suffix(),
        }
    }
}

/// Built-in target filter applied before move-to and duplicate-to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Container numbers that may never be targets
    #[serde(default)]
    pub veto: Vec<u32>,
    /// Cross-collection only: allow copies to keep their source container number
    #[serde(default = "default_true")]
    pub keep_original: bool,
    /// Cross-collection only: allow creating a missing target container
    #[serde(default = "default_true")]
    pub create_new: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            veto: Vec::new(),
            keep_original: true,
            create_new: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when `BM_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub id: CollectionId,
    pub file: String,
    #[serde(default)]
    pub allow_stealth: bool,
    #[serde(default)]
    pub max_containers: Option<u32>,
}

impl CollectionConfig {
    pub fn settings(&self) -> CollectionSettings {
        CollectionSettings {
            allow_stealth: self.allow_stealth,
            max_containers: self.max_containers,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_indent() -> u32 {
    MAX_DEPTH
}

fn default_copy_suffix() -> String {
    " (copy)".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}
