use std::path::PathBuf;

use super::catalog::Catalog;
use super::config::WorkspaceConfig;

/// A fully loaded bulkmod workspace
#[derive(Debug)]
pub struct Workspace {
    /// Root directory of the workspace (parent of `bulkmod/`)
    pub root: PathBuf,
    /// Path to the `bulkmod/` directory
    pub bulk_dir: PathBuf,
    /// Parsed workspace.toml
    pub config: WorkspaceConfig,
    /// Loaded collections
    pub catalog: Catalog,
}
