use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::model::catalog::Catalog;
use crate::model::collection::Collection;
use crate::model::config::WorkspaceConfig;
use crate::model::item::CollectionId;
use crate::model::workspace::Workspace;
use crate::parse::{parse_collection, serialize_collection};

/// Name of the marker directory holding config and collection files
pub const BULK_DIR: &str = "bulkmod";
pub const CONFIG_FILE: &str = "workspace.toml";

/// Error type for workspace I/O operations
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("not a bulkmod workspace: no bulkmod/workspace.toml found")]
    NotAWorkspace,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse workspace.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("could not edit workspace.toml: {0}")]
    ConfigEditError(#[from] toml_edit::TomlError),
    #[error("collection {0} is listed more than once in workspace.toml")]
    DuplicateCollection(CollectionId),
    #[error("collection not found: {0}")]
    UnknownCollection(CollectionId),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Discover the workspace by walking up from the given directory,
/// looking for `bulkmod/workspace.toml`.
pub fn discover_workspace(start: &Path) -> Result<PathBuf, WorkspaceError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(BULK_DIR).join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(WorkspaceError::NotAWorkspace);
        }
    }
}

/// Load the config and every collection file of a workspace.
pub fn load_workspace(root: &Path) -> Result<Workspace, WorkspaceError> {
    let bulk_dir = root.join(BULK_DIR);
    if !bulk_dir.is_dir() {
        return Err(WorkspaceError::NotAWorkspace);
    }

    let config_path = bulk_dir.join(CONFIG_FILE);
    let config_text = read_file(&config_path)?;
    let config: WorkspaceConfig = toml::from_str(&config_text)?;

    let mut catalog = Catalog::new();
    for entry in &config.collections {
        if catalog.get(entry.id).is_some() {
            return Err(WorkspaceError::DuplicateCollection(entry.id));
        }
        let path = bulk_dir.join(&entry.file);
        if !path.exists() {
            tracing::warn!(collection = entry.id, path = %path.display(), "collection file missing, skipped");
            continue;
        }
        let text = read_file(&path)?;
        catalog.insert(parse_collection(&text, entry.id, entry.settings()));
    }
    tracing::debug!(
        root = %root.display(),
        collections = config.collections.len(),
        "workspace loaded"
    );

    Ok(Workspace {
        root: root.to_path_buf(),
        bulk_dir,
        config,
        catalog,
    })
}

/// Save a collection file back to disk
pub fn save_collection(
    bulk_dir: &Path,
    file_path: &str,
    collection: &Collection,
) -> Result<(), WorkspaceError> {
    let full_path = bulk_dir.join(file_path);
    let content = serialize_collection(collection);
    if let Err(e) = atomic_write(&full_path, content.as_bytes()) {
        tracing::error!(
            collection = collection.id,
            path = %full_path.display(),
            error = %e,
            "collection write failed"
        );
        return Err(WorkspaceError::WriteError {
            path: full_path,
            source: e,
        });
    }
    Ok(())
}

/// Write every modified collection and clear its dirty flag.
/// Returns the number of files written.
pub fn save_dirty(workspace: &mut Workspace) -> Result<usize, WorkspaceError> {
    let mut saved = 0;
    for collection in workspace.catalog.collections_mut() {
        if !collection.dirty {
            continue;
        }
        let file = workspace
            .config
            .collections
            .iter()
            .find(|c| c.id == collection.id)
            .map(|c| c.file.as_str())
            .ok_or(WorkspaceError::UnknownCollection(collection.id))?;
        save_collection(&workspace.bulk_dir, file, collection)?;
        collection.dirty = false;
        saved += 1;
    }
    Ok(saved)
}

/// Write to a temp file in the same directory, then rename over the target.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn read_file(path: &Path) -> Result<String, WorkspaceError> {
    fs::read_to_string(path).map_err(|e| WorkspaceError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}
