use std::fs;
use std::path::Path;

use crate::io::workspace_io::{CONFIG_FILE, WorkspaceError, atomic_write};
use crate::model::config::{CollectionConfig, WorkspaceConfig};

/// Read the workspace config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing.
pub fn read_config(
    bulk_dir: &Path,
) -> Result<(WorkspaceConfig, toml_edit::DocumentMut), WorkspaceError> {
    let config_path = bulk_dir.join(CONFIG_FILE);
    let config_text = fs::read_to_string(&config_path).map_err(|e| WorkspaceError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config: WorkspaceConfig = toml::from_str(&config_text)?;
    let doc: toml_edit::DocumentMut = config_text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(bulk_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), WorkspaceError> {
    let config_path = bulk_dir.join(CONFIG_FILE);
    atomic_write(&config_path, doc.to_string().as_bytes()).map_err(|e| {
        WorkspaceError::WriteError {
            path: config_path,
            source: e,
        }
    })
}

fn gate_table(doc: &mut toml_edit::DocumentMut) -> &mut toml_edit::Item {
    if !doc.contains_key("gate") {
        doc["gate"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    &mut doc["gate"]
}

fn veto_numbers(doc: &toml_edit::DocumentMut) -> Vec<i64> {
    doc.get("gate")
        .and_then(|g| g.get("veto"))
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_integer()).collect())
        .unwrap_or_default()
}

/// Add or remove a container number from `[gate] veto`.
/// Returns true if the list changed.
pub fn set_veto(doc: &mut toml_edit::DocumentMut, number: u32, vetoed: bool) -> bool {
    let mut numbers = veto_numbers(doc);
    let n = i64::from(number);
    let present = numbers.contains(&n);
    if present == vetoed {
        return false;
    }
    if vetoed {
        numbers.push(n);
        numbers.sort_unstable();
    } else {
        numbers.retain(|&v| v != n);
    }
    let array: toml_edit::Array = numbers.into_iter().collect();
    gate_table(doc)["veto"] = toml_edit::value(array);
    true
}

/// Update the cross-collection policy flags in `[gate]`
pub fn set_gate_policy(
    doc: &mut toml_edit::DocumentMut,
    keep_original: Option<bool>,
    create_new: Option<bool>,
) {
    if let Some(keep) = keep_original {
        gate_table(doc)["keep_original"] = toml_edit::value(keep);
    }
    if let Some(create) = create_new {
        gate_table(doc)["create_new"] = toml_edit::value(create);
    }
}

/// Add a new collection to the config document
pub fn add_collection_to_config(doc: &mut toml_edit::DocumentMut, collection: &CollectionConfig) {
    if !doc.contains_key("collections") {
        doc["collections"] = toml_edit::Item::ArrayOfTables(toml_edit::ArrayOfTables::new());
    }

    if let Some(collections) = doc["collections"].as_array_of_tables_mut() {
        let mut table = toml_edit::Table::new();
        table["id"] = toml_edit::value(collection.id as i64);
        table["file"] = toml_edit::value(&collection.file);
        if collection.allow_stealth {
            table["allow_stealth"] = toml_edit::value(true);
        }
        if let Some(max) = collection.max_containers {
            table["max_containers"] = toml_edit::value(i64::from(max));
        }
        collections.push(table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> &'static str {
        r#"[workspace]
name = "test"

# Containers nobody may target
[gate]
veto = [0]

[[collections]]
id = 1
file = "collections/rust-101.md"
allow_stealth = true
"#
    }

    #[test]
    fn test_round_trip_config() {
        let tmp = TempDir::new().unwrap();
        let bulk_dir = tmp.path().join("bulkmod");
        fs::create_dir_all(&bulk_dir).unwrap();
        let config_path = bulk_dir.join(CONFIG_FILE);

        let original = sample_config();
        fs::write(&config_path, original).unwrap();

        let (config, doc) = read_config(&bulk_dir).unwrap();
        assert_eq!(config.gate.veto, vec![0]);
        write_config(&bulk_dir, &doc).unwrap();

        let written = fs::read_to_string(&config_path).unwrap();
        assert_eq!(written, original);
    }

    #[test]
    fn test_set_veto() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        assert!(set_veto(&mut doc, 3, true));
        assert!(!set_veto(&mut doc, 3, true));
        assert!(set_veto(&mut doc, 0, false));

        let result = doc.to_string();
        assert!(result.contains("# Containers nobody may target"));
        let config: WorkspaceConfig = toml::from_str(&result).unwrap();
        assert_eq!(config.gate.veto, vec![3]);
    }

    #[test]
    fn test_set_veto_creates_gate_table() {
        let mut doc: toml_edit::DocumentMut = "[workspace]\nname = \"t\"\n".parse().unwrap();
        set_veto(&mut doc, 2, true);
        let config: WorkspaceConfig = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(config.gate.veto, vec![2]);
        assert!(config.gate.keep_original);
    }

    #[test]
    fn test_set_gate_policy() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        set_gate_policy(&mut doc, None, Some(false));
        let config: WorkspaceConfig = toml::from_str(&doc.to_string()).unwrap();
        assert!(config.gate.keep_original);
        assert!(!config.gate.create_new);
        assert_eq!(config.gate.veto, vec![0]);
    }

    #[test]
    fn test_add_collection() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        add_collection_to_config(
            &mut doc,
            &CollectionConfig {
                id: 2,
                file: "collections/advanced.md".to_string(),
                allow_stealth: false,
                max_containers: Some(12),
            },
        );
        let config: WorkspaceConfig = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(config.collections.len(), 2);
        assert_eq!(config.collections[1].id, 2);
        assert_eq!(config.collections[1].max_containers, Some(12));
        assert!(!config.collections[1].allow_stealth);
    }
}
