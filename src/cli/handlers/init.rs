use std::collections::HashSet;
use std::fs;

use crate::cli::commands::InitArgs;
use crate::io::config_io;
use crate::io::workspace_io::{self, BULK_DIR, CONFIG_FILE};
use crate::model::collection::Collection;
use crate::model::config::CollectionConfig;
use crate::model::item::CollectionId;
use crate::parse::serialize_collection;

const WORKSPACE_TOML_TEMPLATE: &str = r##"[workspace]
name = ""

[engine]
# Deepest indentation level an item may reach
max_indent = 16
# Appended to the name of every duplicated item
copy_suffix = " (copy)"

# Target filter consulted before move-to and duplicate-to.
# Edit with: bm gate veto <n> / bm gate allow <n> / bm gate policy
[gate]
veto = []
keep_original = true
create_new = true

[log]
# Overridden by the BM_LOG environment variable
level = "warn"

# --- Collections ---
# Add collections with [[collections]] entries:
#
# [[collections]]
# id = 2
# file = "collections/rust-101.md"
# allow_stealth = true
# max_containers = 52
"##;

/// Infer a workspace name from a directory name: replace hyphens with spaces, title-case.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + &chars.collect::<String>()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse --collection pairs from the flat Vec<String> produced by clap.
fn parse_collection_pairs(args: &[String]) -> Result<Vec<(CollectionId, &str)>, String> {
    args.chunks(2)
        .filter(|chunk| chunk.len() == 2)
        .map(|chunk| {
            let id = chunk[0].parse::<CollectionId>().map_err(|_| {
                format!("invalid collection id \"{}\": expected a number", chunk[0])
            })?;
            Ok((id, chunk[1].as_str()))
        })
        .collect()
}

/// Lowercase file stem from a title: alphanumerics kept, everything else
/// collapsed to single hyphens.
fn file_stem(title: &str) -> String {
    let mut stem = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.is_empty() && !stem.ends_with('-') {
            stem.push('-');
        }
    }
    stem.trim_end_matches('-').to_string()
}

fn collection_entries(pairs: &[(CollectionId, &str)]) -> Vec<CollectionConfig> {
    let mut used = HashSet::new();
    pairs
        .iter()
        .map(|(id, title)| {
            let stem = file_stem(title);
            let stem = if stem.is_empty() || !used.insert(stem.clone()) {
                format!("collection-{}", id)
            } else {
                stem
            };
            CollectionConfig {
                id: *id,
                file: format!("collections/{}.md", stem),
                allow_stealth: false,
                max_containers: None,
            }
        })
        .collect()
}

fn render_workspace_toml(
    name: &str,
    entries: &[CollectionConfig],
) -> Result<String, toml_edit::TomlError> {
    let mut doc: toml_edit::DocumentMut = WORKSPACE_TOML_TEMPLATE.parse()?;
    doc["workspace"]["name"] = toml_edit::value(name);
    for entry in entries {
        config_io::add_collection_to_config(&mut doc, entry);
    }
    Ok(doc.to_string())
}

pub fn cmd_init(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let bulk_dir = cwd.join(BULK_DIR);

    if bulk_dir.is_dir() {
        return Err(format!("bulkmod workspace already exists in ./{}/", BULK_DIR).into());
    }

    if let Some(parent) = cwd.parent()
        && let Ok(parent_root) = workspace_io::discover_workspace(parent)
    {
        eprintln!(
            "Note: parent workspace found at {}/",
            parent_root.join(BULK_DIR).display()
        );
        eprintln!("Creating new workspace in ./{}/", BULK_DIR);
    }

    let pairs = parse_collection_pairs(&args.collection)?;
    let mut seen_ids = HashSet::new();
    for (id, _) in &pairs {
        if !seen_ids.insert(*id) {
            return Err(format!("duplicate collection id {}", id).into());
        }
    }

    let name = args.name.unwrap_or_else(|| {
        cwd.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .unwrap_or_else(|| "Untitled".to_string())
    });

    let entries = collection_entries(&pairs);
    fs::create_dir_all(bulk_dir.join("collections"))?;
    fs::write(
        bulk_dir.join(CONFIG_FILE),
        render_workspace_toml(&name, &entries)?,
    )?;

    for ((id, title), entry) in pairs.iter().zip(&entries) {
        let collection = Collection::new(*id, *title);
        fs::write(bulk_dir.join(&entry.file), serialize_collection(&collection))?;
    }

    println!("Initialized bulkmod workspace: {}", name);
    for ((id, title), entry) in pairs.iter().zip(&entries) {
        println!("  collection: {} ({}) {}", title, id, entry.file);
    }

    Ok(())
}
