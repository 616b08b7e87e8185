use regex::Regex;
use serde::Serialize;

use crate::model::collection::Collection;
use crate::model::config::CollectionConfig;
use crate::model::item::{CollectionId, Item, ItemId, Visibility};
use crate::ops::check::{CheckError, CheckResult, CheckWarning};
use crate::ops::decode::Action;
use crate::ops::BatchReport;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ItemJson {
    pub id: ItemId,
    pub kind: String,
    pub name: String,
    pub indent: u32,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deleting: bool,
}

#[derive(Serialize)]
pub struct ContainerJson {
    pub number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub items: Vec<ItemJson>,
}

#[derive(Serialize)]
pub struct CollectionListJson {
    pub collection: CollectionId,
    pub title: String,
    pub containers: Vec<ContainerJson>,
}

#[derive(Serialize)]
pub struct CollectionInfoJson {
    pub id: CollectionId,
    pub title: String,
    pub file: String,
    pub containers: usize,
    pub items: usize,
    pub allow_stealth: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_containers: Option<u32>,
}

pub fn item_to_json(item: &Item) -> ItemJson {
    ItemJson {
        id: item.id,
        kind: item.kind.clone(),
        name: item.name.clone(),
        indent: item.indent,
        visibility: item.visibility(),
        deleting: item.deleting,
    }
}

/// Containers in order, keeping only items whose name matches `filter`
pub fn collection_to_json(collection: &Collection, filter: Option<&Regex>) -> CollectionListJson {
    let containers = collection
        .containers()
        .into_iter()
        .map(|c| ContainerJson {
            number: c.number,
            name: c.name.clone(),
            items: collection
                .items_in(c.number)
                .into_iter()
                .filter(|item| matches_filter(item, filter))
                .map(item_to_json)
                .collect(),
        })
        .collect();
    CollectionListJson {
        collection: collection.id,
        title: collection.title.clone(),
        containers,
    }
}

pub fn collection_info(entry: &CollectionConfig, collection: &Collection) -> CollectionInfoJson {
    CollectionInfoJson {
        id: collection.id,
        title: collection.title.clone(),
        file: entry.file.clone(),
        containers: collection.containers().len(),
        items: collection.items.len(),
        allow_stealth: collection.settings.allow_stealth,
        max_containers: collection.settings.max_containers,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn matches_filter(item: &Item, filter: Option<&Regex>) -> bool {
    filter.is_none_or(|re| re.is_match(&item.name))
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

/// Format a single item as a one-line summary, indented by its level
pub fn format_item_line(item: &Item) -> String {
    let deleting = if item.deleting { " (deleting)" } else { "" };
    format!(
        "{}[{}] {} {}: {}{}",
        "  ".repeat(item.indent as usize),
        item.visibility().checkbox_char(),
        item.id,
        item.kind,
        item.name,
        deleting
    )
}

/// Format a collection listing: one header per container, then its items.
/// With a filter, containers without a matching item are left out.
pub fn format_collection_listing(collection: &Collection, filter: Option<&Regex>) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", collection.title, collection.id)];
    for container in collection.containers() {
        let items: Vec<&Item> = collection
            .items_in(container.number)
            .into_iter()
            .filter(|item| matches_filter(item, filter))
            .collect();
        if filter.is_some() && items.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(match &container.name {
            Some(name) => format!("{:>3}  {}", container.number, name),
            None => format!("{:>3}", container.number),
        });
        for item in items {
            lines.push(format!("     {}", format_item_line(item)));
        }
    }
    lines
}

pub fn format_collection_info(info: &CollectionInfoJson) -> String {
    let mut flags = Vec::new();
    if info.allow_stealth {
        flags.push("stealth".to_string());
    }
    if let Some(max) = info.max_containers {
        flags.push(format!("max {}", max));
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", flags.join(", "))
    };
    format!(
        "{:>4}  {}  ({}, {})  {}{}",
        info.id,
        info.title,
        plural(info.containers, "container", "containers"),
        plural(info.items, "item", "items"),
        info.file,
        flags
    )
}

/// One-line summary of a finished batch
pub fn format_batch_summary(report: &BatchReport) -> String {
    let outcome = &report.outcome;
    let mut line = match report.action {
        Action::Duplicate | Action::DuplicateTo => {
            let pairs: Vec<String> = outcome
                .created
                .iter()
                .map(|d| format!("{} -> {}", d.source, d.id))
                .collect();
            if pairs.is_empty() {
                format!("{}: no copies created", report.action)
            } else {
                format!(
                    "{}: {} created ({})",
                    report.action,
                    plural(pairs.len(), "copy", "copies"),
                    pairs.join(", ")
                )
            }
        }
        Action::Delete => format!(
            "{}: {} marked for deletion",
            report.action,
            plural(outcome.deletions, "item", "items")
        ),
        _ => format!(
            "{}: {} changed",
            report.action,
            plural(outcome.changed.len(), "item", "items")
        ),
    };
    for created in &outcome.containers_created {
        line.push_str(&format!(
            ", created container {} in collection {}",
            created.number, created.collection
        ));
    }
    if report.dropped > 0 {
        line.push_str(&format!(
            ", {} ignored",
            plural(report.dropped, "stale id", "stale ids")
        ));
    }
    line
}

pub fn format_check_result(result: &CheckResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for err in &result.errors {
            lines.push(match err {
                CheckError::MultiplyPlaced {
                    collection,
                    item,
                    containers,
                } => format!(
                    "  [{}] {} is placed in containers {}",
                    collection,
                    item,
                    join_numbers(containers)
                ),
                CheckError::MissingRecord {
                    collection,
                    container,
                    item,
                } => format!(
                    "  [{}] container {} lists unknown item {}",
                    collection, container, item
                ),
                CheckError::Unplaced { collection, item } => {
                    format!("  [{}] {} is not placed in any container", collection, item)
                }
                CheckError::DuplicateId { item, collections } => format!(
                    "  {} is duplicated in collections: {}",
                    item,
                    join_numbers(collections)
                ),
                CheckError::ContainerMismatch {
                    collection,
                    item,
                    recorded,
                    placed,
                } => format!(
                    "  [{}] {} records container {} but is placed in {}",
                    collection, item, recorded, placed
                ),
            });
        }
    }
    if !result.warnings.is_empty() {
        lines.push("Warnings:".to_string());
        for warning in &result.warnings {
            lines.push(match warning {
                CheckWarning::IndentTooDeep {
                    collection,
                    item,
                    indent,
                    max,
                } => format!(
                    "  [{}] {} is indented {} levels (max {})",
                    collection, item, indent, max
                ),
                CheckWarning::StealthNotAllowed { collection, item } => format!(
                    "  [{}] {} is stealth but the collection does not allow it",
                    collection, item
                ),
                CheckWarning::HiddenOnPage { collection, item } => {
                    format!("  [{}] {} is hidden but flagged on-page", collection, item)
                }
            });
        }
    }
    lines.push(if result.valid {
        "✓ workspace is valid".to_string()
    } else {
        "✗ workspace has errors".to_string()
    });
    lines
}

fn join_numbers<T: ToString>(numbers: &[T]) -> String {
    numbers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
