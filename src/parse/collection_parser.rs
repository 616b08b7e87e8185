use indexmap::IndexMap;

use crate::model::collection::{Collection, CollectionNode, CollectionSettings, Container};
use crate::model::item::{CollectionId, Item};
use crate::parse::item_parser::{is_item_line, parse_item_line};

/// Parse a collection file from its source text
pub fn parse_collection(
    source: &str,
    id: CollectionId,
    settings: CollectionSettings,
) -> Collection {
    let lines: Vec<String> = source.lines().map(|l| l.to_string()).collect();
    let mut nodes: Vec<CollectionNode> = Vec::new();
    let mut items: IndexMap<u64, Item> = IndexMap::new();
    let mut title = String::new();
    let mut description = None;

    let mut idx = 0;
    let mut literal_buf: Vec<String> = Vec::new();

    while idx < lines.len() {
        let line = &lines[idx];
        let trimmed = line.trim();

        // Collection title: `# Title`
        if let Some(t) = trimmed.strip_prefix("# ") {
            if title.is_empty() {
                title = t.to_string();
            }
            literal_buf.push(line.clone());
            idx += 1;
            continue;
        }

        // Description: `> text`
        if let Some(desc) = trimmed.strip_prefix("> ") {
            description = Some(desc.to_string());
            literal_buf.push(line.clone());
            idx += 1;
            continue;
        }

        // Container header: `## 3` or `## 3 Week three`
        if let Some(after_hashes) = trimmed.strip_prefix("## ")
            && let Some((number, name)) = parse_header(after_hashes)
            && !has_container(&nodes, number)
        {
            flush_literal(&mut literal_buf, &mut nodes);

            let mut header_lines = vec![line.clone()];
            idx += 1;

            // Collect blank lines between header and first item
            while idx < lines.len() && lines[idx].trim().is_empty() {
                header_lines.push(lines[idx].clone());
                idx += 1;
            }

            let mut sequence = Vec::new();
            while idx < lines.len() {
                let line = &lines[idx];
                if let Some(item) = parse_item_line(line, id, number)
                    && !items.contains_key(&item.id)
                {
                    sequence.push(item.id);
                    items.insert(item.id, item);
                    idx += 1;
                    continue;
                }
                // Blank lines between items are skipped when more items follow
                if line.trim().is_empty() && has_more_items(&lines, idx + 1) {
                    idx += 1;
                    continue;
                }
                break;
            }

            let mut trailing_lines = Vec::new();
            while idx < lines.len() && lines[idx].trim().is_empty() {
                trailing_lines.push(lines[idx].clone());
                idx += 1;
            }

            nodes.push(CollectionNode::Section {
                container: Container {
                    number,
                    name,
                    sequence,
                },
                header_lines,
                trailing_lines,
                dirty: false,
            });
            continue;
        }

        // Everything else is literal text
        literal_buf.push(line.clone());
        idx += 1;
    }

    flush_literal(&mut literal_buf, &mut nodes);

    Collection {
        id,
        title,
        description,
        settings,
        nodes,
        items,
        trailing_newline: source.ends_with('\n'),
        dirty: false,
    }
}

/// Split `3 Week three` into the container number and optional name
fn parse_header(s: &str) -> Option<(u32, Option<String>)> {
    let s = s.trim();
    let (num, rest) = match s.split_once(' ') {
        Some((num, rest)) => (num, Some(rest.trim())),
        None => (s, None),
    };
    let number = num.parse().ok()?;
    let name = rest.filter(|r| !r.is_empty()).map(|r| r.to_string());
    Some((number, name))
}

fn has_container(nodes: &[CollectionNode], number: u32) -> bool {
    nodes.iter().any(
        |n| matches!(n, CollectionNode::Section { container, .. } if container.number == number),
    )
}

/// Look ahead through blank lines to check whether another item line follows
fn has_more_items(lines: &[String], start: usize) -> bool {
    lines
        .iter()
        .skip(start)
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| is_item_line(l))
}

fn flush_literal(buf: &mut Vec<String>, nodes: &mut Vec<CollectionNode>) {
    if !buf.is_empty() {
        nodes.push(CollectionNode::Literal(std::mem::take(buf)));
    }
}
