use crate::model::collection::{Collection, CollectionNode};
use crate::parse::item_serializer::serialize_item;

/// Serialize a collection back to its markdown representation.
/// Literal nodes are emitted verbatim. Clean sections keep their original
/// spacing; rewritten sections are emitted in canonical form.
pub fn serialize_collection(collection: &Collection) -> String {
    let mut lines: Vec<String> = Vec::new();
    let node_count = collection.nodes.len();

    for (i, node) in collection.nodes.iter().enumerate() {
        let is_last = i + 1 == node_count;
        match node {
            CollectionNode::Literal(literal_lines) => {
                lines.extend(literal_lines.iter().cloned());
            }
            CollectionNode::Section {
                container,
                header_lines,
                trailing_lines,
                dirty,
            } => {
                let item_lines: Vec<String> = container
                    .sequence
                    .iter()
                    .filter_map(|id| collection.items.get(id))
                    .map(serialize_item)
                    .collect();

                if *dirty {
                    let header = header_lines
                        .first()
                        .cloned()
                        .unwrap_or_else(|| container.header());
                    lines.push(header);
                    if !is_last || !item_lines.is_empty() {
                        lines.push(String::new());
                    }
                    let has_items = !item_lines.is_empty();
                    lines.extend(item_lines);
                    if has_items && !is_last {
                        lines.push(String::new());
                    }
                } else {
                    lines.extend(header_lines.iter().cloned());
                    lines.extend(item_lines);
                    lines.extend(trailing_lines.iter().cloned());
                    // Keep a blank line before whatever follows
                    if !is_last && lines.last().is_some_and(|l| !l.trim().is_empty()) {
                        lines.push(String::new());
                    }
                }
            }
        }
    }

    let mut out = lines.join("\n");
    if collection.trailing_newline {
        out.push('\n');
    }
    out
}
