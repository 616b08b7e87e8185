use crate::model::item::{CollectionId, Item, Visibility};

/// Trailing marker for items with a pending deletion
pub const DELETING_MARKER: &str = " #deleting";

/// Parse an item line: `<indent>- [c] \`ID\` kind: Name [#deleting]`.
/// Indentation is two spaces per depth level. Returns `None` if the line is
/// not a well-formed item line.
pub fn parse_item_line(line: &str, collection: CollectionId, container: u32) -> Option<Item> {
    let spaces = count_indent(line);
    let content = line[spaces..].trim_end();

    // Checkbox: `- [c] `
    let after_open = content.strip_prefix("- [")?;
    let mut chars = after_open.chars();
    let visibility = Visibility::from_checkbox_char(chars.next()?)?;
    let after_checkbox = chars.as_str().strip_prefix("] ")?;

    // ID: `\`123\``
    let after_tick = after_checkbox.strip_prefix('`')?;
    let end_tick = after_tick.find('`')?;
    let id = after_tick[..end_tick].parse().ok()?;
    let rest = after_tick[end_tick + 1..].strip_prefix(' ')?;

    // Kind and name: `forum: Announcements`
    let (kind, name) = rest.split_once(": ")?;
    if kind.is_empty() || kind.contains(' ') {
        return None;
    }
    let (name, deleting) = match name.strip_suffix(DELETING_MARKER) {
        Some(stripped) => (stripped, true),
        None => (name, false),
    };

    let (visible, visible_on_page) = visibility.flags();
    Some(Item {
        id,
        collection,
        container,
        kind: kind.to_string(),
        name: name.to_string(),
        indent: (spaces / 2) as u32,
        visible,
        visible_on_page,
        deleting,
        source_text: Some(line.to_string()),
        dirty: false,
    })
}

/// Check if a line looks like an item line (starts with `- [` at some indent)
pub fn is_item_line(line: &str) -> bool {
    let content = &line[count_indent(line)..];
    content.starts_with("- [") && content.as_bytes().get(4) == Some(&b']')
}

/// Count leading spaces
fn count_indent(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}
