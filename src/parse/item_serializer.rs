use crate::model::item::Item;
use crate::parse::item_parser::DELETING_MARKER;

/// Serialize a single item. If clean (not dirty), emit the verbatim source line.
/// If dirty, emit canonical format.
pub fn serialize_item(item: &Item) -> String {
    if !item.dirty
        && let Some(ref source) = item.source_text
    {
        return source.clone();
    }

    let mut line = format!(
        "{}- [{}] `{}` {}: {}",
        "  ".repeat(item.indent as usize),
        item.visibility().checkbox_char(),
        item.id,
        item.kind,
        item.name
    );
    if item.deleting {
        line.push_str(DELETING_MARKER);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::item_parser::parse_item_line;

    #[test]
    fn test_clean_item_emits_source_verbatim() {
        // Odd spacing survives because the item is clean
        let source = "   - [ ] `4` page: Odd indent";
        let item = parse_item_line(source, 1, 0).unwrap();
        assert_eq!(serialize_item(&item), source);
    }

    #[test]
    fn test_dirty_item_is_canonical() {
        let mut item = parse_item_line("   - [ ] `4` page: Odd indent", 1, 0).unwrap();
        item.indent = 2;
        item.visible_on_page = false;
        item.deleting = true;
        item.mark_dirty();
        assert_eq!(
            serialize_item(&item),
            "    - [~] `4` page: Odd indent #deleting"
        );
    }
}
