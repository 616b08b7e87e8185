//! Indentation clamp for move-left and move-right.

use crate::model::item::Item;

/// Shift the indentation of every item by `delta`, clamped to `[0, max]`.
///
/// Only single-level steps are accepted; any other delta leaves every item
/// untouched. Returns, per item, whether its depth changed.
pub fn adjust(items: &mut [Item], delta: i32, max: u32) -> Vec<bool> {
    if delta != 1 && delta != -1 {
        return vec![false; items.len()];
    }
    items
        .iter_mut()
        .map(|item| {
            let depth = (i64::from(item.indent) + i64::from(delta)).clamp(0, i64::from(max));
            let depth = depth as u32;
            if depth == item.indent {
                return false;
            }
            item.indent = depth;
            item.mark_dirty();
            true
        })
        .collect()
}
