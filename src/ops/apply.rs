//! Executes a plan against a store, one step at a time, stopping at the
//! first failure.

use serde::Serialize;

use crate::model::item::{CollectionId, Item, ItemId};
use crate::ops::decode::Action;
use crate::ops::planner::{Plan, Slot, Step};
use crate::ops::store::{DeleteCommand, DeletionQueue, Store, StoreError};

/// A first store failure while applying a plan. Steps before it stay applied.
#[derive(Debug, thiserror::Error)]
#[error("{action} failed{}: {source}", .item.map(|id| format!(" on item {id}")).unwrap_or_default())]
pub struct ApplyError {
    pub action: Action,
    /// The item of the failing step, if it had one
    pub item: Option<ItemId>,
    /// Items already changed by earlier steps
    pub applied: Vec<ItemId>,
    /// Items whose steps were never attempted
    pub pending: Vec<ItemId>,
    #[source]
    pub source: StoreError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Duplicated {
    pub source: ItemId,
    pub id: ItemId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreatedContainer {
    pub collection: CollectionId,
    pub number: u32,
}

/// What a fully applied plan changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Items moved, updated or marked for deletion
    pub changed: Vec<ItemId>,
    pub created: Vec<Duplicated>,
    pub containers_created: Vec<CreatedContainer>,
    pub deletions: usize,
}

/// Execute a plan step by step, stopping at the first failure
pub fn apply(
    store: &mut dyn Store,
    queue: &dyn DeletionQueue,
    plan: &Plan,
) -> Result<ApplyReport, ApplyError> {
    let mut report = ApplyReport::default();
    let mut slots: Vec<ItemId> = Vec::new();
    let mut applied: Vec<ItemId> = Vec::new();

    for (i, step) in plan.steps.iter().enumerate() {
        let result = apply_step(store, queue, plan.collection, step, &mut slots, &mut report);
        if let Err(source) = result {
            let pending = plan.steps[i + 1..]
                .iter()
                .filter_map(Step::item_id)
                .collect();
            tracing::warn!(
                action = %plan.action,
                item = ?step.item_id(),
                error = %source,
                "batch step failed"
            );
            return Err(ApplyError {
                action: plan.action,
                item: step.item_id(),
                applied,
                pending,
                source,
            });
        }
        applied.extend(step.item_id());
    }

    Ok(report)
}

fn apply_step(
    store: &mut dyn Store,
    queue: &dyn DeletionQueue,
    collection: CollectionId,
    step: &Step,
    slots: &mut Vec<ItemId>,
    report: &mut ApplyReport,
) -> Result<(), StoreError> {
    match step {
        Step::CreateContainer { collection, number } => {
            store.create_container(*collection, *number)?;
            report.containers_created.push(CreatedContainer {
                collection: *collection,
                number: *number,
            });
        }
        Step::Relocate {
            item,
            from,
            to,
            source_sequence,
            target_sequence,
        } => {
            let source_sequence = source_sequence.as_deref();
            relocate(store, collection, item, *from, *to, source_sequence, target_sequence)?;
            report.changed.push(item.id);
        }
        Step::Update { item } => {
            store.update_item(item)?;
            report.changed.push(item.id);
        }
        Step::Duplicate {
            source,
            draft,
            slot,
            sequence,
        } => {
            let id = store.create_item(draft)?;
            if slots.len() <= *slot {
                slots.resize(*slot + 1, 0);
            }
            slots[*slot] = id;
            let resolved: Vec<ItemId> = sequence
                .iter()
                .map(|s| match s {
                    Slot::Existing(id) => *id,
                    Slot::Created(k) => slots.get(*k).copied().unwrap_or(id),
                })
                .collect();
            if let Err(e) = store.replace_sequence(draft.collection, draft.container, &resolved) {
                if let Err(discard) = store.discard_item(id) {
                    tracing::warn!(item = id, error = %discard, "could not discard unplaced copy");
                }
                return Err(e);
            }
            report.created.push(Duplicated { source: *source, id });
        }
        Step::Delete { collection, item } => {
            store.mark_deleting(*item)?;
            queue.enqueue(DeleteCommand::new(*collection, *item));
            report.changed.push(*item);
            report.deletions += 1;
        }
    }
    Ok(())
}

/// Write both sequences, then the item record. A failure after the source
/// sequence was written puts the previous sequences back.
fn relocate(
    store: &mut dyn Store,
    collection: CollectionId,
    item: &Item,
    from: u32,
    to: u32,
    source_sequence: Option<&[ItemId]>,
    target_sequence: &[ItemId],
) -> Result<(), StoreError> {
    let previous = store.containers(collection)?;
    let previous_of = |number: u32| {
        previous
            .iter()
            .find(|c| c.number == number)
            .map(|c| c.sequence.clone())
    };

    let mut restore: Vec<(u32, Vec<ItemId>)> = Vec::new();
    if let Some(seq) = source_sequence {
        store.replace_sequence(collection, from, seq)?;
        restore.extend(previous_of(from).map(|s| (from, s)));
    }

    let result = store
        .replace_sequence(collection, to, target_sequence)
        .and_then(|()| {
            restore.insert(0, (to, previous_of(to).unwrap_or_default()));
            store.update_item(item)
        });

    if let Err(e) = result {
        // Target first, so the source can take the item back
        for (number, seq) in restore {
            if let Err(undo) = store.replace_sequence(collection, number, &seq) {
                tracing::warn!(container = number, error = %undo, "could not restore sequence");
            }
        }
        return Err(e);
    }
    Ok(())
}
