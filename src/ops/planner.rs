//! Computes the ordered list of structural changes for one batch.
//!
//! Every planner sorts its selection by container order first, so the plan
//! never depends on the order ids arrived in. Steps carry whole replacement
//! sequences computed against a working copy of the container index.

use std::collections::{BTreeSet, HashMap};

use crate::model::collection::CollectionSettings;
use crate::model::item::{CollectionId, Item, ItemId, Visibility};
use crate::ops::decode::{Action, TargetContainer};
use crate::ops::gate::GateVerdict;
use crate::ops::indent;
use crate::ops::index::ContainerIndex;

/// Error type for targets a plan cannot use
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("container {0} is not an allowed target")]
    Disallowed(u32),
    #[error("container {0} does not exist and new containers may not be created")]
    CreationDenied(u32),
    #[error("collection {collection} cannot hold more than {max} containers")]
    ContainerLimit { collection: CollectionId, max: u32 },
    #[error("copies may not keep their container numbers in collection {0}")]
    KeepOriginalDenied(CollectionId),
    #[error("items cannot be moved to another collection ({0})")]
    CrossCollectionMove(CollectionId),
}

/// A sequence entry that may refer to an item created earlier in the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Existing(ItemId),
    /// The item created by the duplicate step with this slot number
    Created(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    CreateContainer {
        collection: CollectionId,
        number: u32,
    },
    /// Move one item; `item` already carries its new container
    Relocate {
        item: Item,
        from: u32,
        to: u32,
        /// New source sequence, absent when nothing is removed from another container
        source_sequence: Option<Vec<ItemId>>,
        target_sequence: Vec<ItemId>,
    },
    /// Overwrite attributes of an item in place
    Update { item: Item },
    Duplicate {
        source: ItemId,
        draft: Item,
        slot: usize,
        /// New sequence of the container the copy lands in
        sequence: Vec<Slot>,
    },
    Delete {
        collection: CollectionId,
        item: ItemId,
    },
}

impl Step {
    /// The selected item this step acts on
    pub fn item_id(&self) -> Option<ItemId> {
        match self {
            Step::CreateContainer { .. } => None,
            Step::Relocate { item, .. } | Step::Update { item } => Some(item.id),
            Step::Duplicate { source, .. } => Some(*source),
            Step::Delete { item, .. } => Some(*item),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub action: Action,
    pub collection: CollectionId,
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(action: Action, collection: CollectionId) -> Self {
        Plan {
            action,
            collection,
            steps: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// The collection a move or copy lands in, with the gate's verdict on it
pub struct Destination<'a> {
    pub index: &'a ContainerIndex,
    pub settings: CollectionSettings,
    pub verdict: &'a GateVerdict,
}

impl Destination<'_> {
    fn collection(&self) -> CollectionId {
        self.index.collection()
    }

    fn check_capacity(&self, extra: usize) -> Result<(), PlanError> {
        match self.settings.max_containers {
            Some(max) if self.index.len() + extra > max as usize => {
                Err(PlanError::ContainerLimit {
                    collection: self.collection(),
                    max,
                })
            }
            _ => Ok(()),
        }
    }

    /// Where items aimed at `number` land, and whether that container must
    /// be created first. Only the next free number can be created.
    fn landing(&self, number: u32) -> Result<(u32, bool), PlanError> {
        if self.index.contains(number) {
            return if self.verdict.allows(number) {
                Ok((number, false))
            } else {
                Err(PlanError::Disallowed(number))
            };
        }
        if number != self.index.next_number() {
            return Err(PlanError::Disallowed(number));
        }
        if !self.verdict.create_new() {
            return Err(PlanError::CreationDenied(number));
        }
        self.check_capacity(1)?;
        if !self.verdict.allows(number) {
            return Err(PlanError::Disallowed(number));
        }
        Ok((number, true))
    }

    /// Containers to create so that every number in `needed` exists,
    /// ascending
    fn keep_original_creations(&self, needed: &BTreeSet<u32>) -> Result<Vec<u32>, PlanError> {
        if !self.verdict.keep_original() {
            return Err(PlanError::KeepOriginalDenied(self.collection()));
        }
        let Some(&highest) = needed.last() else {
            return Ok(Vec::new());
        };
        if let Some(&n) = needed
            .iter()
            .find(|&&n| self.index.contains(n) && !self.verdict.allows(n))
        {
            return Err(PlanError::Disallowed(n));
        }

        let missing: Vec<u32> = (0..=highest).filter(|&n| !self.index.contains(n)).collect();
        if missing.is_empty() {
            return Ok(missing);
        }
        if !self.verdict.create_new() {
            return Err(PlanError::CreationDenied(missing[0]));
        }
        self.check_capacity(missing.len())?;
        let next = self.index.next_number();
        if missing.contains(&next) && !self.verdict.allows(next) {
            return Err(PlanError::Disallowed(next));
        }
        Ok(missing)
    }
}

/// Working copies of container sequences, seeded lazily from the index
struct Sequences<'a, T> {
    index: &'a ContainerIndex,
    seqs: HashMap<u32, Vec<T>>,
    seed: fn(ItemId) -> T,
}

impl<'a, T> Sequences<'a, T> {
    fn new(index: &'a ContainerIndex, seed: fn(ItemId) -> T) -> Self {
        Sequences {
            index,
            seqs: HashMap::new(),
            seed,
        }
    }

    fn get(&mut self, number: u32) -> &mut Vec<T> {
        let index = self.index;
        let seed = self.seed;
        self.seqs.entry(number).or_insert_with(|| {
            index
                .sequence(number)
                .map(|s| s.iter().map(|&id| seed(id)).collect())
                .unwrap_or_default()
        })
    }
}

pub fn plan_indent(
    action: Action,
    source: &ContainerIndex,
    items: Vec<Item>,
    delta: i32,
    max: u32,
) -> Plan {
    let mut plan = Plan::new(action, source.collection());
    let mut items = source.container_order(items);
    let changed = indent::adjust(&mut items, delta, max);
    plan.steps = items
        .into_iter()
        .zip(changed)
        .filter(|(_, changed)| *changed)
        .map(|(item, _)| Step::Update { item })
        .collect();
    plan
}

/// Show or hide items. Hiding always takes the item off the page; the
/// stealth state is only produced when the collection allows it.
pub fn plan_visibility(
    action: Action,
    source: &ContainerIndex,
    settings: CollectionSettings,
    items: Vec<Item>,
    visible: bool,
    on_page: Option<bool>,
) -> Plan {
    let target = if !visible {
        Visibility::Hidden
    } else if on_page == Some(false) && settings.allow_stealth {
        Visibility::Stealth
    } else {
        Visibility::Shown
    };

    let mut plan = Plan::new(action, source.collection());
    for mut item in source.container_order(items) {
        if (item.visible, item.visible_on_page) == target.flags() {
            continue;
        }
        item.set_visibility(target);
        item.mark_dirty();
        plan.steps.push(Step::Update { item });
    }
    plan
}

/// Move items to the tail of one container of their own collection
pub fn plan_move_to(
    action: Action,
    dest: &Destination,
    items: Vec<Item>,
    target: u32,
) -> Result<Plan, PlanError> {
    let index = dest.index;
    let mut plan = Plan::new(action, index.collection());
    if items.is_empty() {
        return Ok(plan);
    }

    let (to, create) = dest.landing(target)?;
    if create {
        plan.steps.push(Step::CreateContainer {
            collection: index.collection(),
            number: to,
        });
    }

    let mut sequences = Sequences::new(index, |id| id);
    for mut item in index.container_order(items) {
        let placed = index.position(item.id).is_some();
        let from = index.container_of(&item);
        if placed && from == to && sequences.get(to).last() == Some(&item.id) {
            continue;
        }

        let source_sequence = if placed && from != to {
            let seq = sequences.get(from);
            seq.retain(|&id| id != item.id);
            Some(seq.clone())
        } else {
            None
        };
        let target_seq = sequences.get(to);
        target_seq.retain(|&id| id != item.id);
        target_seq.push(item.id);
        let target_sequence = target_seq.clone();

        item.container = to;
        plan.steps.push(Step::Relocate {
            item,
            from,
            to,
            source_sequence,
            target_sequence,
        });
    }
    Ok(plan)
}

/// Duplicate items in place, each copy after the last item of its source
/// container
pub fn plan_duplicate(
    action: Action,
    source: &ContainerIndex,
    settings: CollectionSettings,
    items: Vec<Item>,
    suffix: &str,
) -> Plan {
    let mut plan = Plan::new(action, source.collection());
    let items = source.container_order(items);
    let landings: Vec<u32> = items.iter().map(|i| source.container_of(i)).collect();
    push_duplicates(&mut plan, source, settings, items, &landings, suffix);
    plan
}

/// Duplicate items into a target container, possibly in another collection
pub fn plan_duplicate_to(
    action: Action,
    source: &ContainerIndex,
    dest: &Destination,
    items: Vec<Item>,
    target: TargetContainer,
    suffix: &str,
) -> Result<Plan, PlanError> {
    let mut plan = Plan::new(action, source.collection());
    if items.is_empty() {
        return Ok(plan);
    }
    let items = source.container_order(items);

    let landings: Vec<u32> = match target {
        TargetContainer::Number(n) => {
            let (to, create) = dest.landing(n)?;
            if create {
                plan.steps.push(Step::CreateContainer {
                    collection: dest.collection(),
                    number: to,
                });
            }
            vec![to; items.len()]
        }
        TargetContainer::KeepOriginal => {
            let landings: Vec<u32> = items.iter().map(|i| source.container_of(i)).collect();
            let needed: BTreeSet<u32> = landings.iter().copied().collect();
            for number in dest.keep_original_creations(&needed)? {
                plan.steps.push(Step::CreateContainer {
                    collection: dest.collection(),
                    number,
                });
            }
            landings
        }
    };

    push_duplicates(&mut plan, dest.index, dest.settings, items, &landings, suffix);
    Ok(plan)
}

fn push_duplicates(
    plan: &mut Plan,
    dest: &ContainerIndex,
    settings: CollectionSettings,
    items: Vec<Item>,
    landings: &[u32],
    suffix: &str,
) {
    let mut sequences = Sequences::new(dest, Slot::Existing);
    for (slot, (item, &to)) in items.iter().zip(landings).enumerate() {
        let draft = draft_copy(item, dest.collection(), to, settings, suffix);
        let seq = sequences.get(to);
        seq.push(Slot::Created(slot));
        plan.steps.push(Step::Duplicate {
            source: item.id,
            draft,
            slot,
            sequence: seq.clone(),
        });
    }
}

/// A copy of `item` ready to be created in the target container
fn draft_copy(
    item: &Item,
    collection: CollectionId,
    container: u32,
    settings: CollectionSettings,
    suffix: &str,
) -> Item {
    let mut draft = Item {
        collection,
        container,
        name: format!("{}{}", item.name, suffix),
        deleting: false,
        source_text: None,
        dirty: true,
        ..item.clone()
    };
    if !settings.allow_stealth && draft.visibility() == Visibility::Stealth {
        draft.set_visibility(Visibility::Shown);
    }
    draft
}

pub fn plan_delete(action: Action, source: &ContainerIndex, items: Vec<Item>) -> Plan {
    let mut plan = Plan::new(action, source.collection());
    plan.steps = source
        .container_order(items)
        .into_iter()
        .map(|item| Step::Delete {
            collection: item.collection,
            item: item.id,
        })
        .collect();
    plan
}
