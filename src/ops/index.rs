//! Snapshot of a collection's containers and the container-order sort.

use std::collections::HashMap;

use crate::model::collection::Container;
use crate::model::item::{CollectionId, Item, ItemId};
use crate::ops::store::{Store, StoreError};

/// Read model of one collection's containers, taken once per batch.
///
/// The index is never mutated; plans carry whole replacement sequences
/// computed against it.
#[derive(Debug, Clone)]
pub struct ContainerIndex {
    collection: CollectionId,
    /// Ascending by number
    containers: Vec<Container>,
    positions: HashMap<ItemId, (u32, usize)>,
}

impl ContainerIndex {
    pub fn build(store: &dyn Store, collection: CollectionId) -> Result<Self, StoreError> {
        Ok(ContainerIndex::from_containers(
            collection,
            store.containers(collection)?,
        ))
    }

    pub fn from_containers(collection: CollectionId, mut containers: Vec<Container>) -> Self {
        containers.sort_by_key(|c| c.number);
        let mut positions = HashMap::new();
        for c in &containers {
            for (pos, &id) in c.sequence.iter().enumerate() {
                positions.entry(id).or_insert((c.number, pos));
            }
        }
        ContainerIndex {
            collection,
            containers,
            positions,
        }
    }

    pub fn collection(&self) -> CollectionId {
        self.collection
    }

    pub fn numbers(&self) -> Vec<u32> {
        self.containers.iter().map(|c| c.number).collect()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn contains(&self, number: u32) -> bool {
        self.sequence(number).is_some()
    }

    pub fn sequence(&self, number: u32) -> Option<&[ItemId]> {
        self.containers
            .iter()
            .find(|c| c.number == number)
            .map(|c| c.sequence.as_slice())
    }

    /// Container number and position of a placed item
    pub fn position(&self, id: ItemId) -> Option<(u32, usize)> {
        self.positions.get(&id).copied()
    }

    /// The number a newly created container would receive
    pub fn next_number(&self) -> u32 {
        self.containers.last().map(|c| c.number + 1).unwrap_or(0)
    }

    /// The container an item actually sits in, falling back to its record
    pub fn container_of(&self, item: &Item) -> u32 {
        self.position(item.id)
            .map(|(number, _)| number)
            .unwrap_or(item.container)
    }

    /// Sort items by container number, then by position in that container's
    /// sequence. Items missing from every sequence go after the placed items
    /// of their recorded container, ordered by id.
    pub fn container_order(&self, mut items: Vec<Item>) -> Vec<Item> {
        items.sort_by_key(|item| match self.position(item.id) {
            Some((number, pos)) => (number, pos, item.id),
            None => (item.container, usize::MAX, item.id),
        });
        items
    }
}
