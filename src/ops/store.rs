//! Collaborator interfaces the batch engine reads from and writes to.

use std::sync::mpsc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::collection::{CollectionSettings, Container};
use crate::model::item::{CollectionId, Item, ItemId};

/// Error type for store reads and writes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    UnknownCollection(CollectionId),
    #[error("container {number} not found in collection {collection}")]
    UnknownContainer {
        collection: CollectionId,
        number: u32,
    },
    #[error("container {number} already exists in collection {collection}")]
    ContainerExists {
        collection: CollectionId,
        number: u32,
    },
    #[error("item not found: {0}")]
    UnknownItem(ItemId),
    #[error("item {item} does not belong to collection {collection}")]
    ForeignItem {
        item: ItemId,
        collection: CollectionId,
    },
    #[error("item {0} appears twice in the new sequence")]
    DuplicateInSequence(ItemId),
    #[error("item {item} is still placed in container {container}")]
    AlreadyPlaced { item: ItemId, container: u32 },
}

/// The authoritative record of collections, containers and items.
///
/// Sequence writes are whole replacements. Implementations reject any write
/// that would place an item in two containers at once.
pub trait Store {
    fn settings(&self, collection: CollectionId) -> Result<CollectionSettings, StoreError>;

    /// Snapshot of every container of a collection, ascending by number
    fn containers(&self, collection: CollectionId) -> Result<Vec<Container>, StoreError>;

    fn item(&self, id: ItemId) -> Option<Item>;

    fn replace_sequence(
        &mut self,
        collection: CollectionId,
        number: u32,
        sequence: &[ItemId],
    ) -> Result<(), StoreError>;

    /// Overwrite the attributes of an existing item
    fn update_item(&mut self, item: &Item) -> Result<(), StoreError>;

    /// Create a new item from `draft` (its id is ignored) and return the fresh id.
    /// The item is not placed in any sequence.
    fn create_item(&mut self, draft: &Item) -> Result<ItemId, StoreError>;

    fn create_container(&mut self, collection: CollectionId, number: u32)
    -> Result<(), StoreError>;

    fn mark_deleting(&mut self, id: ItemId) -> Result<(), StoreError>;

    /// Drop an item record and any sequence entry pointing at it
    fn discard_item(&mut self, id: ItemId) -> Result<(), StoreError>;
}

/// A request for the deletion subsystem to remove one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCommand {
    pub collection: CollectionId,
    pub item: ItemId,
    pub requested_at: DateTime<Utc>,
}

impl DeleteCommand {
    pub fn new(collection: CollectionId, item: ItemId) -> Self {
        DeleteCommand {
            collection,
            item,
            requested_at: Utc::now(),
        }
    }
}

/// One-way channel to the asynchronous deletion subsystem.
/// Enqueueing never waits for the deletion itself.
pub trait DeletionQueue {
    fn enqueue(&self, command: DeleteCommand);
}

/// Deletion queue backed by an mpsc channel
pub struct ChannelQueue {
    sender: mpsc::Sender<DeleteCommand>,
}

impl ChannelQueue {
    pub fn channel() -> (Self, mpsc::Receiver<DeleteCommand>) {
        let (sender, receiver) = mpsc::channel();
        (ChannelQueue { sender }, receiver)
    }
}

impl DeletionQueue for ChannelQueue {
    fn enqueue(&self, command: DeleteCommand) {
        let item = command.item;
        if self.sender.send(command).is_err() {
            tracing::warn!(item, "deletion receiver gone, command dropped");
        }
    }
}
