use std::collections::HashSet;

use crate::model::catalog::Catalog;
use crate::model::collection::{Collection, CollectionSettings, Container};
use crate::model::item::{CollectionId, Item, ItemId};
use crate::ops::store::{Store, StoreError};

impl Catalog {
    fn collection(&self, id: CollectionId) -> Result<&Collection, StoreError> {
        self.get(id).ok_or(StoreError::UnknownCollection(id))
    }

    fn collection_mut(&mut self, id: CollectionId) -> Result<&mut Collection, StoreError> {
        self.get_mut(id).ok_or(StoreError::UnknownCollection(id))
    }

    /// The collection that holds an item record
    fn owner_of(&self, id: ItemId) -> Result<CollectionId, StoreError> {
        self.find_item(id)
            .map(|i| i.collection)
            .ok_or(StoreError::UnknownItem(id))
    }
}

impl Store for Catalog {
    fn settings(&self, collection: CollectionId) -> Result<CollectionSettings, StoreError> {
        Ok(self.collection(collection)?.settings)
    }

    fn containers(&self, collection: CollectionId) -> Result<Vec<Container>, StoreError> {
        Ok(self
            .collection(collection)?
            .containers()
            .into_iter()
            .cloned()
            .collect())
    }

    fn item(&self, id: ItemId) -> Option<Item> {
        self.find_item(id).cloned()
    }

    fn replace_sequence(
        &mut self,
        collection: CollectionId,
        number: u32,
        sequence: &[ItemId],
    ) -> Result<(), StoreError> {
        let c = self.collection_mut(collection)?;
        if c.container(number).is_none() {
            return Err(StoreError::UnknownContainer { collection, number });
        }

        let mut seen = HashSet::new();
        for &id in sequence {
            if !seen.insert(id) {
                return Err(StoreError::DuplicateInSequence(id));
            }
            if !c.items.contains_key(&id) {
                return Err(StoreError::ForeignItem {
                    item: id,
                    collection,
                });
            }
            if let Some((placed, _)) = c.locate(id)
                && placed != number
            {
                return Err(StoreError::AlreadyPlaced {
                    item: id,
                    container: placed,
                });
            }
        }

        c.set_sequence(number, sequence.to_vec());
        Ok(())
    }

    fn update_item(&mut self, item: &Item) -> Result<(), StoreError> {
        let owner = self.owner_of(item.id)?;
        if owner != item.collection {
            return Err(StoreError::ForeignItem {
                item: item.id,
                collection: item.collection,
            });
        }
        let c = self.collection_mut(owner)?;
        if c.container(item.container).is_none() {
            return Err(StoreError::UnknownContainer {
                collection: owner,
                number: item.container,
            });
        }
        if let Some(existing) = c.items.get_mut(&item.id)
            && existing != item
        {
            let source_text = existing.source_text.take();
            *existing = Item {
                source_text,
                dirty: true,
                ..item.clone()
            };
            c.dirty = true;
        }
        Ok(())
    }

    fn create_item(&mut self, draft: &Item) -> Result<ItemId, StoreError> {
        let id = self.next_item_id();
        let c = self.collection_mut(draft.collection)?;
        if c.container(draft.container).is_none() {
            return Err(StoreError::UnknownContainer {
                collection: draft.collection,
                number: draft.container,
            });
        }
        let item = Item {
            id,
            source_text: None,
            dirty: true,
            ..draft.clone()
        };
        c.items.insert(id, item);
        c.dirty = true;
        Ok(id)
    }

    fn create_container(
        &mut self,
        collection: CollectionId,
        number: u32,
    ) -> Result<(), StoreError> {
        let c = self.collection_mut(collection)?;
        if !c.ensure_container(number) {
            return Err(StoreError::ContainerExists { collection, number });
        }
        Ok(())
    }

    fn mark_deleting(&mut self, id: ItemId) -> Result<(), StoreError> {
        let owner = self.owner_of(id)?;
        let c = self.collection_mut(owner)?;
        if let Some(item) = c.items.get_mut(&id)
            && !item.deleting
        {
            item.deleting = true;
            item.mark_dirty();
            c.dirty = true;
        }
        Ok(())
    }

    fn discard_item(&mut self, id: ItemId) -> Result<(), StoreError> {
        let owner = self.owner_of(id)?;
        self.collection_mut(owner)?.remove_item(id);
        Ok(())
    }
}
