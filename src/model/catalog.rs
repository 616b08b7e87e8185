use indexmap::IndexMap;

use super::collection::Collection;
use super::item::{CollectionId, Item, ItemId};

/// Every loaded collection of a workspace, keyed by collection id
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    collections: IndexMap<CollectionId, Collection>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Add or replace a collection
    pub fn insert(&mut self, collection: Collection) {
        self.collections.insert(collection.id, collection);
    }

    pub fn get(&self, id: CollectionId) -> Option<&Collection> {
        self.collections.get(&id)
    }

    pub fn get_mut(&mut self, id: CollectionId) -> Option<&mut Collection> {
        self.collections.get_mut(&id)
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    pub fn collections_mut(&mut self) -> impl Iterator<Item = &mut Collection> {
        self.collections.values_mut()
    }

    /// Find an item record in any collection
    pub fn find_item(&self, id: ItemId) -> Option<&Item> {
        self.collections.values().find_map(|c| c.items.get(&id))
    }

    /// The next free item id: one past the highest id in any collection
    pub fn next_item_id(&self) -> ItemId {
        self.collections
            .values()
            .flat_map(|c| c.items.keys())
            .max()
            .map(|max| max + 1)
            .unwrap_or(1)
    }

    /// Remove an item that is marked for deletion. Returns false if the item
    /// is missing or was never flagged.
    pub fn purge_item(&mut self, collection: CollectionId, id: ItemId) -> bool {
        let Some(c) = self.collections.get_mut(&collection) else {
            return false;
        };
        if !c.items.get(&id).is_some_and(|i| i.deleting) {
            return false;
        }
        c.remove_item(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let mut first = Collection::new(1, "First");
        first.items.insert(4, Item::new(4, 1, 0, "page", "Four"));
        first.set_sequence(0, vec![4]);
        let mut second = Collection::new(2, "Second");
        second.items.insert(9, Item::new(9, 2, 0, "quiz", "Nine"));
        second.set_sequence(0, vec![9]);

        let mut catalog = Catalog::new();
        catalog.insert(first);
        catalog.insert(second);
        catalog
    }

    #[test]
    fn test_next_item_id_spans_collections() {
        assert_eq!(catalog().next_item_id(), 10);
        assert_eq!(Catalog::new().next_item_id(), 1);
    }

    #[test]
    fn test_find_item() {
        let catalog = catalog();
        assert_eq!(catalog.find_item(9).map(|i| i.collection), Some(2));
        assert!(catalog.find_item(5).is_none());
    }

    #[test]
    fn test_purge_requires_deleting_flag() {
        let mut catalog = catalog();
        assert!(!catalog.purge_item(1, 4));

        catalog.get_mut(1).unwrap().items.get_mut(&4).unwrap().deleting = true;
        assert!(catalog.purge_item(1, 4));
        assert!(catalog.find_item(4).is_none());
        assert!(catalog.get(1).unwrap().container(0).unwrap().sequence.is_empty());
    }
}
