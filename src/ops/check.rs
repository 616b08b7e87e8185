//! Structural integrity report over a loaded catalog.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::catalog::Catalog;
use crate::model::collection::Collection;
use crate::model::item::{CollectionId, ItemId, Visibility};

/// Structured result from `bm check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A structural error (something that must be fixed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// An item id appears in more than one place in the sequences
    #[serde(rename = "multiply_placed")]
    MultiplyPlaced {
        collection: CollectionId,
        item: ItemId,
        containers: Vec<u32>,
    },
    /// A sequence entry has no item record
    #[serde(rename = "missing_record")]
    MissingRecord {
        collection: CollectionId,
        container: u32,
        item: ItemId,
    },
    /// An item record is not placed in any sequence
    #[serde(rename = "unplaced")]
    Unplaced {
        collection: CollectionId,
        item: ItemId,
    },
    /// The same item id is used in several collections
    #[serde(rename = "duplicate_id")]
    DuplicateId {
        item: ItemId,
        collections: Vec<CollectionId>,
    },
    /// The record's container differs from the sequence holding it
    #[serde(rename = "container_mismatch")]
    ContainerMismatch {
        collection: CollectionId,
        item: ItemId,
        recorded: u32,
        placed: u32,
    },
}

/// A validation warning (non-critical issue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    #[serde(rename = "indent_too_deep")]
    IndentTooDeep {
        collection: CollectionId,
        item: ItemId,
        indent: u32,
        max: u32,
    },
    /// Stealth item in a collection that does not allow stealth
    #[serde(rename = "stealth_not_allowed")]
    StealthNotAllowed {
        collection: CollectionId,
        item: ItemId,
    },
    /// Hidden item still flagged as shown on the page
    #[serde(rename = "hidden_on_page")]
    HiddenOnPage {
        collection: CollectionId,
        item: ItemId,
    },
}

/// Validate every collection of a catalog. Read-only.
pub fn check_catalog(catalog: &Catalog, max_indent: u32) -> CheckResult {
    let mut result = CheckResult::default();

    for collection in catalog.collections() {
        check_collection(collection, max_indent, &mut result);
    }

    let mut owners: BTreeMap<ItemId, Vec<CollectionId>> = BTreeMap::new();
    for collection in catalog.collections() {
        for &id in collection.items.keys() {
            owners.entry(id).or_default().push(collection.id);
        }
    }
    for (item, collections) in owners {
        if collections.len() > 1 {
            result
                .errors
                .push(CheckError::DuplicateId { item, collections });
        }
    }

    result.valid = result.errors.is_empty();
    result
}

fn check_collection(collection: &Collection, max_indent: u32, result: &mut CheckResult) {
    let cid = collection.id;
    let mut placements: HashMap<ItemId, Vec<u32>> = HashMap::new();

    for container in collection.containers() {
        for &id in &container.sequence {
            placements.entry(id).or_default().push(container.number);
            if !collection.items.contains_key(&id) {
                result.errors.push(CheckError::MissingRecord {
                    collection: cid,
                    container: container.number,
                    item: id,
                });
            }
        }
    }

    for item in collection.items.values() {
        match placements.get(&item.id).map(Vec::as_slice) {
            None | Some([]) => result.errors.push(CheckError::Unplaced {
                collection: cid,
                item: item.id,
            }),
            Some([placed]) if *placed != item.container => {
                result.errors.push(CheckError::ContainerMismatch {
                    collection: cid,
                    item: item.id,
                    recorded: item.container,
                    placed: *placed,
                });
            }
            Some([_]) => {}
            Some(many) => result.errors.push(CheckError::MultiplyPlaced {
                collection: cid,
                item: item.id,
                containers: many.to_vec(),
            }),
        }

        if item.indent > max_indent {
            result.warnings.push(CheckWarning::IndentTooDeep {
                collection: cid,
                item: item.id,
                indent: item.indent,
                max: max_indent,
            });
        }
        if !item.visible && item.visible_on_page {
            result.warnings.push(CheckWarning::HiddenOnPage {
                collection: cid,
                item: item.id,
            });
        }
        if !collection.settings.allow_stealth && item.visibility() == Visibility::Stealth {
            result.warnings.push(CheckWarning::StealthNotAllowed {
                collection: cid,
                item: item.id,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::collection::CollectionSettings;
    use crate::model::item::{Item, MAX_DEPTH};
    use crate::ops::test_helpers::sample_catalog;
    use crate::parse::parse_collection;

    #[test]
    fn test_check_clean_catalog() {
        let result = check_catalog(&sample_catalog(), MAX_DEPTH);
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_check_structural_errors() {
        let mut catalog = sample_catalog();
        let c = catalog.get_mut(1).unwrap();
        // 12 sits in two containers, 999 has no record
        c.set_sequence(2, vec![21, 12, 999]);
        // 41 claims container 2 but is placed in 4
        c.items.get_mut(&41).unwrap().container = 2;
        // 50 has a record but no place
        c.items.insert(50, Item::new(50, 1, 0, "page", "Stray"));

        let result = check_catalog(&catalog, MAX_DEPTH);
        assert!(!result.valid);
        assert!(result.errors.contains(&CheckError::MultiplyPlaced {
            collection: 1,
            item: 12,
            containers: vec![1, 2],
        }));
        assert!(result.errors.contains(&CheckError::MissingRecord {
            collection: 1,
            container: 2,
            item: 999,
        }));
        assert!(result.errors.contains(&CheckError::ContainerMismatch {
            collection: 1,
            item: 41,
            recorded: 2,
            placed: 4,
        }));
        assert!(result.errors.contains(&CheckError::Unplaced {
            collection: 1,
            item: 50,
        }));
        assert_eq!(result.errors.len(), 4);
    }

    #[test]
    fn test_check_duplicate_id_across_collections() {
        let mut catalog = sample_catalog();
        catalog.insert(parse_collection(
            "# Copy\n\n## 0\n\n- [ ] `11` page: Clash\n",
            3,
            CollectionSettings::default(),
        ));
        let result = check_catalog(&catalog, MAX_DEPTH);
        assert_eq!(
            result.errors,
            vec![CheckError::DuplicateId {
                item: 11,
                collections: vec![1, 3],
            }]
        );
    }

    #[test]
    fn test_check_warnings() {
        let mut catalog = sample_catalog();
        {
            let c = catalog.get_mut(1).unwrap();
            c.items.get_mut(&11).unwrap().indent = 20;
            let hidden = c.items.get_mut(&14).unwrap();
            hidden.visible_on_page = true;
        }
        {
            let c = catalog.get_mut(2).unwrap();
            c.items.get_mut(&201).unwrap().visible_on_page = false;
        }

        let result = check_catalog(&catalog, MAX_DEPTH);
        assert!(result.valid);
        assert_eq!(
            result.warnings,
            vec![
                CheckWarning::IndentTooDeep {
                    collection: 1,
                    item: 11,
                    indent: 20,
                    max: 16,
                },
                CheckWarning::HiddenOnPage {
                    collection: 1,
                    item: 14,
                },
                CheckWarning::StealthNotAllowed {
                    collection: 2,
                    item: 201,
                },
            ]
        );
    }

    #[test]
    fn test_check_result_serializes_to_json() {
        let result = CheckResult {
            valid: false,
            errors: vec![CheckError::Unplaced {
                collection: 1,
                item: 7,
            }],
            warnings: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["errors"][0]["type"], "unplaced");
        assert_eq!(json["errors"][0]["item"], 7);
    }
}
