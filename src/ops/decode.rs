//! Turns a raw request payload into a validated operation and the item
//! records it applies to.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::item::{CollectionId, Item, ItemId};
use crate::ops::store::Store;

/// Error type for payload decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload has no action")]
    MissingAction,
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("payload has no itemIds list")]
    MissingItemIds,
    #[error("item id is not numeric: {0:?}")]
    InvalidId(String),
    #[error("{action} requires {parameter}")]
    MissingParameter {
        action: Action,
        parameter: &'static str,
    },
}

/// The bulk operations a batch can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveTo,
    Hide,
    Show,
    Duplicate,
    DuplicateTo,
    Delete,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::MoveLeft,
        Action::MoveRight,
        Action::MoveTo,
        Action::Hide,
        Action::Show,
        Action::Duplicate,
        Action::DuplicateTo,
        Action::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::MoveLeft => "move-left",
            Action::MoveRight => "move-right",
            Action::MoveTo => "move-to",
            Action::Hide => "hide",
            Action::Show => "show",
            Action::Duplicate => "duplicate",
            Action::DuplicateTo => "duplicate-to",
            Action::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where duplicated items land in the target collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetContainer {
    Number(u32),
    /// Each copy goes to the container with its source's number
    KeepOriginal,
}

/// A validated operation with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Change indentation by `delta` levels
    Indent { delta: i32 },
    MoveTo {
        target: u32,
        collection: Option<CollectionId>,
    },
    SetVisibility {
        visible: bool,
        on_page: Option<bool>,
    },
    /// Copy in place, after the last item of the source container
    Duplicate,
    DuplicateTo {
        collection: Option<CollectionId>,
        target: TargetContainer,
    },
    Delete,
}

/// A decoded request, item ids not yet resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub action: Action,
    pub operation: Operation,
    pub item_ids: Vec<ItemId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPayload {
    action: Option<String>,
    item_ids: Option<Vec<RawId>>,
    target: Option<u32>,
    target_collection: Option<CollectionId>,
    keep_original: Option<bool>,
    visible_on_page: Option<bool>,
}

/// Decode a JSON payload into a request
pub fn decode(payload: &str) -> Result<Request, DecodeError> {
    if payload.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    let value: serde_json::Value = serde_json::from_str(payload)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    let raw: RawPayload = serde_json::from_value(value)?;

    let action_name = raw.action.ok_or(DecodeError::MissingAction)?;
    let action = Action::parse(&action_name).ok_or(DecodeError::UnknownAction(action_name))?;

    let item_ids = raw
        .item_ids
        .ok_or(DecodeError::MissingItemIds)?
        .into_iter()
        .map(|id| match id {
            RawId::Number(n) => Ok(n),
            RawId::Text(s) => s.trim().parse().map_err(|_| DecodeError::InvalidId(s)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let missing = |parameter: &'static str| DecodeError::MissingParameter { action, parameter };
    let operation = match action {
        Action::MoveLeft => Operation::Indent { delta: -1 },
        Action::MoveRight => Operation::Indent { delta: 1 },
        Action::MoveTo => Operation::MoveTo {
            target: raw.target.ok_or_else(|| missing("target"))?,
            collection: raw.target_collection,
        },
        Action::Hide => Operation::SetVisibility {
            visible: false,
            on_page: None,
        },
        Action::Show => Operation::SetVisibility {
            visible: true,
            on_page: raw.visible_on_page,
        },
        Action::Duplicate => Operation::Duplicate,
        Action::DuplicateTo => {
            let target = if raw.keep_original == Some(true) {
                TargetContainer::KeepOriginal
            } else {
                TargetContainer::Number(
                    raw.target
                        .ok_or_else(|| missing("target or keepOriginal"))?,
                )
            };
            Operation::DuplicateTo {
                collection: raw.target_collection,
                target,
            }
        }
        Action::Delete => Operation::Delete,
    };

    Ok(Request {
        action,
        operation,
        item_ids,
    })
}

/// Item records a batch operates on
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub items: Vec<Item>,
    /// Ids that were unknown, foreign to the collection or already deleting
    pub dropped: usize,
}

/// Look up every id in the store. Repeated ids collapse to one; ids that
/// cannot take part in a batch are dropped and counted.
pub fn resolve(store: &dyn Store, collection: CollectionId, ids: &[ItemId]) -> Selection {
    let mut seen = HashSet::new();
    let mut selection = Selection::default();
    for &id in ids {
        if !seen.insert(id) {
            continue;
        }
        match store.item(id) {
            Some(item) if item.collection == collection && !item.deleting => {
                selection.items.push(item);
            }
            _ => selection.dropped += 1,
        }
    }
    selection
}
