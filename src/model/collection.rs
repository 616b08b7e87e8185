use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::item::{CollectionId, Item, ItemId};

/// Per-collection policy flags, read from `workspace.toml`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Whether items may be available but not shown on the collection page
    #[serde(default)]
    pub allow_stealth: bool,
    /// Upper bound on the number of containers; `None` is unbounded
    #[serde(default)]
    pub max_containers: Option<u32>,
}

/// An ordered bucket of items (a section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Container number, also its position among siblings
    pub number: u32,
    /// Display name from the `## <number> <name>` header
    pub name: Option<String>,
    /// Authoritative item order
    pub sequence: Vec<ItemId>,
}

impl Container {
    pub fn new(number: u32) -> Self {
        Container {
            number,
            name: None,
            sequence: Vec::new(),
        }
    }

    /// The `## ...` header line for this container
    pub fn header(&self) -> String {
        match &self.name {
            Some(name) => format!("## {} {}", self.number, name),
            None => format!("## {}", self.number),
        }
    }
}

/// A content node in the collection file: either a container or literal text
#[derive(Debug, Clone)]
pub enum CollectionNode {
    /// A literal text block (title, description, notes, blank lines)
    Literal(Vec<String>),
    /// A container section
    Section {
        container: Container,
        /// The header line plus blank lines before the first item
        header_lines: Vec<String>,
        /// Blank lines after the last item
        trailing_lines: Vec<String>,
        /// Whether the sequence has been rewritten since parsing
        dirty: bool,
    },
}

/// A parsed collection file
#[derive(Debug, Clone)]
pub struct Collection {
    pub id: CollectionId,
    /// Title from the `# Title` line
    pub title: String,
    /// Description from the `> description` line
    pub description: Option<String>,
    pub settings: CollectionSettings,
    /// All nodes in the file, in order
    pub nodes: Vec<CollectionNode>,
    /// Item records keyed by id, in file order
    pub items: IndexMap<ItemId, Item>,
    /// Whether the source ended with a newline
    pub trailing_newline: bool,
    /// Whether anything changed since load
    pub dirty: bool,
}

impl Collection {
    /// Create an empty collection holding only the implicit container 0
    pub fn new(id: CollectionId, title: impl Into<String>) -> Self {
        let title = title.into();
        Collection {
            id,
            nodes: vec![
                CollectionNode::Literal(vec![format!("# {}", title), String::new()]),
                CollectionNode::Section {
                    container: Container::new(0),
                    header_lines: vec!["## 0".to_string(), String::new()],
                    trailing_lines: Vec::new(),
                    dirty: false,
                },
            ],
            title,
            description: None,
            settings: CollectionSettings::default(),
            items: IndexMap::new(),
            trailing_newline: true,
            dirty: true,
        }
    }

    /// All containers, ascending by number
    pub fn containers(&self) -> Vec<&Container> {
        let mut containers: Vec<&Container> = self
            .nodes
            .iter()
            .filter_map(|n| match n {
                CollectionNode::Section { container, .. } => Some(container),
                CollectionNode::Literal(_) => None,
            })
            .collect();
        containers.sort_by_key(|c| c.number);
        containers
    }

    pub fn container(&self, number: u32) -> Option<&Container> {
        self.nodes.iter().find_map(|n| match n {
            CollectionNode::Section { container, .. } if container.number == number => {
                Some(container)
            }
            _ => None,
        })
    }

    /// Replace the sequence of a container, marking it for canonical emission.
    /// Returns false if the container does not exist.
    pub fn set_sequence(&mut self, number: u32, sequence: Vec<ItemId>) -> bool {
        for node in &mut self.nodes {
            if let CollectionNode::Section {
                container, dirty, ..
            } = node
                && container.number == number
            {
                if container.sequence != sequence {
                    container.sequence = sequence;
                    *dirty = true;
                    self.dirty = true;
                }
                return true;
            }
        }
        false
    }

    /// Find the container number and position of an item in the sequences
    pub fn locate(&self, id: ItemId) -> Option<(u32, usize)> {
        self.containers().into_iter().find_map(|c| {
            c.sequence
                .iter()
                .position(|&i| i == id)
                .map(|pos| (c.number, pos))
        })
    }

    /// Items of a container in sequence order (entries without a record are skipped)
    pub fn items_in(&self, number: u32) -> Vec<&Item> {
        self.container(number)
            .map(|c| c.sequence.iter().filter_map(|id| self.items.get(id)).collect())
            .unwrap_or_default()
    }

    /// The number a newly created container would receive
    pub fn next_container_number(&self) -> u32 {
        self.containers()
            .last()
            .map(|c| c.number + 1)
            .unwrap_or(0)
    }

    /// Ensure a container exists, creating an empty one if missing.
    /// New containers are inserted before the first container with a higher number.
    /// Returns true if a container was created.
    pub fn ensure_container(&mut self, number: u32) -> bool {
        if self.container(number).is_some() {
            return false;
        }
        let new_node = CollectionNode::Section {
            container: Container::new(number),
            header_lines: vec![format!("## {}", number), String::new()],
            trailing_lines: Vec::new(),
            dirty: true,
        };
        let insert_pos = self
            .nodes
            .iter()
            .position(|n| {
                matches!(n, CollectionNode::Section { container, .. } if container.number > number)
            })
            .unwrap_or(self.nodes.len());
        self.nodes.insert(insert_pos, new_node);
        self.dirty = true;
        true
    }

    /// Remove an item record and every sequence entry pointing at it
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let removed = self.items.shift_remove(&id);
        for node in &mut self.nodes {
            if let CollectionNode::Section {
                container, dirty, ..
            } = node
                && container.sequence.contains(&id)
            {
                container.sequence.retain(|&i| i != id);
                *dirty = true;
            }
        }
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }
}
