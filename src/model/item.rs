use serde::{Deserialize, Serialize};

/// Identifier of a collection (course)
pub type CollectionId = u64;

/// Identifier of an item, unique across every collection in a workspace
pub type ItemId = u64;

/// Upper bound on indentation depth
pub const MAX_DEPTH: u32 = 16;

/// How an item presents itself on the collection page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Available and listed on the page
    Shown,
    /// Available through direct access but not listed on the page
    Stealth,
    /// Not available to participants
    Hidden,
}

impl Visibility {
    /// The character used inside the checkbox `[ ]`
    pub fn checkbox_char(self) -> char {
        match self {
            Visibility::Shown => ' ',
            Visibility::Stealth => '~',
            Visibility::Hidden => '-',
        }
    }

    /// Parse a checkbox character into a visibility
    pub fn from_checkbox_char(c: char) -> Option<Visibility> {
        match c {
            ' ' => Some(Visibility::Shown),
            '~' => Some(Visibility::Stealth),
            '-' => Some(Visibility::Hidden),
            _ => None,
        }
    }

    /// The `(visible, visible_on_page)` flag pair for this visibility
    pub fn flags(self) -> (bool, bool) {
        match self {
            Visibility::Shown => (true, true),
            Visibility::Stealth => (true, false),
            Visibility::Hidden => (false, false),
        }
    }
}

/// An activity or resource placed in a container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Owning collection
    pub collection: CollectionId,
    /// Owning container number
    pub container: u32,
    /// Type tag, e.g. `forum` or `quiz`
    pub kind: String,
    /// Display name
    pub name: String,
    /// Indentation depth (0 = flush left)
    pub indent: u32,
    pub visible: bool,
    pub visible_on_page: bool,
    /// Set when an asynchronous deletion has been requested
    pub deleting: bool,

    // --- Source tracking ---
    /// The original source line for this item (for verbatim emission)
    #[serde(skip)]
    pub source_text: Option<String>,
    /// Whether this item has been modified since parsing
    #[serde(skip)]
    pub dirty: bool,
}

impl Item {
    /// Create a new shown item at depth 0, marked dirty (no source)
    pub fn new(
        id: ItemId,
        collection: CollectionId,
        container: u32,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Item {
            id,
            collection,
            container,
            kind: kind.into(),
            name: name.into(),
            indent: 0,
            visible: true,
            visible_on_page: true,
            deleting: false,
            source_text: None,
            dirty: true,
        }
    }

    pub fn visibility(&self) -> Visibility {
        match (self.visible, self.visible_on_page) {
            (false, _) => Visibility::Hidden,
            (true, true) => Visibility::Shown,
            (true, false) => Visibility::Stealth,
        }
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        let (visible, on_page) = visibility.flags();
        self.visible = visible;
        self.visible_on_page = on_page;
    }

    /// Mark this item as dirty (will be serialized in canonical format)
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.collection == other.collection
            && self.container == other.container
            && self.kind == other.kind
            && self.name == other.name
            && self.indent == other.indent
            && self.visible == other.visible
            && self.visible_on_page == other.visible_on_page
            && self.deleting == other.deleting
    }
}

impl Eq for Item {}
