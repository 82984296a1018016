//! Desired state: the template set every repository should contain.
//!
//! All collections are ordered. Creation follows this order, so it is part of
//! the contract: files and directories are sorted by name when loaded from
//! disk, labels keep the order of `labels.json`.

mod load;

pub use load::{TemplateError, load};

/// A flat template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTemplate {
    pub name: String,
    pub content: String,
}

impl FileTemplate {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// One slot of a template directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirTemplateEntry {
    /// A file directly inside the directory.
    Leaf(String),
    /// A subdirectory holding flat files.
    Nested(Vec<FileTemplate>),
}

/// A template directory: `<name>/<leaf>` files and `<name>/<sub>/<file>` trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTemplate {
    pub name: String,
    pub entries: Vec<(String, DirTemplateEntry)>,
}

impl DirTemplate {
    /// Whether `name` is declared as a nested subdirectory of this template.
    pub fn declares_nested(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|(slot, entry)| slot == name && matches!(entry, DirTemplateEntry::Nested(_)))
    }
}

/// A label every repository should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTemplate {
    pub name: String,
    pub description: String,
    /// Six hex digits, no leading `#`.
    pub color: String,
}

/// The complete desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSet {
    pub files: Vec<FileTemplate>,
    pub dirs: Vec<DirTemplate>,
    pub labels: Vec<LabelTemplate>,
}

impl TemplateSet {
    #[cfg(test)]
    pub fn dir(&self, name: &str) -> Option<&DirTemplate> {
        self.dirs.iter().find(|dir| dir.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty() && self.labels.is_empty()
    }
}
