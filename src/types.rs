//! Remote entities observed through the GitHub API.
//!
//! Each type keeps the handful of fields the reconciler reads as typed fields
//! and carries every other field of the remote JSON in `extra`, so a value
//! written back to the cache is the same document the API returned.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of account owning a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccountKind {
    #[default]
    User,
    Organization,
    #[serde(untagged)]
    Other(String),
}

/// Owner of a repository as embedded in repository listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    #[serde(rename = "type", default)]
    pub kind: AccountKind,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Permissions the authenticated user holds on a repository.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub pull: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Read-only descriptor of a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub owner: Option<Account>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub permissions: Option<Permissions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Repo {
    /// Login of the owning account, if the listing carried one.
    pub fn owner_login(&self) -> Option<&str> {
        self.owner.as_ref().map(|owner| owner.login.as_str())
    }

    /// Whether the owning account is an organization.
    pub fn is_org_owned(&self) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|owner| owner.kind == AccountKind::Organization)
    }

    pub fn is_admin(&self) -> bool {
        self.permissions.as_ref().is_some_and(|p| p.admin)
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name)
    }
}

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Display name, falling back to the login when no name is set.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.login,
        }
    }
}

/// An organization the authenticated user belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Org {
    pub login: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Type of a repository content entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(untagged)]
    Other(String),
}

/// One entry of a repository's contents listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentEntry {
    /// Build a bare entry for `path`, deriving the name from its last segment.
    pub fn new(path: impl Into<String>, kind: EntryKind) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            name,
            path,
            kind,
            url: None,
            sha: None,
            extra: Map::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// An issue label present on a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Core API quota as reported by `/rate_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rate {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp (seconds) at which the quota resets.
    pub reset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub rate: Rate,
}
