//! GitHub REST API surface consumed by the reconciler

mod client;
mod error;

pub use client::{DEFAULT_API_URL, GitHubClient};
pub use error::ApiError;

use crate::types::{ContentEntry, Label, Org, RateLimit, Repo, User};

/// A label to create on a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLabel<'a> {
    pub name: &'a str,
    pub color: &'a str,
    pub description: &'a str,
}

/// Remote operations the reconciler needs.
///
/// Every call is a single bounded request (or a bounded sequence of page
/// requests for listings); there are no retries.
pub trait GitHubApi: Send + Sync {
    /// The authenticated user.
    fn authenticated_user(&self) -> Result<User, ApiError>;

    /// Repositories owned by the authenticated user.
    fn user_repos(&self) -> Result<Vec<Repo>, ApiError>;

    /// Organizations the authenticated user belongs to.
    fn user_orgs(&self) -> Result<Vec<Org>, ApiError>;

    /// Repositories of one organization.
    fn org_repos(&self, org: &str) -> Result<Vec<Repo>, ApiError>;

    /// Entries of the directory at `path` (`""` for the repository root).
    fn list_contents(&self, owner: &str, repo: &str, path: &str)
    -> Result<Vec<ContentEntry>, ApiError>;

    fn list_labels(&self, owner: &str, repo: &str) -> Result<Vec<Label>, ApiError>;

    fn create_label(&self, owner: &str, repo: &str, label: &NewLabel<'_>)
    -> Result<Label, ApiError>;

    /// Create (or overwrite) the file at `path` with already base64-encoded
    /// content, returning the descriptor of the written file.
    fn put_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content_base64: &str,
        message: &str,
    ) -> Result<ContentEntry, ApiError>;

    fn rate_limit(&self) -> Result<RateLimit, ApiError>;
}
