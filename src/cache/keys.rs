//! Cache key layout
//!
//! Every observed fact lives under a key namespaced by entity kind and
//! repository identity:
//!
//! ```text
//! <cache root>/
//! ├── user-data.json
//! ├── repos.json
//! ├── orgs.json
//! ├── org-repos/
//! │   └── <org>.json
//! ├── repo-files/
//! │   └── <owner prefix><repo>.json    # flat root listing
//! ├── repo-dirs/
//! │   └── <owner prefix><repo>.json    # template directory name -> entries
//! └── repo-labels/
//!     └── <owner prefix><repo>.json
//! ```
//!
//! The owner prefix is `<org login>-` for organization-owned repositories and
//! empty otherwise.

use crate::types::Repo;

/// Authenticated user payload.
pub const USER_DATA: &str = "user-data.json";
/// Personal repository listing.
pub const REPOS: &str = "repos.json";
/// Organization listing.
pub const ORGS: &str = "orgs.json";

/// Repository listing for one organization: `org-repos/<org>.json`
pub fn org_repos(org: &str) -> String {
    format!("org-repos/{}.json", org)
}

/// Flat root listing of a repository: `repo-files/<prefix><repo>.json`
pub fn repo_files(repo: &Repo) -> String {
    format!("repo-files/{}.json", repo_stem(repo))
}

/// Expanded template directories of a repository: `repo-dirs/<prefix><repo>.json`
pub fn repo_dirs(repo: &Repo) -> String {
    format!("repo-dirs/{}.json", repo_stem(repo))
}

/// Label listing of a repository: `repo-labels/<prefix><repo>.json`
pub fn repo_labels(repo: &Repo) -> String {
    format!("repo-labels/{}.json", repo_stem(repo))
}

fn repo_stem(repo: &Repo) -> String {
    match repo.owner_login() {
        Some(login) if repo.is_org_owned() => format!("{}-{}", login, repo.name),
        _ => repo.name.clone(),
    }
}
