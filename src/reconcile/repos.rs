//! Enumeration of the repositories a run reconciles.

use std::collections::HashSet;

use super::ReconcileError;
use crate::cache::{Cache, keys};
use crate::github::GitHubApi;
use crate::types::{Org, Repo, User};

/// Which repositories are reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoFilter {
    /// Organizations whose repositories are included; empty means all.
    pub orgs: Vec<String>,
    /// Repository names never reconciled.
    pub skip: Vec<String>,
    /// If non-empty, only these repository names (or full names).
    pub only: Vec<String>,
    pub include_forks: bool,
    pub include_non_admin: bool,
}

impl RepoFilter {
    pub fn admits_org(&self, login: &str) -> bool {
        self.orgs.is_empty() || self.orgs.iter().any(|org| org == login)
    }

    pub fn admits(&self, repo: &Repo) -> bool {
        if self.skip.iter().any(|name| *name == repo.name) {
            return false;
        }
        if !self.only.is_empty()
            && !self
                .only
                .iter()
                .any(|name| *name == repo.name || *name == repo.full_name)
        {
            return false;
        }
        if repo.fork && !self.include_forks {
            return false;
        }
        repo.is_admin() || self.include_non_admin
    }
}

/// The authenticated user, cache-first.
pub fn authenticated_user(api: &dyn GitHubApi, cache: &Cache) -> Result<User, ReconcileError> {
    if let Some(user) = cache.get(keys::USER_DATA)? {
        return Ok(user);
    }

    log::info!("Getting user...");
    let user = api.authenticated_user()?;
    cache.put(keys::USER_DATA, &user)?;
    Ok(user)
}

/// Personal repositories followed by repositories of admitted organizations,
/// filtered and de-duplicated by full name. Every listing is cache-first.
pub fn list_repos(
    api: &dyn GitHubApi,
    cache: &Cache,
    filter: &RepoFilter,
) -> Result<Vec<Repo>, ReconcileError> {
    let mut repos: Vec<Repo> = match cache.get(keys::REPOS)? {
        Some(repos) => repos,
        None => {
            log::info!("Getting repos...");
            let repos = api.user_repos()?;
            cache.put(keys::REPOS, &repos)?;
            repos
        }
    };

    let orgs: Vec<Org> = match cache.get(keys::ORGS)? {
        Some(orgs) => orgs,
        None => {
            log::info!("Getting orgs...");
            let orgs = api.user_orgs()?;
            cache.put(keys::ORGS, &orgs)?;
            orgs
        }
    };

    for org in orgs.iter().filter(|org| filter.admits_org(&org.login)) {
        let key = keys::org_repos(&org.login);
        let org_repos: Vec<Repo> = match cache.get(&key)? {
            Some(org_repos) => org_repos,
            None => {
                log::info!("Getting org {}...", org.login);
                let org_repos = api.org_repos(&org.login)?;
                cache.put(&key, &org_repos)?;
                org_repos
            }
        };
        repos.extend(org_repos);
    }

    let mut seen = HashSet::new();
    repos.retain(|repo| seen.insert(repo.full_name.clone()));
    repos.retain(|repo| filter.admits(repo));
    Ok(repos)
}
