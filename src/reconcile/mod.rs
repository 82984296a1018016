//! Reconciliation engine: observe each repository, diff against the template
//! set, and create whatever is missing.

mod create;
pub mod diff;
mod fetch;
mod placeholders;
mod repos;
#[cfg(test)]
mod testing;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::cache::{Cache, CacheError};
use crate::github::{ApiError, GitHubApi};
use crate::ledger::Ledger;
use crate::templates::TemplateSet;
use crate::types::{ContentEntry, Label, Repo, User};

pub use create::{Creator, RepoReport};
pub use fetch::Fetcher;
pub use placeholders::Placeholders;
pub use repos::{RepoFilter, authenticated_user, list_repos};

/// Template directory name -> entries observed there (subdirectories the
/// template declares as nested are flattened into the same sequence).
pub type ObservedDirs = BTreeMap<String, Vec<ContentEntry>>;

/// Errors that end the reconciliation of one repository.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Fetching observed state failed; the repository is skipped.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// The cache could not be read or written; the run cannot continue.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Everything observed about one repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observed {
    pub files: Vec<ContentEntry>,
    pub dirs: ObservedDirs,
    pub labels: Vec<Label>,
}

/// A repository together with the login its API calls are addressed to.
#[derive(Debug, Clone, Copy)]
pub struct RepoContext<'a> {
    pub repo: &'a Repo,
    pub owner: &'a str,
}

impl<'a> RepoContext<'a> {
    /// Address calls to the repository owner, or the authenticated user when
    /// the listing carried no owner.
    pub fn new(repo: &'a Repo, user: &'a User) -> Self {
        Self {
            repo,
            owner: repo.owner_login().unwrap_or(&user.login),
        }
    }

    pub fn name(&self) -> &'a str {
        &self.repo.name
    }
}

/// Items a repository is missing, without creating them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoPlan {
    pub repo: String,
    pub files: Vec<String>,
    pub dir_paths: Vec<String>,
    pub labels: Vec<String>,
}

impl RepoPlan {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dir_paths.is_empty() && self.labels.is_empty()
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub repos: usize,
    pub created: usize,
    pub labels: usize,
    pub failed: usize,
    /// Repositories whose observed state could not be fetched.
    pub skipped: Vec<String>,
    /// The run ended early on a stop request.
    pub stopped: bool,
}

/// Drives reconciliation over a sequence of repositories, one at a time.
pub struct Engine<'a> {
    api: &'a dyn GitHubApi,
    cache: &'a Cache,
    ledger: &'a Ledger,
    templates: &'a TemplateSet,
}

impl<'a> Engine<'a> {
    pub fn new(
        api: &'a dyn GitHubApi,
        cache: &'a Cache,
        ledger: &'a Ledger,
        templates: &'a TemplateSet,
    ) -> Self {
        Self {
            api,
            cache,
            ledger,
            templates,
        }
    }

    /// Bring one repository up to the template set.
    pub fn reconcile(&self, repo: &Repo, user: &User) -> Result<RepoReport, ReconcileError> {
        let ctx = RepoContext::new(repo, user);
        let Observed {
            mut files,
            mut dirs,
            mut labels,
        } = Fetcher::new(self.api, self.cache).observe(&ctx, self.templates)?;

        let mut creator = Creator::new(
            self.api,
            self.cache,
            self.ledger,
            ctx,
            Placeholders::for_repo(repo, user),
        );
        creator.create_files(&self.templates.files, &mut files)?;
        creator.create_dirs(&self.templates.dirs, &mut dirs)?;
        creator.create_labels(&self.templates.labels, &mut labels)?;
        Ok(creator.finish())
    }

    /// Compute what `reconcile` would create for one repository.
    pub fn plan(&self, repo: &Repo, user: &User) -> Result<RepoPlan, ReconcileError> {
        let ctx = RepoContext::new(repo, user);
        let observed = Fetcher::new(self.api, self.cache).observe(&ctx, self.templates)?;

        Ok(RepoPlan {
            repo: repo.full_name.clone(),
            files: diff::missing_files(&self.templates.files, &observed.files)
                .into_iter()
                .map(|template| template.name.clone())
                .collect(),
            dir_paths: diff::missing_dir_items(&self.templates.dirs, &observed.dirs)
                .into_iter()
                .map(|item| item.path)
                .collect(),
            labels: diff::missing_labels(&self.templates.labels, &observed.labels)
                .into_iter()
                .map(|label| label.name.clone())
                .collect(),
        })
    }

    /// Reconcile every repository in order.
    ///
    /// A repository whose state cannot be fetched is logged, recorded, and
    /// skipped. A cache failure ends the run. `stop` is checked between
    /// repositories.
    pub fn run(
        &self,
        repos: &[Repo],
        user: &User,
        stop: &AtomicBool,
    ) -> Result<RunSummary, ReconcileError> {
        let mut summary = RunSummary::default();

        for repo in repos {
            if stop.load(Ordering::SeqCst) {
                log::info!("Stop requested, ending run before {}", repo);
                summary.stopped = true;
                break;
            }

            log::info!("Reconciling {}", repo);
            match self.reconcile(repo, user) {
                Ok(report) => {
                    summary.repos += 1;
                    summary.created += report.created.len();
                    summary.labels += report.labels.len();
                    summary.failed += report.failed.len();
                }
                Err(ReconcileError::Api(e)) => {
                    log::warn!("Could not get {} state: {}", repo, e);
                    if let Err(ledger_err) = self.ledger.record_error(&repo.name, "fetch", &e.to_string()) {
                        log::warn!("Failed to record error for {}: {}", repo, ledger_err);
                    }
                    summary.skipped.push(repo.full_name.clone());
                }
                Err(e) => return Err(e),
            }

            self.log_rate_limit();
        }

        Ok(summary)
    }

    fn log_rate_limit(&self) {
        match self.api.rate_limit() {
            Ok(limit) => {
                let now = chrono::Utc::now().timestamp();
                let minutes = (limit.rate.reset - now).max(0) / 60;
                log::info!(
                    "{} requests remaining out of {}. Resets in {} minutes",
                    limit.rate.remaining,
                    limit.rate.limit,
                    minutes
                );
            }
            Err(e) => log::debug!("Could not get rate limit: {}", e),
        }
    }
}
