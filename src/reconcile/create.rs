//! Creation of missing items, keeping the cache in step after every create.

use base64::Engine as _;
use base64::prelude::BASE64_STANDARD;

use super::{ObservedDirs, Placeholders, RepoContext, diff};
use crate::cache::{Cache, CacheError, keys};
use crate::github::{GitHubApi, NewLabel};
use crate::ledger::Ledger;
use crate::templates::{DirTemplate, FileTemplate, LabelTemplate};
use crate::types::{ContentEntry, Label};

/// Outcome of creating one repository's missing items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoReport {
    /// Paths created, in creation order.
    pub created: Vec<String>,
    /// Labels created.
    pub labels: Vec<String>,
    /// Paths or labels whose create call failed.
    pub failed: Vec<String>,
}

/// Creates missing items for one repository.
///
/// Each successful create is appended to the observed state, recorded in the
/// ledger, and the full state is written to the cache before the next item. A failed create is
/// logged and recorded, then skipped.
pub struct Creator<'a> {
    api: &'a dyn GitHubApi,
    cache: &'a Cache,
    ledger: &'a Ledger,
    ctx: RepoContext<'a>,
    placeholders: Placeholders,
    report: RepoReport,
}

impl<'a> Creator<'a> {
    pub fn new(
        api: &'a dyn GitHubApi,
        cache: &'a Cache,
        ledger: &'a Ledger,
        ctx: RepoContext<'a>,
        placeholders: Placeholders,
    ) -> Self {
        Self {
            api,
            cache,
            ledger,
            ctx,
            placeholders,
            report: RepoReport::default(),
        }
    }

    pub fn finish(self) -> RepoReport {
        self.report
    }

    pub fn create_files(
        &mut self,
        templates: &[FileTemplate],
        observed: &mut Vec<ContentEntry>,
    ) -> Result<(), CacheError> {
        let key = keys::repo_files(self.ctx.repo);
        for template in diff::missing_files(templates, observed) {
            if let Some(entry) = self.put_file(&template.name, &template.content) {
                observed.push(entry);
                self.record_created(&template.name);
                self.cache.put(&key, &*observed)?;
            }
        }
        Ok(())
    }

    pub fn create_dirs(
        &mut self,
        templates: &[DirTemplate],
        observed: &mut ObservedDirs,
    ) -> Result<(), CacheError> {
        let key = keys::repo_dirs(self.ctx.repo);
        for item in diff::missing_dir_items(templates, observed) {
            if let Some(entry) = self.put_file(&item.path, item.content) {
                observed.entry(item.dir.to_string()).or_default().push(entry);
                self.record_created(&item.path);
                self.cache.put(&key, &*observed)?;
            }
        }
        Ok(())
    }

    pub fn create_labels(
        &mut self,
        templates: &[LabelTemplate],
        observed: &mut Vec<Label>,
    ) -> Result<(), CacheError> {
        let key = keys::repo_labels(self.ctx.repo);
        for template in diff::missing_labels(templates, observed) {
            log::info!("Creating label '{}'...", template.name);
            let label = NewLabel {
                name: &template.name,
                color: &template.color,
                description: &template.description,
            };
            match self.api.create_label(self.ctx.owner, self.ctx.name(), &label) {
                Ok(created) => {
                    observed.push(created);
                    self.report.labels.push(template.name.clone());
                    self.cache.put(&key, &*observed)?;
                }
                Err(e) => self.record_failure(&format!("label:{}", template.name), &e.to_string()),
            }
        }
        Ok(())
    }

    fn put_file(&mut self, path: &str, template: &str) -> Option<ContentEntry> {
        log::info!("Creating file '{}'...", path);
        let content = BASE64_STANDARD.encode(self.placeholders.apply(template));
        let message = format!("Added {}", path);

        match self
            .api
            .put_file(self.ctx.owner, self.ctx.name(), path, &content, &message)
        {
            Ok(entry) => Some(entry),
            Err(e) => {
                self.record_failure(path, &e.to_string());
                None
            }
        }
    }

    fn record_created(&mut self, path: &str) {
        if let Err(e) = self.ledger.record_generated(self.ctx.name(), &[path]) {
            log::warn!("Failed to record generated file {}: {}", path, e);
        }
        self.report.created.push(path.to_string());
    }

    fn record_failure(&mut self, item: &str, message: &str) {
        log::warn!("Could not create '{}' in {}: {}", item, self.ctx.repo, message);
        if let Err(e) = self.ledger.record_error(self.ctx.name(), item, message) {
            log::warn!("Failed to record error for {}: {}", item, e);
        }
        self.report.failed.push(item.to_string());
    }
}
