//! Cache-first retrieval of a repository's observed state.

use std::thread;

use super::{ObservedDirs, Observed, ReconcileError, RepoContext};
use crate::cache::{Cache, keys};
use crate::github::GitHubApi;
use crate::templates::{DirTemplate, TemplateSet};
use crate::types::{ContentEntry, Label};

/// Reads observed state from the cache, falling back to the API on a miss.
///
/// A cached value is returned as-is and a fetched value is persisted as-is;
/// the two are never merged.
pub struct Fetcher<'a> {
    api: &'a dyn GitHubApi,
    cache: &'a Cache,
}

impl<'a> Fetcher<'a> {
    pub fn new(api: &'a dyn GitHubApi, cache: &'a Cache) -> Self {
        Self { api, cache }
    }

    /// Observe files, template directories, and labels of one repository.
    ///
    /// Labels are fetched on a separate thread while the root listing and
    /// directories are fetched in sequence; they touch disjoint cache keys.
    pub fn observe(
        &self,
        ctx: &RepoContext<'_>,
        templates: &TemplateSet,
    ) -> Result<Observed, ReconcileError> {
        thread::scope(|scope| {
            let labels = scope.spawn(|| self.labels(ctx));

            let tree = self
                .files(ctx)
                .and_then(|files| Ok((self.dirs(ctx, &templates.dirs, &files)?, files)));

            let labels = labels
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));

            let (dirs, files) = tree?;
            Ok(Observed {
                files,
                dirs,
                labels: labels?,
            })
        })
    }

    /// Flat root listing.
    pub fn files(&self, ctx: &RepoContext<'_>) -> Result<Vec<ContentEntry>, ReconcileError> {
        let key = keys::repo_files(ctx.repo);
        if let Some(files) = self.cache.get(&key)? {
            log::debug!("Using cached files for {}", ctx.repo);
            return Ok(files);
        }

        log::info!("Getting repo '{}' files...", ctx.name());
        let files = self.api.list_contents(ctx.owner, ctx.name(), "")?;
        self.cache.put(&key, &files)?;
        Ok(files)
    }

    /// Contents of every template directory, keyed by directory name.
    ///
    /// A directory absent from `files` is recorded as empty. Inside a present
    /// directory, a subdirectory is expanded into the same sequence only when
    /// the template declares that slot as nested.
    pub fn dirs(
        &self,
        ctx: &RepoContext<'_>,
        templates: &[DirTemplate],
        files: &[ContentEntry],
    ) -> Result<ObservedDirs, ReconcileError> {
        let key = keys::repo_dirs(ctx.repo);
        if let Some(dirs) = self.cache.get(&key)? {
            log::debug!("Using cached dirs for {}", ctx.repo);
            return Ok(dirs);
        }

        log::info!("Getting repo '{}' dirs...", ctx.name());
        let mut observed = ObservedDirs::new();
        for template in templates {
            let found = files
                .iter()
                .find(|entry| entry.is_dir() && entry.name == template.name);

            let entries = match found {
                None => Vec::new(),
                Some(dir) => {
                    let mut entries = self.api.list_contents(ctx.owner, ctx.name(), &dir.path)?;
                    let nested: Vec<String> = entries
                        .iter()
                        .filter(|entry| entry.is_dir() && template.declares_nested(&entry.name))
                        .map(|entry| entry.path.clone())
                        .collect();
                    for path in nested {
                        let sub = self.api.list_contents(ctx.owner, ctx.name(), &path)?;
                        entries.extend(sub);
                    }
                    entries
                }
            };
            observed.insert(template.name.clone(), entries);
        }

        self.cache.put(&key, &observed)?;
        Ok(observed)
    }

    pub fn labels(&self, ctx: &RepoContext<'_>) -> Result<Vec<Label>, ReconcileError> {
        let key = keys::repo_labels(ctx.repo);
        if let Some(labels) = self.cache.get(&key)? {
            log::debug!("Using cached labels for {}", ctx.repo);
            return Ok(labels);
        }

        log::info!("Getting repo '{}' labels...", ctx.name());
        let labels = self.api.list_labels(ctx.owner, ctx.name())?;
        self.cache.put(&key, &labels)?;
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{FakeApi, user, user_repo};
    use super::*;
    use crate::cache::MemoryStore;
    use crate::templates::{DirTemplateEntry, FileTemplate};
    use crate::types::EntryKind;
    use serde_json::json;

    fn github_template(nested: bool) -> DirTemplate {
        let entry = if nested {
            DirTemplateEntry::Nested(vec![FileTemplate::new("bug.md", "bug")])
        } else {
            DirTemplateEntry::Leaf("bug".to_string())
        };
        DirTemplate {
            name: ".github".to_string(),
            entries: vec![("ISSUE_TEMPLATE".to_string(), entry)],
        }
    }

    #[test]
    fn test_cached_files_skip_the_network() {
        let api = FakeApi::default();
        let repo = user_repo("jane", "acme");
        let jane = user("jane", None);
        let ctx = RepoContext::new(&repo, &jane);
        let cached = json!([{"name": "LICENSE", "path": "LICENSE", "type": "file"}]).to_string();
        let cache = Cache::open(MemoryStore::with_blobs([("repo-files/acme.json", cached)]));

        let files = Fetcher::new(&api, &cache).files(&ctx).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "LICENSE");
        assert_eq!(api.list_count(), 0);
    }

    #[test]
    fn test_cached_files_are_not_merged_with_remote() {
        let api = FakeApi::default();
        api.add_file("jane/acme", "README.md", "remote only");
        let repo = user_repo("jane", "acme");
        let jane = user("jane", None);
        let ctx = RepoContext::new(&repo, &jane);
        let cache = Cache::open(MemoryStore::with_blobs([("repo-files/acme.json", "[]")]));

        let files = Fetcher::new(&api, &cache).files(&ctx).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_fetched_files_are_persisted() {
        let api = FakeApi::default();
        api.add_file("jane/acme", "LICENSE", "MIT");
        let repo = user_repo("jane", "acme");
        let jane = user("jane", None);
        let ctx = RepoContext::new(&repo, &jane);
        let cache = Cache::open(MemoryStore::default());

        let files = Fetcher::new(&api, &cache).files(&ctx).unwrap();

        let cached: Vec<ContentEntry> = cache.get("repo-files/acme.json").unwrap().unwrap();
        assert_eq!(cached, files);
        assert_eq!(api.list_count(), 1);
    }

    #[test]
    fn test_missing_template_dir_is_empty_without_listing_it() {
        let api = FakeApi::default();
        let repo = user_repo("jane", "acme");
        let jane = user("jane", None);
        let ctx = RepoContext::new(&repo, &jane);
        let cache = Cache::open(MemoryStore::default());

        let dirs = Fetcher::new(&api, &cache)
            .dirs(&ctx, &[github_template(true)], &[])
            .unwrap();

        assert_eq!(dirs[".github"], Vec::<ContentEntry>::new());
        assert_eq!(api.list_count(), 0);
        assert!(cache.contains("repo-dirs/acme.json"));
    }

    #[test]
    fn test_nested_template_slot_is_flattened() {
        let api = FakeApi::default();
        api.add_file("jane/acme", ".github/CODEOWNERS", "*");
        api.add_file("jane/acme", ".github/ISSUE_TEMPLATE/bug.md", "bug");
        let repo = user_repo("jane", "acme");
        let jane = user("jane", None);
        let ctx = RepoContext::new(&repo, &jane);
        let cache = Cache::open(MemoryStore::default());
        let fetcher = Fetcher::new(&api, &cache);

        let files = fetcher.files(&ctx).unwrap();
        let dirs = fetcher.dirs(&ctx, &[github_template(true)], &files).unwrap();

        let paths: Vec<_> = dirs[".github"].iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![".github/CODEOWNERS", ".github/ISSUE_TEMPLATE", ".github/ISSUE_TEMPLATE/bug.md"]
        );
        assert_eq!(dirs[".github"][1].kind, EntryKind::Dir);
    }

    #[test]
    fn test_flat_template_slot_is_not_expanded() {
        let api = FakeApi::default();
        api.add_file("jane/acme", ".github/ISSUE_TEMPLATE/bug.md", "bug");
        let repo = user_repo("jane", "acme");
        let jane = user("jane", None);
        let ctx = RepoContext::new(&repo, &jane);
        let cache = Cache::open(MemoryStore::default());
        let fetcher = Fetcher::new(&api, &cache);

        let files = fetcher.files(&ctx).unwrap();
        let dirs = fetcher.dirs(&ctx, &[github_template(false)], &files).unwrap();

        let paths: Vec<_> = dirs[".github"].iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec![".github/ISSUE_TEMPLATE"]);
        assert!(!api.listed("jane/acme", ".github/ISSUE_TEMPLATE"));
    }

    #[test]
    fn test_labels_are_cache_first() {
        let api = FakeApi::default();
        api.add_label("jane/acme", "bug");
        let repo = user_repo("jane", "acme");
        let jane = user("jane", None);
        let ctx = RepoContext::new(&repo, &jane);
        let cache = Cache::open(MemoryStore::default());
        let fetcher = Fetcher::new(&api, &cache);

        assert_eq!(fetcher.labels(&ctx).unwrap()[0].name, "bug");
        assert_eq!(fetcher.labels(&ctx).unwrap()[0].name, "bug");
        assert_eq!(api.list_count(), 1);
    }

    #[test]
    fn test_observe_collects_all_three_kinds() {
        let api = FakeApi::default();
        api.add_file("jane/acme", "LICENSE", "MIT");
        api.add_label("jane/acme", "stale");
        let repo = user_repo("jane", "acme");
        let jane = user("jane", None);
        let ctx = RepoContext::new(&repo, &jane);
        let cache = Cache::open(MemoryStore::default());
        let templates = TemplateSet {
            dirs: vec![github_template(true)],
            ..TemplateSet::default()
        };

        let observed = Fetcher::new(&api, &cache).observe(&ctx, &templates).unwrap();

        assert_eq!(observed.files.len(), 1);
        assert!(observed.dirs[".github"].is_empty());
        assert_eq!(observed.labels.len(), 1);
    }

    #[test]
    fn test_observe_surfaces_listing_failure() {
        let api = FakeApi::default();
        api.fail_listing("jane/acme");
        let repo = user_repo("jane", "acme");
        let jane = user("jane", None);
        let ctx = RepoContext::new(&repo, &jane);
        let cache = Cache::open(MemoryStore::default());

        let err = Fetcher::new(&api, &cache)
            .observe(&ctx, &TemplateSet::default())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Api(_)));
        assert!(!cache.contains("repo-files/acme.json"));
    }
}
