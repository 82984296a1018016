//! In-memory `GitHubApi` used by the reconciler tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use base64::Engine as _;
use base64::prelude::BASE64_STANDARD;
use serde_json::{Map, json};

use crate::github::{ApiError, GitHubApi, NewLabel};
use crate::types::{
    Account, AccountKind, ContentEntry, EntryKind, Label, Org, Permissions, Rate, RateLimit, Repo,
    User,
};

pub fn user(login: &str, name: Option<&str>) -> User {
    User {
        login: login.to_string(),
        name: name.map(str::to_string),
        extra: Map::new(),
    }
}

fn repo(owner: &str, name: &str, kind: AccountKind) -> Repo {
    Repo {
        name: name.to_string(),
        full_name: format!("{}/{}", owner, name),
        owner: Some(Account {
            login: owner.to_string(),
            kind,
            extra: Map::new(),
        }),
        fork: false,
        permissions: Some(Permissions {
            admin: true,
            push: true,
            pull: true,
            extra: Map::new(),
        }),
        extra: Map::new(),
    }
}

/// Admin-accessible, non-fork repository owned by a user.
pub fn user_repo(owner: &str, name: &str) -> Repo {
    repo(owner, name, AccountKind::User)
}

/// Admin-accessible, non-fork repository owned by an organization.
pub fn org_repo(org: &str, name: &str) -> Repo {
    repo(org, name, AccountKind::Organization)
}

#[derive(Default)]
struct State {
    user: Option<User>,
    repos: Vec<Repo>,
    orgs: Vec<(String, Vec<Repo>)>,
    /// (full name, directory path) -> entries in insertion order; "" is the root.
    listings: HashMap<(String, String), Vec<ContentEntry>>,
    /// (full name, file path) -> (decoded content, commit message).
    files: HashMap<(String, String), (String, Option<String>)>,
    labels: HashMap<String, Vec<Label>>,
    failing_listings: HashSet<String>,
    failing_puts: HashSet<(String, String)>,
    listed: Vec<(String, String)>,
    calls: usize,
    lists: usize,
    puts: usize,
    label_creates: usize,
}

impl State {
    /// Record `path` as a file, creating every parent directory entry.
    fn insert_file(&mut self, full: &str, path: &str) -> ContentEntry {
        let segments: Vec<&str> = path.split('/').collect();
        let last = segments.len() - 1;

        for i in 0..segments.len() {
            let parent = segments[..i].join("/");
            let current = segments[..=i].join("/");
            let kind = if i == last {
                EntryKind::File
            } else {
                EntryKind::Dir
            };

            let listing = self.listings.entry((full.to_string(), parent)).or_default();
            if !listing.iter().any(|entry| entry.path == current) {
                listing.push(ContentEntry::new(current, kind));
            }
        }

        ContentEntry::new(path, EntryKind::File)
    }
}

fn server_error(url: String) -> ApiError {
    ApiError::Status {
        code: 500,
        url,
        message: "Server Error".to_string(),
    }
}

/// Remote state held in memory; every call is counted.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn set_user(&self, user: User) {
        self.state.lock().unwrap().user = Some(user);
    }

    pub fn set_repos(&self, repos: Vec<Repo>) {
        self.state.lock().unwrap().repos = repos;
    }

    pub fn add_org(&self, login: &str, repos: Vec<Repo>) {
        self.state
            .lock()
            .unwrap()
            .orgs
            .push((login.to_string(), repos));
    }

    pub fn add_file(&self, full: &str, path: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        state.insert_file(full, path);
        state.files.insert(
            (full.to_string(), path.to_string()),
            (content.to_string(), None),
        );
    }

    pub fn add_label(&self, full: &str, name: &str) {
        let label = serde_json::from_value(json!({"name": name, "color": "ededed"})).unwrap();
        self.state
            .lock()
            .unwrap()
            .labels
            .entry(full.to_string())
            .or_default()
            .push(label);
    }

    /// Make every contents listing of `full` fail.
    pub fn fail_listing(&self, full: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_listings
            .insert(full.to_string());
    }

    pub fn fail_put(&self, full: &str, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_puts
            .insert((full.to_string(), path.to_string()));
    }

    /// Every call made, of any kind.
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    /// Contents and label listings.
    pub fn list_count(&self) -> usize {
        self.state.lock().unwrap().lists
    }

    pub fn put_count(&self) -> usize {
        self.state.lock().unwrap().puts
    }

    pub fn label_create_count(&self) -> usize {
        self.state.lock().unwrap().label_creates
    }

    /// Whether the directory at `path` of `full` was listed.
    pub fn listed(&self, full: &str, path: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .listed
            .iter()
            .any(|(f, p)| f == full && p == path)
    }

    pub fn file_content(&self, full: &str, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let (content, _) = state.files.get(&(full.to_string(), path.to_string()))?;
        Some(content.clone())
    }

    pub fn put_message(&self, full: &str, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let (_, message) = state.files.get(&(full.to_string(), path.to_string()))?;
        message.clone()
    }
}

impl GitHubApi for FakeApi {
    fn authenticated_user(&self) -> Result<User, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.user.clone().ok_or_else(|| ApiError::Status {
            code: 401,
            url: "/user".to_string(),
            message: "Bad credentials".to_string(),
        })
    }

    fn user_repos(&self) -> Result<Vec<Repo>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(state.repos.clone())
    }

    fn user_orgs(&self) -> Result<Vec<Org>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(state
            .orgs
            .iter()
            .map(|(login, _)| Org {
                login: login.clone(),
                extra: Map::new(),
            })
            .collect())
    }

    fn org_repos(&self, org: &str) -> Result<Vec<Repo>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(state
            .orgs
            .iter()
            .find(|(login, _)| login == org)
            .map(|(_, repos)| repos.clone())
            .unwrap_or_default())
    }

    fn list_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<ContentEntry>, ApiError> {
        let full = format!("{}/{}", owner, repo);
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.lists += 1;
        state.listed.push((full.clone(), path.to_string()));

        if state.failing_listings.contains(&full) {
            return Err(server_error(format!("/repos/{}/contents/{}", full, path)));
        }
        Ok(state
            .listings
            .get(&(full, path.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn list_labels(&self, owner: &str, repo: &str) -> Result<Vec<Label>, ApiError> {
        let full = format!("{}/{}", owner, repo);
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.lists += 1;
        Ok(state.labels.get(&full).cloned().unwrap_or_default())
    }

    fn create_label(
        &self,
        owner: &str,
        repo: &str,
        label: &NewLabel<'_>,
    ) -> Result<Label, ApiError> {
        let full = format!("{}/{}", owner, repo);
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.label_creates += 1;

        let created = Label {
            name: label.name.to_string(),
            color: label.color.to_string(),
            description: Some(label.description.to_string()),
            extra: Map::new(),
        };
        state.labels.entry(full).or_default().push(created.clone());
        Ok(created)
    }

    fn put_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content_base64: &str,
        message: &str,
    ) -> Result<ContentEntry, ApiError> {
        let full = format!("{}/{}", owner, repo);
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.puts += 1;

        if state
            .failing_puts
            .contains(&(full.clone(), path.to_string()))
        {
            return Err(server_error(format!("/repos/{}/contents/{}", full, path)));
        }

        let bytes = BASE64_STANDARD.decode(content_base64).unwrap();
        let content = String::from_utf8(bytes).unwrap();
        let entry = state.insert_file(&full, path);
        state
            .files
            .insert((full, path.to_string()), (content, Some(message.to_string())));
        Ok(entry)
    }

    fn rate_limit(&self) -> Result<RateLimit, ApiError> {
        self.state.lock().unwrap().calls += 1;
        Ok(RateLimit {
            rate: Rate {
                limit: 5000,
                remaining: 4999,
                reset: chrono::Utc::now().timestamp() + 3600,
            },
        })
    }
}
