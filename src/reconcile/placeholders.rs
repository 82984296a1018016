use chrono::Datelike;

use crate::types::{Repo, User};

const REPO_NAME: &str = "{{repo-name}}";
const REPO_FULL_NAME: &str = "{{repo-full-name}}";
const USER_NAME: &str = "{{user-name}}";
const YEAR: &str = "{{year}}";

/// Literal token substitution applied to template content before upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    repo_name: String,
    repo_full_name: String,
    user_name: String,
    year: String,
}

impl Placeholders {
    pub fn new(
        repo_name: impl Into<String>,
        repo_full_name: impl Into<String>,
        user_name: impl Into<String>,
        year: i32,
    ) -> Self {
        Self {
            repo_name: repo_name.into(),
            repo_full_name: repo_full_name.into(),
            user_name: user_name.into(),
            year: format!("{:04}", year),
        }
    }

    /// Values for `repo` in the current year.
    ///
    /// `{{user-name}}` is the owner's display name: the authenticated user's
    /// name (or login) for personal repositories, the owner login otherwise.
    pub fn for_repo(repo: &Repo, user: &User) -> Self {
        let user_name = match repo.owner_login() {
            Some(login) if login != user.login => login,
            _ => user.display_name(),
        };
        Self::new(
            &repo.name,
            &repo.full_name,
            user_name,
            chrono::Local::now().year(),
        )
    }

    fn value(&self, token: &str) -> Option<&str> {
        match token {
            REPO_NAME => Some(&self.repo_name),
            REPO_FULL_NAME => Some(&self.repo_full_name),
            USER_NAME => Some(&self.user_name),
            YEAR => Some(&self.year),
            _ => None,
        }
    }

    /// Replace every known token in a single left-to-right pass. Substituted
    /// values are never rescanned; unknown `{{...}}` sequences are kept.
    pub fn apply(&self, content: &str) -> String {
        let mut out = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];

            let token = tail.find("}}").map(|end| &tail[..end + 2]);
            match token.and_then(|token| Some((token, self.value(token)?))) {
                Some((token, value)) => {
                    out.push_str(value);
                    rest = &tail[token.len()..];
                }
                None => {
                    out.push_str("{{");
                    rest = &tail[2..];
                }
            }
        }

        out.push_str(rest);
        out
    }
}
