//! Blocking GitHub REST client built on `ureq`.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{ApiError, GitHubApi, NewLabel};
use crate::types::{ContentEntry, Label, Org, RateLimit, Repo, User};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "repofill";
const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PER_PAGE: u32 = 100;

/// Authenticated client for the GitHub REST API.
pub struct GitHubClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct PutFileResponse {
    content: ContentEntry,
}

impl GitHubClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build();

        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", API_VERSION)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        log::debug!("GET {}", url);
        let response = self
            .request("GET", url)
            .call()
            .map_err(|e| ApiError::from_ureq(url, e))?;
        parse_body(url, response)
    }

    /// GET every page of a listing, following `Link: rel="next"`.
    fn get_paged<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());

        while let Some(url) = next {
            log::debug!("GET {}", url);
            let response = self
                .request("GET", &url)
                .call()
                .map_err(|e| ApiError::from_ureq(&url, e))?;
            next = response.header("link").and_then(next_page);
            let page: Vec<T> = parse_body(&url, response)?;
            items.extend(page);
        }

        Ok(items)
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        method: &str,
        url: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        log::debug!("{} {}", method, url);
        let response = self
            .request(method, url)
            .send_json(body)
            .map_err(|e| ApiError::from_ureq(url, e))?;
        parse_body(url, response)
    }
}

fn parse_body<T: DeserializeOwned>(url: &str, response: ureq::Response) -> Result<T, ApiError> {
    response.into_json().map_err(|source| ApiError::Body {
        url: url.to_string(),
        source,
    })
}

impl GitHubApi for GitHubClient {
    fn authenticated_user(&self) -> Result<User, ApiError> {
        self.get_json(&self.url("/user"))
    }

    fn user_repos(&self) -> Result<Vec<Repo>, ApiError> {
        self.get_paged(&self.url(&format!(
            "/user/repos?affiliation=owner&per_page={}",
            PER_PAGE
        )))
    }

    fn user_orgs(&self) -> Result<Vec<Org>, ApiError> {
        self.get_paged(&self.url(&format!("/user/orgs?per_page={}", PER_PAGE)))
    }

    fn org_repos(&self, org: &str) -> Result<Vec<Repo>, ApiError> {
        self.get_paged(&self.url(&format!(
            "/orgs/{}/repos?per_page={}",
            encode_segment(org),
            PER_PAGE
        )))
    }

    fn list_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<ContentEntry>, ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/contents/{}",
            encode_segment(owner),
            encode_segment(repo),
            encode_path(path)
        ));
        match self.get_json(&url) {
            // Empty repositories and vanished directories both answer 404.
            Err(e) if e.is_not_found() => {
                log::debug!("{} not found, treating as empty", url);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn list_labels(&self, owner: &str, repo: &str) -> Result<Vec<Label>, ApiError> {
        self.get_paged(&self.url(&format!(
            "/repos/{}/{}/labels?per_page={}",
            encode_segment(owner),
            encode_segment(repo),
            PER_PAGE
        )))
    }

    fn create_label(
        &self,
        owner: &str,
        repo: &str,
        label: &NewLabel<'_>,
    ) -> Result<Label, ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/labels",
            encode_segment(owner),
            encode_segment(repo)
        ));
        self.send_json(
            "POST",
            &url,
            json!({
                "name": label.name,
                "color": label.color,
                "description": label.description,
            }),
        )
    }

    fn put_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content_base64: &str,
        message: &str,
    ) -> Result<ContentEntry, ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/contents/{}",
            encode_segment(owner),
            encode_segment(repo),
            encode_path(path)
        ));
        let response: PutFileResponse = self.send_json(
            "PUT",
            &url,
            json!({
                "message": message,
                "content": content_base64,
            }),
        )?;
        Ok(response.content)
    }

    fn rate_limit(&self) -> Result<RateLimit, ApiError> {
        self.get_json(&self.url("/rate_limit"))
    }
}

/// Extract the `rel="next"` target from a `Link` header.
fn next_page(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        let target = target.trim();
        target
            .strip_prefix('<')?
            .strip_suffix('>')
            .map(str::to_string)
    })
}

/// Percent-encode every `/`-separated segment of a repository path.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
