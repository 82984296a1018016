//! Run settings, taken from command-line flags or their environment variables.

use std::path::PathBuf;

use clap::Args;
use thiserror::Error;

use crate::github::DEFAULT_API_URL;
use crate::reconcile::RepoFilter;

const APP_DIR: &str = "repofill";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no GitHub token: pass --token or set GITHUB_TOKEN")]
    MissingToken,

    #[error("no cache directory: pass --cache-dir or set REPOFILL_CACHE_DIR")]
    NoCacheDir,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// GitHub token used for every API call
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "REPOFILL_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Directory holding cached remote state
    #[arg(long, env = "REPOFILL_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Templates root (files/, dirs/, labels.json)
    #[arg(long, env = "REPOFILL_TEMPLATES", default_value = "templates", global = true)]
    pub templates: PathBuf,

    /// Directory receiving generated.json and errors.json
    #[arg(long, env = "REPOFILL_OUTPUT", default_value = "output", global = true)]
    pub output: PathBuf,

    /// Only include repositories of this organization (repeatable)
    #[arg(long = "org", value_name = "LOGIN", global = true)]
    pub orgs: Vec<String>,

    /// Never reconcile this repository name (repeatable)
    #[arg(long, value_name = "NAME", global = true)]
    pub skip: Vec<String>,

    /// Only reconcile this repository name or full name (repeatable)
    #[arg(long = "repo", value_name = "NAME", global = true)]
    pub only: Vec<String>,

    /// Also reconcile forks
    #[arg(long, global = true)]
    pub include_forks: bool,

    /// Also reconcile repositories without admin permission
    #[arg(long, global = true)]
    pub include_non_admin: bool,
}

/// Resolved settings, built once and passed by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub token: Option<String>,
    pub api_url: String,
    pub cache_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    pub filter: RepoFilter,
}

impl Settings {
    pub fn from_args(args: ConfigArgs) -> Result<Self, ConfigError> {
        let cache_dir = match args.cache_dir {
            Some(dir) => dir,
            None => default_cache_dir().ok_or(ConfigError::NoCacheDir)?,
        };

        Ok(Self {
            token: args.token.filter(|token| !token.trim().is_empty()),
            api_url: args.api_url,
            cache_dir,
            templates_dir: args.templates,
            output_dir: args.output,
            filter: RepoFilter {
                orgs: args.orgs,
                skip: args.skip,
                only: args.only,
                include_forks: args.include_forks,
                include_non_admin: args.include_non_admin,
            },
        })
    }

    pub fn token(&self) -> Result<&str, ConfigError> {
        self.token.as_deref().ok_or(ConfigError::MissingToken)
    }
}

/// `<platform cache dir>/repofill`.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR))
}
