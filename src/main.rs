pub mod cache;
pub mod config;
pub mod github;
pub mod ledger;
pub mod reconcile;
pub mod templates;
pub mod types;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};

use crate::cache::{Cache, CacheLock, FsStore};
use crate::config::{ConfigArgs, Settings};
use crate::github::{GitHubApi, GitHubClient};
use crate::ledger::Ledger;
use crate::reconcile::Engine;
use crate::templates::{DirTemplateEntry, TemplateSet};

#[derive(Parser)]
#[command(
    name = "repofill",
    about = "Fill missing template files, directories, and labels across your GitHub repositories"
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create every missing template item in every admitted repository
    Fill,

    /// Show what `fill` would create, without creating anything
    Plan,

    /// Inspect or clear the cache of observed remote state
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Print the loaded template set in creation order
    Templates,

    /// Show the remaining API quota
    RateLimit,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Print the cache directory
    Path,

    /// Remove every cached entry
    Clear,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_args(cli.config)?;

    match cli.command {
        Commands::Fill => cmd_fill(&settings),
        Commands::Plan => cmd_plan(&settings),
        Commands::Cache {
            command: CacheCommands::Path,
        } => cmd_cache_path(&settings),
        Commands::Cache {
            command: CacheCommands::Clear,
        } => cmd_cache_clear(&settings),
        Commands::Templates => cmd_templates(&settings),
        Commands::RateLimit => cmd_rate_limit(&settings),
    }
}

fn client(settings: &Settings) -> Result<GitHubClient, Box<dyn std::error::Error>> {
    Ok(GitHubClient::new(&settings.api_url, settings.token()?))
}

fn cmd_fill(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let api = client(settings)?;
    let templates = templates::load(&settings.templates_dir)?;
    if templates.is_empty() {
        log::warn!(
            "No templates found under {}",
            settings.templates_dir.display()
        );
    }

    let _lock = CacheLock::acquire(&settings.cache_dir)?;
    let cache = Cache::open(FsStore::new(&settings.cache_dir));

    let ledger = Ledger::new(&settings.output_dir);
    ledger.reset_generated()?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        log::info!("Stopping after the current repository...");
        handler_stop.store(true, Ordering::SeqCst);
    })?;

    let user = reconcile::authenticated_user(&api, &cache)?;
    let repos = reconcile::list_repos(&api, &cache, &settings.filter)?;
    log::info!("Reconciling {} repositories as {}", repos.len(), user.login);

    let summary = Engine::new(&api, &cache, &ledger, &templates).run(&repos, &user, &stop)?;

    println!("Repositories: {}", summary.repos);
    println!("Files created: {}", summary.created);
    println!("Labels created: {}", summary.labels);
    println!("Failed creates: {}", summary.failed);
    if !summary.skipped.is_empty() {
        println!("Skipped: {}", summary.skipped.join(", "));
    }
    if summary.stopped {
        println!("Stopped early");
    }
    if summary.failed > 0 || !summary.skipped.is_empty() {
        println!("See {}", ledger.errors_path().display());
    }

    Ok(())
}

fn cmd_plan(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let api = client(settings)?;
    let templates = templates::load(&settings.templates_dir)?;

    let _lock = CacheLock::acquire(&settings.cache_dir)?;
    let cache = Cache::open(FsStore::new(&settings.cache_dir));
    let ledger = Ledger::new(&settings.output_dir);

    let user = reconcile::authenticated_user(&api, &cache)?;
    let repos = reconcile::list_repos(&api, &cache, &settings.filter)?;
    let engine = Engine::new(&api, &cache, &ledger, &templates);

    let mut pending = 0;
    for repo in &repos {
        let plan = match engine.plan(repo, &user) {
            Ok(plan) => plan,
            Err(reconcile::ReconcileError::Api(e)) => {
                log::warn!("Could not get {} state: {}", repo, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if plan.is_empty() {
            continue;
        }

        pending += 1;
        println!("{}", plan.repo);
        for file in &plan.files {
            println!("  file   {}", file);
        }
        for path in &plan.dir_paths {
            println!("  file   {}", path);
        }
        for label in &plan.labels {
            println!("  label  {}", label);
        }
    }

    println!(
        "{} of {} repositories have missing items",
        pending,
        repos.len()
    );
    Ok(())
}

fn cmd_cache_path(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", settings.cache_dir.display());
    Ok(())
}

fn cmd_cache_clear(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let root = &settings.cache_dir;
    if !root.exists() {
        println!("Cache is already empty");
        return Ok(());
    }

    // Fail fast if a run holds the cache.
    drop(CacheLock::acquire(root)?);
    std::fs::remove_dir_all(root)?;
    println!("Removed {}", root.display());
    Ok(())
}

fn cmd_templates(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let templates = templates::load(&settings.templates_dir)?;
    print_templates(&templates);
    Ok(())
}

fn print_templates(templates: &TemplateSet) {
    if templates.is_empty() {
        println!("No templates");
        return;
    }

    for file in &templates.files {
        println!("{}", file.name);
    }
    for dir in &templates.dirs {
        for (slot, entry) in &dir.entries {
            match entry {
                DirTemplateEntry::Leaf(_) => println!("{}/{}", dir.name, slot),
                DirTemplateEntry::Nested(files) => {
                    for file in files {
                        println!("{}/{}/{}", dir.name, slot, file.name);
                    }
                }
            }
        }
    }
    for label in &templates.labels {
        println!("label {} #{} {}", label.name, label.color, label.description);
    }
}

fn cmd_rate_limit(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let limit = client(settings)?.rate_limit()?;
    let minutes = (limit.rate.reset - chrono::Utc::now().timestamp()).max(0) / 60;

    println!("Limit:     {}", limit.rate.limit);
    println!("Remaining: {}", limit.rate.remaining);
    println!("Resets in: {}m", minutes);
    Ok(())
}
