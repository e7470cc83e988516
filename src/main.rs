//! crosstune: inspect how music links classify, normalize and sit in the cache.

mod error;

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Parser, Subcommand};
use crosstune_cache::{Database, Repository};
use crosstune_config::Config;
use crosstune_music::{Classified, ResolutionResult, classify, classify_token, normalize};
use crosstune_storage::DurableStore;
use crosstune_storage::backend::LocalStore;
use exn::ResultExt;
use std::path::PathBuf;
use std::process::ExitCode;
use time::UtcDateTime;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "crosstune", version, about = "Resolve music links across streaming providers")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "CROSSTUNE_CONFIG")]
    config: Option<PathBuf>,

    /// More logging (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Less logging (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every link or identifier recognized in the text
    Classify {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Print the cache key of a link
    Normalize { link: String },
    /// Show what the cache holds for a link, without contacting providers
    Cached { link: String },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(verbose: u8, quiet: u8) {
    let level = match i16::from(verbose) - i16::from(quiet) {
        ..=-2 => "off",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Classify { text } => {
            let text = text.join(" ");
            let inputs = classify(&text);
            if inputs.is_empty() {
                exn::bail!(ErrorKind::NotRecognized(text));
            }
            for input in inputs {
                let resolvable = if input.is_resolvable() { "" } else { " (not resolvable)" };
                println!("{input}{resolvable}");
            }
        },
        Command::Normalize { link } => println!("{}", cache_key(&link)),
        Command::Cached { link } => {
            let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
            cached(&config, &link).await?;
        },
        Command::Config => {
            let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
            println!("{config:#?}");
        },
    }
    Ok(())
}

/// Classified key when the link matches a grammar, plain normalization
/// otherwise.
fn cache_key(link: &str) -> String {
    classify_token(link).map_or_else(|| normalize(link), |Classified { key, .. }| key)
}

async fn cached(config: &Config, link: &str) -> Result<()> {
    let key = cache_key(link);
    debug!(%key, database = %config.cache.database.display(), "inspecting cache");
    if !config.cache.database.is_file() {
        println!("{key}: not cached (no index at {})", config.cache.database.display());
        return Ok(());
    }
    let db = Database::connect(&config.cache.database).await.or_raise(|| ErrorKind::Index)?;
    // Inspection only: never touch the index.
    let index = Repository::new(db.pool().clone(), true);
    let Some(entry) = index.get_by_normalized_link(&key).await.or_raise(|| ErrorKind::Index)? else {
        println!("{key}: not cached");
        return Ok(());
    };

    let now = UtcDateTime::now();
    let freshness = match entry.is_fresh(now, config.freshness()) {
        true => "fresh",
        false => "stale",
    };
    println!("{key}: {freshness}, last looked up {} ({} ago)", entry.last_looked_up_at, entry.age(now));
    println!("pointer: {}", entry.pointer);
    for link in &entry.links {
        println!("link: {link}");
    }

    let root = std::path::absolute(&config.store.root).or_raise(|| ErrorKind::Store)?;
    let store = LocalStore::new("records", root).or_raise(|| ErrorKind::Store)?;
    match store.read(&entry.pointer).await.or_raise(|| ErrorKind::Store)? {
        Some(record) => print_result(&ResolutionResult::from_record(&record)),
        None => println!("durable record missing; the next lookup will re-resolve"),
    }
    db.close().await;
    Ok(())
}

fn print_result(result: &ResolutionResult) {
    for entry in result.results() {
        let identifier = entry.identifier.as_ref().map(|i| format!(" [{} {i}]", i.kind())).unwrap_or_default();
        println!("{:<14} {} - {}{identifier}", entry.provider.as_tag(), entry.artist, entry.title);
        println!("{:<14} {}", "", entry.url);
    }
}
