//! FRA Atlas CLI — browse, search and map Forest Rights Act claims from the terminal.
//!
//! Talks to the records API through `fra-atlas-client` and drives the same
//! search session the atlas view uses.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::error;

use fra_atlas_client::{ClaimSource, HttpClaimSource};
use fra_atlas_core::geo::{project_markers, to_geojson};
use fra_atlas_core::{AtlasConfig, AtlasSession, SearchParams, StatusCounts};

mod render;
mod session;

/// FRA Atlas CLI — Forest Rights Act claim records from the terminal.
#[derive(Parser)]
#[command(name = "fra-atlas", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Records API base URL (overrides the config file and FRA_ATLAS_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Config file (default: .fra-atlas.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List every claim
    List,
    /// Search claims by text and filters
    Search(FilterArgs),
    /// Print the claims the map would show, as GeoJSON
    Map(FilterArgs),
    /// Claim counts per status
    Stats,
    /// Interactive session: reads commands from stdin (try `help`)
    Session,
}

#[derive(Args)]
struct FilterArgs {
    /// Free-text query (holder, village, district, state or claim id)
    query: Option<String>,

    /// Filter by claim status
    #[arg(long)]
    status: Option<String>,

    /// Filter by state
    #[arg(long)]
    state: Option<String>,

    /// Filter by district
    #[arg(long)]
    district: Option<String>,
}

impl FilterArgs {
    fn params(&self) -> SearchParams {
        SearchParams::new(
            self.query.as_deref().unwrap_or_default(),
            self.status.as_deref().unwrap_or_default(),
            self.state.as_deref().unwrap_or_default(),
            self.district.as_deref().unwrap_or_default(),
        )
    }
}

fn load_config(cli: &Cli) -> AtlasConfig {
    let mut config = match cli.config {
        Some(ref path) => AtlasConfig::from_file(path).unwrap_or_else(|e| {
            error!(error = %e, "Could not load config");
            std::process::exit(1);
        }),
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            AtlasConfig::load(&cwd)
        }
    };
    config.apply_base_url_override(cli.base_url.as_deref());
    config
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            error!(error = %e, "Could not serialize output");
            std::process::exit(1);
        }
    }
}

/// Load the full set, run one search, and apply it. Blank parameters leave
/// the session on the full set.
async fn searched_session<S: ClaimSource>(
    config: &AtlasConfig,
    source: &S,
    params: SearchParams,
) -> AtlasSession {
    let mut session = AtlasSession::new(config);
    session.load_full_set(source.fetch_all().await);
    if let Some(request) = session.search(params) {
        let outcome = source.search(&request.params).await;
        session.apply_results(request.seq, outcome);
    }
    session
}

const DEFAULT_LOG_DIRECTIVES: &str = "fra_atlas=warn";

/// `RUST_LOG` wins outright when set; otherwise only warnings are shown.
fn log_directives(rust_log: Option<&str>) -> &str {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ => DEFAULT_LOG_DIRECTIVES,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_directives(
            std::env::var("RUST_LOG").ok().as_deref(),
        )))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);
    let source = HttpClaimSource::new(&config).unwrap_or_else(|e| {
        error!(error = %e, "Could not create records client");
        std::process::exit(1);
    });

    match cli.command {
        Commands::List => {
            let records = source.fetch_all().await.unwrap_or_else(|e| {
                error!(base_url = source.base_url(), error = %e, "Could not load claims");
                std::process::exit(1);
            });
            if cli.json {
                print_json(&records);
            } else {
                for record in &records {
                    println!("{}", render::claim_line(record));
                }
                eprintln!("\n{} claims", records.len());
            }
        }
        Commands::Search(ref filters) => {
            let params = filters.params();
            let searched = !params.is_empty();
            let session = searched_session(&config, &source, params).await;

            if cli.json {
                print_json(&session.view());
            } else if !searched {
                eprintln!("No search terms — map shows all {} claims", session.full_set().len());
            } else if session.results().records.is_empty() {
                eprintln!("No matching claims — map shows all {} claims", session.display_records().len());
                std::process::exit(1);
            } else {
                for record in &session.results().records {
                    println!("{}", render::claim_line(record));
                }
                eprintln!("\n{} results", session.results().records.len());
            }
        }
        Commands::Map(ref filters) => {
            let mut session = searched_session(&config, &source, filters.params()).await;
            session.view_all();
            print_json(&to_geojson(&project_markers(session.display_records())));
        }
        Commands::Stats => {
            let records = source.fetch_all().await.unwrap_or_else(|e| {
                error!(base_url = source.base_url(), error = %e, "Could not load claims");
                std::process::exit(1);
            });
            let counts = StatusCounts::tally(&records);
            if cli.json {
                print_json(&counts);
            } else {
                print!("{}", render::status_counts(&counts));
            }
        }
        Commands::Session => {
            session::run(&config, source, cli.json).await;
        }
    }
}
