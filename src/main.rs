// Folio - main.rs
//
// Command-line front end. Handles:
// 1. CLI argument parsing
// 2. Configuration loading (folio.toml, CLI overrides)
// 3. Logging initialisation (debug mode support)
// 4. Dispatch to the query service and text/JSON output

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use folio::app::service::{BlogService, ListQuery};
use folio::core::model::Post;
use folio::core::query::PostFilter;
use folio::platform::config::{self, PlatformPaths};
use folio::util::error::{ConfigError, FolioError};
use folio::util::{constants, logging};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Folio - flat-file blog content engine.
///
/// Reads Markdown posts with YAML front-matter from a directory and answers
/// listing, lookup and search queries over them.
#[derive(Parser, Debug)]
#[command(name = "folio", version, about)]
struct Cli {
    /// Posts directory (overrides [content] posts_dir).
    #[arg(short = 'p', long = "posts-dir", global = true)]
    posts_dir: Option<PathBuf>,

    /// Config file (defaults to folio.toml in the platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Print results as JSON.
    #[arg(long = "json", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List posts, newest first.
    List(ListArgs),

    /// Show a single post.
    Show {
        slug: String,

        /// Allow showing drafts.
        #[arg(long)]
        drafts: bool,

        /// Print rendered HTML instead of the Markdown body.
        #[arg(long)]
        html: bool,
    },

    /// Tags with post counts.
    Tags {
        #[arg(long)]
        drafts: bool,
    },

    /// Search titles, bodies and tags.
    Search { text: String },

    /// Most recent posts.
    Recent {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Posts sharing tags with a post.
    Related {
        slug: String,

        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Cache and scan status.
    Status,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Only posts with this exact tag.
    #[arg(short = 't', long)]
    tag: Option<String>,

    /// Include drafts.
    #[arg(long)]
    drafts: bool,

    /// Only posts from this year.
    #[arg(long)]
    year: Option<i32>,

    /// Only posts on or after this date (YYYY-MM-DD).
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Only posts on or before this date (YYYY-MM-DD).
    #[arg(long)]
    until: Option<NaiveDate>,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Posts per page (defaults to [query] page_size).
    #[arg(long = "page-size")]
    page_size: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FolioError> {
    // An explicit --config must exist; the platform default may be absent.
    let config_path = match cli.config {
        Some(ref path) => {
            if !path.exists() {
                return Err(ConfigError::Io {
                    path: path.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, "config file not found"),
                }
                .into());
            }
            path.clone()
        }
        None => PlatformPaths::resolve().config_file(),
    };

    let (mut app_config, warnings) = config::load_config(&config_path);

    logging::init(cli.debug, app_config.log_level.as_deref());
    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "Folio starting"
    );
    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config warning");
        eprintln!("Warning: {warning}");
    }

    if let Some(dir) = cli.posts_dir {
        app_config.posts_dir = dir;
    }

    let service = BlogService::from_config(&app_config);
    let json = cli.json;
    let mut out = io::stdout().lock();

    match cli.command {
        Command::List(args) => {
            let request = ListQuery {
                filter: PostFilter {
                    tag: args.tag,
                    include_drafts: args.drafts,
                    year: args.year,
                    since: args.since,
                    until: args.until,
                    text: String::new(),
                },
                page: args.page,
                page_size: args.page_size,
            };
            let page = service.list(&request)?;
            if json {
                print_json(&mut out, &page)?;
            } else {
                print_posts(&mut out, &page.items)?;
                writeln!(
                    out,
                    "-- page {}/{} ({} posts)",
                    page.page, page.total_pages, page.total_items
                )
                .map_err(stdout_error)?;
            }
        }
        Command::Show { slug, drafts, html } => {
            let post = service.get(&slug, drafts)?;
            if json {
                print_json(&mut out, &post)?;
            } else {
                print_post(&mut out, &post, html)?;
            }
        }
        Command::Tags { drafts } => {
            let tags = service.tags(drafts);
            if json {
                print_json(&mut out, &tags)?;
            } else {
                for tag in &tags {
                    writeln!(out, "{:>5}  {}", tag.count, tag.tag).map_err(stdout_error)?;
                }
            }
        }
        Command::Search { text } => {
            let posts = service.search(&text);
            if json {
                print_json(&mut out, &posts)?;
            } else {
                print_posts(&mut out, &posts)?;
            }
        }
        Command::Recent { limit } => {
            let posts = service.recent(limit);
            if json {
                print_json(&mut out, &posts)?;
            } else {
                print_posts(&mut out, &posts)?;
            }
        }
        Command::Related { slug, limit } => {
            let posts = service.related(&slug, limit)?;
            if json {
                print_json(&mut out, &posts)?;
            } else {
                print_posts(&mut out, &posts)?;
            }
        }
        Command::Status => {
            // Refresh first so the status reflects the directory as it is now.
            let read = service.cache().get_posts();
            let status = service.status();
            if json {
                print_json(&mut out, &status)?;
            } else {
                let last_scan = status
                    .last_scan
                    .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
                writeln!(out, "Posts directory: {}", status.posts_dir.display())
                    .map_err(stdout_error)?;
                writeln!(out, "Last scan:       {last_scan}").map_err(stdout_error)?;
                writeln!(out, "Posts:           {}", status.post_count).map_err(stdout_error)?;
                writeln!(out, "Drafts:          {}", status.draft_count).map_err(stdout_error)?;
                writeln!(out, "Skipped files:   {}", status.skipped_count)
                    .map_err(stdout_error)?;
                for skipped in read.store.skipped() {
                    writeln!(out, "  [{}] {}", skipped.kind, skipped.reason)
                        .map_err(stdout_error)?;
                }
                if let Some(ref warning) = status.degraded {
                    writeln!(out, "Degraded:        {}", warning.message).map_err(stdout_error)?;
                }
            }
        }
    }

    Ok(())
}

fn stdout_error(source: io::Error) -> FolioError {
    FolioError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "write output",
        source,
    }
}

fn print_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<(), FolioError> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(|e| stdout_error(e.into()))?;
    writeln!(out).map_err(stdout_error)
}

fn print_posts(out: &mut impl Write, posts: &[Arc<Post>]) -> Result<(), FolioError> {
    for post in posts {
        let tags = post.tags.iter().cloned().collect::<Vec<_>>().join(", ");
        let draft = if post.draft { " [draft]" } else { "" };
        writeln!(
            out,
            "{}  {:<32}  {}{draft}{}",
            post.date_iso(),
            post.slug,
            post.title,
            if tags.is_empty() {
                String::new()
            } else {
                format!("  ({tags})")
            }
        )
        .map_err(stdout_error)?;
    }
    Ok(())
}

fn print_post(out: &mut impl Write, post: &Post, html: bool) -> Result<(), FolioError> {
    let tags = post.tags.iter().cloned().collect::<Vec<_>>().join(", ");
    let header = format!(
        "{}\n{} | {} | {} min read\nTags: {}\n",
        post.title,
        post.date_formatted(),
        post.author,
        post.reading_time,
        if tags.is_empty() { "-" } else { tags.as_str() }
    );
    let body = if html { &post.rendered_html } else { &post.body };
    write!(out, "{header}\n{body}").map_err(stdout_error)?;
    if !body.ends_with('\n') {
        writeln!(out).map_err(stdout_error)?;
    }
    Ok(())
}
