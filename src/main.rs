//! # nzb-search CLI
//!
//! Searches Usenet groups for a release and writes an NZB per release found.
//!
//! ```bash
//! nzb-search --header "My.Release" --groups a.b.teevee --date 14.03.2024 --days 2
//! ```
//!
//! Settings come from the TOML configuration file (`--config`, default `config.toml`) and are
//! overridden by flags. Header, groups, date and days are prompted for when neither provides
//! them. A missing configuration file is created with defaults.

use chrono::NaiveDate;
use clap::Parser;
use nzb_search::{
    Config, ConnectionPool, GroupSource, Result, SearchEngine, SearchRequest, run_with_shutdown,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

/// Format of the post date on the command line and at the prompt
const DATE_FORMAT: &str = "%d.%m.%Y";

/// Search Usenet for a header and build NZB files from the overview data
#[derive(Parser, Debug)]
#[command(name = "nzb-search", version, about)]
struct Cli {
    /// Path to the configuration file (TOML)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Header (part of the subject) to search for
    #[arg(long)]
    header: Option<String>,

    /// Date the header was posted (DD.MM.YYYY)
    #[arg(long)]
    date: Option<String>,

    /// Groups to search: comma list, file with one group per line, ALL or BINARIES
    #[arg(long)]
    groups: Option<String>,

    /// Directory the NZB files are written to
    #[arg(long)]
    path: Option<PathBuf>,

    /// Number of days to search back from the post date
    #[arg(long)]
    days: Option<u32>,

    /// Usenet server host
    #[arg(long)]
    host: Option<String>,

    /// Usenet server port
    #[arg(long)]
    port: Option<u16>,

    /// Connect with TLS
    #[arg(long)]
    ssl: bool,

    /// Usenet server username
    #[arg(long)]
    user: Option<String>,

    /// Usenet server password
    #[arg(long)]
    pass: Option<String>,

    /// Maximum number of connections
    #[arg(long)]
    conn: Option<usize>,

    /// Number of groups scanned in parallel
    #[arg(long)]
    scans: Option<usize>,

    /// Number of articles requested per overview call
    #[arg(long)]
    step: Option<u64>,

    /// Show verbose output
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    /// Flags take precedence over the configuration file
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.ssl {
            config.server.tls = true;
        }
        if let Some(user) = &self.user {
            config.server.username = Some(user.clone());
        }
        if let Some(pass) = &self.pass {
            config.server.password = Some(pass.clone());
        }
        if let Some(conn) = self.conn {
            config.server.connections = conn;
        }
        if let Some(groups) = &self.groups {
            config.search.groups = Some(groups.clone());
        }
        if let Some(path) = &self.path {
            config.search.path = path.clone();
        }
        if let Some(days) = self.days {
            config.search.days = Some(days);
        }
        if let Some(scans) = self.scans {
            config.search.parallel_scans = scans;
        }
        if let Some(step) = self.step {
            config.search.step = step;
        }
        if self.verbose {
            config.search.verbose = true;
        }
    }
}

/// Line-oriented questions on stdin; `None` means stdin was closed
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_string()))
    }
}

fn parse_post_date(input: &str) -> std::result::Result<NaiveDate, String> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|_| format!("Error parsing date '{}': Date does not have correct format DD.MM.YYYY!", input))
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if !cli.config.exists() {
        Config::default().save(&cli.config)?;
        println!(
            "Created configuration file '{}'. Please edit it and run again.",
            cli.config.display()
        );
        return Ok(());
    }

    let mut config = Config::load(&cli.config)?;
    cli.apply(&mut config);
    init_logging(config.search.verbose);
    config.validate()?;

    let mut prompt = Prompt::new();

    let mut term = cli.header.clone().unwrap_or_default();
    while term.trim().is_empty() {
        match prompt.ask("Enter header to search for: ").await? {
            Some(input) => term = input,
            None => return Ok(()),
        }
    }

    let pool = ConnectionPool::from_config(&config);

    let mut groups_input = config.search.groups.clone();
    let groups = loop {
        let input = match groups_input.take() {
            Some(input) => input,
            None => match prompt.ask("Enter group name(s) to search in: ").await? {
                Some(input) => input,
                None => return Ok(()),
            },
        };
        match GroupSource::parse(&input).resolve(&pool).await {
            Ok(groups) => break groups,
            Err(e) => println!("Error: {}", e),
        }
    };

    let mut date_input = cli.date.clone();
    let post_date = loop {
        let input = match date_input.take() {
            Some(input) => input,
            None => {
                match prompt
                    .ask("Enter the date when the header was posted (DD.MM.YYYY): ")
                    .await?
                {
                    Some(input) => input,
                    None => return Ok(()),
                }
            }
        };
        if input.is_empty() {
            continue;
        }
        match parse_post_date(&input) {
            Ok(date) => break date,
            Err(message) => println!("{}", message),
        }
    };

    let mut days = config.search.days.unwrap_or(0);
    while days == 0 {
        let Some(input) = prompt.ask("Enter the amount of days to search back: ").await? else {
            return Ok(());
        };
        match input.parse::<u32>() {
            Ok(value) => days = value,
            Err(e) => println!("Error parsing input '{}': {}", input, e),
        }
    }

    let request = SearchRequest {
        term: term.trim().to_string(),
        post_date,
        days,
    };
    tracing::debug!(path = %config.search.path.display(), "Writing NZB files to output path");

    let engine = SearchEngine::new(&config, pool, request)?;
    let report = run_with_shutdown(&engine, groups).await?;

    for outcome in report.failures() {
        if let Err(e) = &outcome.result {
            tracing::warn!(group = %outcome.group, error = %e, "Group was not searched completely");
        }
    }
    for path in report.saved() {
        println!("NZB file written: {}", path.display());
    }
    println!("{}", report.summary());
    Ok(())
}
