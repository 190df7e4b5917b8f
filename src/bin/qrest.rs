//! qrest: query REST APIs with SQL.
//!
//! # Usage
//!
//! ```bash
//! # Run a statement against an API description
//! qrest --spec https://petstore.swagger.io/v2/swagger.json \
//!     query "SELECT id, name FROM findByStatus WHERE status = 'sold' LIMIT 5"
//!
//! # Show the request without sending it
//! qrest --spec petstore.json query "DELETE FROM pet WHERE petId = 4" --dry-run
//!
//! # Serve the configured APIs over HTTP
//! qrest --config qrest.toml serve
//! ```

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use qrest::catalog::Catalog;
use qrest::config::{self, Config, LoggingConfig};
use qrest::executor::{self, QueryResult, Row};
use qrest::grammar::Grammar;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

#[derive(Parser)]
#[command(name = "qrest")]
#[command(version)]
#[command(about = "Query REST APIs with SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    qrest --spec petstore.json query \"SELECT * FROM findByStatus WHERE status = 'sold'\"
    qrest --spec petstore.json grammar --table findByStatus
    qrest --config qrest.toml serve --port 9000")]
struct Cli {
    /// Config file (default: ./qrest.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// OpenAPI/Swagger document URL or path; replaces configured APIs
    #[arg(long, global = true, env = "QREST_SPEC")]
    spec: Option<String>,

    /// Override the base URL declared by the document
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Auth scheme for --spec: none, bearer, apikey or basic
    #[arg(long, global = true)]
    auth_type: Option<String>,

    /// Auth token for --spec
    #[arg(long, global = true, env = "QREST_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Only load the named API from the config
    #[arg(long, global = true)]
    api: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one SQL statement
    Query {
        /// The statement to run
        sql: String,
        /// Validate and show the HTTP request without sending it
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Show derived grammars
    Grammar {
        /// Only this table
        #[arg(short, long)]
        table: Option<String>,
    },
    /// List discovered operations
    Capabilities,
    /// Write a sample config file
    Init {
        /// Destination
        #[arg(default_value = config::CONFIG_FILE)]
        path: PathBuf,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init { path } = &cli.command {
        config::write_sample(path)?;
        println!("{} Wrote sample config to {}", "✓".green(), path.display().to_string().cyan());
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    init_logging(&config.logging, cli.verbose)?;

    if config.apis.is_empty() {
        bail!("no APIs configured; pass --spec or add [[apis]] to {}", config::CONFIG_FILE);
    }

    let catalog = Catalog::load(&config).await;
    for (name, reason) in catalog.failures() {
        eprintln!("{} API '{}': {}", "⚠".yellow(), name, reason);
    }
    if catalog.is_empty() {
        bail!("no tables discovered");
    }

    match cli.command {
        Commands::Query { sql, dry_run } => {
            if cli.verbose {
                eprintln!("{} {}", "Input:".dimmed(), sql.yellow());
            }
            if dry_run {
                explain_request(&catalog, &config, &sql)
            } else {
                run_query(&catalog, &sql, cli.format).await
            }
        }
        Commands::Grammar { table } => {
            let grammars: Vec<&Grammar> = match table {
                Some(t) => vec![catalog
                    .grammar(&t)
                    .with_context(|| format!("table '{}' not found", t))?],
                None => catalog.tables().map(|(_, _, g)| g).collect(),
            };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&grammars)?),
                OutputFormat::Table => grammars.iter().for_each(|g| print_grammar(g)),
            }
            Ok(())
        }
        Commands::Capabilities => {
            print_capabilities(&catalog, cli.format)?;
            Ok(())
        }
        Commands::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            qrest::server::serve(config, catalog).await?;
            Ok(())
        }
        Commands::Init { .. } => Ok(()),
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(spec) = &cli.spec {
        let adhoc = Config::from_cli(
            spec,
            cli.base_url.as_deref(),
            cli.auth_type.as_deref(),
            cli.auth_token.as_deref(),
        );
        config.apis = adhoc.apis;
    } else if let Some(base_url) = &cli.base_url {
        for api in &mut config.apis {
            api.base_url = Some(base_url.clone());
        }
    }

    if let Some(name) = &cli.api {
        let api = config
            .api(name)
            .cloned()
            .with_context(|| format!("API '{}' is not configured", name))?;
        config.apis = vec![api];
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(logging: &LoggingConfig, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("qrest={},tower_http={}", level, level)));

    let writer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(logging.file.is_none());
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn run_query(catalog: &Catalog, sql: &str, format: OutputFormat) -> anyhow::Result<()> {
    let result = match catalog.query(sql).await {
        Ok(result) => result,
        Err(failure) => {
            for suggestion in &failure.suggestions {
                eprintln!("  {} {}", "hint:".cyan(), suggestion);
            }
            return Err(failure.into());
        }
    };

    for warning in &result.warnings {
        eprintln!("{} {}", "⚠".yellow(), warning);
    }
    if let Some(error) = &result.error {
        bail!("{}", error);
    }
    format_output(&result, &format);
    Ok(())
}

fn explain_request(catalog: &Catalog, config: &Config, sql: &str) -> anyhow::Result<()> {
    let (route, query) = catalog.prepare(sql)?;
    let request = executor::build_request(route.capability, &query, config.defaults.pagination)?;

    println!("{} {} ({})", "Table:".dimmed(), route.capability.table.white(), route.api.dimmed());
    println!("{} {} {}", "Request:".green().bold(), request.method.to_string().cyan(), request.url);
    if let Some(body) = &request.body {
        println!("{}", "Body:".green().bold());
        println!("{}", serde_json::to_string_pretty(body)?);
    }
    for warning in &request.warnings {
        println!("{} {}", "⚠".yellow(), warning);
    }
    Ok(())
}

fn format_output(result: &QueryResult, format: &OutputFormat) {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
        return;
    }
    if result.rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }
    print_rows(&result.rows);
    println!();
    println!("{} row(s) returned", result.total.to_string().cyan());
}

fn print_rows(rows: &[Row]) {
    let mut columns: Vec<&String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
    }

    let widths: Vec<usize> = columns
        .iter()
        .map(|c| {
            rows.iter()
                .filter_map(|row| row.get(*c))
                .map(|v| val_to_string(v).chars().count())
                .fold(c.chars().count(), usize::max)
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:width$}", c, width = w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| {
                let val = row.get(*c).map(val_to_string).unwrap_or_default();
                format!("{:width$}", val, width = w)
            })
            .collect();
        println!("{}", cells.join(" │ "));
    }
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn print_grammar(grammar: &Grammar) {
    println!(
        "{} {} {}",
        grammar.table.cyan().bold(),
        "·".dimmed(),
        grammar.method.to_string().yellow()
    );
    println!("  {} {}", "Columns:".dimmed(), join_or_dash(&grammar.columns));
    if grammar.filters.is_empty() {
        println!("  {} -", "Filters:".dimmed());
    } else {
        println!("  {}", "Filters:".dimmed());
        for (column, ops) in &grammar.filters {
            let ops: Vec<&str> = ops.iter().map(|op| op.as_str()).collect();
            println!("    • {} {}", column.white(), ops.join(" ").dimmed());
        }
    }
    println!("  {} {}", "Order by:".dimmed(), join_or_dash(&grammar.orderable));
    if !grammar.method.is_read() {
        println!("  {} {}", "Writable:".dimmed(), join_or_dash(&grammar.writable));
    }
    println!(
        "  {} default {}, max {}{}",
        "Limit:".dimmed(),
        grammar.default_limit,
        grammar.max_limit,
        if grammar.paging { ", paged" } else { "" }
    );
    for suggestion in &grammar.suggestions {
        println!("  {} {}", "hint:".cyan(), suggestion.dimmed());
    }
    println!();
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn print_capabilities(catalog: &Catalog, format: OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        let caps: Vec<_> = catalog.tables().map(|(_, cap, _)| cap).collect();
        println!("{}", serde_json::to_string_pretty(&caps)?);
        return Ok(());
    }

    let rows: Vec<Row> = catalog
        .tables()
        .map(|(api, cap, _)| {
            let mut row = Row::new();
            row.insert("api".into(), api.into());
            row.insert("table".into(), cap.table.clone().into());
            row.insert("method".into(), cap.method.as_str().into());
            row.insert("path".into(), cap.path.clone().into());
            row.insert(
                "parameters".into(),
                cap.parameters
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
                    .into(),
            );
            row
        })
        .collect();
    print_rows(&rows);
    println!();
    println!("{} table(s)", rows.len().to_string().cyan());
    Ok(())
}
