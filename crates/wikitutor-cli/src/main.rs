//! Wikitutor CLI - encyclopedia-backed summaries and learning paths

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use wikitutor_core::api::{ApiResponse, HealthStatus, Wikitutor};
use wikitutor_core::config::Config;

#[derive(Parser)]
#[command(name = "wikitutor")]
#[command(author, version, about = "Summaries and learning paths for any encyclopedia topic", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve free-form input to its canonical topic title
    Resolve { input: String },

    /// Show the article intro for a topic
    Article { topic: String },

    /// Show a topic summary at a reading level
    Summary {
        topic: String,
        /// basic, intermediate or advanced
        #[arg(short, long)]
        level: Option<String>,
    },

    /// List topics linked from the article
    Links { topic: String },

    /// Show the learning path for a topic
    Path {
        topic: String,
        /// basic, intermediate or advanced
        #[arg(short, long)]
        level: Option<String>,
    },

    /// Rank the learning path again and replace the stored one
    Rerank { topic: String },

    /// Drop every cached artifact for a canonical topic title
    Invalidate { topic: String },

    /// Empty the cache
    FlushCache,

    /// Delete every stored topic artifact
    ClearDb {
        /// Required; the store cannot be recovered afterwards
        #[arg(long)]
        force: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wikitutor=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let format = cli.format;
    let quiet = cli.quiet;

    // Config commands must work even when the database cannot be opened
    let app = || async { Wikitutor::open(Config::load()?).await };

    match cli.command {
        Commands::Resolve { input } => {
            let response = app().await?.topics().resolve(&input).await;
            emit(&response, format, quiet, |body| field(body, "topic").to_string())
        }

        Commands::Article { topic } => {
            let response = app().await?.topics().article(&topic).await;
            emit(&response, format, quiet, |body| {
                format!("# {}\n\n{}", field(body, "topic"), field(body, "text"))
            })
        }

        Commands::Summary { topic, level } => {
            let response = app().await?.topics().summary(&topic, level.as_deref()).await;
            emit(&response, format, quiet, |body| {
                format!(
                    "# {} ({})\n\n{}",
                    field(body, "topic"),
                    field(body, "level"),
                    field(body, "summary")
                )
            })
        }

        Commands::Links { topic } => {
            let response = app().await?.topics().links(&topic).await;
            emit(&response, format, quiet, |body| bullet_list(&body["links"]))
        }

        Commands::Path { topic, level } => {
            let response = app().await?.topics().learning_path(&topic, level.as_deref()).await;
            emit(&response, format, quiet, render_path)
        }

        Commands::Rerank { topic } => {
            let response = app().await?.topics().rerank(&topic).await;
            emit(&response, format, quiet, render_path)
        }

        Commands::Invalidate { topic } => {
            let response = app().await?.invalidate(&topic).await;
            emit(&response, format, quiet, |body| {
                format!("Cache cleared for '{}'", field(body, "topic"))
            })
        }

        Commands::FlushCache => {
            let response = app().await?.flush_cache().await;
            emit(&response, format, quiet, |_| "Cache flushed.".to_string())
        }

        Commands::ClearDb { force } => {
            if !force {
                bail!("Refusing to clear the database without --force");
            }
            let response = app().await?.clear_store().await;
            emit(&response, format, quiet, |_| "Database cleared.".to_string())
        }

        Commands::Doctor => cmd_doctor(&app().await?, format, quiet).await,

        Commands::Config { action } => cmd_config(action, quiet),
    }
}

// ============================================================================
// Output
// ============================================================================

/// Print a boundary response; non-200 responses exit with an error.
fn emit(
    response: &ApiResponse,
    format: OutputFormat,
    quiet: bool,
    render: impl FnOnce(&Value) -> String,
) -> anyhow::Result<()> {
    if let Some(message) = response.error_message() {
        if format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&response.body)?);
        }
        return Err(anyhow!("{} ({})", message, response.status.code()));
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response.body)?),
        OutputFormat::Text if !quiet => println!("{}", render(&response.body)),
        OutputFormat::Text => {}
    }
    Ok(())
}

fn field<'a>(body: &'a Value, name: &str) -> &'a str {
    body.get(name).and_then(Value::as_str).unwrap_or_default()
}

fn bullet_list(items: &Value) -> String {
    items
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|item| format!("  - {}", item))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn render_path(body: &Value) -> String {
    let mut out = format!("# {}\n", field(body, "topic"));
    if let Some(summary) = body.get("summary").and_then(Value::as_str) {
        out.push_str(&format!("\n{}\n", summary));
    }
    out.push_str("\nLearning path:\n");
    if let Some(links) = body["links"].as_array() {
        for (i, link) in links.iter().filter_map(Value::as_str).enumerate() {
            out.push_str(&format!("  {:>2}. {}\n", i + 1, link));
        }
    }
    out
}

// ============================================================================
// Command Implementations
// ============================================================================

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(app: &Wikitutor, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let report = app.doctor().await;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        println!("Wikitutor Health Check");
        println!("======================");
        println!();
        for check in &report.checks {
            let marker = match check.status {
                HealthStatus::Ok => "[OK]",
                HealthStatus::Warning => "[--]",
                HealthStatus::Error => "[!!]",
            };
            match &check.message {
                Some(message) => println!("{} {}: {}", marker, check.name, message),
                None => println!("{} {}", marker, check.name),
            }
        }
        println!();
        match report.overall_status {
            HealthStatus::Ok => println!("All checks passed!"),
            HealthStatus::Warning => println!("Usable, with warnings. See above for details."),
            HealthStatus::Error => println!("Some checks failed. See above for details."),
        }
    }

    if report.overall_status == HealthStatus::Error {
        bail!("Health check failed");
    }
    Ok(())
}
