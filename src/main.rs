//! Demandboard CLI
//!
//! Command-line front end for the demand/procurement API:
//! - Seed or clear session credentials
//! - Summarize plant totals for a time window
//! - Export consolidated, raw or summary CSV files
//! - Upload interval data through bulk-add

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use demandboard::config::generate_default_config;
use demandboard::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "demandboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Demand and procurement dashboard client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, overrides the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store credentials from a sign-in
    Login {
        /// Access token
        #[arg(long)]
        bearer: String,
        /// Refresh token, kept between runs
        #[arg(long)]
        refresh: Option<String>,
        /// Access token lifetime in seconds
        #[arg(long)]
        expires_in: Option<u64>,
    },

    /// Forget stored credentials
    Logout,

    /// Print per-plant totals
    Summary {
        #[command(flatten)]
        source: Source,
    },

    /// Export intervals as CSV
    Export {
        #[command(flatten)]
        source: Source,
        /// Row shape
        #[arg(short, long, value_enum, default_value = "consolidated")]
        kind: ExportKind,
        /// Column preset (compact, detailed)
        #[arg(short, long)]
        profile: Option<String>,
        /// Output file (default: export directory from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a JSON payload to bulk-add and summarize the result
    Upload {
        /// Path to the JSON payload
        file: PathBuf,
    },

    /// Print a default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Where intervals come from
#[derive(clap::Args)]
pub struct Source {
    /// Window start
    #[arg(long)]
    start: Option<String>,
    /// Window end
    #[arg(long)]
    end: Option<String>,
    /// Read intervals from a saved JSON response instead of the API
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportKind {
    Consolidated,
    Raw,
    Summary,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    init_logging(&config.logging);

    match cli.command {
        Commands::Login {
            bearer,
            refresh,
            expires_in,
        } => {
            let session = open_session(&config)?;
            let credential = Credential::new(bearer, refresh)
                .expires_in(expires_in.unwrap_or(config.session.bearer_ttl_secs));
            session.sign_in(&credential);
            println!("Signed in");
        }

        Commands::Logout => {
            open_session(&config)?.sign_out();
            println!("Signed out");
        }

        Commands::Summary { source } => {
            let intervals = load_intervals(&config, &source).await?;
            print_summary(&aggregate(&intervals));
        }

        Commands::Export {
            source,
            kind,
            profile,
            output,
        } => {
            let intervals = load_intervals(&config, &source).await?;

            let mut export_profile = config.export.export_profile();
            if let Some(name) = profile {
                export_profile = ExportProfile::named(&name)
                    .with_context(|| format!("Unknown export profile: {}", name))?
                    .list_separator(config.export.list_separator.clone())
                    .header_mode(config.export.header_mode);
            }
            let builder = ExportBuilder::new(export_profile);

            let (stem, rows) = match kind {
                ExportKind::Consolidated => {
                    ("consolidated", builder.build_consolidated_rows(&intervals))
                }
                ExportKind::Raw => ("raw", builder.build_raw_rows(intervals)),
                ExportKind::Summary => {
                    ("summary", builder.build_summary_rows(&aggregate(&intervals)))
                }
            };

            let Some(doc) = builder.to_csv(&rows)? else {
                println!("Nothing to export");
                return Ok(());
            };
            let doc = doc.named(stem);

            let path = output
                .unwrap_or_else(|| Path::new(&config.export.output_dir).join(doc.filename()));
            doc.save(&path)?;
            println!("Exported {} rows to {}", rows.len(), path.display());
        }

        Commands::Upload { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", file.display()))?;

            let client = api_client(&config)?;
            let intervals = client.bulk_add(&payload).await?;
            print_summary(&aggregate(&intervals));
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("demandboard={}", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn open_session(config: &Config) -> anyhow::Result<SessionContext> {
    let store = FileCredentialStore::open(&config.session.credentials_file)
        .with_context(|| format!("Failed to open {}", config.session.credentials_file))?;

    Ok(SessionContext::new(Arc::new(store)).with_bearer_ttl(config.session.bearer_ttl_secs))
}

fn api_client(config: &Config) -> anyhow::Result<ApiClient> {
    let session = open_session(config)?;
    Ok(ApiClient::new(&config.api.client_config(), session)?)
}

async fn load_intervals(config: &Config, source: &Source) -> anyhow::Result<Vec<ProcurementInterval>> {
    if let Some(path) = &source.input {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let intervals = serde_json::from_str(&content)
            .with_context(|| format!("Expected an array of intervals in {}", path.display()))?;
        return Ok(intervals);
    }

    let client = api_client(config)?;
    let query = DashboardQuery {
        start: source.start.clone(),
        end: source.end.clone(),
    };
    Ok(client.dashboard(&query).await?)
}

fn print_summary(acc: &AggregationAccumulator) {
    let window = |ts: &Option<serde_json::Value>| {
        ts.as_ref()
            .map(|v| export::cell_text(Some(v)))
            .unwrap_or_else(|| "-".to_string())
    };

    println!(
        "Intervals: {}  ({} .. {})",
        acc.interval_count(),
        window(&acc.start_timestamp),
        window(&acc.end_timestamp)
    );
    println!(
        "Exchange: predicted qty {:.2}, predicted price {:.2}",
        acc.total_exchange.predicted_qty, acc.total_exchange.predicted_price
    );
    println!();
    println!(
        "{:<30} {:<12} {:>14} {:>14} {:>8}",
        "Plant", "Type", "Energy (kWh)", "Net cost", "Count"
    );

    let grand_total = acc.grand_total();
    for totals in acc.plants.values().chain(std::iter::once(&grand_total)) {
        println!(
            "{:<30} {:<12} {:>14.2} {:>14.2} {:>8}",
            totals.plant_name,
            totals.plant_type,
            totals.total_generated_energy,
            totals.total_net_cost,
            totals.count
        );
    }
}
