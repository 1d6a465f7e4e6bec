use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fabdash_core::{
    alert_summary, data_overview, hourly_aggregates, operations_overview, summary_metrics,
    DashboardConfig, SensorTable, TableCache,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

use render::Report;

const DEFAULT_CONFIG: &str = "fabdash.toml";

#[derive(Parser, Debug)]
#[command(author, version, about = "Manufacturing sensor dashboard panels", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to ./fabdash.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Sensor CSV export, overrides the configured data path
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record count and date range
    Overview,
    /// Average quality, speed, energy and optimal-conditions share
    Summary,
    /// Machine speed against quality, split by optimal conditions
    Operations,
    /// Hourly means of every sensor field
    Hourly,
    /// Percentile-based alert counts
    Alerts,
    /// Most recent readings
    Recent(RecentArgs),
    /// Every panel at once
    Report,
}

#[derive(Args, Debug, Default)]
struct RecentArgs {
    /// Number of rows to show, overrides the configured window
    #[arg(long)]
    rows: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let table = TableCache::global()
        .get_or_load(&config.data_path, &config.load_options())
        .with_context(|| format!("failed to load {}", config.data_path.display()))?;

    let report = build_report(&cli.command, &config, &table)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<DashboardConfig> {
    dotenvy::dotenv().ok();

    let config = match &cli.config {
        Some(path) => read_config(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => read_config(Path::new(DEFAULT_CONFIG))?,
        None => DashboardConfig::default(),
    };
    let mut config = config
        .apply_env()
        .context("invalid FABDASH_* environment override")?;

    if let Some(path) = &cli.data {
        config.data_path = path.clone();
    }
    info!(data_path = %config.data_path.display(), "resolved dashboard configuration");
    Ok(config)
}

fn read_config(path: &Path) -> Result<DashboardConfig> {
    DashboardConfig::from_file(path)
        .with_context(|| format!("failed to read config {}", path.display()))
}

fn build_report(command: &Command, config: &DashboardConfig, table: &SensorTable) -> Result<Report> {
    let mut report = Report::default();
    let everything = matches!(command, Command::Report);

    if everything || matches!(command, Command::Overview) {
        report.overview = Some(data_overview(table)?);
    }
    if everything || matches!(command, Command::Summary) {
        report.summary = Some(summary_metrics(table)?);
    }
    if everything || matches!(command, Command::Operations) {
        report.operations = Some(operations_overview(table)?);
    }
    if everything || matches!(command, Command::Hourly) {
        report.hourly = Some(hourly_aggregates(table)?);
    }
    if everything || matches!(command, Command::Alerts) {
        report.alerts = Some(alert_summary(table)?);
    }
    match command {
        Command::Recent(args) => {
            let rows = args.rows.unwrap_or(config.recent_rows);
            report.recent = Some(table.tail(rows).to_vec());
        }
        Command::Report => report.recent = Some(table.tail(config.recent_rows).to_vec()),
        _ => {}
    }

    Ok(report)
}
