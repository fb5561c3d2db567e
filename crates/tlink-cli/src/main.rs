use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use tlink_core::{Adaptor, Config, ExportConfig, HttpConnector, ResultExporter, TestResultNode};

#[derive(Parser)]
#[command(name = "tlink")]
#[command(about = "Report test run results to a TestLink server", long_about = None)]
struct Cli {
    /// Config file (defaults to ./tlink.toml, then the user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a result file (.json, .yaml or .yml)
    Export {
        #[arg(required = true)]
        results: PathBuf,
    },
    /// Connect and resolve the configured hierarchy without reporting
    Check {
        /// Fixture whose configuration to check (default: [defaults])
        #[arg(long)]
        fixture: Option<String>,
    },
    /// Print a default configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init => {
            print!("{}", Config::default_config_string());
            Ok(())
        }
        Commands::Export { results } => export(load_config(cli.config)?, &results).await,
        Commands::Check { fixture } => check(load_config(cli.config)?, fixture.as_deref()).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path)
            .wrap_err_with(|| format!("failed to load {}", path.display())),
        None => Config::load().wrap_err("failed to load configuration"),
    }
}

fn connector(config: &Config) -> HttpConnector {
    HttpConnector::new(Duration::from_secs(config.client.timeout_secs))
}

async fn export(config: Config, results: &Path) -> Result<()> {
    let tree = TestResultNode::from_file(results)
        .wrap_err_with(|| format!("failed to read {}", results.display()))?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!("Exporting {} results", tree.leaf_count()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let mut exporter = ResultExporter::new(connector(&config), config);
    let summary = exporter.run_finished(&tree).await;

    spinner.finish_and_clear();
    println!("Export finished: {summary}");
    if let Some(error) = exporter.adaptor().last_error() {
        println!("  Last connection error: {error}");
    }
    Ok(())
}

async fn check(config: Config, fixture: Option<&str>) -> Result<()> {
    let fixture_config = match fixture {
        Some(name) => config
            .fixture(name)
            .ok_or_else(|| eyre!("no configuration for fixture '{name}'"))?,
        None => config.defaults.clone(),
    };
    fixture_config.validate()?;

    let suite_fallback = fixture.unwrap_or_default();
    let selection = fixture_config.hierarchy(suite_fallback);
    if selection.test_suite.is_empty() {
        return Err(eyre!("no test suite configured; set `test_suite` or pass --fixture"));
    }

    // Checking must not change the server, so missing suites stay missing.
    let settings = ExportConfig {
        create_missing_suites: false,
        ..config.export.clone()
    };
    let mut adaptor = Adaptor::with_settings(connector(&config), settings);

    let params = fixture_config.connection();
    println!("Connecting to {}", params.url);
    if !adaptor.set_connection(params).await {
        let reason = adaptor
            .last_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(eyre!("could not connect: {reason}"));
    }

    let ids = adaptor.set_hierarchy(selection.clone()).await?;
    println!("Hierarchy resolved:");
    println!("  Project:    {} (id {}, prefix {})", selection.project, ids.project_id, ids.project_prefix);
    println!("  Test plan:  {} (id {})", selection.test_plan, ids.test_plan_id);
    println!("  Platform:   {} (id {})", display_or(&selection.platform, "none"), ids.platform_id);
    println!("  Build:      {} (id {})", display_or(&selection.build, "latest"), ids.build_id);
    println!("  Test suite: {} (id {})", selection.test_suite, ids.test_suite_id);
    Ok(())
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}
