//! Sports features CLI
//!
//! Adds wagering-market features to a JSON event table.

use clap::{Parser, Subcommand};
use sportsfeatures::{Config, Result};

#[derive(Parser)]
#[command(name = "sportsfeatures")]
#[command(about = "Wagering-market features for historical sports event tables", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute odds features for a table
    Process {
        /// Input table (JSON array of records)
        #[arg(short, long)]
        input: String,
        /// Output table path
        #[arg(short, long)]
        output: String,
        /// Keep raw quote and post-event statistic columns
        #[arg(long)]
        keep_leakage: bool,
        /// Sort rows by event time before processing
        #[arg(long)]
        sort: bool,
    },
    /// List the columns the configuration adds and removes
    Columns,
    /// Write a default config
    Init,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        log::info!("No config at {}, using defaults", cli.config);
        Config::default()
    };

    let result = match cli.command {
        Commands::Process {
            input,
            output,
            keep_leakage,
            sort,
        } => commands::process(config, &input, &output, keep_leakage, sort),
        Commands::Columns => commands::columns(&config),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use sportsfeatures::data::Table;
    use sportsfeatures::features::feature_columns;
    use sportsfeatures::pipeline::{self, leakage_columns};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);
        println!("\nNext steps:");
        println!("  1. Edit {} to describe your identifiers and bets", config_path);
        println!("  2. Run 'sportsfeatures process --input events.json --output features.json'");
        Ok(())
    }

    pub fn process(
        mut config: Config,
        input: &str,
        output: &str,
        keep_leakage: bool,
        sort: bool,
    ) -> Result<()> {
        if sort {
            config.engine.sort_by_time = true;
        }

        let mut table = Table::load_json(input)?;
        log::info!(
            "Loaded {} rows with {} columns from {}",
            table.len(),
            table.columns().len(),
            input
        );
        if !table.is_empty() && !table.has_column(&config.dt_column) {
            log::warn!("Event time column {} not found in input", config.dt_column);
        }

        let summary = pipeline::process(&mut table, &config, !keep_leakage)?;
        table.save_json(output)?;

        println!(
            "Wrote {} rows to {} ({} identifiers scored, {} missing, {} history entries)",
            summary.rows, output, summary.scored, summary.degraded, summary.history
        );
        Ok(())
    }

    pub fn columns(config: &Config) -> Result<()> {
        println!("Added:");
        for identifier in &config.identifiers {
            for column in feature_columns(&identifier.column_prefix) {
                println!("  {}", column);
            }
        }
        println!("\nRemoved:");
        for column in leakage_columns(&config.identifiers) {
            println!("  {}", column);
        }
        Ok(())
    }
}
