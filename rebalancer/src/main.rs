//! CLI entry point for the holdbook rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use holdbook::Currency;
use holdbook_rebalancer::config::{Config, FormatSetting};
use holdbook_rebalancer::pipeline::{self, RunOptions};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Portfolio composition and rebalancing from brokerage balance payloads")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Broker format: item_list, account_stock or auto (overrides config)
    #[arg(long)]
    format: Option<FormatSetting>,

    /// Reporting currency: KRW or USD (overrides config)
    #[arg(long)]
    currency: Option<Currency>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl From<OutputArgs> for RunOptions {
    fn from(args: OutputArgs) -> Self {
        RunOptions {
            format: args.format,
            currency: args.currency,
            json: args.json,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Show the valued account composition
    Snapshot {
        /// Path to the broker balance payload (JSON)
        payload: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compute the rebalance plan against a target allocation
    Plan {
        /// Path to target.json
        target: PathBuf,

        /// Path to the broker balance payload (JSON)
        payload: PathBuf,

        /// Optional live price sheet (JSON)
        #[arg(long)]
        prices: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print the detected broker format of a payload
    Detect {
        /// Path to the broker balance payload (JSON)
        payload: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    // detect needs no config
    if let Command::Detect { payload } = &cli.command {
        match pipeline::detect(payload) {
            Ok(format) => println!("{format}"),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Snapshot { payload, output } => {
            pipeline::run_snapshot(&config, &payload, &output.into())
        }
        Command::Plan {
            target,
            payload,
            prices,
            output,
        } => pipeline::run_plan(&config, &target, &payload, prices.as_deref(), &output.into()),
        Command::Detect { .. } => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
