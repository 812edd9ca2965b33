//! Tenancy CLI
//!
//! Command-line tools for inspection stores.
//!
//! # Commands
//!
//! - `inspect` - Display store statistics and metadata
//! - `verify` - Check the manifest, checkpoint image and journal
//! - `checkpoint` - Fold the journal into a fresh checkpoint image
//! - `records` - List records with search, date range and sort
//! - `properties` - List properties with search, date range and sort

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tenancy_core::{DateRange, SortOrder, Stage};
use tracing_subscriber::EnvFilter;

/// Inspection store tools.
#[derive(Parser)]
#[command(name = "tenancy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format shared by the listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// Pretty JSON
    Json,
}

/// Creation-date preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RangeArg {
    /// Everything
    All,
    /// Since midnight UTC
    Today,
    /// Last 7 days
    #[value(name = "7d")]
    Week,
    /// Last 30 days
    #[value(name = "30d")]
    Month,
    /// Last 365 days
    #[value(name = "365d")]
    Year,
}

impl From<RangeArg> for DateRange {
    fn from(arg: RangeArg) -> Self {
        match arg {
            RangeArg::All => DateRange::All,
            RangeArg::Today => DateRange::Today,
            RangeArg::Week => DateRange::Last7Days,
            RangeArg::Month => DateRange::Last30Days,
            RangeArg::Year => DateRange::Last365Days,
        }
    }
}

/// Sort direction by creation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderArg {
    /// Oldest first
    Asc,
    /// Newest first
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Asc => SortOrder::Ascending,
            OrderArg::Desc => SortOrder::Descending,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Display store statistics and metadata
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Verify store integrity without modifying it
    Verify,

    /// Fold the journal into a checkpoint image
    Checkpoint,

    /// List records
    Records {
        /// Case-insensitive text search over titles
        #[arg(short, long, default_value = "")]
        search: String,

        /// Creation-date preset
        #[arg(short, long, value_enum, default_value = "all")]
        range: RangeArg,

        /// Sort order by creation date
        #[arg(short, long, value_enum, default_value = "desc")]
        order: OrderArg,

        /// Only this stage (move-in, living, move-out)
        #[arg(long)]
        stage: Option<Stage>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// List properties
    Properties {
        /// Case-insensitive text search over names and addresses
        #[arg(short, long, default_value = "")]
        search: String,

        /// Creation-date preset
        #[arg(short, long, value_enum, default_value = "all")]
        range: RangeArg,

        /// Sort order by creation date
        #[arg(short, long, value_enum, default_value = "desc")]
        order: OrderArg,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Checkpoint => {
            let path = cli.path.ok_or("Store path required for checkpoint")?;
            commands::checkpoint::run(&path)?;
        }
        Commands::Records {
            search,
            range,
            order,
            stage,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for records")?;
            let query = tenancy_core::RecordQuery {
                search,
                range: range.into(),
                order: order.into(),
                stage,
                property: None,
            };
            commands::records::run(&path, &query, format)?;
        }
        Commands::Properties {
            search,
            range,
            order,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for properties")?;
            let query = tenancy_core::PropertyQuery {
                search,
                range: range.into(),
                order: order.into(),
            };
            commands::properties::run(&path, &query, format)?;
        }
        Commands::Version => {
            println!("Tenancy CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Tenancy Core v{}", tenancy_core::VERSION);
            println!("Schema v{}", tenancy_core::CURRENT_SCHEMA_VERSION);
        }
    }

    Ok(())
}
