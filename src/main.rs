use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use torneo_import::model::SheetLayout;
use torneo_import::pipeline::{run, ImportConfig};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Normalize the historic tournament workbook into relational CSVs"
)]
struct Args {
    /// Path to the raw .xlsx workbook
    #[arg(short, long)]
    input: PathBuf,
    /// Name of the sheet holding the historic rows
    #[arg(long, default_value = "BD")]
    sheet: String,
    /// Output directory for the normalized tables
    #[arg(long, default_value = "normalized")]
    out: PathBuf,
    /// Optional CSV export of existing players (id,name,...) to reuse ids
    #[arg(long)]
    existing_players: Option<PathBuf>,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    let config = ImportConfig {
        input: args.input,
        sheet: args.sheet,
        out_dir: args.out,
        existing_players: args.existing_players,
        layout: SheetLayout::default(),
    };

    let summary = run(&config)?;
    info!(
        rows = summary.rows_total,
        skipped = summary.rows_skipped,
        results = summary.results,
        duplicates = summary.duplicates_skipped,
        out = %summary.output_dir,
        "import complete"
    );
    Ok(())
}
