// src/pipeline.rs
//
// End-to-end orchestration: grid → pass 1 (identities) → pass 2 (results)
// → tables + summary. Pass 1 runs to completion before pass 2 starts, and
// rows are processed in strict source order within each pass: later rows
// only fill in missing event fields, never overwrite.
use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::materialize::materialize_results;
use crate::model::SheetLayout;
use crate::output::{self, ImportSummary};
use crate::registry::{ExistingPlayers, ImportRegistry};
use crate::xlsx;

pub struct ImportConfig {
    pub input: PathBuf,
    pub sheet: String,
    pub out_dir: PathBuf,
    pub existing_players: Option<PathBuf>,
    pub layout: SheetLayout,
}

pub fn run(config: &ImportConfig) -> Result<ImportSummary> {
    config.layout.validate()?;

    let existing = match &config.existing_players {
        Some(path) if path.exists() => ExistingPlayers::load(path)?,
        Some(path) => {
            warn!(path = %path.display(), "existing-players export not found; starting empty");
            ExistingPlayers::default()
        }
        None => ExistingPlayers::default(),
    };

    let rows = xlsx::load_sheet_rows(&config.input, &config.sheet)?;
    // the first row is the sheet header, not data
    let data_rows = rows.get(1..).unwrap_or(&[]);

    let mut registry = ImportRegistry::new(config.layout.clone(), existing);
    for row in data_rows {
        registry.admit(row);
    }
    info!(
        rows = registry.rows_scanned(),
        skipped = registry.rows_skipped(),
        seasons = registry.seasons_len(),
        events = registry.events_len(),
        new_players = registry.new_players_len(),
        reused_players = registry.existing_players_matched(),
        "identity pass complete"
    );

    let materialized = materialize_results(data_rows, &registry);
    output::write_tables(&config.out_dir, &registry, &materialized)
}
