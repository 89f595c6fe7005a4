// src/output/mod.rs
//
// Thin I/O layer: the four normalized tables as CSV plus the run summary as
// JSON, written into the output directory. Column orders and absent-value
// renderings are the bulk-load contract with the destination store.
use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

use crate::materialize::Materialized;
use crate::registry::ImportRegistry;

pub const SEASONS_FILE: &str = "seasons.csv";
pub const EVENTS_FILE: &str = "event_nights.csv";
pub const PLAYERS_FILE: &str = "players.csv";
pub const RESULTS_FILE: &str = "event_results.csv";
pub const SUMMARY_FILE: &str = "import_summary.json";

/// Run observability counts; shape is a collaborator contract.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub rows_total: u64,
    pub rows_skipped: u64,
    pub seasons: usize,
    pub events: usize,
    pub players: usize,
    pub existing_players_matched: usize,
    pub results: usize,
    pub duplicates_skipped: u64,
    pub ambiguous_name_collisions: u64,
    pub output_dir: String,
}

#[tracing::instrument(level = "info", skip_all, fields(out_dir = %out_dir.display()))]
pub fn write_tables(
    out_dir: &Path,
    registry: &ImportRegistry,
    materialized: &Materialized,
) -> Result<ImportSummary> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {:?}", out_dir))?;

    write_seasons(out_dir, registry)?;
    write_events(out_dir, registry)?;
    write_players(out_dir, registry)?;
    write_results(out_dir, materialized)?;

    let summary = ImportSummary {
        rows_total: registry.rows_scanned(),
        rows_skipped: registry.rows_skipped(),
        seasons: registry.seasons_len(),
        events: registry.events_len(),
        players: registry.new_players_len(),
        existing_players_matched: registry.existing_players_matched(),
        results: materialized.results.len(),
        duplicates_skipped: materialized.duplicates_skipped,
        ambiguous_name_collisions: registry.ambiguous_name_collisions(),
        output_dir: out_dir.display().to_string(),
    };
    write_summary(out_dir, &summary)?;

    info!(
        seasons = summary.seasons,
        events = summary.events,
        players = summary.players,
        results = summary.results,
        "tables written"
    );
    Ok(summary)
}

fn table_writer(out_dir: &Path, name: &str) -> Result<Writer<File>> {
    let path = out_dir.join(name);
    Writer::from_path(&path).with_context(|| format!("creating {:?}", path))
}

fn write_seasons(out_dir: &Path, registry: &ImportRegistry) -> Result<()> {
    let mut wtr = table_writer(out_dir, SEASONS_FILE)?;
    wtr.write_record(["id", "type", "year", "status", "name"])?;
    for season in registry.seasons() {
        let year = season.year.to_string();
        wtr.write_record([
            season.id.as_str(),
            season.season_type.as_str(),
            year.as_str(),
            season.status.as_str(),
            season.name.as_str(),
        ])?;
    }
    wtr.flush().context("flushing seasons table")?;
    Ok(())
}

fn write_events(out_dir: &Path, registry: &ImportRegistry) -> Result<()> {
    let mut wtr = table_writer(out_dir, EVENTS_FILE)?;
    wtr.write_record([
        "id",
        "season_id",
        "number",
        "date",
        "status",
        "players_count",
        "venue",
    ])?;
    for event in registry.events() {
        let number = event.number.to_string();
        let date = event.date.map(|d| d.to_string()).unwrap_or_default();
        let players_count = event.players_count.unwrap_or(0).to_string();
        wtr.write_record([
            event.id.as_str(),
            event.season_id.as_str(),
            number.as_str(),
            date.as_str(),
            // every historic event is over by definition
            "finished",
            players_count.as_str(),
            event.venue.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush().context("flushing event_nights table")?;
    Ok(())
}

fn write_players(out_dir: &Path, registry: &ImportRegistry) -> Result<()> {
    let mut wtr = table_writer(out_dir, PLAYERS_FILE)?;
    wtr.write_record(["id", "name"])?;
    for player in registry.new_players() {
        wtr.write_record([player.id.as_str(), player.name.as_str()])?;
    }
    wtr.flush().context("flushing players table")?;
    Ok(())
}

fn write_results(out_dir: &Path, materialized: &Materialized) -> Result<()> {
    let mut wtr = table_writer(out_dir, RESULTS_FILE)?;
    wtr.write_record([
        "event_id",
        "player_id",
        "position",
        "rebuys",
        "points",
        "prize",
        "position_text",
        "position_label",
        "is_bubble",
        "bounty_count",
        "bounty_credit_name",
    ])?;
    for result in &materialized.results {
        let position = result.position.unwrap_or(0).to_string();
        let rebuys = result.rebuys.to_string();
        let points = result.points.to_string();
        let prize = result.prize.to_string();
        let bounty_count = result.bounty_count.unwrap_or(0.0).to_string();
        let is_bubble = if result.is_bubble == Some(true) {
            "true"
        } else {
            "false"
        };
        wtr.write_record([
            result.event_id.as_str(),
            result.player_id.as_str(),
            position.as_str(),
            rebuys.as_str(),
            points.as_str(),
            prize.as_str(),
            result.position_text.as_str(),
            result.position_label.as_str(),
            is_bubble,
            bounty_count.as_str(),
            result.bounty_credit_name.as_str(),
        ])?;
    }
    wtr.flush().context("flushing event_results table")?;
    Ok(())
}

fn write_summary(out_dir: &Path, summary: &ImportSummary) -> Result<()> {
    let path = out_dir.join(SUMMARY_FILE);
    let file = File::create(&path).with_context(|| format!("creating {:?}", path))?;
    serde_json::to_writer_pretty(file, summary).context("writing import summary")?;
    Ok(())
}
