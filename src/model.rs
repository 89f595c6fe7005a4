// src/model.rs
use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

/// The three tournament cycles a season code can resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonType {
    Apertura,
    Clausura,
    Summer,
}

impl SeasonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonType::Apertura => "apertura",
            SeasonType::Clausura => "clausura",
            SeasonType::Summer => "summer",
        }
    }

    /// Human-facing season name prefix, as the destination system displays it.
    pub fn display_name(&self) -> &'static str {
        match self {
            SeasonType::Apertura => "Apertura",
            SeasonType::Clausura => "Clausura",
            SeasonType::Summer => "Summer Cup",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonStatus {
    Active,
    Finished,
}

impl SeasonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonStatus::Active => "active",
            SeasonStatus::Finished => "finished",
        }
    }
}

/// One tournament cycle. Unique on `(season_type, year)`; never mutated
/// after creation.
#[derive(Clone, Debug, Serialize)]
pub struct Season {
    pub id: String,
    #[serde(rename = "type")]
    pub season_type: SeasonType,
    pub year: i32,
    pub status: SeasonStatus,
    pub name: String,
}

/// One dated occurrence within a season. Unique on `(season_id, number)`.
/// Optional fields are backfilled first-non-empty-wins, never overwritten.
#[derive(Clone, Debug, Serialize)]
pub struct EventNight {
    pub id: String,
    pub season_id: String,
    pub number: u32,
    pub date: Option<NaiveDate>,
    pub players_count: Option<u32>,
    pub venue: Option<String>,
}

impl EventNight {
    /// First-non-empty-wins merge: each optional field takes the incoming
    /// value only while it is still unset. Later rows never overwrite.
    pub fn fill_missing(
        &mut self,
        date: Option<NaiveDate>,
        venue: Option<String>,
        players_count: Option<u32>,
    ) {
        if self.date.is_none() {
            self.date = date;
        }
        if self.venue.is_none() {
            self.venue = venue;
        }
        if self.players_count.is_none() {
            self.players_count = players_count;
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Player {
    pub id: String,
    pub name: String,
}

/// One finishing record for a `(event, player)` pair. `rebuys` and `prize`
/// are structural placeholders required by the destination schema; the
/// historic sheet does not carry them.
#[derive(Clone, Debug, Serialize)]
pub struct EventResult {
    pub event_id: String,
    pub player_id: String,
    pub position: Option<u32>,
    pub rebuys: u32,
    pub points: f64,
    pub prize: f64,
    pub position_text: String,
    pub position_label: String,
    pub is_bubble: Option<bool>,
    pub bounty_count: Option<f64>,
    pub bounty_credit_name: String,
}

/// Zero-based column positions of the fields this import consumes. The
/// historic sheet layout is the default; a layout change is a config edit,
/// not a code change.
#[derive(Clone, Debug)]
pub struct SheetLayout {
    pub season_code: usize,
    pub date_serial: usize,
    pub venue: usize,
    pub event_label: usize,
    pub player_name: usize,
    pub position_word: usize,
    pub position_label: usize,
    pub players_count: usize,
    pub bounty_count: usize,
    pub points: usize,
    pub bounty_credit: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            season_code: 1,
            date_serial: 2,
            venue: 3,
            event_label: 4,
            player_name: 5,
            position_word: 6,
            position_label: 7,
            players_count: 13,
            bounty_count: 20,
            points: 21,
            bounty_credit: 23,
        }
    }
}

impl SheetLayout {
    /// Checked once at startup: two fields mapped to the same column is a
    /// configuration mistake, not a recoverable row condition.
    pub fn validate(&self) -> Result<()> {
        let cols = [
            self.season_code,
            self.date_serial,
            self.venue,
            self.event_label,
            self.player_name,
            self.position_word,
            self.position_label,
            self.players_count,
            self.bounty_count,
            self.points,
            self.bounty_credit,
        ];
        let distinct: HashSet<usize> = cols.iter().copied().collect();
        if distinct.len() != cols.len() {
            bail!("sheet layout maps two fields to the same column: {:?}", self);
        }
        Ok(())
    }

    /// Fetch a cell by column index, treating anything past the end of the
    /// row as blank. Worksheets only serialize non-empty trailing cells.
    pub fn field<'a>(row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(String::as_str).unwrap_or("")
    }
}
