// src/registry/mod.rs
//
// Pass 1: build canonical, deduplicated Season / EventNight / Player
// identities from the row stream, in strict source order. The registry owns
// every map for the duration of the run; pass 2 only reads it.
use chrono::{Datelike, Local};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;
use uuid::Uuid;

use crate::model::{EventNight, Player, Season, SeasonStatus, SeasonType, SheetLayout};
use crate::normalize::{
    name_key, parse_event_number, parse_float, parse_int, parse_season_code, serial_to_date,
    slugify,
};

pub mod existing;

pub use existing::{CaseMatch, ExistingPlayers};

type SeasonKey = (SeasonType, i32);
type EventKey = (SeasonType, i32, u32);

pub struct ImportRegistry {
    layout: SheetLayout,
    import_year: i32,
    existing: ExistingPlayers,
    seasons: BTreeMap<SeasonKey, Season>,
    events: BTreeMap<EventKey, EventNight>,
    // canonical name → player id, ordered so output is deterministic
    players: BTreeMap<String, String>,
    // lowercase spelling → canonical spelling, memoized on first sight
    canonical_by_key: HashMap<String, String>,
    // every taken identifier (pre-existing and minted) → owning name
    id_to_name: HashMap<String, String>,
    new_player_ids: HashSet<String>,
    rows_scanned: u64,
    rows_skipped: u64,
    ambiguous_names: u64,
}

impl ImportRegistry {
    pub fn new(layout: SheetLayout, existing: ExistingPlayers) -> Self {
        Self::with_import_year(layout, existing, Local::now().year())
    }

    /// Season status derives from `year` versus the import-time calendar
    /// year; injectable so tests are not wall-clock dependent.
    pub fn with_import_year(layout: SheetLayout, existing: ExistingPlayers, year: i32) -> Self {
        let id_to_name = existing
            .entries()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
        Self {
            layout,
            import_year: year,
            existing,
            seasons: BTreeMap::new(),
            events: BTreeMap::new(),
            players: BTreeMap::new(),
            canonical_by_key: HashMap::new(),
            id_to_name,
            new_player_ids: HashSet::new(),
            rows_scanned: 0,
            rows_skipped: 0,
            ambiguous_names: 0,
        }
    }

    /// Admit one row: resolve or create its season, event night, and player.
    /// Rows whose identity cannot be established (no tournament code, no
    /// event number) are dropped and counted; a missing player name still
    /// contributes its season/event.
    pub fn admit(&mut self, row: &[String]) {
        self.rows_scanned += 1;

        let code = SheetLayout::field(row, self.layout.season_code).trim();
        if code.is_empty() {
            self.rows_skipped += 1;
            return;
        }
        let Some((season_type, year)) = parse_season_code(code) else {
            self.rows_skipped += 1;
            return;
        };
        let season_id = self.season_entry(season_type, year).id.clone();

        let Some(number) = parse_event_number(SheetLayout::field(row, self.layout.event_label))
        else {
            self.rows_skipped += 1;
            return;
        };

        let date = parse_float(SheetLayout::field(row, self.layout.date_serial))
            .and_then(serial_to_date);
        let venue = non_empty(SheetLayout::field(row, self.layout.venue));
        let players_count = parse_int(SheetLayout::field(row, self.layout.players_count))
            .and_then(|n| u32::try_from(n).ok());

        match self.events.entry((season_type, year, number)) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().fill_missing(date, venue, players_count)
            }
            Entry::Vacant(entry) => {
                entry.insert(EventNight {
                    id: Uuid::new_v4().to_string(),
                    season_id,
                    number,
                    date,
                    players_count,
                    venue,
                });
            }
        }

        let name_raw = SheetLayout::field(row, self.layout.player_name).trim();
        if name_raw.is_empty() {
            return;
        }
        let canonical = self.canonicalize(name_raw);
        self.ensure_player(&canonical);
    }

    fn season_entry(&mut self, season_type: SeasonType, year: i32) -> &Season {
        let import_year = self.import_year;
        self.seasons.entry((season_type, year)).or_insert_with(|| Season {
            id: Uuid::new_v4().to_string(),
            season_type,
            year,
            status: if year < import_year {
                SeasonStatus::Finished
            } else {
                SeasonStatus::Active
            },
            name: format!("{} {}", season_type.display_name(), year),
        })
    }

    /// Choose the canonical spelling for a case-insensitive key, once. The
    /// priority is: exact pre-existing match, unique case-insensitive
    /// pre-existing match, the row's own spelling. An ambiguous
    /// case-insensitive match degrades to the row's spelling and is counted
    /// for the run summary.
    fn canonicalize(&mut self, name_raw: &str) -> String {
        let key = name_key(name_raw);
        if let Some(canonical) = self.canonical_by_key.get(&key) {
            return canonical.clone();
        }
        let canonical = if self.existing.id_for(name_raw).is_some() {
            name_raw.to_string()
        } else {
            match self.existing.case_insensitive(&key) {
                CaseMatch::Unique(name) => name.to_string(),
                CaseMatch::Ambiguous => {
                    self.ambiguous_names += 1;
                    warn!(
                        name = name_raw,
                        "case-insensitive match against existing registry is ambiguous; \
                         keeping the row's own spelling"
                    );
                    name_raw.to_string()
                }
                CaseMatch::Absent => name_raw.to_string(),
            }
        };
        self.canonical_by_key.insert(key, canonical.clone());
        canonical
    }

    /// Resolve the identifier for a canonical name: reuse the pre-existing
    /// one when the name is known, otherwise mint a slug and bump a numeric
    /// suffix until it collides with nothing already taken.
    fn ensure_player(&mut self, canonical: &str) {
        if self.players.contains_key(canonical) {
            return;
        }
        if let Some(id) = self.existing.id_for(canonical) {
            self.players.insert(canonical.to_string(), id.to_string());
            return;
        }
        let base = slugify(canonical);
        let mut slug = base.clone();
        let mut counter = 2;
        while self
            .id_to_name
            .get(&slug)
            .is_some_and(|owner| owner.as_str() != canonical)
        {
            slug = format!("{}-{}", base, counter);
            counter += 1;
        }
        self.players.insert(canonical.to_string(), slug.clone());
        self.id_to_name.insert(slug.clone(), canonical.to_string());
        self.new_player_ids.insert(slug);
    }

    // ── read-only surface for pass 2 and output ─────────────────────────

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub fn lookup_event(
        &self,
        season_type: SeasonType,
        year: i32,
        number: u32,
    ) -> Option<&EventNight> {
        self.events.get(&(season_type, year, number))
    }

    /// Canonical spelling for a raw name, falling back to the raw spelling
    /// when the key was never admitted.
    pub fn canonical_name<'a>(&'a self, name_raw: &'a str) -> &'a str {
        self.canonical_by_key
            .get(&name_key(name_raw))
            .map(String::as_str)
            .unwrap_or(name_raw)
    }

    pub fn player_id(&self, name_raw: &str) -> Option<&str> {
        self.players
            .get(self.canonical_name(name_raw))
            .map(String::as_str)
    }

    pub fn seasons(&self) -> impl Iterator<Item = &Season> {
        self.seasons.values()
    }

    pub fn events(&self) -> impl Iterator<Item = &EventNight> {
        self.events.values()
    }

    /// Newly minted players only, ordered by name. Pre-existing players are
    /// already present in the destination store and are not re-emitted.
    pub fn new_players(&self) -> Vec<Player> {
        self.players
            .iter()
            .filter(|(_, id)| self.new_player_ids.contains(*id))
            .map(|(name, id)| Player {
                id: id.clone(),
                name: name.clone(),
            })
            .collect()
    }

    pub fn seasons_len(&self) -> usize {
        self.seasons.len()
    }

    pub fn events_len(&self) -> usize {
        self.events.len()
    }

    pub fn new_players_len(&self) -> usize {
        self.new_player_ids.len()
    }

    pub fn existing_players_matched(&self) -> usize {
        self.players.len() - self.new_player_ids.len()
    }

    pub fn rows_scanned(&self) -> u64 {
        self.rows_scanned
    }

    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped
    }

    pub fn ambiguous_name_collisions(&self) -> u64 {
        self.ambiguous_names
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
