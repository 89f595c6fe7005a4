// src/registry/existing.rs
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

use crate::normalize::name_key;

/// How a case-insensitive spelling relates to the pre-existing registry.
pub enum CaseMatch<'a> {
    /// No known player matches this spelling at all.
    Absent,
    /// Exactly one known player matches case-insensitively.
    Unique(&'a str),
    /// Two or more known players differ only by case; identity cannot be
    /// disambiguated from the sheet alone.
    Ambiguous,
}

/// Read-only snapshot of the destination system's player table, consumed to
/// keep player identifiers stable across repeated imports. Absence is valid
/// and means an empty registry.
#[derive(Debug, Default)]
pub struct ExistingPlayers {
    name_to_id: HashMap<String, String>,
    // lowercase spelling → unique exact name, or None once two exact names collide
    lower_to_name: HashMap<String, Option<String>>,
    ids: HashSet<String>,
}

impl ExistingPlayers {
    /// Load a two-column `(id, name)` export. Extra columns are ignored;
    /// rows missing either field are dropped.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("opening existing-players export {:?}", path))?;

        let headers = reader
            .headers()
            .with_context(|| format!("reading headers of {:?}", path))?;
        let id_col = headers.iter().position(|h| h.trim() == "id");
        let name_col = headers.iter().position(|h| h.trim() == "name");
        let (id_col, name_col) = match (id_col, name_col) {
            (Some(i), Some(n)) => (i, n),
            _ => anyhow::bail!("{:?} lacks `id`/`name` columns", path),
        };

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("reading record from {:?}", path))?;
            let id = record.get(id_col).unwrap_or("").trim();
            let name = record.get(name_col).unwrap_or("").trim();
            if id.is_empty() || name.is_empty() {
                continue;
            }
            entries.push((id.to_string(), name.to_string()));
        }
        let loaded = Self::from_entries(entries);
        info!(players = loaded.len(), path = %path.display(), "existing player registry loaded");
        Ok(loaded)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut players = Self::default();
        for (id, name) in entries {
            players.ids.insert(id.clone());
            players.name_to_id.insert(name.clone(), id);
        }
        for name in players.name_to_id.keys() {
            let key = name_key(name);
            let slot = players
                .lower_to_name
                .entry(key)
                .or_insert_with(|| Some(name.clone()));
            if slot.as_deref() != Some(name.as_str()) {
                *slot = None;
            }
        }
        players
    }

    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }

    /// Exact-spelling lookup.
    pub fn id_for(&self, name: &str) -> Option<&str> {
        self.name_to_id.get(name).map(String::as_str)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Lookup by lowercase key, distinguishing "nobody" from "several".
    pub fn case_insensitive(&self, lower_key: &str) -> CaseMatch<'_> {
        match self.lower_to_name.get(lower_key) {
            None => CaseMatch::Absent,
            Some(Some(name)) => CaseMatch::Unique(name),
            Some(None) => CaseMatch::Ambiguous,
        }
    }

    /// `(id, name)` pairs, for seeding identifier-collision checks.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.name_to_id
            .iter()
            .map(|(name, id)| (id.as_str(), name.as_str()))
    }
}
