// src/normalize/position.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::normalize_text;

static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Spanish ordinal names for ranks 1–9, in comparison form (diacritics
/// already stripped).
const ORDINALS: [(&str, u32); 9] = [
    ("PRIMERO", 1),
    ("SEGUNDO", 2),
    ("TERCERO", 3),
    ("CUARTO", 4),
    ("QUINTO", 5),
    ("SEXTO", 6),
    ("SEPTIMO", 7),
    ("OCTAVO", 8),
    ("NOVENO", 9),
];

const LAST: &str = "ULTIMO";
const BUBBLE: &str = "BURBUJA";

/// Resolve a numeric finishing position from the short ordinal word, the
/// free-text label, and the event's known player count. The bubble label
/// means "just outside the positions" and never carries a number, whatever
/// the ordinal field says; after that: exact ordinal word, the word for
/// "last" in either field (maps to the player count, unresolved when the
/// count is unknown), first digit run in the label.
pub fn parse_position(word: &str, label: &str, players_count: Option<u32>) -> Option<u32> {
    let word_norm = normalize_text(word);
    let label_norm = normalize_text(label);

    if label_norm == BUBBLE {
        return None;
    }
    if let Some((_, rank)) = ORDINALS.iter().find(|(name, _)| *name == word_norm) {
        return Some(*rank);
    }
    if word_norm == LAST {
        return players_count;
    }
    if label_norm == LAST || label_norm == "ULTIMO-" {
        return players_count;
    }
    DIGITS_RE
        .find(&label_norm)
        .and_then(|m| m.as_str().parse().ok())
}

/// The bubble is distinct from "position unknown": detected independently of
/// position resolution and recorded as its own flag.
pub fn is_bubble_label(label: &str) -> bool {
    normalize_text(label) == BUBBLE
}
