// src/normalize/mod.rs
//
// Pure field normalizers. Every function is total over its input: malformed
// or human-mangled text yields an absence, never an error. The sheet is
// hand-curated, so best effort per field is the accepted posture.
use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

pub mod code;
pub mod position;

pub use code::{parse_event_number, parse_season_code};
pub use position::{is_bubble_label, parse_position};

static SLUG_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Markers curators typed into numeric cells to mean "no data".
fn is_absent_marker(text: &str) -> bool {
    matches!(text, "" | "-" | "x" | "X")
}

/// Locale-tolerant float parse: trims, treats `""`/`"-"`/`"x"`/`"X"` as
/// absent, accepts a decimal comma.
pub fn parse_float(raw: &str) -> Option<f64> {
    let text = raw.trim();
    if is_absent_marker(text) {
        return None;
    }
    text.replace(',', ".").parse().ok()
}

/// Float parse, then round-to-nearest integer.
pub fn parse_int(raw: &str) -> Option<i64> {
    parse_float(raw).map(|v| v.round() as i64)
}

/// Convert a 1900-system serial day count into a calendar date. The legacy
/// spreadsheet epoch is 1899-12-30; fractional days (time-of-day) are
/// discarded.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Canonical comparison form: trimmed, combining marks stripped, uppercased.
/// `"Prímero"`, `"PRIMERO"`, `"primero"` and the decomposed
/// `"Pri\u{0301}mero"` all normalize identically.
pub fn normalize_text(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(strip_diacritic)
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

/// Shared case-insensitive key for player-name lookups. Kept in one place so
/// pass 1, pass 2 and the existing-registry index derive keys identically.
/// `to_lowercase` is not a full case fold (ẞ keeps a distinct key), which is
/// acceptable for the Spanish name corpus.
pub fn name_key(raw: &str) -> String {
    raw.to_lowercase()
}

/// URL-safe lowercase token for minting player identifiers: diacritics
/// stripped, runs of non-alphanumerics collapsed to a single `-`, edges
/// trimmed, `"player"` when nothing survives.
pub fn slugify(raw: &str) -> String {
    let lowered: String = raw
        .trim()
        .chars()
        .map(strip_diacritic)
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let lowered = lowered.to_lowercase();
    let slug = SLUG_STRIP_RE.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "player".to_string()
    } else {
        slug.to_string()
    }
}

/// Combining diacritical marks; decomposed cell text carries these as
/// separate codepoints after the base letter.
fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

/// Fold the precomposed Latin accented range onto its base letters; combined
/// with the mark filter above this covers both precomposed and decomposed
/// spellings of the Spanish name corpus.
fn strip_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'Á' | 'À' | 'Ä' | 'Â' | 'Ã' | 'Å' => 'A',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn float_parse_handles_markers_and_comma() {
        assert_eq!(parse_float("12.5"), Some(12.5));
        assert_eq!(parse_float(" 12,5 "), Some(12.5));
        assert_eq!(parse_float(""), None);
        assert_eq!(parse_float("-"), None);
        assert_eq!(parse_float("x"), None);
        assert_eq!(parse_float("X"), None);
        assert_eq!(parse_float("dos"), None);
        // a plain negative number is still a number
        assert_eq!(parse_float("-3"), Some(-3.0));
    }

    #[test]
    fn int_parse_rounds_to_nearest() {
        assert_eq!(parse_int("8,6"), Some(9));
        assert_eq!(parse_int("8.4"), Some(8));
        assert_eq!(parse_int("nope"), None);
    }

    #[test]
    fn serial_date_uses_legacy_epoch() {
        // 43904 = 2020-03-14 in the 1900 system
        assert_eq!(
            serial_to_date(43904.0),
            NaiveDate::from_ymd_opt(2020, 3, 14)
        );
        assert_eq!(serial_to_date(1.0), NaiveDate::from_ymd_opt(1899, 12, 31));
        // fractional time-of-day discarded
        assert_eq!(
            serial_to_date(43904.75),
            NaiveDate::from_ymd_opt(2020, 3, 14)
        );
    }

    #[test]
    fn normalize_text_is_case_and_accent_insensitive() {
        assert_eq!(normalize_text("Prímero"), "PRIMERO");
        assert_eq!(normalize_text("  último "), "ULTIMO");
        assert_eq!(normalize_text("Ñoño"), "NONO");
    }

    #[test]
    fn decomposed_accents_match_precomposed() {
        // shared-string tables may carry the accent as a combining mark
        assert_eq!(
            normalize_text("Pri\u{0301}mero"),
            normalize_text("Prímero")
        );
        assert_eq!(normalize_text("u\u{0301}ltimo"), "ULTIMO");
        assert_eq!(slugify("Jose\u{0301}"), "jose");
    }

    #[test]
    fn name_key_lowercases() {
        assert_eq!(name_key("ALICE"), "alice");
        assert_eq!(name_key("José"), "josé");
    }

    #[test]
    fn slugify_produces_url_safe_tokens() {
        assert_eq!(slugify("José María"), "jose-maria");
        assert_eq!(slugify("  El--Tío  "), "el-tio");
        assert_eq!(slugify("Ana (la Jefa)"), "ana-la-jefa");
        assert_eq!(slugify("***"), "player");
        assert_eq!(slugify(""), "player");
    }
}
