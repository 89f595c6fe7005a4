// src/normalize/code.rs
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::SeasonType;

static SEASON_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(Ap|Cl|Sm)(\d{4})$").unwrap());
static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Parse a tournament code of the form `{Ap|Cl|Sm}{YYYY}`, case-insensitive,
/// with any embedded whitespace ignored (`"ap 2020"` → apertura 2020). Any
/// other shape yields no match and the row is skipped upstream.
pub fn parse_season_code(raw: &str) -> Option<(SeasonType, i32)> {
    let code: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let caps = SEASON_CODE_RE.captures(&code)?;
    let season_type = match caps[1].to_ascii_lowercase().as_str() {
        "ap" => SeasonType::Apertura,
        "cl" => SeasonType::Clausura,
        "sm" => SeasonType::Summer,
        _ => return None,
    };
    let year: i32 = caps[2].parse().ok()?;
    Some((season_type, year))
}

/// Extract the first run of digits from a free-text event field
/// (`"Fecha 12"` → 12). No digits, or a zero number, count as absent.
pub fn parse_event_number(raw: &str) -> Option<u32> {
    DIGITS_RE
        .find(raw)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_codes_parse_in_any_case_with_spaces() {
        assert_eq!(
            parse_season_code("Ap2020"),
            Some((SeasonType::Apertura, 2020))
        );
        assert_eq!(
            parse_season_code("cl 2019"),
            Some((SeasonType::Clausura, 2019))
        );
        assert_eq!(
            parse_season_code(" SM2021 "),
            Some((SeasonType::Summer, 2021))
        );
    }

    #[test]
    fn malformed_season_codes_do_not_match() {
        assert_eq!(parse_season_code(""), None);
        assert_eq!(parse_season_code("Ap20"), None);
        assert_eq!(parse_season_code("Xx2020"), None);
        assert_eq!(parse_season_code("Ap2020b"), None);
    }

    #[test]
    fn event_number_takes_first_digit_run() {
        assert_eq!(parse_event_number("Fecha 12"), Some(12));
        assert_eq!(parse_event_number("3a fecha"), Some(3));
        assert_eq!(parse_event_number("final"), None);
        assert_eq!(parse_event_number(""), None);
        assert_eq!(parse_event_number("Fecha 0"), None);
    }
}
