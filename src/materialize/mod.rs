// src/materialize/mod.rs
//
// Pass 2: re-scan the row stream with read-only access to the registry and
// emit one EventResult per (event, player) pair, first occurrence wins.
use std::collections::HashSet;
use tracing::info;

use crate::model::{EventResult, SheetLayout};
use crate::normalize::{
    is_bubble_label, parse_event_number, parse_float, parse_position, parse_season_code,
};
use crate::registry::ImportRegistry;

pub struct Materialized {
    pub results: Vec<EventResult>,
    pub duplicates_skipped: u64,
}

/// Keys are re-derived exactly as pass 1 derived them, as pure lookups. A
/// row whose season, event, or player never registered is dropped silently:
/// pass 1 already counted it.
#[tracing::instrument(level = "info", skip_all, fields(rows = rows.len()))]
pub fn materialize_results(rows: &[Vec<String>], registry: &ImportRegistry) -> Materialized {
    let layout = registry.layout();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut results = Vec::new();
    let mut duplicates_skipped = 0u64;

    for row in rows {
        let code = SheetLayout::field(row, layout.season_code).trim();
        if code.is_empty() {
            continue;
        }
        let Some((season_type, year)) = parse_season_code(code) else {
            continue;
        };
        let Some(number) = parse_event_number(SheetLayout::field(row, layout.event_label)) else {
            continue;
        };
        let Some(event) = registry.lookup_event(season_type, year, number) else {
            continue;
        };

        let name_raw = SheetLayout::field(row, layout.player_name).trim();
        if name_raw.is_empty() {
            continue;
        }
        let Some(player_id) = registry.player_id(name_raw) else {
            continue;
        };

        if !seen.insert((event.id.clone(), player_id.to_string())) {
            duplicates_skipped += 1;
            continue;
        }

        let position_text = SheetLayout::field(row, layout.position_word).trim().to_string();
        let position_label = SheetLayout::field(row, layout.position_label)
            .trim()
            .to_string();
        let position = parse_position(&position_text, &position_label, event.players_count);
        // the bubble flag is tri-state and independent of position resolution
        let is_bubble = is_bubble_label(&position_label).then_some(true);

        let bounty_count = parse_float(SheetLayout::field(row, layout.bounty_count));
        let bounty_credit_name =
            normalize_bounty_credit(SheetLayout::field(row, layout.bounty_credit));
        let points = parse_float(SheetLayout::field(row, layout.points)).unwrap_or(0.0);

        results.push(EventResult {
            event_id: event.id.clone(),
            player_id: player_id.to_string(),
            position,
            rebuys: 0,
            points,
            prize: 0.0,
            position_text,
            position_label,
            is_bubble,
            bounty_count,
            bounty_credit_name,
        });
    }

    info!(
        results = results.len(),
        duplicates_skipped, "results materialized"
    );
    Materialized {
        results,
        duplicates_skipped,
    }
}

/// A bounty-credit cell of empty/dash/x means "nobody".
fn normalize_bounty_credit(raw: &str) -> String {
    let text = raw.trim();
    if matches!(text.to_lowercase().as_str(), "" | "-" | "x") {
        String::new()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SheetLayout;
    use crate::registry::{ExistingPlayers, ImportRegistry};

    fn row(cells: &[(usize, &str)]) -> Vec<String> {
        let width = cells.iter().map(|(idx, _)| idx + 1).max().unwrap_or(0);
        let mut row = vec![String::new(); width];
        for (idx, value) in cells {
            row[*idx] = value.to_string();
        }
        row
    }

    fn run(rows: Vec<Vec<String>>) -> Materialized {
        let mut registry =
            ImportRegistry::with_import_year(SheetLayout::default(), ExistingPlayers::default(), 2024);
        for r in &rows {
            registry.admit(r);
        }
        materialize_results(&rows, &registry)
    }

    #[test]
    fn single_winner_row_produces_one_result() {
        let out = run(vec![row(&[
            (1, "Ap2020"),
            (4, "Fecha 1"),
            (5, "Alice"),
            (6, "PRIMERO"),
            (13, "4"),
        ])]);
        assert_eq!(out.results.len(), 1);
        let result = &out.results[0];
        assert_eq!(result.position, Some(1));
        assert_eq!(result.rebuys, 0);
        assert_eq!(result.prize, 0.0);
        assert_eq!(result.is_bubble, None);
    }

    #[test]
    fn case_varied_duplicate_collapses_either_order() {
        for flip in [false, true] {
            let mut rows = vec![
                row(&[(1, "Ap2020"), (4, "Fecha 1"), (5, "Alice"), (21, "10")]),
                row(&[(1, "Ap2020"), (4, "Fecha 1"), (5, "ALICE"), (21, "12")]),
            ];
            if flip {
                rows.reverse();
            }
            let out = run(rows);
            assert_eq!(out.results.len(), 1);
            assert_eq!(out.duplicates_skipped, 1);
            // first occurrence wins
            let expected = if flip { 12.0 } else { 10.0 };
            assert_eq!(out.results[0].points, expected);
        }
    }

    #[test]
    fn bubble_overrides_even_a_filled_ordinal_word() {
        let out = run(vec![row(&[
            (1, "Ap2020"),
            (4, "Fecha 1"),
            (5, "Alice"),
            (6, "quinto"),
            (7, "Burbuja"),
            (13, "9"),
        ])]);
        let result = &out.results[0];
        assert_eq!(result.position, None);
        assert_eq!(result.is_bubble, Some(true));
    }

    #[test]
    fn bubble_label_alone_yields_no_position() {
        let out = run(vec![row(&[
            (1, "Ap2020"),
            (4, "Fecha 1"),
            (5, "Alice"),
            (7, "BURBUJA"),
            (13, "9"),
        ])]);
        let result = &out.results[0];
        assert_eq!(result.position, None);
        assert_eq!(result.is_bubble, Some(true));
    }

    #[test]
    fn last_resolves_through_backfilled_player_count() {
        let out = run(vec![
            row(&[(1, "Ap2020"), (4, "Fecha 1"), (5, "Alice"), (6, "ÚLTIMO")]),
            // same event; a later row supplies the count used above
            row(&[(1, "Ap2020"), (4, "Fecha 1"), (5, "Bob"), (13, "9")]),
        ]);
        assert_eq!(out.results[0].position, Some(9));
    }

    #[test]
    fn bounty_and_points_fields_normalize() {
        let out = run(vec![row(&[
            (1, "Ap2020"),
            (4, "Fecha 1"),
            (5, "Alice"),
            (20, "2,0"),
            (21, "-"),
            (23, "x"),
        ])]);
        let result = &out.results[0];
        assert_eq!(result.bounty_count, Some(2.0));
        assert_eq!(result.points, 0.0);
        assert_eq!(result.bounty_credit_name, "");
    }

    #[test]
    fn unresolvable_rows_are_dropped_without_results() {
        let out = run(vec![
            row(&[(1, "nope"), (4, "Fecha 1"), (5, "Alice")]),
            row(&[(1, "Ap2020"), (4, "sin fecha"), (5, "Alice")]),
            row(&[(1, "Ap2020"), (4, "Fecha 1"), (5, "")]),
        ]);
        assert!(out.results.is_empty());
        assert_eq!(out.duplicates_skipped, 0);
    }
}
