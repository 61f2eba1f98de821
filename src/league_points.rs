//! Historical league points.
//!
//! The ranked-table CSV carries one row per team per season. Two aggregates
//! feed the merge: mean points per season over seasons after the recent
//! cutoff and after the long cutoff. The row universe is seeded from the
//! scraped team directories, so a promoted club with no history still gets
//! a row (with empty aggregates that default downstream).

use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::table::{Table, parse_number};
use crate::team_names::canonical_team_id;

#[derive(Debug, Clone)]
pub struct SeasonPoints {
    pub team: String,
    pub season_end_year: i32,
    pub points: f64,
}

#[derive(Debug, Clone)]
pub struct PointsRow {
    pub team: String,
    pub points_last_5: Option<f64>,
    pub points_last_10: Option<f64>,
}

/// Load the history CSV (`team, season_end_year, points`). Team names are
/// canonicalized on the way in; rows with non-numeric season or points are
/// skipped.
pub fn load_history(path: &Path) -> Result<Vec<SeasonPoints>> {
    let table =
        Table::load(path).with_context(|| format!("read history table {}", path.display()))?;
    let team_col = history_column(&table, "team", path)?;
    let year_col = history_column(&table, "season_end_year", path)?;
    let points_col = history_column(&table, "points", path)?;

    let mut out = Vec::new();
    for idx in 0..table.rows.len() {
        let Some(team) = table.cell(idx, team_col) else {
            continue;
        };
        let Some(year) = table.cell(idx, year_col).and_then(parse_number) else {
            continue;
        };
        let Some(points) = table.cell(idx, points_col).and_then(parse_number) else {
            continue;
        };
        out.push(SeasonPoints {
            team: canonical_team_id(team),
            season_end_year: year as i32,
            points,
        });
    }
    Ok(out)
}

fn history_column(table: &Table, name: &str, path: &Path) -> Result<usize> {
    table
        .column(name)
        .ok_or_else(|| anyhow!("column `{name}` absent in {}", path.display()))
}

/// One row per scraped team directory, with the two aggregates attached
/// where history exists.
pub fn points_rows(
    history: &[SeasonPoints],
    team_dirs: &[String],
    recent_cutoff: i32,
    long_cutoff: i32,
) -> Vec<PointsRow> {
    team_dirs
        .iter()
        .map(|dir| {
            let team = canonical_team_id(dir);
            PointsRow {
                points_last_5: mean_after(history, &team, recent_cutoff),
                points_last_10: mean_after(history, &team, long_cutoff),
                team,
            }
        })
        .collect()
}

/// Mean points per season over seasons strictly after `cutoff`.
fn mean_after(history: &[SeasonPoints], team: &str, cutoff: i32) -> Option<f64> {
    let mut sum = 0.0;
    let mut seasons = 0usize;
    for record in history {
        if record.team == team && record.season_end_year > cutoff {
            sum += record.points;
            seasons += 1;
        }
    }
    if seasons == 0 {
        None
    } else {
        Some(sum / seasons as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<SeasonPoints> {
        let mut out = Vec::new();
        for (year, points) in [(2023, 84.0), (2024, 89.0), (2015, 60.0)] {
            out.push(SeasonPoints {
                team: "arsenal".to_string(),
                season_end_year: year,
                points,
            });
        }
        out.push(SeasonPoints {
            team: "manchester_united".to_string(),
            season_end_year: 2024,
            points: 60.0,
        });
        out
    }

    #[test]
    fn mean_respects_cutoff() {
        let history = history();
        assert_eq!(mean_after(&history, "arsenal", 2019), Some(86.5));
        assert_eq!(
            mean_after(&history, "arsenal", 2014),
            Some((84.0 + 89.0 + 60.0) / 3.0)
        );
        assert_eq!(mean_after(&history, "arsenal", 2024), None);
    }

    #[test]
    fn rows_seeded_from_directories() {
        let history = history();
        let dirs = vec!["Arsenal".to_string(), "Ipswich_Town".to_string()];
        let rows = points_rows(&history, &dirs, 2019, 2014);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].team, "arsenal");
        assert_eq!(rows[0].points_last_5, Some(86.5));
        // Promoted club, no history: aggregates stay empty here and default
        // to zero at the merge.
        assert_eq!(rows[1].team, "ipswich");
        assert_eq!(rows[1].points_last_5, None);
        assert_eq!(rows[1].points_last_10, None);
    }

    #[test]
    fn history_aliases_fold_into_one_team() {
        let history = vec![
            SeasonPoints {
                team: canonical_team_id("Manchester Utd"),
                season_end_year: 2023,
                points: 66.0,
            },
            SeasonPoints {
                team: canonical_team_id("Manchester United"),
                season_end_year: 2024,
                points: 60.0,
            },
        ];
        assert_eq!(mean_after(&history, "manchester_united", 2019), Some(63.0));
    }
}
