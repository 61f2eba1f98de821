//! Per-team file parsers.
//!
//! The stats-site fetcher leaves one directory per team; the five parsers
//! here turn those files into typed rows, one per team, with documented
//! defaults whenever a file is missing, empty or malformed. Nothing in
//! this module aborts the run: every gap becomes a `TeamFileIssue` and a
//! default value, so a team with a single bad file still reaches the merge
//! with the rest of its data intact.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::table::{Table, parse_number};
use crate::team_names::canonical_team_id;

const ATTACK_SPEED_FILE: &str = "attackSpeed.csv";
const FORMATION_FILE: &str = "formation.csv";
const GAME_STATE_FILE: &str = "gameState.csv";
const MATCHES_FILE: &str = "matches.csv";
const SQUAD_FILE: &str = "section_2.csv";

const MATCH_DATE_FORMAT: &str = "%b %d, %Y";
const FORM_WINDOW: usize = 5;
const SQUAD_MIN_SHARE: f64 = 0.3;

const WINNING_STATES: [&str; 2] = ["Goal diff +1", "Goal diff > +1"];
const LOSING_STATES: [&str; 2] = ["Goal diff -1", "Goal diff < -1"];
const DRAW_STATES: [&str; 1] = ["Goal diff 0"];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedSplit {
    pub shots: f64,
    pub goals: f64,
    pub xg: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AttackSpeedRow {
    pub team: String,
    pub normal: SpeedSplit,
    pub standard: SpeedSplit,
    pub slow: SpeedSplit,
    pub fast: SpeedSplit,
}

#[derive(Debug, Clone)]
pub struct FormationRow {
    pub team: String,
    pub favorite_tactics: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GameStateRow {
    pub team: String,
    pub winning_time: f64,
    pub losing_time: f64,
    pub draw_time: f64,
}

#[derive(Debug, Clone)]
pub struct FormRow {
    pub team: String,
    pub form: f64,
}

#[derive(Debug, Clone)]
pub struct SquadSizeRow {
    pub team: String,
    pub squad_size: f64,
}

/// Why a team file contributed a default instead of data.
#[derive(Debug, Clone, PartialEq)]
pub enum FileIssue {
    Missing,
    Empty,
    MissingColumn(&'static str),
    Unreadable(String),
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct TeamFileIssue {
    pub team: String,
    pub file: &'static str,
    pub issue: FileIssue,
}

impl fmt::Display for FileIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileIssue::Missing => write!(f, "missing"),
            FileIssue::Empty => write!(f, "no data rows"),
            FileIssue::MissingColumn(col) => write!(f, "column `{col}` absent"),
            FileIssue::Unreadable(msg) => write!(f, "unreadable: {msg}"),
            FileIssue::Malformed(what) => write!(f, "malformed: {what}"),
        }
    }
}

impl fmt::Display for TeamFileIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {} (defaulted)", self.team, self.file, self.issue)
    }
}

#[derive(Default)]
pub struct TeamTables {
    pub attack_speed: Vec<AttackSpeedRow>,
    pub formation: Vec<FormationRow>,
    pub game_state: Vec<GameStateRow>,
    pub form: Vec<FormRow>,
    pub squad_size: Vec<SquadSizeRow>,
    pub issues: Vec<TeamFileIssue>,
}

/// Team directories under the data root, display-cased, sorted. Names with
/// the reserved `.` prefix and plain files are skipped.
pub fn team_dirs(base: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let entries =
        fs::read_dir(base).with_context(|| format!("list team directories in {}", base.display()))?;
    for entry in entries {
        let entry = entry.context("read directory entry")?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if !entry.file_type().ok().is_some_and(|t| t.is_dir()) {
            continue;
        }
        out.push(name);
    }
    out.sort();
    Ok(out)
}

/// Run all five parsers over every team directory.
pub fn collect(base: &Path) -> Result<TeamTables> {
    let mut tables = TeamTables::default();
    for dir_name in team_dirs(base)? {
        let team = canonical_team_id(&dir_name);
        let dir = base.join(&dir_name);
        tables
            .attack_speed
            .push(attack_speed_row(&team, &dir, &mut tables.issues));
        tables
            .formation
            .push(formation_row(&team, &dir, &mut tables.issues));
        tables
            .game_state
            .push(game_state_row(&team, &dir, &mut tables.issues));
        tables.form.push(form_row(&team, &dir, &mut tables.issues));
        tables
            .squad_size
            .push(squad_size_row(&team, &dir, &mut tables.issues));
    }
    Ok(tables)
}

fn load_team_table(
    dir: &Path,
    file: &'static str,
    team: &str,
    issues: &mut Vec<TeamFileIssue>,
) -> Option<Table> {
    let path = dir.join(file);
    if !path.exists() {
        issues.push(TeamFileIssue {
            team: team.to_string(),
            file,
            issue: FileIssue::Missing,
        });
        return None;
    }
    match Table::load(&path) {
        Ok(table) if table.is_empty() => {
            issues.push(TeamFileIssue {
                team: team.to_string(),
                file,
                issue: FileIssue::Empty,
            });
            None
        }
        Ok(table) => Some(table),
        Err(err) => {
            issues.push(TeamFileIssue {
                team: team.to_string(),
                file,
                issue: FileIssue::Unreadable(format!("{err:#}")),
            });
            None
        }
    }
}

fn require_column(
    table: &Table,
    file: &'static str,
    column: &'static str,
    team: &str,
    issues: &mut Vec<TeamFileIssue>,
) -> Option<usize> {
    let found = table.column(column);
    if found.is_none() {
        issues.push(TeamFileIssue {
            team: team.to_string(),
            file,
            issue: FileIssue::MissingColumn(column),
        });
    }
    found
}

/// Shots, goals and xG per attack speed. A speed label absent from the
/// file yields zeros for that speed only.
pub fn attack_speed_row(
    team: &str,
    dir: &Path,
    issues: &mut Vec<TeamFileIssue>,
) -> AttackSpeedRow {
    let mut row = AttackSpeedRow {
        team: team.to_string(),
        ..AttackSpeedRow::default()
    };
    let Some(table) = load_team_table(dir, ATTACK_SPEED_FILE, team, issues) else {
        return row;
    };
    let Some(stat_col) = require_column(&table, ATTACK_SPEED_FILE, "stat", team, issues) else {
        return row;
    };
    for column in ["shots", "goals", "xG"] {
        if table.column(column).is_none() {
            issues.push(TeamFileIssue {
                team: team.to_string(),
                file: ATTACK_SPEED_FILE,
                issue: FileIssue::MissingColumn(column),
            });
        }
    }
    row.normal = speed_split(&table, stat_col, "Normal");
    row.standard = speed_split(&table, stat_col, "Standard");
    row.slow = speed_split(&table, stat_col, "Slow");
    row.fast = speed_split(&table, stat_col, "Fast");
    row
}

fn speed_split(table: &Table, stat_col: usize, label: &str) -> SpeedSplit {
    let shots_col = table.column("shots");
    let goals_col = table.column("goals");
    let xg_col = table.column("xG");
    for (idx, row) in table.rows.iter().enumerate() {
        if row.get(stat_col).map(String::as_str) != Some(label) {
            continue;
        }
        let read = |col: Option<usize>| {
            col.and_then(|c| table.cell(idx, c))
                .and_then(parse_number)
                .unwrap_or(0.0)
        };
        return SpeedSplit {
            shots: read(shots_col),
            goals: read(goals_col),
            xg: read(xg_col),
        };
    }
    SpeedSplit::default()
}

/// The formation the team spent the most minutes in. Ties keep the first
/// listed formation.
pub fn formation_row(team: &str, dir: &Path, issues: &mut Vec<TeamFileIssue>) -> FormationRow {
    let mut row = FormationRow {
        team: team.to_string(),
        favorite_tactics: None,
    };
    let Some(table) = load_team_table(dir, FORMATION_FILE, team, issues) else {
        return row;
    };
    let Some(stat_col) = require_column(&table, FORMATION_FILE, "stat", team, issues) else {
        return row;
    };
    let Some(time_col) = require_column(&table, FORMATION_FILE, "time", team, issues) else {
        return row;
    };
    let mut best: Option<(f64, String)> = None;
    for (idx, record) in table.rows.iter().enumerate() {
        let Some(stat) = record.get(stat_col) else {
            continue;
        };
        let time = table.cell(idx, time_col).and_then(parse_number).unwrap_or(0.0);
        if best.as_ref().is_none_or(|(top, _)| time > *top) {
            best = Some((time, stat.clone()));
        }
    }
    row.favorite_tactics = best.map(|(_, stat)| stat);
    row
}

/// Minutes spent winning, losing and drawing, summed from the goal-diff
/// state labels.
pub fn game_state_row(team: &str, dir: &Path, issues: &mut Vec<TeamFileIssue>) -> GameStateRow {
    let mut row = GameStateRow {
        team: team.to_string(),
        ..GameStateRow::default()
    };
    let Some(table) = load_team_table(dir, GAME_STATE_FILE, team, issues) else {
        return row;
    };
    let Some(stat_col) = require_column(&table, GAME_STATE_FILE, "stat", team, issues) else {
        return row;
    };
    let Some(time_col) = require_column(&table, GAME_STATE_FILE, "time", team, issues) else {
        return row;
    };
    for (idx, record) in table.rows.iter().enumerate() {
        let Some(stat) = record.get(stat_col).map(String::as_str) else {
            continue;
        };
        let time = table.cell(idx, time_col).and_then(parse_number).unwrap_or(0.0);
        if WINNING_STATES.contains(&stat) {
            row.winning_time += time;
        } else if LOSING_STATES.contains(&stat) {
            row.losing_time += time;
        } else if DRAW_STATES.contains(&stat) {
            row.draw_time += time;
        }
    }
    row
}

/// Points over the most recent matches: 3 for a win, 1 for a draw, summed
/// over a window that clips to however many matches exist. One bad date or
/// score defaults the whole file, matching how the upstream data behaves
/// when the calendar breaks.
pub fn form_row(team: &str, dir: &Path, issues: &mut Vec<TeamFileIssue>) -> FormRow {
    let mut row = FormRow {
        team: team.to_string(),
        form: 0.0,
    };
    let Some(table) = load_team_table(dir, MATCHES_FILE, team, issues) else {
        return row;
    };
    let Some(date_col) = require_column(&table, MATCHES_FILE, "Date", team, issues) else {
        return row;
    };
    let Some(home_col) = require_column(&table, MATCHES_FILE, "Home Score", team, issues) else {
        return row;
    };
    let Some(away_col) = require_column(&table, MATCHES_FILE, "Away Score", team, issues) else {
        return row;
    };

    let mut dated: Vec<(NaiveDate, f64)> = Vec::new();
    for idx in 0..table.rows.len() {
        let raw_date = table.cell(idx, date_col).unwrap_or_default();
        let date = match NaiveDate::parse_from_str(raw_date, MATCH_DATE_FORMAT) {
            Ok(date) => date,
            Err(_) => {
                issues.push(TeamFileIssue {
                    team: team.to_string(),
                    file: MATCHES_FILE,
                    issue: FileIssue::Malformed(format!("date `{raw_date}`")),
                });
                return row;
            }
        };
        let home = table.cell(idx, home_col).and_then(parse_number);
        let away = table.cell(idx, away_col).and_then(parse_number);
        let (Some(home), Some(away)) = (home, away) else {
            issues.push(TeamFileIssue {
                team: team.to_string(),
                file: MATCHES_FILE,
                issue: FileIssue::Malformed(format!("scores on {raw_date}")),
            });
            return row;
        };
        dated.push((date, match_points(home, away)));
    }
    dated.sort_by_key(|(date, _)| *date);
    let points: Vec<f64> = dated.into_iter().map(|(_, pts)| pts).collect();
    row.form = rolling_form(&points);
    row
}

fn match_points(home: f64, away: f64) -> f64 {
    if home > away {
        3.0
    } else if home == away {
        1.0
    } else {
        0.0
    }
}

/// Rolling sum over the last up-to-`FORM_WINDOW` results, as of the most
/// recent match. Clips instead of demanding a full window.
pub fn rolling_form(points: &[f64]) -> f64 {
    let window = points.len().min(FORM_WINDOW);
    points[points.len() - window..].iter().sum()
}

/// Number of players with meaningful minutes: rows of the squad section
/// whose `Min` exceeds 30% of the squad maximum.
pub fn squad_size_row(team: &str, dir: &Path, issues: &mut Vec<TeamFileIssue>) -> SquadSizeRow {
    let mut row = SquadSizeRow {
        team: team.to_string(),
        squad_size: 0.0,
    };
    let Some(table) = load_team_table(dir, SQUAD_FILE, team, issues) else {
        return row;
    };
    let Some(min_col) = require_column(&table, SQUAD_FILE, "Min", team, issues) else {
        return row;
    };
    let minutes: Vec<f64> = (0..table.rows.len())
        .filter_map(|idx| table.cell(idx, min_col).and_then(parse_number))
        .collect();
    let Some(max) = minutes.iter().copied().reduce(f64::max) else {
        return row;
    };
    let threshold = SQUAD_MIN_SHARE * max;
    row.squad_size = minutes.iter().filter(|m| **m > threshold).count() as f64;
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_form_clips_short_series() {
        assert_eq!(rolling_form(&[3.0, 3.0, 0.0, 1.0, 3.0]), 10.0);
        assert_eq!(rolling_form(&[3.0, 1.0]), 4.0);
        assert_eq!(rolling_form(&[]), 0.0);
        // Window stays at five when more matches exist.
        assert_eq!(rolling_form(&[3.0, 3.0, 3.0, 0.0, 0.0, 0.0, 1.0]), 4.0);
    }

    #[test]
    fn match_points_follow_score_difference() {
        assert_eq!(match_points(2.0, 1.0), 3.0);
        assert_eq!(match_points(1.0, 1.0), 1.0);
        assert_eq!(match_points(0.0, 3.0), 0.0);
    }

    #[test]
    fn squad_threshold_counts_only_regulars() {
        let table = Table {
            columns: vec!["No".into(), "Player".into(), "Min".into()],
            rows: vec![
                vec!["1".into(), "A".into(), "90".into()],
                vec!["2".into(), "B".into(), "85".into()],
                vec!["3".into(), "C".into(), "10".into()],
                vec!["4".into(), "D".into(), "5".into()],
            ],
        };
        let min_col = table.column("Min").unwrap();
        let minutes: Vec<f64> = (0..table.rows.len())
            .filter_map(|idx| table.cell(idx, min_col).and_then(parse_number))
            .collect();
        let max = minutes.iter().copied().reduce(f64::max).unwrap();
        let count = minutes.iter().filter(|m| **m > SQUAD_MIN_SHARE * max).count();
        assert_eq!(count, 2);
    }
}
