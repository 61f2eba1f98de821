//! Merge engine.
//!
//! Eight partial tables go in, one row per team comes out. Every join is
//! an outer join on the canonical team id: a team present in any source
//! appears in the final table, with per-column defaults where other
//! sources had nothing. Rows whose team id is empty are dropped, and a
//! team listed twice by one source keeps its first row. After
//! all joins, `rating` gaps are filled with the cross-team mean of the
//! resolved ratings and every other numeric gap with zero, so the written
//! table never contains a hole.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};

use crate::league_points::PointsRow;
use crate::table::{Table, fmt_num, parse_number};
use crate::team_dataset::{
    AttackSpeedRow, FormRow, FormationRow, GameStateRow, SpeedSplit, SquadSizeRow,
};
use crate::team_names::canonical_team_id;

pub const MERGED_COLUMNS: [&str; 29] = [
    "team",
    "normal_shots",
    "normal_goals",
    "normal_xg",
    "standard_shots",
    "standard_goals",
    "standard_xg",
    "slow_shots",
    "slow_goals",
    "slow_xg",
    "fast_shots",
    "fast_goals",
    "fast_xg",
    "favorite_tactics",
    "winning_time",
    "losing_time",
    "draw_time",
    "form",
    "squad_size",
    "points_last_5",
    "points_last_10",
    "goals",
    "shots pg",
    "discipline",
    "possession",
    "pass%",
    "aerialswon",
    "rating",
    "market_value",
];

/// Season metrics scraped from the ranking grid. All metrics stay optional
/// until the merge fills them.
#[derive(Debug, Clone)]
pub struct RankingRow {
    pub team: String,
    pub goals: Option<f64>,
    pub shots_pg: Option<f64>,
    pub discipline: Option<f64>,
    pub possession: Option<f64>,
    pub pass_pct: Option<f64>,
    pub aerials_won: Option<f64>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MarketRow {
    pub team: String,
    pub market_value: String,
}

/// Fully merged and filled row, the shape of the final CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamRecord {
    pub team: String,
    pub normal: SpeedSplit,
    pub standard: SpeedSplit,
    pub slow: SpeedSplit,
    pub fast: SpeedSplit,
    pub favorite_tactics: Option<String>,
    pub winning_time: f64,
    pub losing_time: f64,
    pub draw_time: f64,
    pub form: f64,
    pub squad_size: f64,
    pub points_last_5: f64,
    pub points_last_10: f64,
    pub goals: f64,
    pub shots_pg: f64,
    pub discipline: f64,
    pub possession: f64,
    pub pass_pct: f64,
    pub aerials_won: f64,
    pub rating: f64,
    pub market_value: Option<String>,
}

impl TeamRecord {
    /// Expected goals summed across the four attack speeds.
    pub fn total_xg(&self) -> f64 {
        self.normal.xg + self.standard.xg + self.slow.xg + self.fast.xg
    }
}

pub struct MergeInputs {
    pub attack_speed: Vec<AttackSpeedRow>,
    pub formation: Vec<FormationRow>,
    pub game_state: Vec<GameStateRow>,
    pub form: Vec<FormRow>,
    pub squad_size: Vec<SquadSizeRow>,
    pub points: Vec<PointsRow>,
    pub ranking: Vec<RankingRow>,
    pub market: Vec<MarketRow>,
}

pub struct MergeOutcome {
    pub records: Vec<TeamRecord>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct PartialRecord {
    speeds: Option<[SpeedSplit; 4]>,
    favorite_tactics: Option<String>,
    winning_time: Option<f64>,
    losing_time: Option<f64>,
    draw_time: Option<f64>,
    form: Option<f64>,
    squad_size: Option<f64>,
    points_last_5: Option<f64>,
    points_last_10: Option<f64>,
    goals: Option<f64>,
    shots_pg: Option<f64>,
    discipline: Option<f64>,
    possession: Option<f64>,
    pass_pct: Option<f64>,
    aerials_won: Option<f64>,
    rating: Option<f64>,
    market_value: Option<String>,
}

/// Outer-join all partial tables in pipeline order and fill the gaps.
/// Duplicate ids within one source keep the first row; later occurrences
/// are dropped with a note.
pub fn merge_team_tables(inputs: MergeInputs) -> MergeOutcome {
    let mut partials: BTreeMap<String, PartialRecord> = BTreeMap::new();
    let mut dropped = 0usize;
    let mut notes = Vec::new();

    for row in first_per_team(inputs.attack_speed, "attack speed", |r| &r.team, &mut notes) {
        if let Some(partial) = upsert(&mut partials, &row.team, &mut dropped) {
            partial.speeds = Some([row.normal, row.standard, row.slow, row.fast]);
        }
    }
    for row in first_per_team(inputs.formation, "formation", |r| &r.team, &mut notes) {
        if let Some(partial) = upsert(&mut partials, &row.team, &mut dropped) {
            partial.favorite_tactics = row.favorite_tactics;
        }
    }
    for row in first_per_team(inputs.game_state, "game state", |r| &r.team, &mut notes) {
        if let Some(partial) = upsert(&mut partials, &row.team, &mut dropped) {
            partial.winning_time = Some(row.winning_time);
            partial.losing_time = Some(row.losing_time);
            partial.draw_time = Some(row.draw_time);
        }
    }
    for row in first_per_team(inputs.form, "form", |r| &r.team, &mut notes) {
        if let Some(partial) = upsert(&mut partials, &row.team, &mut dropped) {
            partial.form = Some(row.form);
        }
    }
    for row in first_per_team(inputs.squad_size, "squad size", |r| &r.team, &mut notes) {
        if let Some(partial) = upsert(&mut partials, &row.team, &mut dropped) {
            partial.squad_size = Some(row.squad_size);
        }
    }
    for row in first_per_team(inputs.points, "points history", |r| &r.team, &mut notes) {
        if let Some(partial) = upsert(&mut partials, &row.team, &mut dropped) {
            partial.points_last_5 = row.points_last_5;
            partial.points_last_10 = row.points_last_10;
        }
    }
    for row in first_per_team(inputs.ranking, "ranking", |r| &r.team, &mut notes) {
        if let Some(partial) = upsert(&mut partials, &row.team, &mut dropped) {
            partial.goals = row.goals;
            partial.shots_pg = row.shots_pg;
            partial.discipline = row.discipline;
            partial.possession = row.possession;
            partial.pass_pct = row.pass_pct;
            partial.aerials_won = row.aerials_won;
            partial.rating = row.rating;
        }
    }
    for row in first_per_team(inputs.market, "market", |r| &r.team, &mut notes) {
        if let Some(partial) = upsert(&mut partials, &row.team, &mut dropped) {
            partial.market_value = Some(row.market_value);
        }
    }

    if dropped > 0 {
        notes.push(format!("dropped {dropped} source rows with empty team ids"));
    }

    let resolved: Vec<f64> = partials.values().filter_map(|p| p.rating).collect();
    let mean_rating = if resolved.is_empty() {
        0.0
    } else {
        resolved.iter().sum::<f64>() / resolved.len() as f64
    };

    let records = partials
        .into_iter()
        .map(|(team, partial)| finish(team, partial, mean_rating))
        .collect();
    MergeOutcome { records, notes }
}

fn upsert<'a>(
    partials: &'a mut BTreeMap<String, PartialRecord>,
    team: &str,
    dropped: &mut usize,
) -> Option<&'a mut PartialRecord> {
    if team.is_empty() {
        *dropped += 1;
        return None;
    }
    Some(partials.entry(team.to_string()).or_default())
}

/// Keep-first dedup for one source's rows. Empty ids pass through so the
/// empty-id drop count stays with `upsert`.
fn first_per_team<T>(
    rows: Vec<T>,
    source: &str,
    team_of: impl Fn(&T) -> &str,
    notes: &mut Vec<String>,
) -> Vec<T> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let team = team_of(&row);
        if !team.is_empty() && !seen.insert(team.to_string()) {
            notes.push(format!("{source} lists `{team}` twice; keeping the first"));
            continue;
        }
        out.push(row);
    }
    out
}

fn finish(team: String, partial: PartialRecord, mean_rating: f64) -> TeamRecord {
    let [normal, standard, slow, fast] = partial.speeds.unwrap_or([SpeedSplit::default(); 4]);
    TeamRecord {
        team,
        normal,
        standard,
        slow,
        fast,
        favorite_tactics: partial.favorite_tactics,
        winning_time: partial.winning_time.unwrap_or(0.0),
        losing_time: partial.losing_time.unwrap_or(0.0),
        draw_time: partial.draw_time.unwrap_or(0.0),
        form: partial.form.unwrap_or(0.0),
        squad_size: partial.squad_size.unwrap_or(0.0),
        points_last_5: partial.points_last_5.unwrap_or(0.0),
        points_last_10: partial.points_last_10.unwrap_or(0.0),
        goals: partial.goals.unwrap_or(0.0),
        shots_pg: partial.shots_pg.unwrap_or(0.0),
        discipline: partial.discipline.unwrap_or(0.0),
        possession: partial.possession.unwrap_or(0.0),
        pass_pct: partial.pass_pct.unwrap_or(0.0),
        aerials_won: partial.aerials_won.unwrap_or(0.0),
        rating: partial.rating.unwrap_or(mean_rating),
        market_value: partial.market_value,
    }
}

/// Ranking CSV reader. The file's first row is the header as scraped from
/// the site; it is skipped and the fixed eight-column layout applies
/// positionally. Duplicate teams keep the first occurrence.
pub fn load_ranking_csv(path: &Path, notes: &mut Vec<String>) -> Result<Vec<RankingRow>> {
    let table =
        Table::load(path).with_context(|| format!("read ranking csv {}", path.display()))?;
    let mut rows: Vec<RankingRow> = Vec::new();
    for (idx, record) in table.rows.iter().enumerate() {
        if record.len() < 8 {
            notes.push(format!(
                "ranking row {} has {} cells instead of 8; skipped",
                idx + 1,
                record.len()
            ));
            continue;
        }
        let team = canonical_team_id(&record[0]);
        if !team.is_empty() && rows.iter().any(|row| row.team == team) {
            notes.push(format!("ranking lists `{team}` twice; keeping the first"));
            continue;
        }
        rows.push(RankingRow {
            team,
            goals: parse_number(&record[1]),
            shots_pg: parse_number(&record[2]),
            discipline: parse_number(&record[3]),
            possession: parse_number(&record[4]),
            pass_pct: parse_number(&record[5]),
            aerials_won: parse_number(&record[6]),
            rating: parse_number(&record[7]),
        });
    }
    Ok(rows)
}

/// Market CSV reader (`team, market_value` with a real header row).
pub fn load_market_csv(path: &Path, notes: &mut Vec<String>) -> Result<Vec<MarketRow>> {
    let table =
        Table::load(path).with_context(|| format!("read market csv {}", path.display()))?;
    let team_col = table.column("team").unwrap_or(0);
    let value_col = table.column("market_value").unwrap_or(1);
    let mut rows: Vec<MarketRow> = Vec::new();
    for record in &table.rows {
        let team = record
            .get(team_col)
            .map(|cell| canonical_team_id(cell))
            .unwrap_or_default();
        let value = record.get(value_col).cloned().unwrap_or_default();
        if value.is_empty() {
            continue;
        }
        if !team.is_empty() && rows.iter().any(|row| row.team == team) {
            notes.push(format!("market lists `{team}` twice; keeping the first"));
            continue;
        }
        rows.push(MarketRow {
            team,
            market_value: value,
        });
    }
    Ok(rows)
}

/// Write the terminal artifact. This is the only write whose failure kills
/// the ETL run.
pub fn write_merged_csv(path: &Path, records: &[TeamRecord]) -> Result<()> {
    let mut table = Table::new(MERGED_COLUMNS.iter().map(|s| s.to_string()).collect());
    for record in records {
        table.rows.push(record_cells(record));
    }
    table
        .save(path)
        .with_context(|| format!("write merged table {}", path.display()))
}

pub(crate) fn record_cells(rec: &TeamRecord) -> Vec<String> {
    let mut cells = vec![rec.team.clone()];
    for split in [&rec.normal, &rec.standard, &rec.slow, &rec.fast] {
        cells.push(fmt_num(split.shots));
        cells.push(fmt_num(split.goals));
        cells.push(fmt_num(split.xg));
    }
    cells.push(rec.favorite_tactics.clone().unwrap_or_default());
    for value in [
        rec.winning_time,
        rec.losing_time,
        rec.draw_time,
        rec.form,
        rec.squad_size,
        rec.points_last_5,
        rec.points_last_10,
        rec.goals,
        rec.shots_pg,
        rec.discipline,
        rec.possession,
        rec.pass_pct,
        rec.aerials_won,
        rec.rating,
    ] {
        cells.push(fmt_num(value));
    }
    cells.push(rec.market_value.clone().unwrap_or_default());
    cells
}

/// Dashboard-side loader for the merged table. Header-addressed, so column
/// order in the file does not matter; absent numerics read as zero.
pub fn read_merged_csv(path: &Path) -> Result<Vec<TeamRecord>> {
    let table =
        Table::load(path).with_context(|| format!("read merged table {}", path.display()))?;
    let mut records = Vec::new();
    for idx in 0..table.rows.len() {
        let text = |name: &str| {
            table
                .column(name)
                .and_then(|col| table.cell(idx, col))
                .unwrap_or("")
                .to_string()
        };
        let num = |name: &str| {
            table
                .column(name)
                .and_then(|col| table.cell(idx, col))
                .and_then(parse_number)
                .unwrap_or(0.0)
        };
        let opt = |name: &str| {
            let value = text(name);
            if value.is_empty() { None } else { Some(value) }
        };
        records.push(TeamRecord {
            team: text("team"),
            normal: SpeedSplit {
                shots: num("normal_shots"),
                goals: num("normal_goals"),
                xg: num("normal_xg"),
            },
            standard: SpeedSplit {
                shots: num("standard_shots"),
                goals: num("standard_goals"),
                xg: num("standard_xg"),
            },
            slow: SpeedSplit {
                shots: num("slow_shots"),
                goals: num("slow_goals"),
                xg: num("slow_xg"),
            },
            fast: SpeedSplit {
                shots: num("fast_shots"),
                goals: num("fast_goals"),
                xg: num("fast_xg"),
            },
            favorite_tactics: opt("favorite_tactics"),
            winning_time: num("winning_time"),
            losing_time: num("losing_time"),
            draw_time: num("draw_time"),
            form: num("form"),
            squad_size: num("squad_size"),
            points_last_5: num("points_last_5"),
            points_last_10: num("points_last_10"),
            goals: num("goals"),
            shots_pg: num("shots pg"),
            discipline: num("discipline"),
            possession: num("possession"),
            pass_pct: num("pass%"),
            aerials_won: num("aerialswon"),
            rating: num("rating"),
            market_value: opt("market_value"),
        });
    }
    Ok(records)
}
