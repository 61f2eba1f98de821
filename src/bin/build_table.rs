use std::path::PathBuf;

use anyhow::Result;

use teamscope::config::Settings;
use teamscope::league_points;
use teamscope::merge::{self, MergeInputs};
use teamscope::team_dataset::{self, TeamTables};
use teamscope::team_names;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let mut settings = Settings::from_env();
    if let Some(dir) = parse_dir_arg() {
        settings.team_data_dir = dir;
    }
    if let Some(out) = parse_out_arg() {
        settings.merged_csv = out;
    }

    println!(
        "Merging team tables from {}",
        settings.team_data_dir.display()
    );
    let mut notes = Vec::new();

    let (dirs, tables) = match team_dataset::team_dirs(&settings.team_data_dir) {
        Ok(dirs) => match team_dataset::collect(&settings.team_data_dir) {
            Ok(tables) => (dirs, tables),
            Err(err) => {
                notes.push(format!("team tables unreadable: {err:#}"));
                (dirs, TeamTables::default())
            }
        },
        Err(err) => {
            notes.push(format!("team data unavailable: {err:#}"));
            (Vec::new(), TeamTables::default())
        }
    };
    if !tables.issues.is_empty() {
        println!("Defaulted inputs: {}", tables.issues.len());
        for issue in tables.issues.iter().take(12) {
            println!("  - {issue}");
        }
    }

    let history = match league_points::load_history(&settings.history_csv) {
        Ok(history) => history,
        Err(err) => {
            notes.push(format!("history table unavailable: {err:#}"));
            Vec::new()
        }
    };
    let points = league_points::points_rows(
        &history,
        &dirs,
        settings.recent_cutoff,
        settings.long_cutoff,
    );

    let ranking = match merge::load_ranking_csv(&settings.ranking_csv, &mut notes) {
        Ok(rows) => rows,
        Err(err) => {
            notes.push(format!("ranking table unavailable: {err:#}"));
            Vec::new()
        }
    };
    let market = match merge::load_market_csv(&settings.market_csv, &mut notes) {
        Ok(rows) => rows,
        Err(err) => {
            notes.push(format!("market table unavailable: {err:#}"));
            Vec::new()
        }
    };

    let expected: Vec<String> = dirs
        .iter()
        .map(|dir| team_names::canonical_team_id(dir))
        .collect();
    let mut scraped: Vec<&str> = ranking.iter().map(|row| row.team.as_str()).collect();
    scraped.extend(market.iter().map(|row| row.team.as_str()));
    let strays = team_names::unresolved(
        scraped.iter().copied(),
        expected.iter().map(String::as_str),
    );
    if !strays.is_empty() {
        println!("Unmatched team ids: {}", strays.join(", "));
    }

    let outcome = merge::merge_team_tables(MergeInputs {
        attack_speed: tables.attack_speed,
        formation: tables.formation,
        game_state: tables.game_state,
        form: tables.form,
        squad_size: tables.squad_size,
        points,
        ranking,
        market,
    });
    notes.extend(outcome.notes);
    for note in &notes {
        println!("  note: {note}");
    }

    merge::write_merged_csv(&settings.merged_csv, &outcome.records)?;
    println!(
        "Merged table: {} teams -> {}",
        outcome.records.len(),
        settings.merged_csv.display()
    );
    Ok(())
}

fn parse_dir_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix("--dir=") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--dir"
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next.trim()));
        }
    }
    None
}

fn parse_out_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix("--out=") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--out"
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next.trim()));
        }
    }
    None
}
