use std::path::PathBuf;

use teamscope::config::Settings;
use teamscope::league_points;
use teamscope::market_fetch;
use teamscope::merge::{self, MergeInputs};
use teamscope::ranking_fetch;
use teamscope::stats_fetch;
use teamscope::team_dataset;
use teamscope::team_names;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

/// Settings pointed at a loopback port nothing listens on, with a single
/// fetch attempt so the tests stay fast.
fn offline_settings() -> Settings {
    let mut settings = Settings::from_env();
    settings.stats_league_url = "http://127.0.0.1:9/league".to_string();
    settings.ranking_table_url = "http://127.0.0.1:9/ranking".to_string();
    settings.market_values_url = "http://127.0.0.1:9/market".to_string();
    settings.wait_attempts = 1;
    settings.settle_ms = 0;
    settings
}

#[test]
fn ranking_fixture_loads_positionally() {
    let mut notes = Vec::new();
    let rows = merge::load_ranking_csv(&fixture_path("league_ranking.csv"), &mut notes)
        .expect("ranking fixture should load");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].team, "arsenal");
    assert_eq!(rows[0].rating, Some(6.89));
    assert_eq!(rows[1].team, "ipswich");
    assert_eq!(rows[2].team, "chelsea");
    assert_eq!(rows[2].goals, Some(77.0));
    // The short trailing row is reported, not fatal.
    assert_eq!(notes.len(), 1);
    assert!(notes[0].contains("skipped"));
}

#[test]
fn market_fixture_keeps_values_verbatim() {
    let mut notes = Vec::new();
    let rows = merge::load_market_csv(&fixture_path("market_values.csv"), &mut notes)
        .expect("market fixture should load");
    assert!(notes.is_empty());
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].team, "arsenal");
    assert_eq!(rows[0].market_value, "€1.24bn");
    assert_eq!(rows[2].team, "manchester_city");
}

#[test]
fn history_aggregates_respect_cutoffs() {
    let history = league_points::load_history(&fixture_path("pl_tables.csv"))
        .expect("history fixture should load");
    assert_eq!(history.len(), 6);

    let dirs = vec!["Arsenal".to_string(), "Ipswich_Town".to_string()];
    let points = league_points::points_rows(&history, &dirs, 2019, 2014);
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].team, "arsenal");
    assert_eq!(points[0].points_last_5, Some(86.5));
    let long = points[0].points_last_10.expect("arsenal long aggregate");
    assert!((long - (89.0 + 84.0 + 71.0) / 3.0).abs() < 1e-9);
    // Ipswich's only season predates both cutoffs.
    assert_eq!(points[1].team, "ipswich");
    assert_eq!(points[1].points_last_5, None);
    assert_eq!(points[1].points_last_10, None);
}

#[test]
fn stray_scraped_ids_are_reported() {
    let mut notes = Vec::new();
    let ranking = merge::load_ranking_csv(&fixture_path("league_ranking.csv"), &mut notes)
        .expect("ranking fixture should load");
    let market = merge::load_market_csv(&fixture_path("market_values.csv"), &mut notes)
        .expect("market fixture should load");

    let expected = ["arsenal", "ipswich"];
    let mut ids: Vec<&str> = ranking.iter().map(|row| row.team.as_str()).collect();
    ids.extend(market.iter().map(|row| row.team.as_str()));
    let strays = team_names::unresolved(ids, expected);
    assert_eq!(
        strays,
        vec!["chelsea".to_string(), "manchester_city".to_string()]
    );
}

#[test]
fn fixture_tree_merges_into_full_rows() {
    let teams_dir = fixture_path("teams");
    let dirs = team_dataset::team_dirs(&teams_dir).expect("fixture tree should list");
    let tables = team_dataset::collect(&teams_dir).expect("fixture tree should collect");

    let mut notes = Vec::new();
    let ranking = merge::load_ranking_csv(&fixture_path("league_ranking.csv"), &mut notes)
        .expect("ranking fixture should load");
    let market = merge::load_market_csv(&fixture_path("market_values.csv"), &mut notes)
        .expect("market fixture should load");
    let history = league_points::load_history(&fixture_path("pl_tables.csv"))
        .expect("history fixture should load");
    let points = league_points::points_rows(&history, &dirs, 2019, 2014);

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

    let teams: Vec<&str> = outcome.records.iter().map(|rec| rec.team.as_str()).collect();
    assert_eq!(teams, vec!["arsenal", "chelsea", "ipswich", "manchester_city"]);

    let arsenal = &outcome.records[0];
    assert_eq!(arsenal.normal.shots, 113.0);
    assert_eq!(arsenal.favorite_tactics.as_deref(), Some("4-3-3"));
    assert_eq!(arsenal.winning_time, 1120.0);
    assert_eq!(arsenal.form, 10.0);
    assert_eq!(arsenal.squad_size, 4.0);
    assert_eq!(arsenal.points_last_5, 86.5);
    assert_eq!(arsenal.goals, 69.0);
    assert_eq!(arsenal.rating, 6.89);
    assert_eq!(arsenal.market_value.as_deref(), Some("€1.24bn"));

    // In the team files but below both history cutoffs and with a broken
    // calendar: the gaps fill with zeros, the rest of the row is real.
    let ipswich = &outcome.records[2];
    assert_eq!(ipswich.fast.shots, 0.0);
    assert_eq!(ipswich.favorite_tactics, None);
    assert_eq!(ipswich.form, 0.0);
    assert_eq!(ipswich.points_last_10, 0.0);
    assert_eq!(ipswich.goals, 36.0);
    assert_eq!(ipswich.squad_size, 2.0);
    assert_eq!(ipswich.market_value.as_deref(), Some("€234.10m"));

    // Market-only team: outer join keeps it, rating falls back to the mean
    // of the three ranked teams.
    let city = &outcome.records[3];
    assert_eq!(city.market_value.as_deref(), Some("€1.31bn"));
    assert_eq!(city.squad_size, 0.0);
    let mean_rating = (6.89 + 6.41 + 6.74) / 3.0;
    assert!((city.rating - mean_rating).abs() < 1e-9);
}

#[test]
fn unreachable_stats_site_lands_in_the_report() {
    let settings = offline_settings();
    let report = stats_fetch::scrape_league(&settings).expect("fetch failure is not fatal");
    assert_eq!(report.teams, 0);
    assert_eq!(report.files_written, 0);
    assert!(report.skipped.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("127.0.0.1"));
}

#[test]
fn unreachable_single_table_sources_come_back_empty() {
    let settings = offline_settings();
    let ranking = ranking_fetch::fetch_ranking_table(&settings).expect("fetch failure is not fatal");
    assert!(ranking.is_none());
    let market = market_fetch::fetch_market_table(&settings).expect("fetch failure is not fatal");
    assert!(market.is_none());
}

#[test]
fn missing_team_data_still_yields_a_merged_table() {
    let missing = fixture_path("no_such_teams");
    assert!(team_dataset::collect(&missing).is_err());

    // The merge binary swaps in empty tables for the unreadable tree and
    // still writes whatever the single-table sources produced.
    let mut notes = Vec::new();
    let ranking = merge::load_ranking_csv(&fixture_path("league_ranking.csv"), &mut notes)
        .expect("ranking fixture should load");

    let tables = team_dataset::TeamTables::default();
    let outcome = merge::merge_team_tables(MergeInputs {
        attack_speed: tables.attack_speed,
        formation: tables.formation,
        game_state: tables.game_state,
        form: tables.form,
        squad_size: tables.squad_size,
        points: Vec::new(),
        ranking,
        market: Vec::new(),
    });
    assert_eq!(outcome.records.len(), 3);
    assert!(outcome.records.iter().all(|rec| rec.normal.shots == 0.0));
}
