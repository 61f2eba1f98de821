use std::path::PathBuf;

use teamscope::team_dataset::{self, FileIssue, SpeedSplit};

fn teams_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("teams");
    path
}

#[test]
fn team_directories_are_sorted_and_filtered() {
    let dirs = team_dataset::team_dirs(&teams_dir()).expect("fixture tree should list");
    // `.stale` and the stray notes file are not team directories.
    assert_eq!(dirs, vec!["Arsenal".to_string(), "Ipswich_Town".to_string()]);
}

#[test]
fn complete_team_parses_every_file() {
    let tables = team_dataset::collect(&teams_dir()).expect("fixture tree should collect");

    let speed = tables
        .attack_speed
        .iter()
        .find(|row| row.team == "arsenal")
        .expect("arsenal attack speed row");
    assert_eq!(speed.normal.shots, 113.0);
    assert_eq!(speed.standard.xg, 24.3);
    assert_eq!(speed.fast.goals, 12.0);

    let formation = tables
        .formation
        .iter()
        .find(|row| row.team == "arsenal")
        .expect("arsenal formation row");
    assert_eq!(formation.favorite_tactics.as_deref(), Some("4-3-3"));

    let game_state = tables
        .game_state
        .iter()
        .find(|row| row.team == "arsenal")
        .expect("arsenal game state row");
    assert_eq!(game_state.winning_time, 1120.0);
    assert_eq!(game_state.losing_time, 511.0);
    assert_eq!(game_state.draw_time, 1437.0);

    // Rows in the file are shuffled; the form window applies after sorting
    // by date, so the August wins drop out.
    let form = tables
        .form
        .iter()
        .find(|row| row.team == "arsenal")
        .expect("arsenal form row");
    assert_eq!(form.form, 10.0);

    let squad = tables
        .squad_size
        .iter()
        .find(|row| row.team == "arsenal")
        .expect("arsenal squad row");
    assert_eq!(squad.squad_size, 4.0);

    assert!(tables.issues.iter().all(|issue| issue.team != "arsenal"));
}

#[test]
fn gaps_default_and_surface_as_issues() {
    let tables = team_dataset::collect(&teams_dir()).expect("fixture tree should collect");

    // No Fast row in the file: that split alone is zero.
    let speed = tables
        .attack_speed
        .iter()
        .find(|row| row.team == "ipswich")
        .expect("ipswich attack speed row");
    assert_eq!(speed.normal.shots, 88.0);
    assert_eq!(speed.fast, SpeedSplit::default());

    // formation.csv is absent entirely.
    let formation = tables
        .formation
        .iter()
        .find(|row| row.team == "ipswich")
        .expect("ipswich formation row");
    assert_eq!(formation.favorite_tactics, None);
    assert!(tables.issues.iter().any(|issue| {
        issue.team == "ipswich"
            && issue.file == "formation.csv"
            && issue.issue == FileIssue::Missing
    }));

    // One unparseable date defaults the whole matches file.
    let form = tables
        .form
        .iter()
        .find(|row| row.team == "ipswich")
        .expect("ipswich form row");
    assert_eq!(form.form, 0.0);
    assert!(tables.issues.iter().any(|issue| {
        issue.team == "ipswich"
            && issue.file == "matches.csv"
            && matches!(issue.issue, FileIssue::Malformed(_))
    }));

    // The rest of the team still parses.
    let squad = tables
        .squad_size
        .iter()
        .find(|row| row.team == "ipswich")
        .expect("ipswich squad row");
    assert_eq!(squad.squad_size, 2.0);
}
