use teamscope::merge::TeamRecord;
use teamscope::state::{self, AppState, Metric};
use teamscope::team_dataset::SpeedSplit;

fn record(team: &str, rating: f64, goals: f64) -> TeamRecord {
    TeamRecord {
        team: team.to_string(),
        rating,
        goals,
        possession: rating * 8.0,
        points_last_10: goals,
        ..TeamRecord::default()
    }
}

fn sample_state() -> AppState {
    AppState::new(
        vec![
            record("liverpool", 7.0, 86.0),
            record("arsenal", 6.9, 69.0),
            record("chelsea", 6.7, 77.0),
            record("fulham", 6.5, 54.0),
        ],
        2,
    )
}

fn team_order(state: &AppState) -> Vec<&str> {
    state
        .sorted_indices()
        .into_iter()
        .map(|idx| state.records[idx].team.as_str())
        .collect()
}

#[test]
fn table_orders_by_sort_metric_descending() {
    let state = sample_state();
    assert_eq!(state.sort_metric, Metric::Rating);
    assert_eq!(
        team_order(&state),
        vec!["liverpool", "arsenal", "chelsea", "fulham"]
    );
}

#[test]
fn equal_metric_breaks_ties_by_name() {
    let state = AppState::new(
        vec![record("everton", 6.5, 40.0), record("brentford", 6.5, 52.0)],
        2,
    );
    assert_eq!(team_order(&state), vec!["brentford", "everton"]);
}

#[test]
fn selection_wraps_both_ways() {
    let mut state = sample_state();
    assert_eq!(state.selected, 0);
    state.select_prev();
    assert_eq!(state.selected, 3);
    state.select_next();
    assert_eq!(state.selected, 0);
    state.select_next();
    assert_eq!(state.selected, 1);
}

#[test]
fn cycling_sort_keeps_the_highlighted_team() {
    let mut state = sample_state();
    // Chelsea sits third by rating but second by goals.
    state.selected = 2;
    assert_eq!(state.selected_record().map(|r| r.team.as_str()), Some("chelsea"));

    state.cycle_sort();
    assert_eq!(state.sort_metric, Metric::Goals);
    assert_eq!(state.selected, 1);
    assert_eq!(state.selected_record().map(|r| r.team.as_str()), Some("chelsea"));
}

#[test]
fn comparison_window_clips_at_the_edges() {
    let mut state = sample_state();
    let top = state.comparison();
    assert!(top.above.is_empty());
    assert_eq!(top.below.len(), 2);
    assert_eq!(top.rank, 1);

    state.selected = 3;
    let bottom = state.comparison();
    assert!(bottom.below.is_empty());
    assert_eq!(bottom.rank, 4);
    let above: Vec<&str> = bottom
        .above
        .iter()
        .map(|&idx| state.records[idx].team.as_str())
        .collect();
    assert_eq!(above, vec!["arsenal", "chelsea"]);
}

#[test]
fn comparison_ranks_by_the_compare_metric() {
    let mut state = AppState::new(
        vec![
            record("liverpool", 7.0, 86.0),
            record("arsenal", 6.9, 78.0),
            record("chelsea", 6.7, 77.0),
            record("everton", 6.6, 80.0),
            record("fulham", 6.5, 54.0),
        ],
        2,
    );
    // Chelsea is third by rating but fourth by goals.
    state.selected = 2;
    assert_eq!(state.comparison().rank, 3);

    state.cycle_compare();
    assert_eq!(state.compare_metric, Metric::Goals);
    assert_eq!(state.selected_record().map(|r| r.team.as_str()), Some("chelsea"));

    let by_goals = state.comparison();
    assert_eq!(by_goals.rank, 4);
    let above: Vec<&str> = by_goals
        .above
        .iter()
        .map(|&idx| state.records[idx].team.as_str())
        .collect();
    assert_eq!(above, vec!["everton", "arsenal"]);
    let below: Vec<&str> = by_goals
        .below
        .iter()
        .map(|&idx| state.records[idx].team.as_str())
        .collect();
    assert_eq!(below, vec!["fulham"]);
}

#[test]
fn table_offset_keeps_the_selection_visible() {
    let mut state = sample_state();
    assert_eq!(state.table_offset(10), 0);
    assert_eq!(state.table_offset(2), 0);
    state.selected = 2;
    assert_eq!(state.table_offset(2), 1);
    state.selected = 3;
    assert_eq!(state.table_offset(2), 2);
}

#[test]
fn reload_clamps_the_selection() {
    let mut state = sample_state();
    state.selected = 3;
    state.set_records(
        vec![record("liverpool", 7.0, 86.0), record("fulham", 6.5, 54.0)],
        2,
    );
    assert_eq!(state.selected, 1);
}

#[test]
fn rebuilding_clusters_applies_clamped_k_and_logs() {
    let mut state = sample_state();
    state.recompute_clusters(3);
    assert_eq!(state.clusters.k, 3);
    assert!(state.logs.back().is_some_and(|msg| msg.contains("k=3")));

    state.recompute_clusters(40);
    assert_eq!(state.clusters.k, 4);
}

#[test]
fn tactic_groups_skip_unresolved_formations() {
    let mut records = vec![
        record("liverpool", 7.0, 84.0),
        record("arsenal", 6.9, 75.0),
        record("chelsea", 6.7, 62.0),
        record("fulham", 6.5, 52.0),
    ];
    records[0].favorite_tactics = Some("4-3-3".to_string());
    records[1].favorite_tactics = Some("4-3-3".to_string());
    records[2].favorite_tactics = Some("3-5-2".to_string());
    records[3].favorite_tactics = None;

    let groups = state::tactic_box_stats(&records);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].0, "3-5-2");
    assert_eq!(groups[0].1.count, 1);
    assert_eq!(groups[1].0, "4-3-3");
    assert_eq!(groups[1].1.count, 2);
    assert_eq!(groups[1].1.min, 75.0);
    assert_eq!(groups[1].1.max, 84.0);
}

#[test]
fn speed_conversion_rates_guard_empty_splits() {
    let mut rec = record("leeds_united", 6.6, 58.0);
    rec.normal = SpeedSplit {
        shots: 200.0,
        goals: 25.0,
        xg: 21.0,
    };
    rec.slow = SpeedSplit {
        shots: 64.0,
        goals: 2.0,
        xg: 1.7,
    };

    let rates = state::speed_conversion(&rec);
    assert_eq!(rates[0], ("Normal", 12.5));
    assert_eq!(rates[1], ("Standard", 0.0));
    assert_eq!(rates[2], ("Slow", 3.125));
    assert_eq!(rates[3], ("Fast", 0.0));
}
