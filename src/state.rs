use std::collections::{BTreeMap, VecDeque};

use crate::cluster::{self, ClusterView};
use crate::merge::TeamRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Table,
    Team,
    Charts,
    Clusters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Rating,
    Goals,
    ShotsPg,
    Possession,
    PassPct,
    AerialsWon,
    Discipline,
    PointsLast5,
    PointsLast10,
    Form,
    SquadSize,
    TotalXg,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::Rating,
        Metric::Goals,
        Metric::ShotsPg,
        Metric::Possession,
        Metric::PassPct,
        Metric::AerialsWon,
        Metric::Discipline,
        Metric::PointsLast5,
        Metric::PointsLast10,
        Metric::Form,
        Metric::SquadSize,
        Metric::TotalXg,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Rating => "Rating",
            Metric::Goals => "Goals",
            Metric::ShotsPg => "Shots/game",
            Metric::Possession => "Possession",
            Metric::PassPct => "Pass %",
            Metric::AerialsWon => "Aerials won",
            Metric::Discipline => "Discipline",
            Metric::PointsLast5 => "Pts (5y)",
            Metric::PointsLast10 => "Pts (10y)",
            Metric::Form => "Form",
            Metric::SquadSize => "Squad size",
            Metric::TotalXg => "Total xG",
        }
    }

    pub fn value(self, record: &TeamRecord) -> f64 {
        match self {
            Metric::Rating => record.rating,
            Metric::Goals => record.goals,
            Metric::ShotsPg => record.shots_pg,
            Metric::Possession => record.possession,
            Metric::PassPct => record.pass_pct,
            Metric::AerialsWon => record.aerials_won,
            Metric::Discipline => record.discipline,
            Metric::PointsLast5 => record.points_last_5,
            Metric::PointsLast10 => record.points_last_10,
            Metric::Form => record.form,
            Metric::SquadSize => record.squad_size,
            Metric::TotalXg => record.total_xg(),
        }
    }

    pub fn next(self) -> Metric {
        match self {
            Metric::Rating => Metric::Goals,
            Metric::Goals => Metric::ShotsPg,
            Metric::ShotsPg => Metric::Possession,
            Metric::Possession => Metric::PassPct,
            Metric::PassPct => Metric::AerialsWon,
            Metric::AerialsWon => Metric::Discipline,
            Metric::Discipline => Metric::PointsLast5,
            Metric::PointsLast5 => Metric::PointsLast10,
            Metric::PointsLast10 => Metric::Form,
            Metric::Form => Metric::SquadSize,
            Metric::SquadSize => Metric::TotalXg,
            Metric::TotalXg => Metric::Rating,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartView {
    PossessionVsPoints,
    PassVsGoals,
    AerialsVsRating,
    SpeedBars,
    CorrelationHeatmap,
    TacticBox,
}

impl ChartView {
    pub fn label(self) -> &'static str {
        match self {
            ChartView::PossessionVsPoints => "Possession vs points",
            ChartView::PassVsGoals => "Pass % vs goals",
            ChartView::AerialsVsRating => "Aerials vs rating",
            ChartView::SpeedBars => "Attack speed mix",
            ChartView::CorrelationHeatmap => "Correlation heatmap",
            ChartView::TacticBox => "Points by formation",
        }
    }

    pub fn next(self) -> ChartView {
        match self {
            ChartView::PossessionVsPoints => ChartView::PassVsGoals,
            ChartView::PassVsGoals => ChartView::AerialsVsRating,
            ChartView::AerialsVsRating => ChartView::SpeedBars,
            ChartView::SpeedBars => ChartView::CorrelationHeatmap,
            ChartView::CorrelationHeatmap => ChartView::TacticBox,
            ChartView::TacticBox => ChartView::PossessionVsPoints,
        }
    }

    /// Axes for the scatter views, `None` for the non-scatter ones.
    pub fn scatter_axes(self) -> Option<(Metric, Metric)> {
        match self {
            ChartView::PossessionVsPoints => Some((Metric::Possession, Metric::PointsLast10)),
            ChartView::PassVsGoals => Some((Metric::PassPct, Metric::Goals)),
            ChartView::AerialsVsRating => Some((Metric::AerialsWon, Metric::Rating)),
            _ => None,
        }
    }
}

/// Neighbours of the selected team ranked by the comparison metric.
/// Indices point into `AppState::records`.
#[derive(Debug, Clone)]
pub struct ComparisonWindow {
    pub above: Vec<usize>,
    pub below: Vec<usize>,
    pub rank: usize,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub records: Vec<TeamRecord>,
    pub clusters: ClusterView,
    pub screen: Screen,
    pub selected: usize,
    pub sort_metric: Metric,
    pub compare_metric: Metric,
    pub chart: ChartView,
    pub show_help: bool,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(records: Vec<TeamRecord>, k: usize) -> Self {
        let clusters = cluster::cluster_teams(&records, k, cluster::DEFAULT_SEED);
        Self {
            records,
            clusters,
            screen: Screen::Table,
            selected: 0,
            sort_metric: Metric::Rating,
            compare_metric: Metric::Rating,
            chart: ChartView::PossessionVsPoints,
            show_help: false,
            logs: VecDeque::with_capacity(200),
        }
    }

    pub fn set_records(&mut self, records: Vec<TeamRecord>, k: usize) {
        self.records = records;
        self.clusters = cluster::cluster_teams(&self.records, k, cluster::DEFAULT_SEED);
        self.clamp_selection();
    }

    /// Row order of the table screen: descending by the sort metric, team
    /// name as the tiebreak.
    pub fn sorted_indices(&self) -> Vec<usize> {
        self.metric_order(self.sort_metric)
    }

    fn metric_order(&self, metric: Metric) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.records.len()).collect();
        order.sort_by(|&a, &b| {
            let va = metric.value(&self.records[a]);
            let vb = metric.value(&self.records[b]);
            vb.partial_cmp(&va)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.records[a].team.cmp(&self.records[b].team))
        });
        order
    }

    pub fn selected_record(&self) -> Option<&TeamRecord> {
        let order = self.sorted_indices();
        order
            .get(self.selected)
            .and_then(|idx| self.records.get(*idx))
    }

    pub fn select_next(&mut self) {
        let total = self.records.len();
        if total == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % total;
    }

    pub fn select_prev(&mut self) {
        let total = self.records.len();
        if total == 0 {
            self.selected = 0;
            return;
        }
        if self.selected == 0 {
            self.selected = total - 1;
        } else {
            self.selected -= 1;
        }
    }

    pub fn clamp_selection(&mut self) {
        let total = self.records.len();
        if total == 0 {
            self.selected = 0;
        } else if self.selected >= total {
            self.selected = total - 1;
        }
    }

    pub fn cycle_sort(&mut self) {
        // Keep the highlight on the same team across re-sorts.
        let keep = self.selected_record().map(|r| r.team.clone());
        self.sort_metric = self.sort_metric.next();
        if let Some(team) = keep {
            let order = self.sorted_indices();
            if let Some(pos) = order.iter().position(|&idx| self.records[idx].team == team) {
                self.selected = pos;
                return;
            }
        }
        self.selected = 0;
    }

    pub fn cycle_compare(&mut self) {
        self.compare_metric = self.compare_metric.next();
    }

    pub fn cycle_chart(&mut self) {
        self.chart = self.chart.next();
    }

    /// Up to two neighbours each way under the comparison metric, plus the
    /// selected team's 1-based rank in that same order. The selection index
    /// lives in sort order, so the team is located there first.
    pub fn comparison(&self) -> ComparisonWindow {
        let table = self.sorted_indices();
        let Some(&selected_idx) = table.get(self.selected.min(table.len().saturating_sub(1)))
        else {
            return ComparisonWindow {
                above: Vec::new(),
                below: Vec::new(),
                rank: 0,
            };
        };
        let order = self.metric_order(self.compare_metric);
        let pos = order
            .iter()
            .position(|&idx| idx == selected_idx)
            .unwrap_or(0);
        ComparisonWindow {
            above: order[pos.saturating_sub(2)..pos].to_vec(),
            below: order[pos + 1..(pos + 3).min(order.len())].to_vec(),
            rank: pos + 1,
        }
    }

    /// First visible table row such that the selection stays on screen.
    pub fn table_offset(&self, visible_rows: usize) -> usize {
        let total = self.records.len();
        if visible_rows == 0 || total <= visible_rows {
            return 0;
        }
        self.selected
            .saturating_sub(visible_rows - 1)
            .min(total - visible_rows)
    }

    pub fn recompute_clusters(&mut self, k: usize) {
        self.clusters = cluster::cluster_teams(&self.records, k, cluster::DEFAULT_SEED);
        self.push_log(format!("[INFO] Rebuilt clusters with k={}", self.clusters.k));
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

pub const HEATMAP_METRICS: [Metric; 8] = [
    Metric::Goals,
    Metric::ShotsPg,
    Metric::Discipline,
    Metric::Possession,
    Metric::PassPct,
    Metric::AerialsWon,
    Metric::Rating,
    Metric::PointsLast10,
];

/// Goals per hundred shots for each attack speed of one record. Speeds
/// with no shots come back as zero instead of a division by zero.
pub fn speed_conversion(rec: &TeamRecord) -> [(&'static str, f64); 4] {
    [
        ("Normal", rec.normal),
        ("Standard", rec.standard),
        ("Slow", rec.slow),
        ("Fast", rec.fast),
    ]
    .map(|(label, split)| {
        let rate = if split.shots > 0.0 {
            split.goals / split.shots * 100.0
        } else {
            0.0
        };
        (label, rate)
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub count: usize,
}

pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mx = xs[..n].iter().sum::<f64>() / n as f64;
    let my = ys[..n].iter().sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom <= 1e-12 {
        return 0.0;
    }
    sxy / denom
}

pub fn correlation_matrix(records: &[TeamRecord]) -> Vec<Vec<f64>> {
    let columns: Vec<Vec<f64>> = HEATMAP_METRICS
        .iter()
        .map(|metric| records.iter().map(|r| metric.value(r)).collect())
        .collect();
    let mut matrix = vec![vec![0.0; columns.len()]; columns.len()];
    for i in 0..columns.len() {
        for j in 0..columns.len() {
            matrix[i][j] = if i == j {
                1.0
            } else {
                pearson(&columns[i], &columns[j])
            };
        }
    }
    matrix
}

fn median_of(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Five-number summary with Tukey hinges: an odd-length middle element
/// belongs to neither half.
pub fn quartiles(values: &[f64]) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    let median = median_of(&sorted);
    let lower = &sorted[..n / 2];
    let upper = &sorted[n.div_ceil(2)..];
    let q1 = if lower.is_empty() {
        median
    } else {
        median_of(lower)
    };
    let q3 = if upper.is_empty() {
        median
    } else {
        median_of(upper)
    };
    Some(BoxStats {
        min: sorted[0],
        q1,
        median,
        q3,
        max: sorted[n - 1],
        count: n,
    })
}

/// Ten-season point summaries grouped by favourite formation. Teams without
/// a resolved formation are left out.
pub fn tactic_box_stats(records: &[TeamRecord]) -> Vec<(String, BoxStats)> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        let Some(tactic) = record.favorite_tactics.as_deref() else {
            continue;
        };
        groups
            .entry(tactic.to_string())
            .or_default()
            .push(record.points_last_10);
    }
    groups
        .into_iter()
        .filter_map(|(tactic, points)| quartiles(&points).map(|stats| (tactic, stats)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_detects_perfect_correlation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&xs, &ys) - 1.0).abs() < 1e-9);
        let inv = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&xs, &inv) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_degenerate_inputs_are_zero() {
        assert_eq!(pearson(&[1.0], &[2.0]), 0.0);
        assert_eq!(pearson(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn quartiles_use_tukey_hinges() {
        let stats = quartiles(&[7.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(stats.median, 4.0);
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.q3, 6.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 7.0);
        assert_eq!(stats.count, 7);
    }

    #[test]
    fn quartiles_single_value_collapses() {
        let stats = quartiles(&[5.0]).unwrap();
        assert_eq!(stats.q1, 5.0);
        assert_eq!(stats.median, 5.0);
        assert_eq!(stats.q3, 5.0);
    }
}
