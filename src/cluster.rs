//! Team clustering over the merged table: z-scored features, a small
//! seeded k-means, a 2D embedding on attack/control composite axes, and a
//! nearest-neighbour "similar teams" list. Everything here is derived on
//! demand for the dashboard; none of it is persisted.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::merge::TeamRecord;

pub const DEFAULT_SEED: u64 = 17;
const MAX_ITERS: usize = 50;
const SIMILAR_COUNT: usize = 3;

// Feature vector layout, used by the composite axes below.
const GOALS: usize = 4;
const SHOTS_PG: usize = 5;
const POSSESSION: usize = 7;
const PASS_PCT: usize = 8;
const AERIALS: usize = 9;
const RATING: usize = 10;
const TOTAL_XG: usize = 11;
const POINTS_5: usize = 2;

const ATTACK_AXIS: [usize; 4] = [GOALS, SHOTS_PG, TOTAL_XG, POINTS_5];
const CONTROL_AXIS: [usize; 4] = [POSSESSION, PASS_PCT, AERIALS, RATING];

#[derive(Debug, Clone)]
pub struct TeamPoint {
    pub team: String,
    pub cluster: usize,
    /// Attack composite: mean z over goals, shots pg, total xG, recent points.
    pub x: f64,
    /// Control composite: mean z over possession, pass%, aerials won, rating.
    pub y: f64,
    pub similar: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterView {
    pub points: Vec<TeamPoint>,
    pub k: usize,
}

/// Cluster the merged records. Fewer than two teams yields an empty view;
/// `k` clamps to the team count. Deterministic for a given seed.
pub fn cluster_teams(records: &[TeamRecord], k: usize, seed: u64) -> ClusterView {
    if records.len() < 2 {
        return ClusterView::default();
    }
    let raw: Vec<Vec<f64>> = records.iter().map(feature_vector).collect();
    let z = zscore_columns(&raw);
    let k = k.clamp(1, records.len());
    let assignment = kmeans(&z, k, seed);

    let points = records
        .iter()
        .enumerate()
        .map(|(idx, rec)| TeamPoint {
            team: rec.team.clone(),
            cluster: assignment[idx],
            x: composite(&z[idx], &ATTACK_AXIS),
            y: composite(&z[idx], &CONTROL_AXIS),
            similar: nearest(&z, idx, records, SIMILAR_COUNT),
        })
        .collect();
    ClusterView { points, k }
}

fn feature_vector(rec: &TeamRecord) -> Vec<f64> {
    vec![
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
        rec.total_xg(),
    ]
}

/// Z-score each column. Columns with near-zero spread contribute zero so a
/// constant column cannot dominate or divide by nothing.
fn zscore_columns(raw: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let cols = raw.first().map(Vec::len).unwrap_or(0);
    let mut out = vec![vec![0.0; cols]; raw.len()];
    for col in 0..cols {
        let values: Vec<f64> = raw.iter().map(|row| row[col]).collect();
        let Some((mean, std)) = dist(&values) else {
            continue;
        };
        for (row, value) in values.iter().enumerate() {
            out[row][col] = (value - mean) / std;
        }
    }
    out
}

fn dist(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / (values.len() as f64);
    let std = var.sqrt();
    if std <= 1e-9 { None } else { Some((mean, std)) }
}

fn kmeans(points: &[Vec<f64>], k: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    // Initial centroids: k distinct team vectors.
    let mut order: Vec<usize> = (0..points.len()).collect();
    for i in 0..k {
        let j = rng.gen_range(i..order.len());
        order.swap(i, j);
    }
    let mut centroids: Vec<Vec<f64>> = order[..k].iter().map(|&i| points[i].clone()).collect();

    let mut assignment = vec![usize::MAX; points.len()];
    for _ in 0..MAX_ITERS {
        let mut changed = false;
        for (idx, point) in points.iter().enumerate() {
            let best = nearest_centroid(point, &centroids);
            if assignment[idx] != best {
                assignment[idx] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        for (ci, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Vec<f64>> = points
                .iter()
                .zip(&assignment)
                .filter(|(_, a)| **a == ci)
                .map(|(p, _)| p)
                .collect();
            if members.is_empty() {
                continue;
            }
            for (col, slot) in centroid.iter_mut().enumerate() {
                *slot = members.iter().map(|m| m[col]).sum::<f64>() / members.len() as f64;
            }
        }
    }
    assignment
}

fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f64::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let d = sq_dist(point, centroid);
        if d < best_dist {
            best_dist = d;
            best = idx;
        }
    }
    best
}

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn composite(z: &[f64], axis: &[usize]) -> f64 {
    axis.iter().map(|&i| z[i]).sum::<f64>() / axis.len() as f64
}

fn nearest(z: &[Vec<f64>], idx: usize, records: &[TeamRecord], count: usize) -> Vec<String> {
    let mut scored: Vec<(f64, &str)> = z
        .iter()
        .enumerate()
        .filter(|(other, _)| *other != idx)
        .map(|(other, point)| (sq_dist(&z[idx], point), records[other].team.as_str()))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored
        .into_iter()
        .take(count)
        .map(|(_, team)| team.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(team: &str, goals: f64, possession: f64, rating: f64) -> TeamRecord {
        TeamRecord {
            team: team.to_string(),
            goals,
            possession,
            rating,
            shots_pg: goals / 4.0,
            pass_pct: possession + 20.0,
            aerials_won: 12.0,
            points_last_5: goals,
            points_last_10: goals,
            form: 7.0,
            squad_size: 16.0,
            ..TeamRecord::default()
        }
    }

    fn records() -> Vec<TeamRecord> {
        vec![
            record("arsenal", 88.0, 61.0, 7.0),
            record("city", 92.0, 64.0, 7.1),
            record("everton", 38.0, 42.0, 6.4),
            record("fulham", 41.0, 44.0, 6.5),
        ]
    }

    #[test]
    fn every_team_gets_one_cluster_within_k() {
        let view = cluster_teams(&records(), 2, DEFAULT_SEED);
        assert_eq!(view.k, 2);
        assert_eq!(view.points.len(), 4);
        for point in &view.points {
            assert!(point.cluster < view.k);
            assert!(point.x.is_finite());
            assert!(point.y.is_finite());
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let a = cluster_teams(&records(), 2, DEFAULT_SEED);
        let b = cluster_teams(&records(), 2, DEFAULT_SEED);
        let clusters_a: Vec<usize> = a.points.iter().map(|p| p.cluster).collect();
        let clusters_b: Vec<usize> = b.points.iter().map(|p| p.cluster).collect();
        assert_eq!(clusters_a, clusters_b);
    }

    #[test]
    fn similar_teams_exclude_self_and_rank_by_distance() {
        let view = cluster_teams(&records(), 2, DEFAULT_SEED);
        let arsenal = view.points.iter().find(|p| p.team == "arsenal").unwrap();
        assert_eq!(arsenal.similar.len(), 3);
        assert!(!arsenal.similar.contains(&"arsenal".to_string()));
        // City's profile sits closest to Arsenal's.
        assert_eq!(arsenal.similar[0], "city");
    }

    #[test]
    fn tiny_inputs_and_oversized_k_are_clamped() {
        let one = vec![record("arsenal", 88.0, 61.0, 7.0)];
        assert!(cluster_teams(&one, 4, DEFAULT_SEED).points.is_empty());
        let view = cluster_teams(&records(), 40, DEFAULT_SEED);
        assert_eq!(view.k, 4);
    }
}
