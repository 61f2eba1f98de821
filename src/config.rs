//! Runtime settings, all environment-driven.
//!
//! Binaries call `dotenvy` first (`.env.local` wins over `.env`), then
//! build one `Settings` snapshot. Nothing here touches the network or the
//! filesystem.

use std::env;
use std::path::PathBuf;

const DEFAULT_STATS_LEAGUE_URL: &str = "https://understat.com/league/EPL";
const DEFAULT_RANKING_TABLE_URL: &str =
    "https://www.whoscored.com/regions/252/tournaments/2/seasons/10316/england-premier-league";
const DEFAULT_MARKET_VALUES_URL: &str =
    "https://www.transfermarkt.com/premier-league/startseite/wettbewerb/GB1";

#[derive(Debug, Clone)]
pub struct Settings {
    pub stats_league_url: String,
    pub ranking_table_url: String,
    pub market_values_url: String,
    pub team_data_dir: PathBuf,
    pub ranking_csv: PathBuf,
    pub market_csv: PathBuf,
    pub history_csv: PathBuf,
    pub merged_csv: PathBuf,
    pub max_teams: usize,
    pub settle_ms: u64,
    pub wait_attempts: usize,
    pub parallelism: usize,
    pub recent_cutoff: i32,
    pub long_cutoff: i32,
    pub cluster_k: usize,
}

impl Settings {
    pub fn from_env() -> Self {
        Settings {
            stats_league_url: env_or("STATS_LEAGUE_URL", DEFAULT_STATS_LEAGUE_URL),
            ranking_table_url: env_or("RANKING_TABLE_URL", DEFAULT_RANKING_TABLE_URL),
            market_values_url: env_or("MARKET_VALUES_URL", DEFAULT_MARKET_VALUES_URL),
            team_data_dir: PathBuf::from(env_or("TEAM_DATA_DIR", "data/teams")),
            ranking_csv: PathBuf::from(env_or("RANKING_CSV", "data/league_ranking.csv")),
            market_csv: PathBuf::from(env_or("MARKET_CSV", "data/market_values.csv")),
            history_csv: PathBuf::from(env_or("HISTORY_TABLE_CSV", "data/pl-tables.csv")),
            merged_csv: PathBuf::from(env_or("MERGED_OUTPUT_CSV", "data/final_output.csv")),
            max_teams: env_parse("SCRAPE_MAX_TEAMS", 20).max(1),
            settle_ms: env_parse("SCRAPE_SETTLE_MS", 5_000),
            wait_attempts: env_parse("SCRAPE_WAIT_ATTEMPTS", 6).max(1),
            parallelism: env_parse("SCRAPE_PARALLELISM", 1).clamp(1, 8),
            recent_cutoff: env_parse("POINTS_RECENT_CUTOFF", 2019),
            long_cutoff: env_parse("POINTS_LONG_CUTOFF", 2014),
            cluster_k: env_parse("CLUSTER_K", 4).max(1),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|val| val.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        // Avoid env mutation in tests; just exercise the parse helpers.
        assert_eq!(env_parse("TEAMSCOPE_TEST_UNSET_KEY", 20usize), 20);
        assert_eq!(env_or("TEAMSCOPE_TEST_UNSET_KEY", "x"), "x");
    }
}
