//! League table workbench: scrape team statistics from three public sites,
//! merge the per-team CSV files into one flat table, and browse the result
//! in a terminal dashboard.
//!
//! The pipeline is file-based on purpose. `scrape` writes raw CSV files,
//! `build_table` merges them into `final_output.csv`, and the dashboard
//! (the default binary) only ever reads that one file.

pub mod cluster;
pub mod config;
pub mod http_client;
pub mod league_points;
pub mod market_fetch;
pub mod merge;
pub mod page;
pub mod ranking_fetch;
pub mod state;
pub mod stats_fetch;
pub mod table;
pub mod table_export;
pub mod team_dataset;
pub mod team_names;
