use std::path::PathBuf;

use anyhow::Result;

use teamscope::config::Settings;
use teamscope::{market_fetch, ranking_fetch, stats_fetch};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let mut settings = Settings::from_env();
    if let Some(dir) = parse_dir_arg() {
        settings.team_data_dir = dir;
    }
    if let Some(max) = parse_max_teams_arg() {
        settings.max_teams = max;
    }

    let source = parse_source_arg().unwrap_or_else(|| "all".to_string());
    match source.as_str() {
        "stats" => scrape_stats(&settings)?,
        "ranking" => scrape_ranking(&settings)?,
        "market" => scrape_market(&settings)?,
        "all" => {
            scrape_stats(&settings)?;
            scrape_ranking(&settings)?;
            scrape_market(&settings)?;
        }
        other => {
            println!("unknown source '{other}', expected stats|ranking|market|all");
        }
    }
    Ok(())
}

fn scrape_stats(settings: &Settings) -> Result<()> {
    println!("Scraping team stats from {}", settings.stats_league_url);
    let report = stats_fetch::scrape_league(settings)?;
    println!(
        "Teams: {} written={} skipped={}",
        report.teams,
        report.files_written,
        report.skipped.len()
    );
    for name in report.skipped.iter().take(6) {
        println!("  skipped: {name}");
    }
    if !report.errors.is_empty() {
        println!("Errors: {}", report.errors.len());
        for err in report.errors.iter().take(6) {
            println!("  - {err}");
        }
    }
    Ok(())
}

fn scrape_ranking(settings: &Settings) -> Result<()> {
    println!("Scraping season ranking from {}", settings.ranking_table_url);
    match ranking_fetch::fetch_ranking_table(settings)? {
        Some(table) => {
            table.save(&settings.ranking_csv)?;
            println!(
                "Ranking rows: {} -> {}",
                table.rows.len(),
                settings.ranking_csv.display()
            );
        }
        None => println!("table not found"),
    }
    Ok(())
}

fn scrape_market(settings: &Settings) -> Result<()> {
    println!("Scraping market values from {}", settings.market_values_url);
    match market_fetch::fetch_market_table(settings)? {
        Some(table) => {
            table.save(&settings.market_csv)?;
            println!(
                "Market rows: {} -> {}",
                table.rows.len(),
                settings.market_csv.display()
            );
        }
        None => println!("table not found"),
    }
    Ok(())
}

fn parse_source_arg() -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix("--source=") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_ascii_lowercase());
            }
        }
        if arg == "--source"
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_ascii_lowercase());
        }
    }
    None
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

fn parse_max_teams_arg() -> Option<usize> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix("--max-teams=")
            && let Ok(max) = raw.trim().parse::<usize>()
            && max != 0
        {
            return Some(max);
        }
        if arg == "--max-teams"
            && let Some(next) = args.get(idx + 1)
            && let Ok(max) = next.trim().parse::<usize>()
            && max != 0
        {
            return Some(max);
        }
    }
    None
}
