//! Ranking-site fetcher: one summary grid of per-team season metrics
//! (goals, shots per game, discipline, possession, pass accuracy, aerials
//! won, rating). The grid is script-rendered, so the fetch waits for it
//! with bounded re-fetch attempts and reports absence instead of failing
//! the run.

use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::Settings;
use crate::page::{RenderedPage, fetch_until};
use crate::table::Table;

const GRID_CSS: &str = "#top-team-stats-summary-grid";

/// `Ok(None)` means the grid never appeared within the configured attempts
/// or the site was unreachable ("table not found"); the caller logs it and
/// moves on.
pub fn fetch_ranking_table(settings: &Settings) -> Result<Option<Table>> {
    let settle = Duration::from_millis(settings.settle_ms);
    let page = match fetch_until(
        &settings.ranking_table_url,
        GRID_CSS,
        settings.wait_attempts,
        settle,
    ) {
        Ok(Some(page)) => page,
        Ok(None) | Err(_) => return Ok(None),
    };
    Ok(Some(grid_table(&page)?))
}

/// The grid as scraped: header cells become the table's first row, body
/// rows keep their cell order, and the leading rank ordinal is stripped
/// from the team cell. Downstream readers skip the scraped header and
/// apply the fixed eight-column layout positionally.
pub fn grid_table(page: &RenderedPage) -> Result<Table> {
    let ordinal = ordinal_pattern()?;
    let header = page
        .rows(&format!("{GRID_CSS} tr"), "th")?
        .into_iter()
        .find(|cells| !cells.is_empty())
        .unwrap_or_default();
    let body = page.rows(&format!("{GRID_CSS} tr"), "td")?;

    let mut table = Table::new(header);
    for mut row in body {
        if row.is_empty() {
            continue;
        }
        row[0] = strip_rank_ordinal(&ordinal, &row[0]);
        table.rows.push(row);
    }
    Ok(table)
}

fn ordinal_pattern() -> Result<Regex> {
    Regex::new(r"^\d+\.?\s*").context("compile ordinal pattern")
}

fn strip_rank_ordinal(pattern: &Regex, cell: &str) -> String {
    pattern.replace(cell.trim(), "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_stripped_from_team_cells() {
        let pattern = ordinal_pattern().unwrap();
        assert_eq!(strip_rank_ordinal(&pattern, "1. Liverpool"), "Liverpool");
        assert_eq!(strip_rank_ordinal(&pattern, "12 Fulham"), "Fulham");
        assert_eq!(strip_rank_ordinal(&pattern, "Everton"), "Everton");
    }

    #[test]
    fn grid_rows_keep_scraped_header_first() {
        let html = r#"
            <table id="top-team-stats-summary-grid">
              <thead><tr>
                <th>Team</th><th>Goals</th><th>Shots pg</th><th>Discipline</th>
                <th>Possession%</th><th>Pass%</th><th>AerialsWon</th><th>Rating</th>
              </tr></thead>
              <tbody>
                <tr><td>1. Liverpool</td><td>86</td><td>17.2</td><td>61</td>
                    <td>62.1</td><td>86.1</td><td>12.3</td><td>7.01</td></tr>
                <tr><td>2. Arsenal</td><td>69</td><td>15.9</td><td>48</td>
                    <td>58.4</td><td>84.7</td><td>14.8</td><td>6.89</td></tr>
              </tbody>
            </table>"#;
        let page = RenderedPage::from_html(html);
        let table = grid_table(&page).unwrap();
        assert_eq!(table.columns[0], "Team");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], "Liverpool");
        assert_eq!(table.rows[1][7], "6.89");
    }
}
