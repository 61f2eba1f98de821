//! Stats-site fetcher.
//!
//! One league listing page yields the team links; each team page yields
//! three kinds of data that land as CSV files under one directory per team:
//!
//! - the `var statisticsData` blob embedded in a script tag, a JS string
//!   literal wrapping JSON; each top-level category becomes
//!   `<category>.csv` with a `stat` column and the nested "against" block
//!   flattened into `against_` columns;
//! - the on-page stat tables, split into sections by header group and
//!   written as `section_<i>.csv`;
//! - the match calendar, written as `matches.csv`.
//!
//! Teams are processed sequentially unless `SCRAPE_PARALLELISM` raises the
//! fan-out. Failures never abort the run: an unreachable or empty league
//! page comes back as a report error, and every failure below the listing
//! is contained to the team (or the file) it touched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::Settings;
use crate::page::{RenderedPage, compile, element_text, fetch_until};
use crate::table::Table;
use crate::team_names::team_dir_name;

const LEAGUE_READY_CSS: &str = "table tbody tr";
const TEAM_LINK_CSS: &str = "table tbody tr td:nth-child(2) a";
const STATS_MARKER: &str = "var statisticsData";

pub struct StatsScrapeReport {
    pub teams: usize,
    pub files_written: usize,
    pub skipped: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TeamLink {
    pub name: String,
    pub url: String,
}

fn report_without_teams(error: String) -> StatsScrapeReport {
    StatsScrapeReport {
        teams: 0,
        files_written: 0,
        skipped: Vec::new(),
        errors: vec![error],
    }
}

/// Everything extracted from one team page. `notes` carries the partial
/// failures that left a piece empty.
pub struct TeamExtract {
    pub categories: Vec<(String, Table)>,
    pub sections: Vec<Table>,
    pub matches: Table,
    pub notes: Vec<String>,
}

pub fn scrape_league(settings: &Settings) -> Result<StatsScrapeReport> {
    let settle = Duration::from_millis(settings.settle_ms);
    let page = match fetch_until(
        &settings.stats_league_url,
        LEAGUE_READY_CSS,
        settings.wait_attempts,
        settle,
    ) {
        Ok(Some(page)) => page,
        Ok(None) => {
            return Ok(report_without_teams(format!(
                "league table never appeared at {}",
                settings.stats_league_url
            )));
        }
        Err(err) => {
            return Ok(report_without_teams(format!(
                "league fetch failed for {}: {err:#}",
                settings.stats_league_url
            )));
        }
    };
    let links = league_team_links(&page, &settings.stats_league_url, settings.max_teams)?;

    let base = settings.team_data_dir.clone();
    let results: Vec<(usize, Vec<String>, Vec<String>)> = if settings.parallelism > 1 {
        with_scrape_pool(settings.parallelism, || {
            links
                .par_iter()
                .map(|link| scrape_team(link, &base, settle))
                .collect()
        })
    } else {
        links
            .iter()
            .map(|link| scrape_team(link, &base, settle))
            .collect()
    };

    let mut report = StatsScrapeReport {
        teams: links.len(),
        files_written: 0,
        skipped: Vec::new(),
        errors: Vec::new(),
    };
    for (written, skipped, errors) in results {
        report.files_written += written;
        report.skipped.extend(skipped);
        report.errors.extend(errors);
    }
    Ok(report)
}

/// Team anchors from the league standings table, capped at `max_teams`.
pub fn league_team_links(
    page: &RenderedPage,
    league_url: &str,
    max_teams: usize,
) -> Result<Vec<TeamLink>> {
    let base = site_base(league_url)?;
    let mut links = Vec::new();
    for (name, href) in page.links(TEAM_LINK_CSS)? {
        if name.is_empty() {
            continue;
        }
        let href = href.trim_start_matches('/');
        links.push(TeamLink {
            name,
            url: format!("{base}/{href}"),
        });
        if links.len() == max_teams {
            break;
        }
    }
    Ok(links)
}

fn site_base(league_url: &str) -> Result<String> {
    let url = reqwest::Url::parse(league_url)
        .with_context(|| format!("parse league url {league_url}"))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("league url {league_url} has no host"))?;
    Ok(format!("{}://{host}", url.scheme()))
}

/// One team: fetch, extract, write. Never fails the run; the tuple is
/// (files written, skipped notes, errors).
fn scrape_team(link: &TeamLink, base: &Path, settle: Duration) -> (usize, Vec<String>, Vec<String>) {
    let mut skipped = Vec::new();
    let mut errors = Vec::new();
    let page = match RenderedPage::fetch(&link.url, settle) {
        Ok(page) => page,
        Err(err) => {
            errors.push(format!("{}: fetch failed: {err:#}", link.name));
            return (0, skipped, errors);
        }
    };
    let extract = match extract_team(&page) {
        Ok(extract) => extract,
        Err(err) => {
            errors.push(format!("{}: extraction failed: {err:#}", link.name));
            return (0, skipped, errors);
        }
    };
    for note in &extract.notes {
        skipped.push(format!("{}: {note}", link.name));
    }
    let dir = team_dir(base, &link.name);
    match write_team(&dir, &extract) {
        Ok(written) => (written, skipped, errors),
        Err(err) => {
            errors.push(format!("{}: write failed: {err:#}", link.name));
            (0, skipped, errors)
        }
    }
}

pub fn team_dir(base: &Path, display_name: &str) -> PathBuf {
    base.join(team_dir_name(display_name))
}

/// Pure extraction from one fetched team page. A missing statistics marker
/// empties the whole extract (nothing else on such a page is trusted).
pub fn extract_team(page: &RenderedPage) -> Result<TeamExtract> {
    let mut notes = Vec::new();

    let categories = match stats_json_literal(page.raw())? {
        Some(literal) => {
            let unescaped = unescape_js(&literal);
            match serde_json::from_str::<Value>(&unescaped) {
                Ok(json) => category_tables(&json),
                Err(err) => {
                    notes.push(format!("embedded stats json unparseable: {err}"));
                    Vec::new()
                }
            }
        }
        None => {
            notes.push("embedded stats not found on page".to_string());
            return Ok(TeamExtract {
                categories: Vec::new(),
                sections: Vec::new(),
                matches: Table::default(),
                notes,
            });
        }
    };

    let sections = match table_sections(page) {
        Ok(sections) => sections,
        Err(err) => {
            notes.push(format!("stat table sections: {err:#}"));
            Vec::new()
        }
    };

    let matches = match_calendar(page)?;

    Ok(TeamExtract {
        categories,
        sections,
        matches,
        notes,
    })
}

fn write_team(dir: &Path, extract: &TeamExtract) -> Result<usize> {
    let mut written = 0usize;
    for (category, table) in &extract.categories {
        table.save(&dir.join(format!("{category}.csv")))?;
        written += 1;
    }
    for (idx, section) in extract.sections.iter().enumerate() {
        if section.is_empty() {
            continue;
        }
        section.save(&dir.join(format!("section_{}.csv", idx + 1)))?;
        written += 1;
    }
    if !extract.matches.is_empty() {
        extract.matches.save(&dir.join("matches.csv"))?;
        written += 1;
    }
    Ok(written)
}

/// The JS string literal passed to `JSON.parse` on the statistics line, if
/// the marker is present and the literal matches.
fn stats_json_literal(raw: &str) -> Result<Option<String>> {
    if !raw.contains(STATS_MARKER) {
        return Ok(None);
    }
    let pattern = Regex::new(r"var statisticsData\s*=\s*JSON\.parse\('((?:\\.|[^'\\])*)'\)")
        .context("compile statistics pattern")?;
    Ok(pattern.captures(raw).map(|caps| caps[1].to_string()))
}

/// Decode the JS string escapes the site uses in its embedded literals:
/// `\xHH`, `\uHHHH` (surrogate pairs combined), and the single-character
/// escapes. Unknown escapes keep the escaped character.
fn unescape_js(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('x') => match hex_escape(&mut chars, 2) {
                Some(code) => match char::from_u32(code) {
                    Some(ch) => out.push(ch),
                    None => out.push('\u{FFFD}'),
                },
                None => out.push_str("\\x"),
            },
            Some('u') => match hex_escape(&mut chars, 4) {
                Some(code) if (0xD800..=0xDBFF).contains(&code) => {
                    // High surrogate: only meaningful with a following \uDC00-\uDFFF.
                    let mut rest = chars.clone();
                    let low = if rest.next() == Some('\\') && rest.next() == Some('u') {
                        hex_escape(&mut rest, 4).filter(|l| (0xDC00..=0xDFFF).contains(l))
                    } else {
                        None
                    };
                    match low {
                        Some(low) => {
                            let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                            match char::from_u32(combined) {
                                Some(ch) => out.push(ch),
                                None => out.push('\u{FFFD}'),
                            }
                            chars = rest;
                        }
                        None => out.push('\u{FFFD}'),
                    }
                }
                Some(code) => match char::from_u32(code) {
                    Some(ch) => out.push(ch),
                    None => out.push('\u{FFFD}'),
                },
                None => out.push_str("\\u"),
            },
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn hex_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, len: usize) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..len {
        let digit = chars.next()?.to_digit(16)?;
        value = value * 16 + digit;
    }
    Some(value)
}

/// Value block for one stat row of the embedded JSON. The keys vary by
/// category, so they land in `own`; the nested "against" block is pulled
/// out by name so it can be prefixed instead of shadowing the team's own
/// columns. `serde_json`'s order-preserving map keeps the columns in the
/// order the site emits them.
#[derive(Deserialize)]
struct StatEntry {
    #[serde(default)]
    against: Map<String, Value>,
    #[serde(flatten)]
    own: Map<String, Value>,
}

/// One flat table per top-level category. Rows carry the stat label in a
/// `stat` column; the remaining columns are the union of value keys in
/// first-seen order, with the nested "against" block flattened into
/// `against_`-prefixed columns. Stats whose value block is not an object
/// keep the bare label.
fn category_tables(json: &Value) -> Vec<(String, Table)> {
    let Some(categories) = json.as_object() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (category, entries) in categories {
        let Some(entries) = entries.as_object() else {
            continue;
        };
        let mut columns: Vec<String> = vec!["stat".to_string()];
        let mut flat_rows: Vec<Vec<(String, String)>> = Vec::new();
        for (stat_name, stat_values) in entries {
            let mut cells: Vec<(String, String)> =
                vec![("stat".to_string(), stat_name.clone())];
            if let Ok(entry) = StatEntry::deserialize(stat_values) {
                for (key, value) in &entry.own {
                    cells.push((key.clone(), value_to_string(value)));
                }
                for (key, value) in &entry.against {
                    cells.push((format!("against_{key}"), value_to_string(value)));
                }
            }
            for (col, _) in &cells {
                if !columns.iter().any(|c| c == col) {
                    columns.push(col.clone());
                }
            }
            flat_rows.push(cells);
        }
        let mut table = Table::new(columns);
        for cells in flat_rows {
            let row = table
                .columns
                .iter()
                .map(|col| {
                    cells
                        .iter()
                        .find(|(name, _)| name == col)
                        .map(|(_, value)| value.clone())
                        .unwrap_or_default()
                })
                .collect();
            table.rows.push(row);
        }
        out.push((category.clone(), table));
    }
    out
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => {
            if *b {
                "yes".to_string()
            } else {
                "no".to_string()
            }
        }
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Split the on-page stat tables into sections. Header groups come from
/// `table thead tr`; a body row joins every section whose header count
/// matches its own cell count, so two same-width sections both see the
/// row. Pages with no body rows at all error, since that means the stats
/// never rendered.
fn table_sections(page: &RenderedPage) -> Result<Vec<Table>> {
    let header_groups = page.rows("table thead tr", "th")?;
    let body_rows = page.rows("table tbody tr", "td")?;
    if body_rows.is_empty() {
        bail!("no stat table rows rendered");
    }
    let mut sections: Vec<Table> = header_groups.into_iter().map(Table::new).collect();
    for row in body_rows {
        if row.is_empty() {
            continue;
        }
        for section in sections
            .iter_mut()
            .filter(|section| section.columns.len() == row.len())
        {
            section.rows.push(row.clone());
        }
    }
    Ok(sections)
}

/// Finished matches from the team calendar: one row per game with a date,
/// an opponent and both scores. Games missing any of those are skipped.
fn match_calendar(page: &RenderedPage) -> Result<Table> {
    let container_sel = compile(".calendar-container .calendar-date-container")?;
    let date_sel = compile(".calendar-date")?;
    let game_sel = compile(".calendar-game")?;
    let home_sel = compile(".team-home")?;
    let away_sel = compile(".team-away")?;
    let opponent_sel = compile(".team-title a")?;

    let mut table = Table::new(vec![
        "Date".to_string(),
        "Opponent".to_string(),
        "Home Score".to_string(),
        "Away Score".to_string(),
    ]);
    for container in page.doc().select(&container_sel) {
        let date = match container.select(&date_sel).next().map(element_text) {
            Some(date) if !date.is_empty() => date,
            _ => continue,
        };
        let game = match container.select(&game_sel).next() {
            Some(game) => game,
            None => continue,
        };
        let home = game.select(&home_sel).next().map(element_text);
        let away = game.select(&away_sel).next().map(element_text);
        let opponent = game.select(&opponent_sel).next().map(element_text);
        if let (Some(home), Some(away), Some(opponent)) = (home, away, opponent) {
            if home.is_empty() || away.is_empty() || opponent.is_empty() {
                continue;
            }
            table.rows.push(vec![date, opponent, home, away]);
        }
    }
    Ok(table)
}

fn with_scrape_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}
