//! Market-valuation fetcher: the league's club listing with one squad
//! market value per row. Values stay verbatim currency strings ("€1.31bn");
//! nothing downstream does arithmetic on them.

use std::time::Duration;

use anyhow::Result;

use crate::config::Settings;
use crate::page::{RenderedPage, compile, element_text, fetch_until};
use crate::table::Table;

const ROW_CSS: &str = "table.items tbody tr";
const NAME_CSS: &str = "td.hauptlink a";
const VALUE_CSS: &str = "td.rechts";

/// `Ok(None)` when the listing table never rendered or the site was
/// unreachable, same contract as the ranking fetcher.
pub fn fetch_market_table(settings: &Settings) -> Result<Option<Table>> {
    let settle = Duration::from_millis(settings.settle_ms);
    let page = match fetch_until(
        &settings.market_values_url,
        ROW_CSS,
        settings.wait_attempts,
        settle,
    ) {
        Ok(Some(page)) => page,
        Ok(None) | Err(_) => return Ok(None),
    };
    Ok(Some(market_table(&page)?))
}

/// `team, market_value` rows. The value sits in the last right-aligned
/// cell of each row; rows missing a name or a value are skipped.
pub fn market_table(page: &RenderedPage) -> Result<Table> {
    let row_sel = compile(ROW_CSS)?;
    let name_sel = compile(NAME_CSS)?;
    let value_sel = compile(VALUE_CSS)?;

    let mut table = Table::new(vec!["team".to_string(), "market_value".to_string()]);
    for row in page.doc().select(&row_sel) {
        let name = row
            .select(&name_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let value = row
            .select(&value_sel)
            .last()
            .map(element_text)
            .unwrap_or_default();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        table.rows.push(vec![name, value]);
    }
    Ok(table)
}
