//! Rendered-page access for the scrapers: one GET with a settle delay,
//! parsed once, queried through CSS selectors. Tests construct pages from
//! canned HTML via `from_html`.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use scraper::{ElementRef, Html, Selector};

use crate::http_client::http_client;

/// Compile a selector literal. All selectors in this crate are constants,
/// so an error here is a programmer mistake surfaced at first use.
pub(crate) fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow!("invalid selector `{css}`: {err}"))
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    let joined: String = el.text().collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct RenderedPage {
    raw: String,
    doc: Html,
}

impl RenderedPage {
    pub fn fetch(url: &str, settle: Duration) -> Result<RenderedPage> {
        let client = http_client()?;
        let body = client
            .get(url)
            .send()
            .with_context(|| format!("request {url}"))?
            .error_for_status()
            .with_context(|| format!("bad status from {url}"))?
            .text()
            .with_context(|| format!("read body from {url}"))?;
        if !settle.is_zero() {
            thread::sleep(settle);
        }
        Ok(RenderedPage::from_html(&body))
    }

    pub fn from_html(html: &str) -> RenderedPage {
        RenderedPage {
            raw: html.to_string(),
            doc: Html::parse_document(html),
        }
    }

    /// Raw document text, for embedded-script extraction.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parsed document, for scoped selection the flat helpers cannot express.
    pub fn doc(&self) -> &Html {
        &self.doc
    }

    pub fn has(&self, css: &str) -> Result<bool> {
        let sel = compile(css)?;
        Ok(self.doc.select(&sel).next().is_some())
    }

    /// Whitespace-normalized text of every match, in document order.
    pub fn texts(&self, css: &str) -> Result<Vec<String>> {
        let sel = compile(css)?;
        Ok(self.doc.select(&sel).map(element_text).collect())
    }

    /// (text, href) of every matching anchor that carries an href.
    pub fn links(&self, css: &str) -> Result<Vec<(String, String)>> {
        let sel = compile(css)?;
        let mut out = Vec::new();
        for el in self.doc.select(&sel) {
            if let Some(href) = el.value().attr("href") {
                out.push((element_text(el), href.to_string()));
            }
        }
        Ok(out)
    }

    /// Cell-text matrix: one entry per `row_css` match, cells taken from
    /// `cell_css` matches inside it. Rows with no cell matches come back
    /// empty rather than being dropped.
    pub fn rows(&self, row_css: &str, cell_css: &str) -> Result<Vec<Vec<String>>> {
        let row_sel = compile(row_css)?;
        let cell_sel = compile(cell_css)?;
        let mut out = Vec::new();
        for row in self.doc.select(&row_sel) {
            out.push(row.select(&cell_sel).map(element_text).collect());
        }
        Ok(out)
    }
}

/// Bounded wait for content a plain GET may not include yet: fetch, check
/// the selector, re-fetch after the settle delay, up to `attempts` times.
/// `Ok(None)` means the selector never appeared; network failures propagate.
pub fn fetch_until(
    url: &str,
    css: &str,
    attempts: usize,
    settle: Duration,
) -> Result<Option<RenderedPage>> {
    for _ in 0..attempts.max(1) {
        let page = RenderedPage::fetch(url, settle)?;
        if page.has(css)? {
            return Ok(Some(page));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <html><body>
        <table><tbody>
            <tr><td>1</td><td><a href="team/Arsenal/2024">Arsenal</a></td></tr>
            <tr><td>2</td><td><a href="team/Chelsea/2024">Chelsea</a></td></tr>
        </tbody></table>
        </body></html>"#;

    #[test]
    fn texts_and_links_normalize_whitespace() {
        let page = RenderedPage::from_html(DOC);
        assert!(page.has("table tbody tr").unwrap());
        let links = page.links("table tbody tr td:nth-child(2) a").unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].0, "Arsenal");
        assert_eq!(links[0].1, "team/Arsenal/2024");
    }

    #[test]
    fn rows_extracts_cell_matrix() {
        let page = RenderedPage::from_html(DOC);
        let rows = page.rows("table tbody tr", "td").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["1".to_string(), "Arsenal".to_string()]);
    }
}
