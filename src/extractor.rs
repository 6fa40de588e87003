// src/extractor.rs
use crate::config::WaitPolicy;
use crate::error::MarketError;
use crate::source::{PageSession, PageSource, Waiter};
use crate::types::{CellLink, RawRow};
use log::{debug, info, warn};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use uuid::Uuid;

/// Reads rows out of tables that are filled in by client-side rendering.
///
/// One call is one pass: open a session, navigate, poll until the table is
/// present, apply the settle delays, read once, close. No retries happen here.
pub struct TableExtractor {
    policy: WaitPolicy,
    reserved_row_ids: Vec<String>,
    link_cell: usize,
    waiter: Arc<dyn Waiter>,
}

impl TableExtractor {
    pub fn new(policy: WaitPolicy, waiter: Arc<dyn Waiter>) -> Self {
        Self {
            policy,
            reserved_row_ids: vec!["minrow".to_string(), "maxrow".to_string()],
            link_cell: 0,
            waiter,
        }
    }

    pub fn with_reserved_row_ids(mut self, ids: Vec<String>) -> Self {
        self.reserved_row_ids = ids;
        self
    }

    /// Cell whose anchor carries the symbol and its title/link target.
    pub fn with_link_cell(mut self, index: usize) -> Self {
        self.link_cell = index;
        self
    }

    pub async fn extract(
        &self,
        source: &dyn PageSource,
        url: &str,
        table_id: &str,
    ) -> Result<Vec<RawRow>, MarketError> {
        let pass_id = Uuid::new_v4();
        info!("[{}] Extracting table #{} from {}", pass_id, table_id, url);

        let mut session = source.open().await?;
        let outcome = self.read_rows(session.as_mut(), url, table_id).await;
        if let Err(e) = session.close().await {
            warn!("[{}] Failed to close session: {}", pass_id, e);
        }

        match &outcome {
            Ok(rows) => info!("[{}] Found {} rows in #{}", pass_id, rows.len(), table_id),
            Err(e) => warn!("[{}] Extraction of #{} failed: {}", pass_id, table_id, e),
        }
        outcome
    }

    /// Waits for every element id to be present, settles, and returns the page HTML.
    pub async fn capture(
        &self,
        source: &dyn PageSource,
        url: &str,
        element_ids: &[&str],
    ) -> Result<String, MarketError> {
        let selectors = element_ids
            .iter()
            .map(|id| id_selector(id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut session = source.open().await?;
        let outcome = self
            .settled_content(session.as_mut(), url, &selectors, &element_ids.join(", "))
            .await;
        if let Err(e) = session.close().await {
            warn!("Failed to close session for {}: {}", url, e);
        }
        outcome
    }

    async fn read_rows(
        &self,
        session: &mut dyn PageSession,
        url: &str,
        table_id: &str,
    ) -> Result<Vec<RawRow>, MarketError> {
        let selector = id_selector(table_id)?;
        let html = self
            .settled_content(session, url, std::slice::from_ref(&selector), table_id)
            .await?;

        let rows = parse_table_rows(&html, table_id, &self.reserved_row_ids, self.link_cell)?;
        if rows.is_empty() {
            return Err(MarketError::SourceUnavailable(format!(
                "table #{} has no usable rows",
                table_id
            )));
        }
        Ok(rows)
    }

    async fn settled_content(
        &self,
        session: &mut dyn PageSession,
        url: &str,
        selectors: &[Selector],
        what: &str,
    ) -> Result<String, MarketError> {
        let max_wait = self.policy.max_wait;
        let started = Instant::now();
        session.navigate(url).await?;

        // The first read is the page load itself and is bounded by the
        // source's own timeout. Later polls share the max_wait budget, which
        // counts fetch time as well as the waiter's sleeps.
        let mut waited = Duration::ZERO;
        let mut html = session.content().await?;
        while !contains_all(&html, selectors) {
            let spent = waited.max(started.elapsed());
            if spent >= max_wait || self.policy.poll_interval.is_zero() {
                return Err(MarketError::SourceUnavailable(format!(
                    "{} not present after {:?}",
                    what, spent
                )));
            }
            let step = self.policy.poll_interval.min(max_wait - spent);
            debug!("{} not present yet, waiting {:?}", what, step);
            self.waiter.wait(step).await;
            waited += step;

            let remaining = max_wait.saturating_sub(waited.max(started.elapsed()));
            html = match timeout(remaining, session.content()).await {
                Ok(content) => content?,
                Err(_) => {
                    return Err(MarketError::SourceUnavailable(format!(
                        "{} not present after {:?}",
                        what, max_wait
                    )))
                }
            };
        }

        if self.policy.settle_delays.is_empty() {
            return Ok(html);
        }
        for delay in &self.policy.settle_delays {
            debug!("Settling {:?} for {}", delay, what);
            self.waiter.wait(*delay).await;
        }
        session.content().await
    }
}

fn id_selector(id: &str) -> Result<Selector, MarketError> {
    Selector::parse(&format!("[id=\"{}\"]", id.replace('"', "")))
        .map_err(|e| MarketError::Config(format!("bad element id '{}': {:?}", id, e)))
}

fn simple_selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn contains_all(html: &str, selectors: &[Selector]) -> bool {
    let document = Html::parse_document(html);
    selectors
        .iter()
        .all(|selector| document.select(selector).next().is_some())
}

fn cell_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn cell_link(cell: ElementRef<'_>, anchor: &Selector) -> Option<CellLink> {
    cell.select(anchor).next().map(|a| CellLink {
        text: cell_text(a),
        title: a.value().attr("title").map(str::to_string),
        href: a.value().attr("href").map(str::to_string),
    })
}

/// Reads the data rows of table `table_id` in document order.
///
/// Rows without `td` cells (headers) and rows whose id is reserved are left
/// out. A missing table is an error, an empty one is not.
pub fn parse_table_rows(
    html: &str,
    table_id: &str,
    reserved_row_ids: &[String],
    link_cell: usize,
) -> Result<Vec<RawRow>, MarketError> {
    let document = Html::parse_document(html);
    let table_selector = id_selector(table_id)?;
    let row_selector = simple_selector("tr");
    let cell_selector = simple_selector("td");
    let anchor_selector = simple_selector("a");

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| MarketError::SourceUnavailable(format!("table #{} not found", table_id)))?;

    let mut rows = Vec::new();
    for row in table.select(&row_selector) {
        if let Some(id) = row.value().id() {
            if reserved_row_ids.iter().any(|reserved| reserved == id) {
                continue;
            }
        }

        let cells: Vec<ElementRef<'_>> = row.select(&cell_selector).collect();
        if cells.is_empty() {
            continue;
        }

        rows.push(RawRow {
            link: cells.get(link_cell).and_then(|cell| cell_link(*cell, &anchor_selector)),
            cells: cells.into_iter().map(cell_text).collect(),
        });
    }
    Ok(rows)
}
