//! WESTER point history (ICOCA point reference page).
//!
//! Each transaction sits in its own small table; the second row carries the
//! data cells. Cancellations arrive as negative rows marked 【取消】 and are
//! kept alongside gains so the reversal is visible in the sheet; plain
//! usage rows (negative, unmarked) are dropped.

use std::sync::OnceLock;

use scraper::{Html, Selector};

use super::rules::FilterPolicy;
use super::{element_text, ScanOptions, SiteExtractor};
use crate::normalize;
use crate::record::{ColumnSpec, TransactionRecord};

const SITE_ID: &str = "wester";

const POLICY: FilterPolicy = FilterPolicy::new(&[], &["【取消】", "取消"]);

fn table_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(".detailTableWrap table").expect("invalid table selector")
    })
}

fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tr").expect("invalid row selector"))
}

fn cell_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td").expect("invalid cell selector"))
}

pub struct WesterExtractor;

impl WesterExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for WesterExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteExtractor for WesterExtractor {
    fn site_id(&self) -> &'static str {
        SITE_ID
    }

    fn is_applicable(&self, url: &str) -> bool {
        url.contains("pointref_search.do")
    }

    fn extract(&self, document: &Html) -> Vec<TransactionRecord> {
        let mut records = Vec::new();

        for table in document.select(table_selector()) {
            // Row 0 is the header; row 1 holds date / place / content /
            // points / note / breakdown.
            let rows: Vec<_> = table.select(row_selector()).collect();
            let Some(data_row) = rows.get(1) else {
                continue;
            };
            let cells: Vec<String> = data_row.select(cell_selector()).map(element_text).collect();
            if cells.len() < 4 {
                continue;
            }

            let Some(amount) = parse_points(&cells[3]) else {
                continue;
            };
            let description = &cells[2];
            if !POLICY.admits(description, amount, &ScanOptions::default()) {
                continue;
            }

            records.push(
                TransactionRecord::new(SITE_ID)
                    .with_field("date", cells[0].clone())
                    .with_field("service", cells[1].clone())
                    .with_field("description", normalize::description(description))
                    .with_field("amount", amount)
                    .with_field("isCancellation", POLICY.is_cancellation(description, amount)),
            );
        }
        records
    }

    fn columns(&self) -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("デイト", "date"),
            ColumnSpec::new("サービス", "service"),
            ColumnSpec::new("ディテール", "description"),
            ColumnSpec::numeric("ゲイン", "amount"),
        ]
    }
}

/// "180 P" / "-1,200 P" -> signed points.
fn parse_points(raw: &str) -> Option<i64> {
    raw.trim()
        .trim_end_matches('P')
        .trim()
        .replace(',', "")
        .parse()
        .ok()
}
