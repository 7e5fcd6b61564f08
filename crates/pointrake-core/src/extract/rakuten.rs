//! Rakuten point history.
//!
//! The history table mixes grants, spends, charges, and "expected" rows;
//! only confirmed grants are extracted: the row must carry the `get` class
//! and an action containing 獲得 but not 予定. The grant date cell renders
//! the year and the month/day as separate fragments, and the real usage
//! date hides inside the detail cell's data block.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::rules::FilterPolicy;
use super::{element_text, element_text_excluding, ScanOptions, SiteExtractor};
use crate::normalize;
use crate::record::{ColumnSpec, TransactionRecord};

const SITE_ID: &str = "RakutenPoint";

const POLICY: FilterPolicy = FilterPolicy::new(&[], &[]);

fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse("table.history-table tbody tr").expect("invalid row selector")
    })
}

fn th_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("th").expect("invalid th selector"))
}

fn action_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(".action").expect("invalid action selector"))
}

fn date_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(".date").expect("invalid date selector"))
}

fn service_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(".service").expect("invalid service selector"))
}

fn detail_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(".detail").expect("invalid detail selector"))
}

fn point_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(".point").expect("invalid point selector"))
}

fn usage_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d{4}/\d{2}/\d{2})\]").expect("invalid usage date regex"))
}

pub struct RakutenExtractor;

impl RakutenExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for RakutenExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteExtractor for RakutenExtractor {
    fn site_id(&self) -> &'static str {
        SITE_ID
    }

    fn is_applicable(&self, url: &str) -> bool {
        url.contains("point.rakuten.co.jp/history")
    }

    fn extract(&self, document: &Html) -> Vec<TransactionRecord> {
        let mut records = Vec::new();

        for row in document.select(row_selector()) {
            // Header and spacer rows.
            if row.select(th_selector()).next().is_some() {
                continue;
            }

            let Some(action) = row.select(action_selector()).next().map(element_text) else {
                continue;
            };
            let is_get_class = row.value().classes().any(|c| c == "get");
            if !is_get_class || !action.contains("獲得") {
                continue;
            }
            // 獲得予定ポイント rows are not confirmed grants.
            if action.contains("予定") {
                continue;
            }

            let Some(date_el) = row.select(date_selector()).next() else {
                continue;
            };
            let Some(detail_el) = row.select(detail_selector()).next() else {
                continue;
            };
            let Some(point_el) = row.select(point_selector()).next() else {
                continue;
            };

            // The cell renders as "2026<br>02/06"; joining the fragments
            // gives "2026/02/06", stored dashed as "2026-02-06".
            let grant_date = date_el
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("/")
                .replace('/', "-");

            let usage_date = detail_el
                .select(date_selector())
                .next()
                .map(element_text)
                .and_then(|text| {
                    usage_date_re()
                        .captures(&text)
                        .map(|caps| caps[1].replace('/', "-"))
                })
                .unwrap_or_else(|| grant_date.clone());

            let service = row
                .select(service_selector())
                .next()
                .map(|el| element_text_excluding(el, "sub-link"))
                .unwrap_or_default();

            let description = normalize::description(&element_text_excluding(detail_el, "data"));

            let Some(amount) = parse_points(&element_text(point_el)) else {
                continue;
            };
            if !POLICY.admits(&description, amount, &ScanOptions::default()) {
                continue;
            }

            records.push(
                TransactionRecord::new(SITE_ID)
                    .with_field("date", grant_date)
                    .with_field("usage_date", usage_date)
                    .with_field("service", service)
                    .with_field("description", description)
                    .with_field("amount", amount)
                    .with_field("action", action),
            );
        }
        records
    }

    fn columns(&self) -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("ポステッド", "date"),
            ColumnSpec::new("トランザク", "usage_date"),
            ColumnSpec::new("サービス", "service"),
            ColumnSpec::new("ディテール", "description"),
            ColumnSpec::numeric("ゲイン", "amount"),
        ]
    }
}

fn parse_points(raw: &str) -> Option<i64> {
    raw.trim().replace(',', "").parse().ok()
}
