//! V-point history (T-site mypage).
//!
//! Store-limited point rows are internal to the store channel and dropped
//! unconditionally; V-point investment rows move points in and out of the
//! investment feature and are only included when the corresponding toggle
//! is enabled.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::rules::{FilterPolicy, KeywordRule, RuleAction};
use super::{element_text, ScanOptions, SiteExtractor};
use crate::normalize;
use crate::record::{ColumnSpec, TransactionRecord};

const SITE_ID: &str = "VPoint";

const RULES: &[KeywordRule] = &[
    KeywordRule::new(&["ストア限定"], RuleAction::Exclude),
    KeywordRule::new(
        &["Ｖポイント運用", "Vポイント運用"],
        RuleAction::IncludeIfToggle("includeVPointInvestment"),
    ),
];
const POLICY: FilterPolicy = FilterPolicy::new(RULES, &[]);

fn item_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("ul > li.list__one").expect("invalid item selector"))
}

fn date_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(".list__one__date").expect("invalid date selector"))
}

fn name_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(".list__one__contents--name").expect("invalid name selector")
    })
}

fn point_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(".list__one__contents--point").expect("invalid point selector")
    })
}

fn ymd_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})").expect("invalid ymd regex"))
}

pub struct VPointExtractor {
    options: ScanOptions,
}

impl VPointExtractor {
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }
}

impl SiteExtractor for VPointExtractor {
    fn site_id(&self) -> &'static str {
        SITE_ID
    }

    fn is_applicable(&self, url: &str) -> bool {
        url.contains("mypage.tsite.jp") || url.contains("vpoint.jp")
    }

    fn extract(&self, document: &Html) -> Vec<TransactionRecord> {
        let mut records = Vec::new();

        for item in document.select(item_selector()) {
            let Some(date_text) = item.select(date_selector()).next().map(element_text) else {
                continue;
            };
            let Some(description) = item.select(name_selector()).next().map(element_text) else {
                continue;
            };
            let Some(point_text) = item.select(point_selector()).next().map(element_text) else {
                continue;
            };
            if date_text.is_empty() || description.is_empty() || point_text.is_empty() {
                continue;
            }

            let Some(amount) = parse_points(&point_text) else {
                continue;
            };
            if !POLICY.admits(&description, amount, &self.options) {
                continue;
            }

            records.push(
                TransactionRecord::new(SITE_ID)
                    .with_field("date", format_date(&date_text))
                    .with_field("description", normalize::description(&description))
                    .with_field("amount", amount)
                    .with_field("isCancellation", false),
            );
        }
        records
    }

    fn columns(&self) -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("デイト", "date"),
            ColumnSpec::new("ディテール", "description"),
            ColumnSpec::numeric("ゲイン", "amount"),
        ]
    }
}

/// "16" / "+90" / "-1,200" -> signed points.
fn parse_points(raw: &str) -> Option<i64> {
    raw.trim().replace(',', "").parse().ok()
}

/// The date cell may carry trailing lines; the first line holds the date,
/// zero-padded to `YYYY/MM/DD` when it parses.
fn format_date(raw: &str) -> String {
    let first_line = raw.split('\n').next().unwrap_or("").trim();
    match ymd_re().captures(first_line) {
        Some(caps) => format!("{}/{:0>2}/{:0>2}", &caps[1], &caps[2], &caps[3]),
        None => first_line.to_string(),
    }
}
