//! Ponta point history (au point portal).
//!
//! The page shows a recent-history list and, once opened, a slide-up modal
//! with the full history. The modal is preferred so the two lists are never
//! double-counted. Dates come as a bare "M月D日" and are assumed to belong
//! to the current calendar year at extraction time; records extracted right
//! after a year boundary may be stamped with the wrong year.

use std::sync::OnceLock;

use chrono::{Datelike, Local};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::rules::{FilterPolicy, KeywordRule, RuleAction};
use super::{element_text, ScanOptions, SiteExtractor};
use crate::normalize;
use crate::record::{ColumnSpec, TransactionRecord};

const SITE_ID: &str = "Ponta";

const RULES: &[KeywordRule] = &[KeywordRule::new(
    &["ａｕ　ＰＡＹ　ポイント運用"],
    RuleAction::IncludeIfToggle("includePontaManagement"),
)];
const POLICY: FilterPolicy = FilterPolicy::new(RULES, &[]);

fn modal_list_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(".point-history-slideup-modal__container .point-list__list")
            .expect("invalid modal list selector")
    })
}

fn recent_list_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(".container__recently-history .point-list__list")
            .expect("invalid recent list selector")
    })
}

fn date_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(".point-list__date").expect("invalid date selector"))
}

fn item_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse("ul > li.point-list__item").expect("invalid item selector")
    })
}

fn detail_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(".point-list__detail").expect("invalid detail selector"))
}

fn point_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(".point-list__point").expect("invalid point selector"))
}

fn month_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)月(\d+)日").expect("invalid month day regex"))
}

pub struct PontaExtractor {
    options: ScanOptions,
}

impl PontaExtractor {
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }
}

impl SiteExtractor for PontaExtractor {
    fn site_id(&self) -> &'static str {
        SITE_ID
    }

    fn is_applicable(&self, url: &str) -> bool {
        url.contains("point-portal.auone.jp/point/history")
    }

    fn extract(&self, document: &Html) -> Vec<TransactionRecord> {
        let container = document
            .select(modal_list_selector())
            .next()
            .or_else(|| document.select(recent_list_selector()).next());
        let Some(container) = container else {
            return Vec::new();
        };

        let mut records = Vec::new();
        let groups = container
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name().eq_ignore_ascii_case("li"));
        for group in groups {
            let date_text = group
                .select(date_selector())
                .next()
                .map(element_text)
                .unwrap_or_default();

            for item in group.select(item_selector()) {
                let description = item
                    .select(detail_selector())
                    .next()
                    .map(element_text)
                    .unwrap_or_default();
                let Some(amount) = item
                    .select(point_selector())
                    .next()
                    .map(element_text)
                    .and_then(|text| parse_points(&text))
                else {
                    continue;
                };

                if !POLICY.admits(&description, amount, &self.options) {
                    continue;
                }

                records.push(
                    TransactionRecord::new(SITE_ID)
                        .with_field("date", format_date(&date_text))
                        .with_field("description", normalize_text(&description))
                        .with_field("amount", amount)
                        .with_field("isCancellation", false),
                );
            }
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

/// "+1P" / "-100P" / "1,234P" -> signed points.
fn parse_points(raw: &str) -> Option<i64> {
    let cleaned = raw.trim().trim_end_matches('P').replace(',', "");
    cleaned.trim().parse().ok()
}

/// "2月8日" -> "YYYY/02/08" with the current local year; anything else is
/// passed through untouched.
fn format_date(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match month_day_re().captures(raw) {
        Some(caps) => {
            let year = Local::now().year();
            format!("{year}/{:0>2}/{:0>2}", &caps[1], &caps[2])
        }
        None => raw.to_string(),
    }
}

fn normalize_text(text: &str) -> String {
    normalize::description(&text.replace('、', ", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_page() -> Html {
        Html::parse_document(
            r#"
            <div class="container__recently-history">
              <ul class="point-list__list">
                <li>
                  <p class="point-list__date">2月8日</p>
                  <ul>
                    <li class="point-list__item">
                      <span class="point-list__detail">ローソン　ａｕ　ＰＡＹ（コード支払い）</span>
                      <span class="point-list__point">+15P</span>
                    </li>
                    <li class="point-list__item">
                      <span class="point-list__detail">ａｕ　ＰＡＹ　ポイント運用（追加）</span>
                      <span class="point-list__point">-100P</span>
                    </li>
                    <li class="point-list__item">
                      <span class="point-list__detail">ポイントでお支払い</span>
                      <span class="point-list__point">-50P</span>
                    </li>
                  </ul>
                </li>
              </ul>
            </div>
            "#,
        )
    }

    #[test]
    fn extracts_gains_with_current_year_dates() {
        let extractor = PontaExtractor::new(ScanOptions::default());
        let records = extractor.extract(&history_page());

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.site(), "Ponta");
        let date = record.get("date").and_then(|v| v.as_str()).unwrap();
        assert_eq!(&date[4..], "/02/08");
        assert_eq!(
            record.get("description").and_then(|v| v.as_str()),
            // Full-width corporate spelling folds to half-width with spaced brackets.
            Some("ローソン au PAY (コード支払い)")
        );
        assert_eq!(record.get("amount").and_then(serde_json::Value::as_i64), Some(15));
    }

    #[test]
    fn management_rows_require_the_toggle() {
        let off = PontaExtractor::new(ScanOptions::default());
        assert_eq!(off.extract(&history_page()).len(), 1);

        let on = PontaExtractor::new(ScanOptions {
            include_ponta_management: true,
            ..ScanOptions::default()
        });
        let records = on.extract(&history_page());
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[1].get("amount").and_then(serde_json::Value::as_i64),
            Some(-100)
        );
    }

    #[test]
    fn missing_list_yields_no_records() {
        let extractor = PontaExtractor::new(ScanOptions::default());
        let document = Html::parse_document("<html><body><p>loading...</p></body></html>");
        assert!(extractor.extract(&document).is_empty());
    }

    #[test]
    fn unparseable_points_skip_the_single_item() {
        let extractor = PontaExtractor::new(ScanOptions::default());
        let document = Html::parse_document(
            r#"
            <div class="container__recently-history">
              <ul class="point-list__list">
                <li>
                  <p class="point-list__date">3月1日</p>
                  <ul>
                    <li class="point-list__item">
                      <span class="point-list__detail">表示エラー</span>
                      <span class="point-list__point">--</span>
                    </li>
                    <li class="point-list__item">
                      <span class="point-list__detail">クーポン</span>
                      <span class="point-list__point">3P</span>
                    </li>
                  </ul>
                </li>
              </ul>
            </div>
            "#,
        );
        let records = extractor.extract(&document);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get("description").and_then(|v| v.as_str()),
            Some("クーポン")
        );
    }

    #[test]
    fn month_day_dates_are_zero_padded() {
        let formatted = format_date("12月3日");
        assert_eq!(&formatted[4..], "/12/03");
    }
}
