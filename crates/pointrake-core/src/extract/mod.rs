//! Source-specific extraction: one [`SiteExtractor`] per supported point
//! site, selected by URL through the [`ExtractorRegistry`].

mod ponta;
mod rakuten;
mod rules;
mod vpoint;
mod wester;

pub use ponta::PontaExtractor;
pub use rakuten::RakutenExtractor;
pub use rules::{FilterPolicy, KeywordRule, RuleAction};
pub use vpoint::VPointExtractor;
pub use wester::WesterExtractor;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::record::{ColumnSpec, TransactionRecord};

/// Per-source boolean toggles read from the persisted configuration before
/// filtering. Keys are the wire-facing camelCase names; unrecognized names
/// read as disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanOptions {
    /// Include au PAY point-management rows (negative on add) for Ponta.
    pub include_ponta_management: bool,
    /// Include V-point investment rows (negative on add) for VPoint.
    pub include_v_point_investment: bool,
}

impl ScanOptions {
    #[must_use]
    pub fn is_enabled(&self, toggle: &str) -> bool {
        match toggle {
            "includePontaManagement" => self.include_ponta_management,
            "includeVPointInvestment" => self.include_v_point_investment,
            _ => false,
        }
    }
}

/// One source's extraction capability set.
pub trait SiteExtractor: Send + Sync {
    /// Stable source identifier stamped on every extracted record.
    fn site_id(&self) -> &'static str;

    /// Pure predicate on the page location; no document access.
    fn is_applicable(&self, url: &str) -> bool;

    /// Scan the document for the source's structural pattern and return
    /// records in document order. A missing pattern (page not loaded yet)
    /// yields an empty sequence, never an error; an item whose amount fails
    /// to parse is skipped on its own.
    fn extract(&self, document: &Html) -> Vec<TransactionRecord>;

    /// Presentational column descriptors for the record set.
    fn columns(&self) -> Vec<ColumnSpec>;
}

/// Result of running the applicable extractor over a document.
#[derive(Debug)]
pub struct Extraction {
    pub site: &'static str,
    pub columns: Vec<ColumnSpec>,
    pub records: Vec<TransactionRecord>,
}

/// Ordered extractor candidates; the first `is_applicable` match wins and no
/// later candidate is tried.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn SiteExtractor>>,
}

impl ExtractorRegistry {
    /// The built-in sources in their fixed priority order.
    #[must_use]
    pub fn with_defaults(options: ScanOptions) -> Self {
        Self {
            extractors: vec![
                Box::new(WesterExtractor::new()),
                Box::new(RakutenExtractor::new()),
                Box::new(PontaExtractor::new(options)),
                Box::new(VPointExtractor::new(options)),
            ],
        }
    }

    #[must_use]
    pub fn find(&self, url: &str) -> Option<&dyn SiteExtractor> {
        self.extractors
            .iter()
            .map(AsRef::as_ref)
            .find(|extractor| extractor.is_applicable(url))
    }

    /// Extract from `document` with the extractor selected by `url`.
    /// `None` means no applicable source, which is distinct from an
    /// applicable source that found zero transactions.
    #[must_use]
    pub fn scan(&self, url: &str, document: &Html) -> Option<Extraction> {
        let extractor = self.find(url)?;
        let records = extractor.extract(document);
        tracing::debug!(
            site = extractor.site_id(),
            records = records.len(),
            "document scanned"
        );
        Some(Extraction {
            site: extractor.site_id(),
            columns: extractor.columns(),
            records,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SiteExtractor> {
        self.extractors.iter().map(AsRef::as_ref)
    }
}

/// Concatenated text content of an element's subtree, trimmed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Like [`element_text`], but subtrees carrying `skip_class` are left out.
pub(crate) fn element_text_excluding(element: ElementRef<'_>, skip_class: &str) -> String {
    fn walk(element: ElementRef<'_>, skip_class: &str, out: &mut String) {
        for child in element.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                if child_el.value().classes().any(|c| c == skip_class) {
                    continue;
                }
                walk(child_el, skip_class, out);
            } else if let Some(text) = child.value().as_text() {
                out.push_str(text);
            }
        }
    }

    let mut out = String::new();
    walk(element, skip_class, &mut out);
    out.trim().to_string()
}
