//! pointrake-core: record model, site extractors, and the idempotent
//! reconciliation engine behind the point-history sheets.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod extract;
pub mod ingest;
pub mod normalize;
pub mod record;
pub mod store;

pub use extract::{
    Extraction, ExtractorRegistry, FilterPolicy, KeywordRule, PontaExtractor, RakutenExtractor,
    RuleAction, ScanOptions, SiteExtractor, VPointExtractor, WesterExtractor,
};
pub use ingest::{
    ingest_batch, parse_batch, IngestError, IngestReport, IngestResult, RecordOutcome,
    IMPORTED_AT_COLUMN,
};
pub use record::{ColumnSpec, TransactionRecord};
pub use store::{SheetStore, SqliteSheetStore, StoreError, StoreResult};
