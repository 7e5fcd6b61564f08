//! The reconciliation engine: idempotent, signature-based merging of a
//! record batch into the per-source sheets.
//!
//! A record's dedup signature is the JSON array of its normalized non-site
//! values, in field order. Each call seeds a per-source signature set from
//! the sheet, then walks the batch in input order so within-batch duplicates
//! are caught too; outcomes are reported in the exact order of the input so
//! callers can flag individual records by position.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::normalize;
use crate::record::TransactionRecord;
use crate::store::{SheetStore, StoreError};

/// System column appended to every sheet's header row.
pub const IMPORTED_AT_COLUMN: &str = "ImportedAt";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid payload: {0}")]
    MalformedBatch(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Per-record outcome, in input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOutcome {
    Added,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub added_count: usize,
    pub outcomes: Vec<RecordOutcome>,
}

/// Validate a wire payload into a record batch.
///
/// The payload must be a JSON array of flat objects. A missing or empty
/// `site` falls back to `"unknown"`; a present non-string `site` makes the
/// whole batch malformed. This is the only source of
/// [`IngestError::MalformedBatch`], and it runs before any store access, so
/// a malformed batch never mutates the store.
pub fn parse_batch(payload: &Value) -> IngestResult<Vec<TransactionRecord>> {
    let Value::Array(items) = payload else {
        return Err(IngestError::MalformedBatch(
            "payload must be an array of records".to_string(),
        ));
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(object) = item else {
            return Err(IngestError::MalformedBatch(format!(
                "record {index} must be an object"
            )));
        };
        let mut fields = object.clone();
        let site = match fields.shift_remove("site") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::String(_)) | None => "unknown".to_string(),
            Some(other) => {
                return Err(IngestError::MalformedBatch(format!(
                    "record {index}: 'site' must be a string, got {other}"
                )));
            }
        };
        records.push(TransactionRecord::from_parts(site, fields));
    }
    Ok(records)
}

struct SiteState {
    headers: Vec<String>,
    signatures: HashSet<String>,
    staged: Vec<Vec<String>>,
}

/// Merge `batch` into the store and report per-record outcomes.
///
/// All sheets touched by the batch are prepared up front (header sets loaded
/// or created from the first record seen for the source, signature sets
/// seeded from existing rows); the batch is then walked in input order and
/// finally each source's staged rows are appended in one batch write.
pub async fn ingest_batch(
    store: &dyn SheetStore,
    batch: &[TransactionRecord],
) -> IngestResult<IngestReport> {
    let mut site_order: Vec<&str> = Vec::new();
    let mut states: HashMap<&str, SiteState> = HashMap::new();

    for record in batch {
        if !states.contains_key(record.site()) {
            let sample_keys: Vec<&str> = record.keys().collect();
            let state = prepare_site(store, record.site(), &sample_keys).await?;
            site_order.push(record.site());
            states.insert(record.site(), state);
        }
    }

    let imported_at = Utc::now().to_rfc3339();
    let mut outcomes = Vec::with_capacity(batch.len());
    let mut added_count = 0;

    for record in batch {
        let state = states
            .get_mut(record.site())
            .expect("every site in the batch was prepared above");

        let signature = record_signature(record);
        if state.signatures.contains(&signature) {
            outcomes.push(RecordOutcome::Skipped);
            continue;
        }
        state.signatures.insert(signature);

        let row: Vec<String> = state
            .headers
            .iter()
            .map(|header| {
                if header == IMPORTED_AT_COLUMN {
                    imported_at.clone()
                } else {
                    record.get(header).map_or_else(String::new, cell_text)
                }
            })
            .collect();
        state.staged.push(row);
        outcomes.push(RecordOutcome::Added);
        added_count += 1;
    }

    for site in &site_order {
        if let Some(state) = states.get(site) {
            if !state.staged.is_empty() {
                store.append_rows(site, &state.staged).await?;
            }
        }
    }

    tracing::debug!(total = batch.len(), added = added_count, "batch reconciled");
    Ok(IngestReport {
        added_count,
        outcomes,
    })
}

async fn prepare_site(
    store: &dyn SheetStore,
    site: &str,
    sample_keys: &[&str],
) -> IngestResult<SiteState> {
    let headers = match store.headers(site).await? {
        Some(headers) => headers,
        None => {
            let mut headers: Vec<String> = sample_keys.iter().map(ToString::to_string).collect();
            headers.push(IMPORTED_AT_COLUMN.to_string());
            store.create_sheet(site, &headers).await?;
            headers
        }
    };

    let header_index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let mut signatures = HashSet::new();
    for row in store.rows(site).await? {
        let parts: Vec<String> = sample_keys
            .iter()
            .map(|key| {
                header_index
                    .get(key)
                    .and_then(|&i| row.get(i))
                    .map_or_else(String::new, |cell| normalize::signature_text(cell))
            })
            .collect();
        signatures.insert(join_signature(&parts));
    }

    Ok(SiteState {
        headers,
        signatures,
        staged: Vec::new(),
    })
}

/// Signature over the record's own non-site fields, in field order.
fn record_signature(record: &TransactionRecord) -> String {
    let parts: Vec<String> = record
        .fields()
        .map(|(_, value)| normalize::signature_value(value))
        .collect();
    join_signature(&parts)
}

fn join_signature(parts: &[String]) -> String {
    serde_json::to_string(parts).unwrap_or_default()
}

/// Stored cell form of a record value. Raw values go in as-is; only the
/// signature comparison normalizes.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteSheetStore;
    use serde_json::json;

    fn record(site: &str, date: &str, description: &str, amount: i64) -> TransactionRecord {
        TransactionRecord::new(site)
            .with_field("date", date)
            .with_field("description", description)
            .with_field("amount", amount)
    }

    #[tokio::test]
    async fn first_ingest_adds_second_skips() {
        let store = SqliteSheetStore::open_memory().await.unwrap();
        let batch = vec![record("A", "2026/01/01", "X", 10)];

        let first = ingest_batch(&store, &batch).await.unwrap();
        assert_eq!(first.added_count, 1);
        assert_eq!(first.outcomes, vec![RecordOutcome::Added]);

        let second = ingest_batch(&store, &batch).await.unwrap();
        assert_eq!(second.added_count, 0);
        assert_eq!(second.outcomes, vec![RecordOutcome::Skipped]);
    }

    #[tokio::test]
    async fn within_batch_duplicates_are_caught() {
        let store = SqliteSheetStore::open_memory().await.unwrap();
        let batch = vec![
            record("A", "2026/01/01", "X", 10),
            record("A", "2026/01/01", "X", 10),
        ];

        let report = ingest_batch(&store, &batch).await.unwrap();
        assert_eq!(report.added_count, 1);
        assert_eq!(
            report.outcomes,
            vec![RecordOutcome::Added, RecordOutcome::Skipped]
        );
        assert_eq!(store.rows("A").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn outcomes_follow_input_order_across_sites() {
        let store = SqliteSheetStore::open_memory().await.unwrap();
        // Seed site B with one existing record.
        ingest_batch(&store, &[record("B", "2026/01/01", "Seen", 5)])
            .await
            .unwrap();

        let batch = vec![
            record("A", "2026/01/01", "New", 1),
            record("B", "2026/01/01", "Seen", 5),
            record("A", "2026/01/02", "New", 2),
        ];
        let report = ingest_batch(&store, &batch).await.unwrap();

        assert_eq!(report.added_count, 2);
        assert_eq!(
            report.outcomes,
            vec![
                RecordOutcome::Added,
                RecordOutcome::Skipped,
                RecordOutcome::Added
            ]
        );
    }

    #[tokio::test]
    async fn headers_are_fixed_by_the_first_record() {
        let store = SqliteSheetStore::open_memory().await.unwrap();
        ingest_batch(&store, &[record("A", "2026/01/01", "X", 10)])
            .await
            .unwrap();

        assert_eq!(
            store.headers("A").await.unwrap(),
            Some(vec![
                "date".to_string(),
                "description".to_string(),
                "amount".to_string(),
                "ImportedAt".to_string()
            ])
        );

        // A later record with an extra field still ingests; the extra field
        // is dropped from storage, not added as a column.
        let extra = record("A", "2026/01/02", "Y", 20).with_field("service", "S");
        let report = ingest_batch(&store, &[extra]).await.unwrap();
        assert_eq!(report.added_count, 1);
        let rows = store.rows("A").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].len(), 4);

        // A record missing a header field writes that cell empty.
        let missing = TransactionRecord::new("A")
            .with_field("date", "2026/01/03")
            .with_field("amount", 30);
        ingest_batch(&store, &[missing]).await.unwrap();
        let rows = store.rows("A").await.unwrap();
        assert_eq!(rows[2][1], "");
    }

    #[tokio::test]
    async fn dash_and_slash_dates_are_duplicates() {
        let store = SqliteSheetStore::open_memory().await.unwrap();
        let first = ingest_batch(&store, &[record("A", "2026-01-01", "X", 10)])
            .await
            .unwrap();
        assert_eq!(first.added_count, 1);

        let second = ingest_batch(&store, &[record("A", "2026/01/01", "X", 10)])
            .await
            .unwrap();
        assert_eq!(second.added_count, 0);
        assert_eq!(second.outcomes, vec![RecordOutcome::Skipped]);
    }

    #[tokio::test]
    async fn stored_cells_keep_raw_values() {
        let store = SqliteSheetStore::open_memory().await.unwrap();
        let batch = vec![TransactionRecord::new("A")
            .with_field("date", "2026-01-01")
            .with_field("amount", 10)
            .with_field("isCancellation", false)];
        ingest_batch(&store, &batch).await.unwrap();

        let rows = store.rows("A").await.unwrap();
        assert_eq!(rows[0][0], "2026-01-01");
        assert_eq!(rows[0][1], "10");
        assert_eq!(rows[0][2], "false");
        // ImportedAt is stamped, never empty.
        assert!(!rows[0][3].is_empty());
    }

    #[test]
    fn parse_batch_accepts_records_and_defaults_site() {
        let payload = json!([
            {"site": "A", "date": "2026/01/01", "amount": 10},
            {"date": "2026/01/02", "amount": 20}
        ]);
        let batch = parse_batch(&payload).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].site(), "A");
        assert_eq!(batch[1].site(), "unknown");
        let keys: Vec<&str> = batch[0].keys().collect();
        assert_eq!(keys, vec!["date", "amount"]);
    }

    #[test]
    fn parse_batch_rejects_non_arrays_and_non_objects() {
        assert!(matches!(
            parse_batch(&json!({"site": "A"})),
            Err(IngestError::MalformedBatch(_))
        ));
        assert!(matches!(
            parse_batch(&json!(["record"])),
            Err(IngestError::MalformedBatch(_))
        ));
        assert!(matches!(
            parse_batch(&json!([{"site": 7}])),
            Err(IngestError::MalformedBatch(_))
        ));
    }

    #[test]
    fn signatures_ignore_the_site_field() {
        let a = record("A", "2026/01/01", "X", 10);
        let b = record("B", "2026/01/01", "X", 10);
        assert_eq!(record_signature(&a), record_signature(&b));
    }
}
