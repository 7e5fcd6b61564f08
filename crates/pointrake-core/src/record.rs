use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn unknown_site() -> String {
    "unknown".to_string()
}

/// One extracted reward-point event.
///
/// A record is the `site` it came from plus an insertion-ordered set of flat
/// scalar fields. Field order is meaningful: the first record seen for a
/// source fixes that source's sheet headers, so extractors must emit the
/// same field set in the same order for every record in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default = "unknown_site")]
    site: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl TransactionRecord {
    #[must_use]
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn from_parts(site: String, fields: Map<String, Value>) -> Self {
        Self { site, fields }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn site(&self) -> &str {
        &self.site
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Field keys in insertion order, excluding `site`.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Field entries in insertion order, excluding `site`.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// How to render one record field: display label, field key, and whether
/// the column is numeric (right-aligned, thousands-grouped). Purely
/// presentational; the reconciliation engine never reads these.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnSpec {
    pub label: &'static str,
    pub key: &'static str,
    pub numeric: bool,
}

impl ColumnSpec {
    #[must_use]
    pub const fn new(label: &'static str, key: &'static str) -> Self {
        Self {
            label,
            key,
            numeric: false,
        }
    }

    #[must_use]
    pub const fn numeric(label: &'static str, key: &'static str) -> Self {
        Self {
            label,
            key,
            numeric: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_order_follows_insertion() {
        let record = TransactionRecord::new("A")
            .with_field("date", "2026/01/01")
            .with_field("description", "Foo")
            .with_field("amount", 10);

        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["date", "description", "amount"]);
    }

    #[test]
    fn serializes_flat_with_site_first() {
        let record = TransactionRecord::new("A")
            .with_field("date", "2026/01/01")
            .with_field("amount", 10);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"site":"A","date":"2026/01/01","amount":10}"#);
    }

    #[test]
    fn deserializes_wire_object_preserving_order() {
        let record: TransactionRecord =
            serde_json::from_str(r#"{"site":"A","b":1,"a":2,"c":3}"#).unwrap();

        assert_eq!(record.site(), "A");
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn missing_site_defaults_to_unknown() {
        let record: TransactionRecord = serde_json::from_str(r#"{"amount":5}"#).unwrap();
        assert_eq!(record.site(), "unknown");
    }
}
