//! Header-driven, append-only tabular persistence, one sheet per source.
//!
//! The store is a collaborator of the reconciliation engine, not part of it:
//! the engine only needs the contract below. The SQLite implementation maps
//! each sheet to its own table; the table's column list in creation order is
//! the sheet's header row, and data rows are TEXT cells in rowid order.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid sheet name: {0:?}")]
    InvalidSheetName(String),

    #[error("Sheet does not exist: {0}")]
    MissingSheet(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read/append contract over per-source sheets. Rows are append-only; there
/// is no update or delete.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// The sheet's ordered header row, or `None` if the sheet does not exist.
    async fn headers(&self, sheet: &str) -> StoreResult<Option<Vec<String>>>;

    /// Create a sheet whose header row is exactly `headers`, in order.
    async fn create_sheet(&self, sheet: &str, headers: &[String]) -> StoreResult<()>;

    /// All data rows in append order, cells aligned with the header row.
    async fn rows(&self, sheet: &str) -> StoreResult<Vec<Vec<String>>>;

    /// Append `rows` (cells in header order) as one batch write.
    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> StoreResult<()>;
}

pub struct SqliteSheetStore {
    pool: Pool<Sqlite>,
}

impl SqliteSheetStore {
    pub async fn open(path: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }
}

fn check_sheet_name(sheet: &str) -> StoreResult<()> {
    if sheet.trim().is_empty() {
        return Err(StoreError::InvalidSheetName(sheet.to_string()));
    }
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[async_trait]
impl SheetStore for SqliteSheetStore {
    async fn headers(&self, sheet: &str) -> StoreResult<Option<Vec<String>>> {
        check_sheet_name(sheet)?;

        let rows = sqlx::query("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
            .bind(sheet)
            .fetch_all(&self.pool)
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut headers = Vec::with_capacity(rows.len());
        for row in &rows {
            headers.push(row.try_get::<String, _>("name")?);
        }
        Ok(Some(headers))
    }

    async fn create_sheet(&self, sheet: &str, headers: &[String]) -> StoreResult<()> {
        check_sheet_name(sheet)?;
        if headers.is_empty() {
            return Err(StoreError::InvalidSheetName(sheet.to_string()));
        }

        let columns = headers
            .iter()
            .map(|h| format!("{} TEXT", quote_ident(h)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({columns})",
            quote_ident(sheet)
        );
        sqlx::query(&sql).execute(&self.pool).await?;

        tracing::debug!(sheet, columns = headers.len(), "sheet created");
        Ok(())
    }

    async fn rows(&self, sheet: &str) -> StoreResult<Vec<Vec<String>>> {
        let Some(headers) = self.headers(sheet).await? else {
            return Ok(Vec::new());
        };

        let columns = headers
            .iter()
            .map(|h| quote_ident(h))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM {} ORDER BY rowid",
            quote_ident(sheet)
        );
        let db_rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(db_rows.len());
        for db_row in &db_rows {
            let mut cells = Vec::with_capacity(headers.len());
            for i in 0..headers.len() {
                cells.push(db_row.try_get::<String, _>(i)?);
            }
            out.push(cells);
        }
        Ok(out)
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(headers) = self.headers(sheet).await? else {
            return Err(StoreError::MissingSheet(sheet.to_string()));
        };

        let columns = headers
            .iter()
            .map(|h| quote_ident(h))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=headers.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote_ident(sheet)
        );

        let mut tx = self.pool.begin().await?;
        for row in rows {
            let mut query = sqlx::query(&sql);
            for cell in row {
                query = query.bind(cell);
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        tracing::debug!(sheet, rows = rows.len(), "rows appended");
        Ok(())
    }
}
