//! Connection pool gateway: `select` and `execute` over a bounded sqlx pool.
//!
//! Every call acquires one pooled connection for the duration of a single statement. The
//! `PoolConnection` guard returns it to the pool on every exit path, errors included.

use crate::config::{DatabaseConfig, WritePolicy};
use crate::error::AppError;
use crate::sql::{bind_all, Dialect};
use futures_util::{StreamExt, TryStreamExt};
use serde_json::{Map, Value};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::AnyPool;

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Clone, Debug)]
pub struct Database {
    pool: AnyPool,
    dialect: Dialect,
    write_policy: WritePolicy,
}

/// Create the pool and open `min_size` connections up front. A connection failure is
/// returned to the caller; there is no degraded mode.
pub async fn init_pool(config: &DatabaseConfig) -> Result<Database, AppError> {
    config.validate()?;
    let url = config.connect_url()?;
    let dialect = Dialect::from_url(&url)?;
    tracing::info!(%dialect, min = config.min_size, max = config.max_size, "create database connection pool...");
    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .min_connections(config.min_size)
        .max_connections(config.max_size)
        .connect(&url)
        .await?;
    Ok(Database {
        pool,
        dialect,
        write_policy: config.write_policy,
    })
}

impl Database {
    pub fn from_pool(pool: AnyPool, dialect: Dialect, write_policy: WritePolicy) -> Self {
        Database {
            pool,
            dialect,
            write_policy,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    /// Run a query and return at most `limit` rows (all rows when `None` or zero).
    pub async fn select(&self, sql: &str, args: &[Value], limit: Option<usize>) -> Result<Vec<Row>, AppError> {
        tracing::info!("SQL: {}", sql);
        tracing::debug!(args = ?args, "bind");
        let sql = self.dialect.rewrite_placeholders(sql);
        let mut conn = self.pool.acquire().await?;
        let query = bind_all(sqlx::query(&sql), args);
        let rows: Vec<AnyRow> = match limit.filter(|&n| n > 0) {
            Some(n) => query.fetch(&mut *conn).take(n).try_collect().await?,
            None => query.fetch_all(&mut *conn).await?,
        };
        tracing::info!("rows returned: {}", rows.len());
        Ok(rows.iter().map(row_to_json).collect())
    }

    /// Run a mutating statement and return the number of affected rows.
    pub async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, AppError> {
        tracing::info!("SQL: {}", sql);
        tracing::debug!(args = ?args, "bind");
        let sql = self.dialect.rewrite_placeholders(sql);
        let mut conn = self.pool.acquire().await?;
        let result = bind_all(sqlx::query(&sql), args).execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    /// Round-trip `select 1`; false when the database is unreachable.
    pub async fn ping(&self) -> bool {
        match sqlx::query("select 1").fetch_optional(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "database ping failed");
                false
            }
        }
    }
}

/// Apply the write policy to a mutation that should have touched exactly one row.
pub fn check_affected(policy: WritePolicy, op: &'static str, table: &str, affected: u64) -> Result<(), AppError> {
    if affected == 1 {
        return Ok(());
    }
    match policy {
        WritePolicy::Warn => {
            tracing::warn!("failed to {} record: affected rows: {} (table {})", op, affected, table);
            Ok(())
        }
        WritePolicy::Strict => Err(AppError::AffectedRows {
            op,
            table: table.to_string(),
            actual: affected,
        }),
    }
}

fn row_to_json(row: &AnyRow) -> Row {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, col.ordinal()));
    }
    map
}

fn cell_to_value(row: &AnyRow, idx: usize) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(idx) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(idx) {
        if let Some(n) = serde_json::Number::from_f64(f64::from(n)) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(idx) {
        return Value::Bool(b);
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(idx) {
        return Value::String(s);
    }
    if let Ok(Some(bytes)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return Value::String(String::from_utf8_lossy(&bytes).into_owned());
    }
    Value::Null
}
