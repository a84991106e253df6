//! Connection handling and statement execution against PostgreSQL.
//!
//! One connection is checked out per operation and returned to the pool when
//! the handle drops, on every exit path. Database failures are classified
//! here, from the SQLSTATE code, never from message text.

use crate::error::ApiError;
use crate::sql::{column_type_lookup, expand_placeholders, SqlParam};
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::{Column, Row};

/// Entry point to the database. Cheap to clone; all state lives in the pool.
#[derive(Clone)]
pub struct Gateway {
    pool: PgPool,
}

impl Gateway {
    pub fn new(pool: PgPool) -> Self {
        Gateway { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out a connection scoped to one operation. Dropping the handle
    /// returns the connection exactly once, error paths included.
    pub async fn open(&self) -> Result<GatewayConnection, ApiError> {
        let conn = self.pool.acquire().await.map_err(classify_db_error)?;
        Ok(GatewayConnection { conn })
    }
}

/// A checked-out connection. Released on drop.
pub struct GatewayConnection {
    conn: PoolConnection<Postgres>,
}

impl GatewayConnection {
    /// Run a SELECT-like statement; returns normalized rows. Zero rows is an
    /// empty vec, not an error.
    pub async fn execute_query(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Value>, ApiError> {
        let (expanded, ordered) = expand_placeholders(sql, params)?;
        tracing::debug!(sql = %expanded, params = ?ordered, "query");
        let mut query = sqlx::query(&expanded);
        for value in &ordered {
            query = query.bind((*value).clone());
        }
        let rows = query
            .fetch_all(self.conn.as_mut())
            .await
            .map_err(classify_db_error)?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    /// Run a mutating statement; returns the affected-row count.
    pub async fn execute_command(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<u64, ApiError> {
        let (expanded, ordered) = expand_placeholders(sql, params)?;
        tracing::debug!(sql = %expanded, params = ?ordered, "command");
        let mut query = sqlx::query(&expanded);
        for value in &ordered {
            query = query.bind((*value).clone());
        }
        let result = query
            .execute(self.conn.as_mut())
            .await
            .map_err(classify_db_error)?;
        Ok(result.rows_affected())
    }

    /// Declared type of a column, from `information_schema.columns`.
    pub async fn describe_column(
        &mut self,
        table: &str,
        column: &str,
    ) -> Result<String, ApiError> {
        let q = column_type_lookup(table, column);
        let rows = self.execute_query(&q.sql, &q.params).await?;
        let declared = rows
            .first()
            .and_then(|row| row.get("data_type"))
            .and_then(Value::as_str)
            .map(str::to_string);
        declared.ok_or_else(|| {
            ApiError::NotFound("No se pudo determinar el tipo de dato".to_string())
        })
    }
}

/// Map a driver error onto the API taxonomy using the SQLSTATE code:
/// undefined table/column is a not-found, any integrity violation is a
/// conflict, everything else an opaque backend failure. Full detail stays in
/// the server log.
fn classify_db_error(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db) = &e {
        if let Some(code) = db.code() {
            if code == "42P01" || code == "42703" {
                tracing::debug!(code = %code, error = %db, "object not found");
                return ApiError::NotFound(
                    "No se encontró el objeto solicitado en la base de datos".to_string(),
                );
            }
            if code.starts_with("23") {
                tracing::debug!(code = %code, error = %db, "constraint violation");
                return ApiError::Conflict(
                    "La operación viola una restricción de la base de datos".to_string(),
                );
            }
        }
    }
    tracing::error!(error = %e, "database error");
    ApiError::Backend("Error interno del servidor".to_string())
}

fn row_to_json(row: &PgRow) -> Value {
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

/// Decode one cell into JSON. Database NULL and non-finite floats normalize
/// to null; date and timestamp values leave as ISO-8601 strings.
fn cell_to_value(row: &PgRow, name: &str) -> Value {
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(f64::from(n)) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(d)) = row.try_get::<Option<rust_decimal::Decimal>, _>(name) {
        if let Some(n) = d.to_f64().and_then(serde_json::Number::from_f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
