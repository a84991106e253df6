//! Table-generic entity operations.
//!
//! Every operation checks its inputs, asks the builder for SQL plus named
//! parameters, and runs the statement over one gateway connection scoped to
//! the call. Key lookups resolve the column's declared type first and coerce
//! the raw path value into a typed parameter before filtering.

use crate::auth::{find_secret_key, hash_password, verify_password};
use crate::coerce::{coerce, normalize_json_scalar, ColumnType};
use crate::db::{Gateway, GatewayConnection};
use crate::error::ApiError;
use crate::sql::{self, BindValue, IdentifierPolicy, SqlParam};
use serde_json::{Map, Value};

pub struct EntityService;

impl EntityService {
    /// All rows of a table, normalized.
    pub async fn list(
        gateway: &Gateway,
        policy: IdentifierPolicy,
        table: &str,
    ) -> Result<Vec<Value>, ApiError> {
        if table.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "El nombre de la tabla no puede estar vacío".to_string(),
            ));
        }
        let q = sql::select_all(policy, table)?;
        let mut conn = gateway.open().await?;
        conn.execute_query(&q.sql, &q.params).await
    }

    /// Rows matching a single-key equality filter. The raw value is coerced
    /// according to the column's declared type; date keys match on the
    /// calendar date regardless of stored time-of-day.
    pub async fn get_by_key(
        gateway: &Gateway,
        policy: IdentifierPolicy,
        table: &str,
        key_column: &str,
        raw_value: &str,
    ) -> Result<Vec<Value>, ApiError> {
        if table.trim().is_empty() || key_column.trim().is_empty() || raw_value.is_empty() {
            return Err(ApiError::InvalidInput(
                "El nombre de la tabla, el nombre de la clave y el valor no pueden estar vacíos"
                    .to_string(),
            ));
        }
        let mut conn = gateway.open().await?;
        let value = coerce_key(&mut conn, table, key_column, raw_value).await?;
        let q = sql::select_by_key(policy, table, key_column, value)?;
        let rows = conn.execute_query(&q.sql, &q.params).await?;
        if rows.is_empty() {
            return Err(ApiError::NotFound(
                "No se encontraron registros".to_string(),
            ));
        }
        Ok(rows)
    }

    /// Insert one row from a JSON payload. Credential-like fields are hashed
    /// before the statement is built.
    pub async fn create(
        gateway: &Gateway,
        policy: IdentifierPolicy,
        table: &str,
        payload: &Map<String, Value>,
    ) -> Result<(), ApiError> {
        if table.trim().is_empty() || payload.is_empty() {
            return Err(ApiError::InvalidInput(
                "El nombre de la tabla y los datos de la entidad no pueden estar vacíos"
                    .to_string(),
            ));
        }
        let prepared = prepare_payload(payload)?;
        let q = sql::insert(policy, table, &prepared)?;
        let mut conn = gateway.open().await?;
        conn.execute_command(&q.sql, &q.params).await?;
        Ok(())
    }

    /// Update rows matching a single-key equality filter with a JSON
    /// payload, hashing credential-like fields the same way as create.
    pub async fn update(
        gateway: &Gateway,
        policy: IdentifierPolicy,
        table: &str,
        key_column: &str,
        raw_key: &str,
        payload: &Map<String, Value>,
    ) -> Result<(), ApiError> {
        if table.trim().is_empty() || key_column.trim().is_empty() || payload.is_empty() {
            return Err(ApiError::InvalidInput(
                "El nombre de la tabla, el nombre de la clave y los datos de la entidad no pueden estar vacíos"
                    .to_string(),
            ));
        }
        let prepared = prepare_payload(payload)?;
        let mut conn = gateway.open().await?;
        let key_value = coerce_key(&mut conn, table, key_column, raw_key).await?;
        let q = sql::update(policy, table, &prepared, key_column, key_value)?;
        conn.execute_command(&q.sql, &q.params).await?;
        Ok(())
    }

    /// Delete rows matching a single-key equality filter.
    pub async fn delete(
        gateway: &Gateway,
        policy: IdentifierPolicy,
        table: &str,
        key_column: &str,
        raw_key: &str,
    ) -> Result<(), ApiError> {
        if table.trim().is_empty() || key_column.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "El nombre de la tabla o el nombre de la clave no pueden estar vacíos".to_string(),
            ));
        }
        let mut conn = gateway.open().await?;
        let key_value = coerce_key(&mut conn, table, key_column, raw_key).await?;
        let q = sql::delete(policy, table, key_column, key_value)?;
        conn.execute_command(&q.sql, &q.params).await?;
        Ok(())
    }

    /// Check a presented password against the stored hash for a user row.
    /// `Ok(false)` is the normal mismatch verdict; a stored value that was
    /// never hashed by this system is a configuration error.
    pub async fn verify_password(
        gateway: &Gateway,
        policy: IdentifierPolicy,
        table: &str,
        user_column: &str,
        user_value: &str,
        password_column: &str,
        presented: &str,
    ) -> Result<bool, ApiError> {
        let q = sql::select_column_by_key(
            policy,
            table,
            password_column,
            user_column,
            BindValue::String(user_value.to_string()),
        )?;
        let mut conn = gateway.open().await?;
        let rows = conn.execute_query(&q.sql, &q.params).await?;
        let row = rows
            .first()
            .ok_or_else(|| ApiError::NotFound("Usuario no encontrado".to_string()))?;
        let stored = row
            .get(password_column)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ApiError::Config("La contraseña almacenada no es un hash válido".to_string())
            })?;
        verify_password(stored, presented)
    }

    /// Run caller-supplied SQL with named parameters. The text is executed
    /// as-is; this is a trusted-caller capability.
    pub async fn run_raw_query(
        gateway: &Gateway,
        sql_text: &str,
        params: Option<&Map<String, Value>>,
    ) -> Result<Vec<Value>, ApiError> {
        if sql_text.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "Debe proporcionar una consulta SQL válida en el cuerpo de la solicitud"
                    .to_string(),
            ));
        }
        let params: Vec<SqlParam> = params
            .map(|map| {
                map.iter()
                    .map(|(name, value)| SqlParam::new(name, normalize_json_scalar(value)))
                    .collect()
            })
            .unwrap_or_default();
        let mut conn = gateway.open().await?;
        let rows = conn.execute_query(sql_text, &params).await?;
        if rows.is_empty() {
            return Err(ApiError::NotFound(
                "No se encontraron resultados para la consulta proporcionada".to_string(),
            ));
        }
        Ok(rows)
    }
}

/// Resolve the key column's declared type and coerce the raw value into a
/// typed parameter.
async fn coerce_key(
    conn: &mut GatewayConnection,
    table: &str,
    key_column: &str,
    raw: &str,
) -> Result<BindValue, ApiError> {
    let declared = conn.describe_column(table, key_column).await?;
    tracing::debug!(table = %table, column = %key_column, declared = %declared, "column type");
    let ty = ColumnType::from_declared(&declared)?;
    Ok(coerce(ty, raw)?)
}

/// Normalize a JSON payload into ordered column/value pairs, replacing the
/// first credential-like field with its salted hash. Further matching keys
/// keep their literal values.
fn prepare_payload(payload: &Map<String, Value>) -> Result<Vec<(String, BindValue)>, ApiError> {
    let secret_key = find_secret_key(payload)
        .filter(|key| is_hashable(&payload[*key]))
        .map(str::to_string);
    let mut prepared = Vec::with_capacity(payload.len());
    for (column, value) in payload {
        let bind = if secret_key.as_deref() == Some(column.as_str()) {
            BindValue::String(hash_password(&plain_text_of(value))?)
        } else {
            normalize_json_scalar(value)
        };
        prepared.push((column.clone(), bind));
    }
    Ok(prepared)
}

fn is_hashable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn plain_text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HASH_MARKER;
    use serde_json::json;

    #[test]
    fn hashes_only_the_first_secret_like_field() {
        let payload = json!({
            "email": "a@b.com",
            "password": "123",
            "clave": "456"
        });
        let prepared = prepare_payload(payload.as_object().unwrap()).unwrap();
        assert_eq!(prepared.len(), 3);
        match &prepared[1].1 {
            BindValue::String(s) => {
                assert!(s.starts_with(HASH_MARKER));
                assert_ne!(s, "123");
            }
            other => panic!("expected hashed string, got {:?}", other),
        }
        // second secret-like key keeps its literal value
        match &prepared[2].1 {
            BindValue::String(s) => assert_eq!(s, "456"),
            other => panic!("expected literal string, got {:?}", other),
        }
    }

    #[test]
    fn preserves_payload_order() {
        let payload = json!({"b": 1, "a": 2, "c": 3});
        let prepared = prepare_payload(payload.as_object().unwrap()).unwrap();
        let names: Vec<&str> = prepared.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn empty_or_null_secrets_are_left_alone() {
        let payload = json!({"contrasena": null});
        let prepared = prepare_payload(payload.as_object().unwrap()).unwrap();
        assert!(matches!(prepared[0].1, BindValue::Null));

        let payload = json!({"contrasena": ""});
        let prepared = prepare_payload(payload.as_object().unwrap()).unwrap();
        match &prepared[0].1 {
            BindValue::String(s) => assert!(s.is_empty()),
            other => panic!("expected empty string, got {:?}", other),
        }
    }

    #[test]
    fn non_secret_values_are_normalized_not_hashed() {
        let payload = json!({"email": "a@b.com", "edad": 30});
        let prepared = prepare_payload(payload.as_object().unwrap()).unwrap();
        assert!(matches!(&prepared[0].1, BindValue::String(s) if s == "a@b.com"));
        assert!(matches!(prepared[1].1, BindValue::I64(30)));
    }
}
