//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for caller-named
//! tables and columns.
//!
//! Identifiers cannot be carried by bind parameters, so table and column
//! names are interpolated into the SQL text; this is the trust boundary of a
//! table-generic API and is gated by [`IdentifierPolicy`]. Data values are
//! carried exclusively as named parameters, never interpolated.

use crate::error::ApiError;
use crate::sql::params::{BindValue, SqlParam};
use regex::Regex;
use std::sync::OnceLock;

/// Reserved placeholder for the key filter of UPDATE/DELETE/SELECT-by-key.
/// Kept distinct from payload-column placeholders by rejecting payloads that
/// use the same name.
pub const KEY_PLACEHOLDER: &str = "@key_value";

/// How table and column names supplied by the caller are checked before
/// interpolation. `Permissive` trusts the caller (the historical behavior of
/// this API); `Strict` requires plain `[A-Za-z_][A-Za-z0-9_]*` identifiers,
/// with an optional schema qualifier on table names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentifierPolicy {
    Permissive,
    Strict,
}

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

impl IdentifierPolicy {
    fn check_column(&self, name: &str) -> Result<(), ApiError> {
        match self {
            IdentifierPolicy::Permissive => Ok(()),
            IdentifierPolicy::Strict => {
                if ident_re().is_match(name) {
                    Ok(())
                } else {
                    Err(ApiError::InvalidInput(format!(
                        "Identificador no permitido: {}",
                        name
                    )))
                }
            }
        }
    }

    fn check_table(&self, name: &str) -> Result<(), ApiError> {
        match self {
            IdentifierPolicy::Permissive => Ok(()),
            IdentifierPolicy::Strict => {
                let mut parts = name.splitn(2, '.');
                let ok = match (parts.next(), parts.next()) {
                    (Some(first), None) => ident_re().is_match(first),
                    (Some(schema), Some(table)) => {
                        ident_re().is_match(schema) && ident_re().is_match(table)
                    }
                    _ => false,
                };
                if ok {
                    Ok(())
                } else {
                    Err(ApiError::InvalidInput(format!(
                        "Identificador no permitido: {}",
                        name
                    )))
                }
            }
        }
    }
}

/// SQL text plus the named parameters it references.
#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// `SELECT * FROM {table}`.
pub fn select_all(policy: IdentifierPolicy, table: &str) -> Result<QueryBuf, ApiError> {
    policy.check_table(table)?;
    Ok(QueryBuf {
        sql: format!("SELECT * FROM {}", table),
        params: Vec::new(),
    })
}

/// `SELECT * FROM {table} WHERE {key} = @key_value`. A date-typed value
/// compares against the date-cast form of the column so any stored
/// time-of-day is ignored.
pub fn select_by_key(
    policy: IdentifierPolicy,
    table: &str,
    key_column: &str,
    value: BindValue,
) -> Result<QueryBuf, ApiError> {
    policy.check_table(table)?;
    policy.check_column(key_column)?;
    let sql = if matches!(value, BindValue::Date(_)) {
        format!(
            "SELECT * FROM {} WHERE CAST({} AS DATE) = {}",
            table, key_column, KEY_PLACEHOLDER
        )
    } else {
        format!(
            "SELECT * FROM {} WHERE {} = {}",
            table, key_column, KEY_PLACEHOLDER
        )
    };
    Ok(QueryBuf {
        sql,
        params: vec![SqlParam::new(KEY_PLACEHOLDER, value)],
    })
}

/// `INSERT INTO {table} (c1, c2, …) VALUES (@c1, @c2, …)`, one placeholder
/// per column in payload order.
pub fn insert(
    policy: IdentifierPolicy,
    table: &str,
    payload: &[(String, BindValue)],
) -> Result<QueryBuf, ApiError> {
    policy.check_table(table)?;
    let mut columns = Vec::with_capacity(payload.len());
    let mut placeholders = Vec::with_capacity(payload.len());
    let mut params = Vec::with_capacity(payload.len());
    for (column, value) in payload {
        policy.check_column(column)?;
        let param = SqlParam::new(column, value.clone());
        placeholders.push(param.name.clone());
        columns.push(column.clone());
        params.push(param);
    }
    Ok(QueryBuf {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        ),
        params,
    })
}

/// `UPDATE {table} SET c1=@c1, … WHERE {key} = @key_value`. The key filter
/// uses the reserved placeholder; a payload column of the same name would
/// collide and is rejected.
pub fn update(
    policy: IdentifierPolicy,
    table: &str,
    payload: &[(String, BindValue)],
    key_column: &str,
    key_value: BindValue,
) -> Result<QueryBuf, ApiError> {
    policy.check_table(table)?;
    policy.check_column(key_column)?;
    let mut sets = Vec::with_capacity(payload.len());
    let mut params = Vec::with_capacity(payload.len() + 1);
    for (column, value) in payload {
        policy.check_column(column)?;
        let param = SqlParam::new(column, value.clone());
        if param.name == KEY_PLACEHOLDER {
            return Err(ApiError::InvalidInput(format!(
                "El nombre de columna {} está reservado",
                column
            )));
        }
        sets.push(format!("{}={}", column, param.name));
        params.push(param);
    }
    params.push(SqlParam::new(KEY_PLACEHOLDER, key_value));
    Ok(QueryBuf {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = {}",
            table,
            sets.join(", "),
            key_column,
            KEY_PLACEHOLDER
        ),
        params,
    })
}

/// `SELECT {column} FROM {table} WHERE {key} = @key_value`. Single-column
/// projection used for credential lookups.
pub fn select_column_by_key(
    policy: IdentifierPolicy,
    table: &str,
    column: &str,
    key_column: &str,
    key_value: BindValue,
) -> Result<QueryBuf, ApiError> {
    policy.check_table(table)?;
    policy.check_column(column)?;
    policy.check_column(key_column)?;
    Ok(QueryBuf {
        sql: format!(
            "SELECT {} FROM {} WHERE {} = {}",
            column, table, key_column, KEY_PLACEHOLDER
        ),
        params: vec![SqlParam::new(KEY_PLACEHOLDER, key_value)],
    })
}

/// `DELETE FROM {table} WHERE {key} = @key_value`.
pub fn delete(
    policy: IdentifierPolicy,
    table: &str,
    key_column: &str,
    key_value: BindValue,
) -> Result<QueryBuf, ApiError> {
    policy.check_table(table)?;
    policy.check_column(key_column)?;
    Ok(QueryBuf {
        sql: format!(
            "DELETE FROM {} WHERE {} = {}",
            table, key_column, KEY_PLACEHOLDER
        ),
        params: vec![SqlParam::new(KEY_PLACEHOLDER, key_value)],
    })
}

/// Metadata lookup for a column's declared type. Table and column names are
/// data here, so they travel as parameters like any other value.
pub fn column_type_lookup(table: &str, column: &str) -> QueryBuf {
    QueryBuf {
        sql: "SELECT data_type FROM information_schema.columns \
              WHERE table_name = @table_name AND column_name = @column_name"
            .to_string(),
        params: vec![
            SqlParam::new("@table_name", BindValue::String(table.to_string())),
            SqlParam::new("@column_name", BindValue::String(column.to_string())),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const P: IdentifierPolicy = IdentifierPolicy::Permissive;

    #[test]
    fn select_all_names_the_table() {
        let q = select_all(P, "usuario").unwrap();
        assert_eq!(q.sql, "SELECT * FROM usuario");
        assert!(q.params.is_empty());
    }

    #[test]
    fn select_by_key_never_embeds_the_value() {
        let hostile = "'; DROP TABLE x; --";
        let q = select_by_key(P, "usuario", "email", BindValue::String(hostile.into())).unwrap();
        assert!(!q.sql.contains(hostile));
        assert_eq!(q.sql, "SELECT * FROM usuario WHERE email = @key_value");
        assert_eq!(q.params.len(), 1);
        match &q.params[0].value {
            BindValue::String(s) => assert_eq!(s, hostile),
            other => panic!("expected string param, got {:?}", other),
        }
    }

    #[test]
    fn date_keys_compare_against_the_date_cast_column() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let q = select_by_key(P, "evento", "fecha", BindValue::Date(d)).unwrap();
        assert_eq!(
            q.sql,
            "SELECT * FROM evento WHERE CAST(fecha AS DATE) = @key_value"
        );
    }

    #[test]
    fn insert_places_one_placeholder_per_column_in_order() {
        let payload = vec![
            ("email".to_string(), BindValue::String("a@b.com".into())),
            ("edad".to_string(), BindValue::I64(30)),
        ];
        let q = insert(P, "usuario", &payload).unwrap();
        assert_eq!(
            q.sql,
            "INSERT INTO usuario (email, edad) VALUES (@email, @edad)"
        );
        assert_eq!(q.params.len(), 2);
        assert_eq!(q.params[0].name, "@email");
        assert_eq!(q.params[1].name, "@edad");
    }

    #[test]
    fn update_reserves_the_key_placeholder() {
        let payload = vec![("contrasena".to_string(), BindValue::String("x".into()))];
        let q = update(
            P,
            "usuario",
            &payload,
            "email",
            BindValue::String("a@b.com".into()),
        )
        .unwrap();
        assert_eq!(
            q.sql,
            "UPDATE usuario SET contrasena=@contrasena WHERE email = @key_value"
        );
        assert_eq!(q.params.last().unwrap().name, KEY_PLACEHOLDER);
    }

    #[test]
    fn update_rejects_a_column_that_collides_with_the_key_placeholder() {
        let payload = vec![("key_value".to_string(), BindValue::I64(1))];
        let err = update(P, "t", &payload, "id", BindValue::I64(2)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn delete_filters_by_the_key_parameter() {
        let q = delete(P, "usuario", "email", BindValue::String("a@b.com".into())).unwrap();
        assert_eq!(q.sql, "DELETE FROM usuario WHERE email = @key_value");
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn column_lookup_carries_names_as_parameters() {
        let q = column_type_lookup("usuario", "email");
        assert!(q.sql.contains("information_schema.columns"));
        assert!(!q.sql.contains("usuario"));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn strict_policy_rejects_hostile_identifiers() {
        let strict = IdentifierPolicy::Strict;
        assert!(select_all(strict, "usuario").is_ok());
        assert!(select_all(strict, "esquema.usuario").is_ok());
        assert!(select_all(strict, "usuario; DROP TABLE x").is_err());
        assert!(select_by_key(strict, "t", "col--", BindValue::I64(1)).is_err());
    }
}
