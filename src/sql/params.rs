//! Named query parameters and the typed values they carry.
//!
//! Statements are built with `@name` placeholders; PostgreSQL only binds
//! positional `$n` arguments, so [`expand_placeholders`] rewrites the SQL
//! text immediately before execution. Values never travel through the SQL
//! text itself.

use crate::error::ApiError;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// Prefix required on every placeholder name.
pub const PARAM_PREFIX: char = '@';

/// A value that can be bound to a PostgreSQL query.
#[derive(Clone, Debug)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl<'q> Encode<'q, Postgres> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            BindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            BindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            BindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            BindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            BindValue::String(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
            BindValue::Date(d) => <NaiveDate as Encode<Postgres>>::encode_by_ref(d, buf)?,
            BindValue::DateTime(dt) => {
                <NaiveDateTime as Encode<Postgres>>::encode_by_ref(dt, buf)?
            }
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            BindValue::Null => PgTypeInfo::with_name("TEXT"),
            BindValue::Bool(_) => PgTypeInfo::with_name("BOOL"),
            BindValue::I64(_) => PgTypeInfo::with_name("INT8"),
            BindValue::F64(_) => PgTypeInfo::with_name("FLOAT8"),
            BindValue::String(_) => PgTypeInfo::with_name("TEXT"),
            BindValue::Date(_) => PgTypeInfo::with_name("DATE"),
            BindValue::DateTime(_) => PgTypeInfo::with_name("TIMESTAMP"),
        })
    }
}

impl sqlx::Type<Postgres> for BindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

/// One named parameter, scoped to a single statement execution.
#[derive(Clone, Debug)]
pub struct SqlParam {
    pub name: String,
    pub value: BindValue,
}

impl SqlParam {
    /// Build a parameter, normalizing the name to carry the `@` prefix.
    pub fn new(name: &str, value: BindValue) -> Self {
        let name = if name.starts_with(PARAM_PREFIX) {
            name.to_string()
        } else {
            format!("{}{}", PARAM_PREFIX, name)
        };
        SqlParam { name, value }
    }
}

/// Rewrite `@name` placeholders as `$n` and return the bind values in
/// positional order. Repeated names reuse their position; a placeholder with
/// no matching parameter is rejected. Single-quoted literals are left alone
/// so free-form statements with `@` inside string constants survive.
pub fn expand_placeholders<'a>(
    sql: &str,
    params: &'a [SqlParam],
) -> Result<(String, Vec<&'a BindValue>), ApiError> {
    let mut out = String::with_capacity(sql.len());
    let mut ordered: Vec<&BindValue> = Vec::new();
    let mut positions: Vec<(&str, usize)> = Vec::new();
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            out.push(c);
            // copy the quoted literal verbatim, honoring '' escapes
            while let Some((_, qc)) = chars.next() {
                out.push(qc);
                if qc == '\'' {
                    match chars.peek() {
                        Some(&(_, '\'')) => {
                            chars.next();
                            out.push('\'');
                        }
                        _ => break,
                    }
                }
            }
            continue;
        }
        if c == PARAM_PREFIX {
            let start = i + c.len_utf8();
            let mut end = start;
            while let Some(&(j, nc)) = chars.peek() {
                if nc.is_ascii_alphanumeric() || nc == '_' {
                    end = j + nc.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            if end == start {
                out.push(c);
                continue;
            }
            let token = &sql[i..end];
            let position = match positions.iter().find(|(name, _)| *name == token) {
                Some((_, pos)) => *pos,
                None => {
                    let param = params.iter().find(|p| p.name == token).ok_or_else(|| {
                        ApiError::InvalidInput(format!(
                            "No se proporcionó un valor para el parámetro {}",
                            token
                        ))
                    })?;
                    ordered.push(&param.value);
                    let pos = ordered.len();
                    positions.push((token, pos));
                    pos
                }
            };
            out.push('$');
            out.push_str(&position.to_string());
            continue;
        }
        out.push(c);
    }

    Ok((out, ordered))
}
