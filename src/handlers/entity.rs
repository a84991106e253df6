//! Entity handlers: list, get-by-key, create, update, delete,
//! verify-password, and the parametrized-query pass-through.
//!
//! The project path segment namespaces the API surface only; routing to a
//! table needs nothing but the table name.

use crate::error::ApiError;
use crate::response::{mensaje, Mensaje};
use crate::service::EntityService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

fn body_to_map(value: Value) -> Result<Map<String, Value>, ApiError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::InvalidInput(
            "El cuerpo de la solicitud debe ser un objeto JSON".to_string(),
        )),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path((_proyecto, tabla)): Path<(String, String)>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let rows = EntityService::list(&state.gateway, state.policy(), &tabla).await?;
    Ok(Json(rows))
}

pub async fn get_by_key(
    State(state): State<AppState>,
    Path((_proyecto, tabla, clave, valor)): Path<(String, String, String, String)>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let rows =
        EntityService::get_by_key(&state.gateway, state.policy(), &tabla, &clave, &valor).await?;
    Ok(Json(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Path((_proyecto, tabla)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Mensaje>, ApiError> {
    let payload = body_to_map(body)?;
    EntityService::create(&state.gateway, state.policy(), &tabla, &payload).await?;
    Ok(mensaje("Entidad creada exitosamente"))
}

pub async fn update(
    State(state): State<AppState>,
    Path((_proyecto, tabla, clave, valor)): Path<(String, String, String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Mensaje>, ApiError> {
    let payload = body_to_map(body)?;
    EntityService::update(&state.gateway, state.policy(), &tabla, &clave, &valor, &payload)
        .await?;
    Ok(mensaje("Entidad actualizada exitosamente"))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((_proyecto, tabla, clave, valor)): Path<(String, String, String, String)>,
) -> Result<Json<Mensaje>, ApiError> {
    EntityService::delete(&state.gateway, state.policy(), &tabla, &clave, &valor).await?;
    Ok(mensaje("Entidad eliminada exitosamente"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPasswordRequest {
    #[serde(default)]
    campo_usuario: Option<String>,
    #[serde(default)]
    campo_contrasena: Option<String>,
    #[serde(default)]
    valor_usuario: Option<String>,
    #[serde(default)]
    valor_contrasena: Option<String>,
}

pub async fn verify_password(
    State(state): State<AppState>,
    Path((_proyecto, tabla)): Path<(String, String)>,
    Json(body): Json<VerifyPasswordRequest>,
) -> Result<Json<Mensaje>, ApiError> {
    let missing = || {
        ApiError::InvalidInput(
            "El nombre de la tabla, el campo de usuario, el campo de contraseña, el valor de usuario y el valor de contraseña no pueden estar vacíos"
                .to_string(),
        )
    };
    let campo_usuario = body.campo_usuario.filter(|s| !s.is_empty()).ok_or_else(missing)?;
    let campo_contrasena = body
        .campo_contrasena
        .filter(|s| !s.is_empty())
        .ok_or_else(missing)?;
    let valor_usuario = body.valor_usuario.filter(|s| !s.is_empty()).ok_or_else(missing)?;
    let valor_contrasena = body
        .valor_contrasena
        .filter(|s| !s.is_empty())
        .ok_or_else(missing)?;
    if tabla.trim().is_empty() {
        return Err(missing());
    }

    let ok = EntityService::verify_password(
        &state.gateway,
        state.policy(),
        &tabla,
        &campo_usuario,
        &valor_usuario,
        &campo_contrasena,
        &valor_contrasena,
    )
    .await?;
    if ok {
        Ok(mensaje("Contraseña verificada exitosamente"))
    } else {
        Err(ApiError::Unauthorized("Contraseña incorrecta".to_string()))
    }
}

#[derive(Deserialize)]
pub struct RawQueryRequest {
    #[serde(default)]
    consulta: Option<String>,
    #[serde(default)]
    parametros: Option<Map<String, Value>>,
}

pub async fn run_query(
    State(state): State<AppState>,
    Path((_proyecto, _tabla)): Path<(String, String)>,
    Json(body): Json<RawQueryRequest>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let consulta = body.consulta.unwrap_or_default();
    let rows =
        EntityService::run_raw_query(&state.gateway, &consulta, body.parametros.as_ref()).await?;
    Ok(Json(rows))
}
