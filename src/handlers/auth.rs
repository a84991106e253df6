//! Token issuance handler.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    usuario: Option<String>,
}

pub async fn issue_token(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> Result<Json<Value>, ApiError> {
    let usuario = body
        .usuario
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("El usuario no puede estar vacío".to_string()))?;
    let token = state.tokens.issue(&usuario)?;
    Ok(Json(json!({ "token": token })))
}
