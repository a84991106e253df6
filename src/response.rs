//! Response envelope helpers: success is either the raw row list or a
//! `{"mensaje": ...}` acknowledgment; errors are `{"error": ...}`.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Mensaje {
    pub mensaje: String,
}

pub fn mensaje(text: &str) -> Json<Mensaje> {
    Json(Mensaje {
        mensaje: text.to_string(),
    })
}
