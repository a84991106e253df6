//! Router construction.
//!
//! Entity routes are parameterized on project and table path segments; the
//! two named operations (`verificar-contrasena`,
//! `ejecutar-consulta-parametrizada`) take routing priority over the
//! key/value pair by segment count and static match.

use crate::auth::middleware::require_bearer;
use crate::handlers::{auth, entity};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

pub fn entity_routes(state: AppState) -> Router {
    let mut router = Router::new()
        .route(
            "/api/:proyecto/:tabla",
            get(entity::list).post(entity::create),
        )
        .route(
            "/api/:proyecto/:tabla/verificar-contrasena",
            post(entity::verify_password),
        )
        .route(
            "/api/:proyecto/:tabla/ejecutar-consulta-parametrizada",
            post(entity::run_query),
        )
        .route(
            "/api/:proyecto/:tabla/:clave/:valor",
            get(entity::get_by_key)
                .put(entity::update)
                .delete(entity::delete),
        )
        .with_state(state.clone());
    if state.settings.jwt.enforce {
        router = router.layer(middleware::from_fn_with_state(state, require_bearer));
    }
    router
}

pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/auth/token", post(auth::issue_token))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn welcome() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "mensaje": "Bienvenido a la API Genérica!",
        "documentacion": "Para más detalles, visita /version",
        "fecha_servidor": chrono::Utc::now().to_rfc3339()
    }))
}

async fn weather_forecast() -> Json<serde_json::Value> {
    Json(serde_json::json!([
        { "date": "2025-02-27", "temperatureC": 12, "summary": "Chilly", "temperatureF": 53 },
        { "date": "2025-02-28", "temperatureC": 4, "summary": "Cool", "temperatureF": 39 },
        { "date": "2025-03-01", "temperatureC": 13, "summary": "Mild", "temperatureF": 55 },
        { "date": "2025-03-02", "temperatureC": -8, "summary": "Mild", "temperatureF": 18 },
        { "date": "2025-03-03", "temperatureC": 44, "summary": "Hot", "temperatureF": 111 }
    ]))
}

/// Routes with no state: welcome, sample data, health, version.
pub fn common_routes() -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/weatherforecast", get(weather_forecast))
        .route("/health", get(health))
        .route("/version", get(version))
}
