//! Tablegate: table-agnostic REST API library over PostgreSQL.

pub mod auth;
pub mod coerce;
pub mod db;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;

pub use auth::TokenService;
pub use coerce::{coerce, normalize_json_scalar, ColumnType};
pub use db::Gateway;
pub use error::ApiError;
pub use routes::{auth_routes, common_routes, entity_routes};
pub use service::EntityService;
pub use settings::Settings;
pub use sql::IdentifierPolicy;
pub use state::AppState;
