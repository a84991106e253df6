//! Startup configuration: a `config.json` in the application-settings shape,
//! loaded once and immutable afterwards. `DATABASE_URL` overrides the
//! configured connection string when present.

use crate::error::ApiError;
use crate::sql::IdentifierPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    pub database_provider: String,
    #[serde(default)]
    pub connection_strings: HashMap<String, String>,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub strict_identifiers: bool,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JwtSettings {
    pub key: String,
    pub issuer: String,
    pub audience: String,
    #[serde(default)]
    pub enforce: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

impl Settings {
    /// Read settings from a JSON file. The file path usually comes from the
    /// `CONFIG_PATH` env var.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ApiError::Config(format!(
                "No se pudo cargar la configuración desde {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut settings: Settings = serde_json::from_str(&raw)
            .map_err(|e| ApiError::Config(format!("Configuración inválida: {}", e)))?;
        if let Ok(url) = std::env::var("DATABASE_URL") {
            settings
                .connection_strings
                .insert(settings.database_provider.clone(), url);
        }
        Ok(settings)
    }

    /// Connection string for the configured provider.
    pub fn connection_string(&self) -> Result<&str, ApiError> {
        if self.database_provider.trim().is_empty() {
            return Err(ApiError::Config(
                "Proveedor de base de datos no configurado".to_string(),
            ));
        }
        self.connection_strings
            .get(&self.database_provider)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::Config("La cadena de conexión es nula o vacía".to_string()))
    }

    pub fn identifier_policy(&self) -> IdentifierPolicy {
        if self.strict_identifiers {
            IdentifierPolicy::Strict
        } else {
            IdentifierPolicy::Permissive
        }
    }
}
