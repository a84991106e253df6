//! Secret-field detection and password hashing.
//!
//! Payload keys that look like credentials are replaced by a salted Argon2id
//! hash before they reach the database; the PHC string embeds algorithm,
//! parameters, and salt. Plaintext and salt are never stored or logged.

use crate::error::ApiError;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde_json::{Map, Value};

/// Substrings that mark a payload key as a credential field.
const SECRET_KEY_HINTS: [&str; 4] = ["password", "contrasena", "passw", "clave"];

/// Prefix every hash produced by this module carries. A stored value without
/// it was not hashed here, which is a server configuration problem.
pub const HASH_MARKER: &str = "$argon2";

/// First payload key (document order) whose lowercase form contains a secret
/// hint. Only that one key is treated as a secret; any further matching keys
/// keep their literal values.
pub fn find_secret_key(payload: &Map<String, Value>) -> Option<&str> {
    payload.keys().map(String::as_str).find(|key| {
        let lower = key.to_lowercase();
        SECRET_KEY_HINTS.iter().any(|hint| lower.contains(hint))
    })
}

/// Hash a plaintext credential with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            ApiError::Backend("Error interno del servidor".to_string())
        })?;
    Ok(hash.to_string())
}

/// Check a presented password against a stored hash. A stored value without
/// the hash marker is a configuration error, not a caller mistake. Returns
/// `Ok(false)` on a plain mismatch; the comparison is constant-time inside
/// the verifier and never re-derives from a fresh salt.
pub fn verify_password(stored: &str, presented: &str) -> Result<bool, ApiError> {
    if !stored.starts_with(HASH_MARKER) {
        return Err(ApiError::Config(
            "La contraseña almacenada no es un hash válido".to_string(),
        ));
    }
    let parsed = PasswordHash::new(stored).map_err(|e| {
        tracing::error!(error = %e, "stored password hash does not parse");
        ApiError::Config("La contraseña almacenada no es un hash válido".to_string())
    })?;
    match Argon2::default().verify_password(presented.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => {
            tracing::error!(error = %e, "password verification failed");
            Err(ApiError::Config(
                "La contraseña almacenada no es un hash válido".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_the_first_secret_like_key_only() {
        let payload = json!({
            "email": "a@b.com",
            "password": "123",
            "clave": "456"
        });
        let map = payload.as_object().unwrap();
        assert_eq!(find_secret_key(map), Some("password"));
    }

    #[test]
    fn matches_hints_as_substrings_case_insensitive() {
        let payload = json!({"UserPassword": "x"});
        assert_eq!(
            find_secret_key(payload.as_object().unwrap()),
            Some("UserPassword")
        );
        let payload = json!({"email": "a@b.com"});
        assert_eq!(find_secret_key(payload.as_object().unwrap()), None);
    }

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("123").unwrap();
        assert!(hash.starts_with(HASH_MARKER));
        assert_ne!(hash, "123");
        assert!(verify_password(&hash, "123").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }

    #[test]
    fn each_hash_uses_a_fresh_salt() {
        let a = hash_password("123").unwrap();
        let b = hash_password("123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unrecognized_stored_value_is_a_config_error() {
        let err = verify_password("plaintext-never-hashed", "123").unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
