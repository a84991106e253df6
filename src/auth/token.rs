//! JWT issuance and validation (HS256).

use crate::error::ApiError;
use crate::settings::JwtSettings;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token lifetime.
const TOKEN_TTL_HOURS: i64 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
}

impl TokenService {
    pub fn new(settings: &JwtSettings) -> Self {
        TokenService {
            encoding: EncodingKey::from_secret(settings.key.as_bytes()),
            decoding: DecodingKey::from_secret(settings.key.as_bytes()),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
        }
    }

    /// Issue a bearer token for a subject. Each token carries a unique `jti`
    /// and expires after two hours.
    pub fn issue(&self, subject: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "token encoding failed");
            ApiError::Config("La clave JWT no está configurada correctamente".to_string())
        })
    }

    /// Validate signature, expiry, issuer, and audience.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                ApiError::Unauthorized("Token inválido o expirado".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&JwtSettings {
            key: "una-clave-de-prueba-suficientemente-larga".to_string(),
            issuer: "tablegate-test".to_string(),
            audience: "tablegate-clients".to_string(),
            enforce: false,
        })
    }

    #[test]
    fn issue_then_validate_round_trips() {
        let svc = service();
        let token = svc.issue("admin@empresa.com").unwrap();
        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims.sub, "admin@empresa.com");
        assert_eq!(claims.iss, "tablegate-test");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tokens_get_unique_ids() {
        let svc = service();
        let a = svc.validate(&svc.issue("u").unwrap()).unwrap();
        let b = svc.validate(&svc.issue("u").unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn garbage_and_wrong_key_tokens_are_rejected() {
        let svc = service();
        assert!(matches!(
            svc.validate("not-a-token"),
            Err(ApiError::Unauthorized(_))
        ));
        let other = TokenService::new(&JwtSettings {
            key: "otra-clave-distinta-para-firmar-tokens".to_string(),
            issuer: "tablegate-test".to_string(),
            audience: "tablegate-clients".to_string(),
            enforce: false,
        });
        let token = other.issue("u").unwrap();
        assert!(matches!(
            svc.validate(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
