use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use game_types::UserProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    pub name: Option<String>,
    pub preferred_username: Option<String>,
    pub email: Option<String>,
}

impl Claims {
    fn into_profile(self) -> Result<UserProfile, AuthError> {
        let id = Uuid::parse_str(&self.sub).map_err(|_| {
            tracing::warn!("Token subject '{}' is not a user id", self.sub);
            AuthError::InvalidSubject
        })?;
        Ok(UserProfile {
            id,
            display_name: self.name,
            username: self.preferred_username,
            email: self.email,
        })
    }
}

/// Turns bearer tokens into user profiles. Token issuance lives elsewhere.
pub struct AuthService {
    decoding_key: Option<DecodingKey>,
    dev_mode: bool,
}

impl AuthService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: Some(DecodingKey::from_secret(secret.as_bytes())),
            dev_mode: false,
        }
    }

    pub fn new_dev_mode() -> Self {
        Self {
            decoding_key: None,
            dev_mode: true,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<UserProfile, AuthError> {
        if self.dev_mode {
            return self.validate_dev_token(token);
        }

        let key = self.decoding_key.as_ref().ok_or(AuthError::NotConfigured)?;
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, key, &validation).map_err(|e| {
            tracing::warn!("JWT validation failed: {:?}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        token_data.claims.into_profile()
    }

    // Dev tokens are either "user_id:name" or a JWT whose payload is read
    // without checking the signature.
    fn validate_dev_token(&self, token: &str) -> Result<UserProfile, AuthError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() == 3 {
            let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
                .decode(parts[1].trim_end_matches('='))
                .map_err(|e| {
                    tracing::warn!("Failed to decode JWT payload in dev mode: {:?}", e);
                    AuthError::InvalidToken
                })?;
            let claims: Claims = serde_json::from_slice(&payload).map_err(|e| {
                tracing::warn!("Failed to parse JWT claims in dev mode: {:?}", e);
                AuthError::InvalidToken
            })?;
            return claims.into_profile();
        }

        let (id, name) = token.split_once(':').ok_or(AuthError::InvalidToken)?;
        let id = Uuid::parse_str(id.trim()).map_err(|_| AuthError::InvalidSubject)?;
        let name = name.trim();
        Ok(UserProfile {
            id,
            display_name: (!name.is_empty()).then(|| name.to_string()),
            username: None,
            email: None,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject is not a valid user id")]
    InvalidSubject,
    #[error("No signing secret configured")]
    NotConfigured,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn far_future() -> u64 {
        (chrono::Utc::now().timestamp() + 3600) as u64
    }

    fn signed(secret: &str, claims: &Claims) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn claims_for(id: Uuid, exp: u64) -> Claims {
        Claims {
            sub: id.to_string(),
            exp,
            name: Some("Ada".to_string()),
            preferred_username: Some("ada".to_string()),
            email: None,
        }
    }

    #[test]
    fn test_valid_hs256_token() {
        let auth = AuthService::new("s3cret");
        let id = Uuid::new_v4();
        let profile = auth.validate_token(&signed("s3cret", &claims_for(id, far_future()))).unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
        assert_eq!(profile.username.as_deref(), Some("ada"));
    }

    #[test]
    fn test_rejects_wrong_secret_and_expired() {
        let auth = AuthService::new("s3cret");
        let id = Uuid::new_v4();
        let forged = signed("other", &claims_for(id, far_future()));
        assert!(matches!(auth.validate_token(&forged), Err(AuthError::InvalidToken)));

        let expired = signed("s3cret", &claims_for(id, 1_000));
        assert!(matches!(auth.validate_token(&expired), Err(AuthError::TokenExpired)));
        assert!(matches!(auth.validate_token("garbage"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_dev_mode_tokens() {
        let auth = AuthService::new_dev_mode();
        let id = Uuid::new_v4();

        let profile = auth.validate_token(&format!("{}:Grace", id)).unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.resolved_display_name(), "Grace");

        // Signature is ignored in dev mode.
        let unsigned = signed("whatever", &claims_for(id, far_future()));
        assert_eq!(auth.validate_token(&unsigned).unwrap().id, id);

        assert!(auth.validate_token("no-separator").is_err());
        assert!(matches!(
            auth.validate_token("not-a-uuid:Name"),
            Err(AuthError::InvalidSubject)
        ));
    }
}
