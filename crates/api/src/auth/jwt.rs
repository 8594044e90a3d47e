use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthConfig;
use crate::error::AppError;
use infra::models::UserRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User id
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, role: String, expiration_minutes: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::minutes(expiration_minutes as i64);

        Self {
            sub: user_id.to_string(),
            email,
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_minutes: u64,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiration_minutes: config.access_token_expiration_minutes,
        }
    }

    pub fn create_token(
        &self,
        user_id: Uuid,
        email: String,
        role: String,
    ) -> Result<String, AppError> {
        let claims = Claims::new(user_id, email, role, self.expiration_minutes);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    pub fn token_for(&self, user: &UserRow) -> Result<String, AppError> {
        self.create_token(user.id, user.email.clone(), user.role.as_str().to_string())
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> JwtService {
        JwtService::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            access_token_expiration_minutes: 5,
            verification_token_expiration_hours: 24,
            reset_token_expiration_minutes: 15,
            bcrypt_cost: 4,
            public_base_url: "http://localhost:8080".to_string(),
            frontend_base_url: "http://localhost:5173".to_string(),
        })
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let jwt = service("secret-a");
        let id = Uuid::new_v4();
        let token = jwt
            .create_token(id, "a@b.co".into(), "owner".into())
            .unwrap();

        let claims = jwt.verify_token(&token).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.role, "owner");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = service("secret-a")
            .create_token(Uuid::new_v4(), "a@b.co".into(), "player".into())
            .unwrap();

        assert!(matches!(
            service("secret-b").verify_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }
}
