use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::onboarding::{Identity, RoleId, User, UserId};

const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role_id: Option<RoleId>,
    #[serde(default)]
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn for_user(user: &User, ttl: Duration) -> Result<Self> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| anyhow!("Token expiry out of range"))?;
        Ok(Self {
            sub: user.id.to_string(),
            role_id: user.role_id,
            is_admin: user.is_admin,
            iat: now.timestamp(),
            exp: expires.timestamp(),
            jti: Uuid::new_v4().to_string(),
        })
    }

    pub fn user_id(&self) -> Result<UserId> {
        self.sub
            .parse()
            .map_err(|e| anyhow!("Invalid subject '{}': {e}", self.sub))
    }

    pub fn identity(&self) -> Result<Identity> {
        Ok(Identity {
            user_id: self.user_id()?,
            role_id: self.role_id,
            is_admin: self.is_admin,
        })
    }
}

/// HS256 signer and verifier for session tokens.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtManager {
    pub fn from_secret(secret: &str, ttl_hours: i64) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "JWT secret must be at least {MIN_SECRET_LEN} characters"
            ));
        }
        if ttl_hours <= 0 {
            return Err(anyhow!("Token expiry must be positive, got {ttl_hours}h"));
        }
        let ttl = Duration::try_hours(ttl_hours)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| anyhow!("Token expiry of {ttl_hours}h is out of range"))?;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        self.encode_claims(&Claims::for_user(user, self.ttl)?)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to encode token: {e}"))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| anyhow!("Token validation failed: {e}"))
    }
}

pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
