use crate::config::Config;
use crate::db::Db;
use crate::errors::ApiError;
use crate::models::user::User;
use crate::social::identity;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use argon2::password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
}

pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|_| ApiError::Internal)?
        .to_string())
}

pub fn verify_password(hash: &str, plain: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

pub fn create_access_token(user_id: &str, ttl: Duration, cfg: &Config) -> Result<String, ApiError> {
    let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret_bytes()),
    )
    .map_err(|_| ApiError::Internal)
}

/// Returns the token subject; bad signatures and expired tokens are both `Unauthorized`.
pub fn verify_access_token(token: &str, cfg: &Config) -> Result<String, ApiError> {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    v.leeway = 0;
    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(cfg.jwt_secret_bytes()), &v)
        .map(|data| data.claims.sub)
        .map_err(|_| ApiError::Unauthorized)
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub async fn require_user(db: &Db, cfg: &Config, token: Option<&str>) -> Result<User, ApiError> {
    let token = token.ok_or(ApiError::Unauthorized)?;
    let user_id = verify_access_token(token, cfg)?;
    match identity::find_by_id(db, &user_id).await? {
        Some(user) => Ok(user),
        None => {
            log::info!("token subject {user_id} no longer maps to a user");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Like `require_user`, but a missing or unusable token yields `None`.
/// Only store failures are reported as errors.
pub async fn optional_user(db: &Db, cfg: &Config, token: Option<&str>) -> Result<Option<User>, ApiError> {
    match require_user(db, cfg, token).await {
        Ok(user) => Ok(Some(user)),
        Err(ApiError::Unauthorized) => Ok(None),
        Err(e) => Err(e),
    }
}

fn app_state(req: &HttpRequest) -> Result<(web::Data<Config>, web::Data<Db>), ApiError> {
    let cfg = req.app_data::<web::Data<Config>>().cloned();
    let db = req.app_data::<web::Data<Db>>().cloned();
    match (cfg, db) {
        (Some(cfg), Some(db)) => Ok((cfg, db)),
        _ => {
            log::error!("Config or Db missing from app data");
            Err(ApiError::Internal)
        }
    }
}

/// The authenticated caller. Extraction fails with 401 when no valid token maps to a user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = bearer_token(req);
        Box::pin(async move {
            let (cfg, db) = state?;
            let user = require_user(&db, &cfg, token.as_deref()).await?;
            Ok(AuthUser { user })
        })
    }
}

/// The caller if a valid token was presented, otherwise anonymous.
#[derive(Debug, Clone)]
pub struct MaybeUser {
    pub user: Option<User>,
}

impl FromRequest for MaybeUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = bearer_token(req);
        Box::pin(async move {
            let (cfg, db) = state?;
            let user = optional_user(&db, &cfg, token.as_deref()).await?;
            Ok(MaybeUser { user })
        })
    }
}
