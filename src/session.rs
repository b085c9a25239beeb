//! Bearer-token session resolution.
//!
//! Tokens are HS256 JWTs whose subject is the staff login. The service only
//! verifies tokens; it does not expose a login flow. Tokens are minted by
//! the operator tooling (and by tests) through [`create_token`].

use crate::db::get_db_pool;
use crate::orm::users;
use crate::user::Actor;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

static KEYS: Lazy<Keys> = Lazy::new(|| {
    let secret = crate::app_config::auth().secret;

    let secret = if secret.is_empty() {
        let random_string: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        log::warn!(
            "MURAJAAT_AUTH_SECRET is not set. A random signing key was generated, so every issued token invalidates when the application restarts."
        );
        random_string
    } else {
        secret
    };

    Keys {
        encoding: EncodingKey::from_secret(secret.as_bytes()),
        decoding: DecodingKey::from_secret(secret.as_bytes()),
    }
});

/// Token claims: staff login and expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Initialize the signing keys. Should be called early in startup so a
/// missing secret is reported before the first request.
pub fn init() {
    Lazy::force(&KEYS);
}

/// Mint a token for a staff login, valid for the configured lifetime.
pub fn create_token(login: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let ttl = chrono::Duration::minutes(crate::app_config::auth().token_ttl_minutes);

    let claims = Claims {
        sub: login.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(&Header::default(), &claims, &KEYS.encoding)
}

/// Verify a token and return its claims, or None for any invalid token.
pub fn decode_token(token: &str) -> Option<Claims> {
    decode::<Claims>(token, &KEYS.decoding, &Validation::default())
        .map(|data| data.claims)
        .ok()
}

/// Resolve a bearer token to the active staff member it belongs to.
pub async fn authenticate_by_token(token: &str) -> Option<Actor> {
    let claims = decode_token(token)?;
    let db = get_db_pool();

    let user = users::Entity::find()
        .filter(users::Column::Login.eq(claims.sub.as_str()))
        .filter(users::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(|e| log::error!("User lookup failed during authentication: {}", e))
        .ok()??;

    Some(Actor::from(user))
}
