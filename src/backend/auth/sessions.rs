/**
 * Bearer Tokens
 *
 * HS256 JWTs carrying `Claims`. The server only verifies tokens; issuing is
 * here for tests and operator tooling.
 */

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::shared::{Claims, Identity};

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Build the claims for `identity`, valid for `ttl`
pub fn claims_for(identity: &Identity, ttl: Duration) -> Claims {
    let now = unix_now();
    let (is_bot, user_id, bot_space_id, bot_id, is_manager) = match *identity {
        Identity::Bot {
            bot_id,
            bot_space_id,
            is_manager,
        } => (true, None, Some(bot_space_id), Some(bot_id), is_manager),
        Identity::User { user_id } => (false, Some(user_id), None, None, false),
    };
    Claims {
        is_bot,
        user_id,
        bot_space_id,
        bot_id,
        is_manager,
        exp: now + ttl.as_secs(),
        iat: now,
    }
}

/// Sign a token for `identity`
pub fn create_token(
    identity: &Identity,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = claims_for(identity, ttl);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Verify signature and expiry and return the claims
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(token_data.claims)
}
