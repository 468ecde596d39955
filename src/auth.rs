//! Authentication: password hashing and bearer tokens.
//!
//! Tokens are opaque random strings backed by the store with a fixed
//! lifetime; there is no refresh flow, callers log in again. The
//! [`CurrentUser`] extractor resolves `Authorization: Bearer` on every
//! protected route.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use rand::RngCore;

use crate::api::ApiState;
use crate::error::{Error, Result};
use crate::store::{Store, User};

/// Hash a password into PHC string format (Argon2id).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Validation(format!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

/// Mint an opaque token value.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Check credentials and issue a bearer token.
pub async fn login(
    store: &Store,
    username: &str,
    password: &str,
    ttl_hours: i64,
) -> Result<String> {
    let user = store
        .get_user_by_username(username)
        .await?
        .ok_or(Error::Unauthenticated)?;

    if !verify_password(password, &user.password_hash) {
        return Err(Error::Unauthenticated);
    }

    let token = generate_token();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);
    store.insert_token(&token, user.id, expires_at).await?;

    tracing::info!(username, "login succeeded");
    Ok(token)
}

/// The authenticated caller, resolved from the bearer token.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<ApiState>) -> Result<Self> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(Error::Unauthenticated)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(Error::Unauthenticated)?;

        let user = state
            .store
            .resolve_token(token, Utc::now())
            .await?
            .ok_or(Error::Unauthenticated)?;

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Role;
    use crate::store::test_store;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn tokens_are_opaque_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn login_issues_resolvable_token() {
        let store = test_store().await;
        let hash = hash_password("hunter2").unwrap();
        let user = store
            .insert_user("alice", "a@example.com", &hash, Role::Member)
            .await
            .unwrap();

        let token = login(&store, "alice", "hunter2", 24).await.unwrap();
        let resolved = store
            .resolve_token(&token, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let store = test_store().await;
        let hash = hash_password("hunter2").unwrap();
        store
            .insert_user("alice", "a@example.com", &hash, Role::Member)
            .await
            .unwrap();

        assert!(matches!(
            login(&store, "alice", "wrong", 24).await,
            Err(Error::Unauthenticated)
        ));
        assert!(matches!(
            login(&store, "nobody", "hunter2", 24).await,
            Err(Error::Unauthenticated)
        ));
    }
}
