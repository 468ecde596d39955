//! Bearer token rows.
//!
//! Tokens are opaque and store-backed; resolving one past its expiry
//! deletes it.

use chrono::{DateTime, Utc};

use crate::error::Result;

use super::{Store, User};

impl Store {
    pub async fn insert_token(
        &self,
        token: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO tokens (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Resolve a token to its user, or `None` if unknown or expired.
    pub async fn resolve_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            "SELECT user_id, expires_at FROM tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some((user_id, expires_at)) = row else {
            return Ok(None);
        };

        if now > expires_at {
            sqlx::query("DELETE FROM tokens WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        self.get_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::policy::Role;
    use crate::store::test_store;

    #[tokio::test]
    async fn resolve_valid_and_expired() {
        let store = test_store().await;
        let user = store
            .insert_user("alice", "a@example.com", "h", Role::Member)
            .await
            .unwrap();

        let now = Utc::now();
        store
            .insert_token("tok-live", user.id, now + Duration::hours(24))
            .await
            .unwrap();
        store
            .insert_token("tok-dead", user.id, now - Duration::hours(1))
            .await
            .unwrap();

        let resolved = store.resolve_token("tok-live", now).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        assert!(store.resolve_token("tok-dead", now).await.unwrap().is_none());
        // Expired token was removed, not just rejected.
        assert!(store.resolve_token("tok-dead", now).await.unwrap().is_none());
        assert!(store.resolve_token("unknown", now).await.unwrap().is_none());
    }
}
