//! User rows and queries.

use serde::Serialize;
use sqlx::FromRow;

use crate::error::Result;
use crate::policy::Role;

use super::Store;

/// A registered account. The password hash never leaves the service.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
}

impl Store {
    pub async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User> {
        let id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
        })
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, role FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, role FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, role FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Update profile fields; `password_hash` only when a new password was
    /// supplied.
    pub async fn update_user(
        &self,
        id: i64,
        email: &str,
        password_hash: Option<&str>,
        role: Role,
    ) -> Result<Option<User>> {
        let result = if let Some(hash) = password_hash {
            sqlx::query("UPDATE users SET email = ?, password_hash = ?, role = ? WHERE id = ?")
                .bind(email)
                .bind(hash)
                .bind(role)
                .bind(id)
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("UPDATE users SET email = ?, role = ? WHERE id = ?")
                .bind(email)
                .bind(role)
                .bind(id)
                .execute(&self.pool)
                .await?
        };

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_store;

    #[tokio::test]
    async fn insert_and_lookup() {
        let store = test_store().await;
        let user = store
            .insert_user("alice", "alice@example.com", "hash", Role::Member)
            .await
            .unwrap();

        let by_id = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.role, Role::Member);

        let by_name = store.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);

        assert!(store.get_user_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn username_is_unique() {
        let store = test_store().await;
        store
            .insert_user("alice", "a@example.com", "h1", Role::Member)
            .await
            .unwrap();
        let dup = store
            .insert_user("alice", "b@example.com", "h2", Role::Member)
            .await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn update_keeps_password_when_not_supplied() {
        let store = test_store().await;
        let user = store
            .insert_user("alice", "a@example.com", "original", Role::Member)
            .await
            .unwrap();

        let updated = store
            .update_user(user.id, "new@example.com", None, Role::Librarian)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.role, Role::Librarian);
        assert_eq!(updated.password_hash, "original");

        assert!(store
            .update_user(9999, "x@example.com", None, Role::Member)
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn password_hash_is_write_only() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: "a@example.com".into(),
            password_hash: "secret".into(),
            role: Role::Member,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"role\":\"member\""));
    }
}
