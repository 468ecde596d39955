//! Category rows and queries.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::Result;

use super::Store;

/// Reference data; books hold a non-owning `category_id`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Create/update payload.
#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

impl Store {
    pub async fn insert_category(&self, name: &str) -> Result<Category> {
        let id = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Category {
            id,
            name: name.to_string(),
        })
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let category =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(category)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    pub async fn update_category(&self, id: i64, name: &str) -> Result<Option<Category>> {
        let result = sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_category(id).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::test_store;

    #[tokio::test]
    async fn crud_roundtrip() {
        let store = test_store().await;

        let fiction = store.insert_category("Fiction").await.unwrap();
        store.insert_category("History").await.unwrap();

        assert_eq!(store.list_categories().await.unwrap().len(), 2);

        let renamed = store
            .update_category(fiction.id, "Literary Fiction")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Literary Fiction");

        assert!(store.delete_category(fiction.id).await.unwrap());
        assert!(!store.delete_category(fiction.id).await.unwrap());
        assert!(store.get_category(fiction.id).await.unwrap().is_none());
    }
}
