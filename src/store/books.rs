//! Book rows and catalog queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::error::{Error, Result};

use super::Store;

/// Circulation status of a copy.
///
/// `Borrowed` iff exactly one open borrow record references the book; the
/// ledger maintains that invariant transactionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookStatus {
    Available,
    Borrowed,
    Reserved,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub category_id: i64,
    pub isbn: String,
    pub status: BookStatus,
}

/// Create/update payload.
#[derive(Debug, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub category_id: i64,
    pub isbn: String,
    #[serde(default)]
    pub status: Option<BookStatus>,
}

/// Catalog list parameters: substring search over title/author/ISBN,
/// status and category filters, whitelisted ordering.
#[derive(Debug, Default, Deserialize)]
pub struct BookFilter {
    pub search: Option<String>,
    pub status: Option<BookStatus>,
    pub category: Option<i64>,
    pub ordering: Option<String>,
}

const SELECT_BOOK: &str = "SELECT id, title, author, category_id, isbn, status FROM books";

impl Store {
    pub async fn insert_book(&self, input: &BookInput) -> Result<Book> {
        let status = input.status.unwrap_or(BookStatus::Available);
        let id = sqlx::query(
            "INSERT INTO books (title, author, category_id, isbn, status) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&input.title)
        .bind(&input.author)
        .bind(input.category_id)
        .bind(&input.isbn)
        .bind(status)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Book {
            id,
            title: input.title.clone(),
            author: input.author.clone(),
            category_id: input.category_id,
            isbn: input.isbn.clone(),
            status,
        })
    }

    pub async fn get_book(&self, id: i64) -> Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("{SELECT_BOOK} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    pub async fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("{SELECT_BOOK} WHERE isbn = ?"))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    pub async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("{SELECT_BOOK} WHERE 1 = 1"));

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{search}%");
            query.push(" AND (title LIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR author LIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR isbn LIKE ");
            query.push_bind(pattern);
            query.push(")");
        }

        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status);
        }

        if let Some(category) = filter.category {
            query.push(" AND category_id = ");
            query.push_bind(category);
        }

        // Ordering is a column name from the client; whitelist it rather
        // than interpolating.
        let order = match filter.ordering.as_deref() {
            None | Some("") => "id",
            Some("title") => "title",
            Some("-title") => "title DESC",
            Some("author") => "author",
            Some("-author") => "author DESC",
            Some(other) => {
                return Err(Error::Validation(format!("unknown ordering field: {other}")))
            }
        };
        query.push(format!(" ORDER BY {order}"));

        let books = query.build_query_as::<Book>().fetch_all(&self.pool).await?;
        Ok(books)
    }

    pub async fn update_book(&self, id: i64, input: &BookInput) -> Result<Option<Book>> {
        let current = match self.get_book(id).await? {
            Some(book) => book,
            None => return Ok(None),
        };
        let status = input.status.unwrap_or(current.status);

        sqlx::query(
            "UPDATE books SET title = ?, author = ?, category_id = ?, isbn = ?, status = ? WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.author)
        .bind(input.category_id)
        .bind(&input.isbn)
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_book(id).await
    }

    pub async fn delete_book(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
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

    async fn seed(store: &Store) -> i64 {
        let category = store.insert_category("Fiction").await.unwrap();
        for (title, author, isbn) in [
            ("Dune", "Frank Herbert", "9780441013593"),
            ("Hyperion", "Dan Simmons", "9780553283686"),
            ("Foundation", "Isaac Asimov", "9780553293357"),
        ] {
            store
                .insert_book(&BookInput {
                    title: title.into(),
                    author: author.into(),
                    category_id: category.id,
                    isbn: isbn.into(),
                    status: None,
                })
                .await
                .unwrap();
        }
        category.id
    }

    #[tokio::test]
    async fn search_matches_title_author_and_isbn() {
        let store = test_store().await;
        seed(&store).await;

        let by_title = store
            .list_books(&BookFilter {
                search: Some("dune".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Dune");

        let by_author = store
            .list_books(&BookFilter {
                search: Some("Asimov".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);

        let by_isbn = store
            .list_books(&BookFilter {
                search: Some("9780553283686".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_isbn[0].title, "Hyperion");
    }

    #[tokio::test]
    async fn filter_by_status_and_category() {
        let store = test_store().await;
        let category = seed(&store).await;

        let available = store
            .list_books(&BookFilter {
                status: Some(BookStatus::Available),
                category: Some(category),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(available.len(), 3);

        let borrowed = store
            .list_books(&BookFilter {
                status: Some(BookStatus::Borrowed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(borrowed.is_empty());
    }

    #[tokio::test]
    async fn ordering_is_whitelisted() {
        let store = test_store().await;
        seed(&store).await;

        let by_title = store
            .list_books(&BookFilter {
                ordering: Some("title".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_title[0].title, "Dune");
        assert_eq!(by_title[2].title, "Hyperion");

        let by_author_desc = store
            .list_books(&BookFilter {
                ordering: Some("-author".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_author_desc[0].author, "Isaac Asimov");

        let bad = store
            .list_books(&BookFilter {
                ordering: Some("id; DROP TABLE books".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(bad, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn isbn_is_unique() {
        let store = test_store().await;
        let category = store.insert_category("Fiction").await.unwrap();
        let input = BookInput {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            category_id: category.id,
            isbn: "9780441013593".into(),
            status: None,
        };
        store.insert_book(&input).await.unwrap();
        assert!(store.insert_book(&input).await.is_err());
    }
}
