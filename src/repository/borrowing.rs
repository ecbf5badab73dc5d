//! Borrowing ledger backed by PostgreSQL

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};

use crate::{
    error::AppResult,
    models::{Book, BorrowRecord, BorrowRecordDetails, UserSummary},
};

use super::{Ledger, LedgerSession};

const BOOK_COLUMNS: &str = "id, title, isbn, author_id, genre_id, publisher_id, publish_date, \
                            COALESCE(available, FALSE) AS available";

const RECORD_COLUMNS: &str = "id, book_id, user_id, borrow_date, return_date";

#[derive(Clone)]
pub struct BorrowingRepository {
    pool: Pool<Postgres>,
}

impl BorrowingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Ledger for BorrowingRepository {
    type Session = PgLedgerSession;

    async fn begin(&self) -> AppResult<PgLedgerSession> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerSession { tx })
    }

    async fn find_book(&self, book_id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn history_for_book(&self, book_id: i32) -> AppResult<Vec<BorrowRecordDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT h.id, h.borrow_date, h.return_date,
                   u.id AS user_id, u.username,
                   b.id AS book_id, b.title, b.isbn, b.author_id, b.genre_id,
                   b.publisher_id, b.publish_date,
                   COALESCE(b.available, FALSE) AS available
            FROM borrowing_history h
            JOIN users u ON u.id = h.user_id
            JOIN books b ON b.id = h.book_id
            WHERE h.book_id = $1
            ORDER BY h.borrow_date, h.id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(details_from_row).collect())
    }
}

fn details_from_row(row: &PgRow) -> BorrowRecordDetails {
    BorrowRecordDetails {
        id: row.get("id"),
        user: UserSummary {
            id: row.get("user_id"),
            username: row.get("username"),
        },
        book: Book {
            id: row.get("book_id"),
            title: row.get("title"),
            isbn: row.get("isbn"),
            author_id: row.get("author_id"),
            genre_id: row.get("genre_id"),
            publisher_id: row.get("publisher_id"),
            publish_date: row.get("publish_date"),
            available: row.get("available"),
        },
        borrow_date: row.get("borrow_date"),
        return_date: row.get("return_date"),
    }
}

/// Ledger session wrapping one database transaction
pub struct PgLedgerSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerSession for PgLedgerSession {
    async fn lock_user(&mut self, user_id: i32) -> AppResult<Option<UserSummary>> {
        let user = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn find_book(&mut self, book_id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR SHARE",
            BOOK_COLUMNS
        ))
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(book)
    }

    async fn find_active(&mut self, user_id: i32, book_id: i32) -> AppResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            r#"
            SELECT {} FROM borrowing_history
            WHERE user_id = $1 AND book_id = $2 AND return_date IS NULL
            ORDER BY id
            LIMIT 1
            "#,
            RECORD_COLUMNS
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(record)
    }

    async fn count_active(&mut self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowing_history WHERE user_id = $1 AND return_date IS NULL",
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn insert(
        &mut self,
        user_id: i32,
        book_id: i32,
        borrow_date: NaiveDate,
    ) -> AppResult<BorrowRecord> {
        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            r#"
            INSERT INTO borrowing_history (book_id, user_id, borrow_date)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(book_id)
        .bind(user_id)
        .bind(borrow_date)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(record)
    }

    async fn close(&mut self, record_id: i32, return_date: NaiveDate) -> AppResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            r#"
            UPDATE borrowing_history SET return_date = $2
            WHERE id = $1 AND return_date IS NULL
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(record_id)
        .bind(return_date)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(record)
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
