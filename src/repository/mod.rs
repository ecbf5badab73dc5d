//! Repository layer for database operations

pub mod borrowing;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, BorrowRecord, BorrowRecordDetails, UserSummary},
};

/// Store of books and borrowing history that hands out transactional sessions.
#[async_trait]
pub trait Ledger: Send + Sync {
    type Session: LedgerSession;

    /// Open a transactional unit of work
    async fn begin(&self) -> AppResult<Self::Session>;

    /// Get a book by ID outside of any session
    async fn find_book(&self, book_id: i32) -> AppResult<Option<Book>>;

    /// Every ledger record of a book, oldest first
    async fn history_for_book(&self, book_id: i32) -> AppResult<Vec<BorrowRecordDetails>>;
}

/// One transaction against the ledger.
///
/// Nothing written through a session is visible to others until
/// [`LedgerSession::commit`]. Dropping a session without committing discards
/// its writes.
#[async_trait]
pub trait LedgerSession: Send {
    /// Lock the user for the rest of the session and return it.
    ///
    /// Sessions locking the same user run one after the other, which makes
    /// the read-then-write borrow checks atomic per user.
    async fn lock_user(&mut self, user_id: i32) -> AppResult<Option<UserSummary>>;

    /// Get a book; its availability cannot change until the session ends
    async fn find_book(&mut self, book_id: i32) -> AppResult<Option<Book>>;

    /// The user's active record for a book, if any
    async fn find_active(&mut self, user_id: i32, book_id: i32) -> AppResult<Option<BorrowRecord>>;

    /// Number of active records held by a user
    async fn count_active(&mut self, user_id: i32) -> AppResult<i64>;

    /// Append a new active record
    async fn insert(
        &mut self,
        user_id: i32,
        book_id: i32,
        borrow_date: NaiveDate,
    ) -> AppResult<BorrowRecord>;

    /// Set the return date of an active record; `None` if it is no longer active
    async fn close(&mut self, record_id: i32, return_date: NaiveDate) -> AppResult<Option<BorrowRecord>>;

    async fn commit(self) -> AppResult<()>;

    async fn rollback(self) -> AppResult<()>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub borrowing: borrowing::BorrowingRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            borrowing: borrowing::BorrowingRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip a trivial query to check database connectivity
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
