//! Borrow/return workflow service

use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{BorrowRecordDetails, ReturnedRecord, UserSummary},
    repository::{Ledger, LedgerSession},
};

use super::rules::{check_borrow, check_return, BorrowError, BorrowSnapshot};

#[derive(Clone)]
pub struct BorrowingService<L> {
    ledger: L,
}

impl<L: Ledger> BorrowingService<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Borrow a book for a user, recording a new active ledger entry
    pub async fn borrow(
        &self,
        user_id: i32,
        book_id: i32,
        today: NaiveDate,
    ) -> AppResult<BorrowRecordDetails> {
        let mut session = self.ledger.begin().await?;
        let outcome = Self::borrow_in(&mut session, user_id, book_id, today).await;
        let details = finish(session, outcome).await?;

        tracing::info!(
            "Book borrowed: record={} user={} book={}",
            details.id,
            user_id,
            book_id
        );
        Ok(details)
    }

    /// Close the user's active ledger entry for a book
    pub async fn return_book(
        &self,
        user_id: i32,
        book_id: i32,
        return_date: NaiveDate,
    ) -> AppResult<ReturnedRecord> {
        let mut session = self.ledger.begin().await?;
        let outcome = Self::return_in(&mut session, user_id, book_id, return_date).await;
        let returned = finish(session, outcome).await?;

        tracing::info!(
            "Book returned: record={} user={} book={} on {}",
            returned.id,
            user_id,
            book_id,
            return_date
        );
        Ok(returned)
    }

    /// Full borrowing history of a book
    pub async fn book_history(&self, book_id: i32) -> AppResult<Vec<BorrowRecordDetails>> {
        if self.ledger.find_book(book_id).await?.is_none() {
            return Err(AppError::NotFound("Book not found.".to_string()));
        }
        self.ledger.history_for_book(book_id).await
    }

    async fn borrow_in(
        session: &mut L::Session,
        user_id: i32,
        book_id: i32,
        today: NaiveDate,
    ) -> AppResult<BorrowRecordDetails> {
        let user = lock_caller(session, user_id).await?;

        let book = session.find_book(book_id).await?;
        let snapshot = BorrowSnapshot {
            book_available: book.as_ref().map(|b| b.available).unwrap_or(false),
            already_borrowed: session.find_active(user_id, book_id).await?.is_some(),
            active_count: session.count_active(user_id).await?,
        };
        check_borrow(&snapshot)?;

        let book = book.ok_or(BorrowError::NotAvailable)?;
        let record = session.insert(user_id, book_id, today).await?;

        Ok(BorrowRecordDetails::new(record, user, book))
    }

    async fn return_in(
        session: &mut L::Session,
        user_id: i32,
        book_id: i32,
        return_date: NaiveDate,
    ) -> AppResult<ReturnedRecord> {
        lock_caller(session, user_id).await?;

        let active = check_return(session.find_active(user_id, book_id).await?)?;
        let closed = session
            .close(active.id, return_date)
            .await?
            .ok_or(BorrowError::NoActiveBorrow)?;

        Ok(ReturnedRecord {
            id: closed.id,
            book_id: closed.book_id,
            user_id: closed.user_id,
            borrow_date: closed.borrow_date,
            return_date: closed.return_date.unwrap_or(return_date),
        })
    }
}

async fn lock_caller<S: LedgerSession>(session: &mut S, user_id: i32) -> AppResult<UserSummary> {
    session
        .lock_user(user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("Could not validate credentials".to_string()))
}

/// Commit the session on success, roll it back on failure
async fn finish<S: LedgerSession, T>(session: S, outcome: AppResult<T>) -> AppResult<T> {
    match outcome {
        Ok(value) => match session.commit().await {
            Ok(()) => Ok(value),
            Err(e) => {
                report(&e);
                Err(e)
            }
        },
        Err(e) => Err(abandon(session, e).await),
    }
}

fn report(error: &AppError) {
    match error {
        AppError::Borrow(rule) => tracing::debug!("Borrow request rejected: {}", rule),
        AppError::Database(_) => tracing::error!("Ledger session failed: {}", error),
        _ => {}
    }
}

/// Roll the session back and hand the original failure on
async fn abandon<S: LedgerSession>(session: S, error: AppError) -> AppError {
    report(&error);

    if let Err(rollback_error) = session.rollback().await {
        tracing::warn!("Ledger rollback failed: {}", rollback_error);
    }
    error
}
