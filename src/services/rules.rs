//! Borrowing rules
//!
//! The rule sequence is kept free of any persistence concern: callers gather
//! a [`BorrowSnapshot`] inside their ledger session and ask [`check_borrow`]
//! for a decision.

use thiserror::Error;

use crate::models::BorrowRecord;

/// Maximum number of simultaneously active borrows per user
pub const MAX_BORROW_LIMIT: i64 = 5;

/// Business rule violations of the borrow/return workflow
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowError {
    #[error("Book is not available for borrowing.")]
    NotAvailable,

    #[error("You have already borrowed this book and have not returned it yet.")]
    AlreadyBorrowed,

    #[error("You cannot borrow more than {limit} books.")]
    LimitExceeded { limit: i64 },

    #[error("No active borrowed books found.")]
    NoActiveBorrow,
}

/// Ledger state relevant to one borrow attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowSnapshot {
    /// `false` when the book does not exist or is not lendable
    pub book_available: bool,
    /// The caller already holds an active record for this book
    pub already_borrowed: bool,
    /// Number of active records held by the caller
    pub active_count: i64,
}

/// Apply the borrow rules in order; the first violation wins.
pub fn check_borrow(snapshot: &BorrowSnapshot) -> Result<(), BorrowError> {
    if !snapshot.book_available {
        return Err(BorrowError::NotAvailable);
    }
    if snapshot.already_borrowed {
        return Err(BorrowError::AlreadyBorrowed);
    }
    if snapshot.active_count >= MAX_BORROW_LIMIT {
        return Err(BorrowError::LimitExceeded {
            limit: MAX_BORROW_LIMIT,
        });
    }
    Ok(())
}

/// A return needs the caller's active record for the book.
pub fn check_return(active: Option<BorrowRecord>) -> Result<BorrowRecord, BorrowError> {
    match active {
        Some(record) if record.is_active() => Ok(record),
        _ => Err(BorrowError::NoActiveBorrow),
    }
}
