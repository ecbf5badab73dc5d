//! Borrowing ledger records and their response shapes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{book::Book, user::UserSummary};

/// One row of the borrowing history ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BorrowRecord {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl BorrowRecord {
    /// A record is active until its return date is set
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }
}

/// Ledger record with the borrowed book and the borrower embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BorrowRecordDetails {
    pub id: i32,
    pub user: UserSummary,
    pub book: Book,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl BorrowRecordDetails {
    pub fn new(record: BorrowRecord, user: UserSummary, book: Book) -> Self {
        Self {
            id: record.id,
            user,
            book,
            borrow_date: record.borrow_date,
            return_date: record.return_date,
        }
    }
}

/// Closed ledger record returned by the return operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReturnedRecord {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub borrow_date: NaiveDate,
    pub return_date: NaiveDate,
}
