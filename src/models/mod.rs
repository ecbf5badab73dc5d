//! Data models for the borrowing ledger

pub mod book;
pub mod borrow;
pub mod user;

pub use book::Book;
pub use borrow::{BorrowRecord, BorrowRecordDetails, ReturnedRecord};
pub use user::{UserClaims, UserSummary};
