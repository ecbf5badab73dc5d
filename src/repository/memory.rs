//! In-memory ledger used by workflow tests

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::AppResult,
    models::{Book, BorrowRecord, BorrowRecordDetails, UserSummary},
};

use super::{Ledger, LedgerSession};

#[derive(Debug, Default)]
struct LedgerState {
    users: HashMap<i32, UserSummary>,
    books: HashMap<i32, Book>,
    records: Vec<BorrowRecord>,
    next_id: i32,
}

/// Ledger whose sessions stage writes until commit and serialise per user
/// through [`LedgerSession::lock_user`] only
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    user_locks: Arc<Mutex<HashMap<i32, Arc<Mutex<()>>>>>,
    rollbacks: Arc<AtomicUsize>,
    fail_inserts: Arc<AtomicBool>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryLedger {
    pub async fn add_user(&self, id: i32, username: &str) {
        self.state.lock().await.users.insert(
            id,
            UserSummary {
                id,
                username: username.to_string(),
            },
        );
    }

    pub async fn add_book(&self, id: i32, available: bool) {
        self.state.lock().await.books.insert(
            id,
            Book {
                id,
                title: format!("Book {}", id),
                isbn: format!("0-19-85345{}-5", id % 10),
                author_id: 1,
                genre_id: 1,
                publisher_id: None,
                publish_date: NaiveDate::from_ymd_opt(2020, 1, 1),
                available,
            },
        );
    }

    /// Committed records, in insertion order
    pub async fn records(&self) -> Vec<BorrowRecord> {
        self.state.lock().await.records.clone()
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Make every following insert fail like a lost database connection
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    /// Make every following commit fail and discard the session's writes
    pub fn fail_commits(&self) {
        self.fail_commits.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    type Session = InMemorySession;

    async fn begin(&self) -> AppResult<InMemorySession> {
        Ok(InMemorySession {
            ledger: self.clone(),
            user_guards: Vec::new(),
            inserted: Vec::new(),
            closed: Vec::new(),
        })
    }

    async fn find_book(&self, book_id: i32) -> AppResult<Option<Book>> {
        Ok(self.state.lock().await.books.get(&book_id).cloned())
    }

    async fn history_for_book(&self, book_id: i32) -> AppResult<Vec<BorrowRecordDetails>> {
        let state = self.state.lock().await;
        let mut history: Vec<BorrowRecordDetails> = state
            .records
            .iter()
            .filter(|r| r.book_id == book_id)
            .filter_map(|r| {
                let user = state.users.get(&r.user_id)?.clone();
                let book = state.books.get(&r.book_id)?.clone();
                Some(BorrowRecordDetails::new(r.clone(), user, book))
            })
            .collect();
        history.sort_by_key(|d| (d.borrow_date, d.id));
        Ok(history)
    }
}

/// Reads see committed records plus this session's own pending writes.
pub struct InMemorySession {
    ledger: InMemoryLedger,
    user_guards: Vec<OwnedMutexGuard<()>>,
    inserted: Vec<BorrowRecord>,
    closed: Vec<(i32, NaiveDate)>,
}

impl InMemorySession {
    async fn visible_records(&self) -> Vec<BorrowRecord> {
        let committed = self.ledger.state.lock().await.records.clone();
        let mut records: Vec<BorrowRecord> = committed
            .into_iter()
            .chain(self.inserted.iter().cloned())
            .collect();
        for (id, date) in &self.closed {
            if let Some(record) = records.iter_mut().find(|r| r.id == *id) {
                record.return_date = Some(*date);
            }
        }
        records
    }
}

#[async_trait]
impl LedgerSession for InMemorySession {
    async fn lock_user(&mut self, user_id: i32) -> AppResult<Option<UserSummary>> {
        let lock = self
            .ledger
            .user_locks
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .clone();
        self.user_guards.push(lock.lock_owned().await);
        Ok(self.ledger.state.lock().await.users.get(&user_id).cloned())
    }

    async fn find_book(&mut self, book_id: i32) -> AppResult<Option<Book>> {
        Ok(self.ledger.state.lock().await.books.get(&book_id).cloned())
    }

    async fn find_active(&mut self, user_id: i32, book_id: i32) -> AppResult<Option<BorrowRecord>> {
        let found = self
            .visible_records()
            .await
            .into_iter()
            .find(|r| r.user_id == user_id && r.book_id == book_id && r.is_active());
        // Let concurrent sessions run between a read and the writes that depend on it.
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn count_active(&mut self, user_id: i32) -> AppResult<i64> {
        let count = self
            .visible_records()
            .await
            .iter()
            .filter(|r| r.user_id == user_id && r.is_active())
            .count();
        tokio::task::yield_now().await;
        Ok(count as i64)
    }

    async fn insert(
        &mut self,
        user_id: i32,
        book_id: i32,
        borrow_date: NaiveDate,
    ) -> AppResult<BorrowRecord> {
        if self.ledger.fail_inserts.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        let id = {
            let mut state = self.ledger.state.lock().await;
            state.next_id += 1;
            state.next_id
        };
        let record = BorrowRecord {
            id,
            book_id,
            user_id,
            borrow_date,
            return_date: None,
        };
        self.inserted.push(record.clone());
        Ok(record)
    }

    async fn close(&mut self, record_id: i32, return_date: NaiveDate) -> AppResult<Option<BorrowRecord>> {
        let record = self
            .visible_records()
            .await
            .into_iter()
            .find(|r| r.id == record_id && r.is_active());
        Ok(record.map(|mut r| {
            self.closed.push((record_id, return_date));
            r.return_date = Some(return_date);
            r
        }))
    }

    async fn commit(self) -> AppResult<()> {
        if self.ledger.fail_commits.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolClosed.into());
        }
        let mut state = self.ledger.state.lock().await;
        for (id, date) in &self.closed {
            if let Some(record) = state.records.iter_mut().find(|r| r.id == *id) {
                record.return_date = Some(*date);
            }
        }
        state.records.extend(self.inserted.iter().cloned());
        Ok(())
    }

    async fn rollback(self) -> AppResult<()> {
        self.ledger.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
