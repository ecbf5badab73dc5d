//! Business logic services

pub mod borrowing;
pub mod rules;

use crate::repository::{borrowing::BorrowingRepository, Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub borrowing: borrowing::BorrowingService<BorrowingRepository>,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            borrowing: borrowing::BorrowingService::new(repository.borrowing.clone()),
            repository,
        }
    }
}
