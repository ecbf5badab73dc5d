//! Book model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Book row as stored in the catalogue.
///
/// `available` is a catalogue-level "lendable" switch. The borrowing workflow
/// reads it but never changes it; a NULL column is read as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub author_id: i32,
    pub genre_id: i32,
    pub publisher_id: Option<i32>,
    pub publish_date: Option<NaiveDate>,
    pub available: bool,
}
