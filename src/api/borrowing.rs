//! Borrow and return endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{BorrowRecordDetails, ReturnedRecord},
    AppState,
};

use super::AuthenticatedUser;

/// Borrow request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BorrowRequest {
    /// ID of the book to borrow
    #[validate(range(min = 1, message = "book_id must be a positive integer"))]
    pub book_id: i32,
}

/// Return request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnRequest {
    /// ID of the book being returned
    #[validate(range(min = 1, message = "book_id must be a positive integer"))]
    pub book_id: i32,
    /// Return date (defaults to today)
    pub return_date: Option<NaiveDate>,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowRecordDetails),
        (status = 400, description = "Book not available, already borrowed or borrow limit reached", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    WithRejection(Json(request), _): WithRejection<Json<BorrowRequest>, AppError>,
) -> AppResult<(StatusCode, Json<BorrowRecordDetails>)> {
    request.validate()?;

    let record = state
        .services
        .borrowing
        .borrow(claims.user_id, request.book_id, today())
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/return",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    request_body = ReturnRequest,
    responses(
        (status = 201, description = "Book returned", body = ReturnedRecord),
        (status = 400, description = "No active borrowed books found", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    WithRejection(Json(request), _): WithRejection<Json<ReturnRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ReturnedRecord>)> {
    request.validate()?;

    let return_date = request.return_date.unwrap_or_else(today);
    let record = state
        .services
        .borrowing
        .return_book(claims.user_id, request.book_id, return_date)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Borrowing history of a book
#[utoipa::path(
    get,
    path = "/books/{id}/history",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Every borrow of the book, oldest first", body = Vec<BorrowRecordDetails>),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn book_history(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    WithRejection(Path(book_id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<Vec<BorrowRecordDetails>>> {
    let history = state.services.borrowing.book_history(book_id).await?;
    Ok(Json(history))
}

/// Server-local calendar date, used for borrow dates and default return dates
fn today() -> NaiveDate {
    Local::now().date_naive()
}
