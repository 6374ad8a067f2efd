//! HTTP request handlers.

use crate::catalog::{BookDetail, NewBook};
use crate::db::{
    Book, BookFilter, DEFAULT_BOOK_PAGE_SIZE, DEFAULT_REVIEW_PAGE_SIZE, Page, Review,
};
use crate::error::Result;
use crate::server::AppState;
use crate::server::gateway::CurrentUser;
use crate::server::state::blocking;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

/// Plain message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

// ============================================================================
// AUTH API
// ============================================================================

/// Signup request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    name: String,
    email: String,
    password: String,
}

/// Login request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// Token response for signup and login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    message: String,
    token: String,
}

/// Create an account.
pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    let Json(req) = payload?;
    let auth = state.auth.clone();
    let (_user, token) =
        blocking(move || auth.signup(&req.name, &req.email, &req.password)).await?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            message: "User created".to_string(),
            token,
        }),
    ))
}

/// Log in with email and password.
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let Json(req) = payload?;
    let auth = state.auth.clone();
    let (_user, token) = blocking(move || auth.login(&req.email, &req.password)).await?;

    Ok(Json(TokenResponse {
        message: "Login successful".to_string(),
        token,
    }))
}

// ============================================================================
// BOOK API
// ============================================================================

/// Book creation request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBookRequest {
    title: String,
    author: String,
    genre: Option<String>,
    description: Option<String>,
}

/// Book listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListBooksParams {
    author: Option<String>,
    genre: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    page: Option<u32>,
    limit: Option<u32>,
}

/// Add a book to the catalog.
pub async fn add_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: std::result::Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>)> {
    let Json(req) = payload?;
    let new_book = NewBook {
        title: req.title,
        author: req.author,
        genre: req.genre,
        description: req.description,
    };

    let catalog = state.catalog.clone();
    let book = blocking(move || catalog.add_book(new_book, &user)).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// List books with optional author/genre filters.
pub async fn list_books(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListBooksParams>, QueryRejection>,
) -> Result<Json<Vec<Book>>> {
    let Query(params) = params?;
    let filter = BookFilter::new(params.author, params.genre);
    let page = Page::new(params.page, params.limit, DEFAULT_BOOK_PAGE_SIZE);

    let catalog = state.catalog.clone();
    let books = blocking(move || catalog.list_books(&filter, page)).await?;
    Ok(Json(books))
}

/// Book details with average rating and paginated reviews.
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: std::result::Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<BookDetail>> {
    let Query(params) = params?;
    let page = Page::new(params.page, params.limit, DEFAULT_REVIEW_PAGE_SIZE);

    let catalog = state.catalog.clone();
    let detail = blocking(move || catalog.get_book_by_id(&id, page)).await?;
    Ok(Json(detail))
}

/// Search books by title or author.
pub async fn search_books(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Book>>> {
    let Query(params) = params?;
    let page = Page::new(params.page, params.limit, DEFAULT_BOOK_PAGE_SIZE);

    let catalog = state.catalog.clone();
    let books = blocking(move || catalog.search_books(params.query.as_deref(), page)).await?;
    Ok(Json(books))
}

// ============================================================================
// REVIEW API
// ============================================================================

/// Review creation request.
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    rating: i64,
    comment: Option<String>,
}

/// Partial review update.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateReviewRequest {
    rating: Option<i64>,
    comment: Option<String>,
}

/// Review a book.
pub async fn add_review(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    CurrentUser(user): CurrentUser,
    payload: std::result::Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Review>)> {
    let Json(req) = payload?;
    let catalog = state.catalog.clone();
    let review =
        blocking(move || catalog.add_review(&book_id, &user, req.rating, req.comment)).await?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// Update one's own review.
pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(user): CurrentUser,
    payload: std::result::Result<Json<UpdateReviewRequest>, JsonRejection>,
) -> Result<Json<Review>> {
    let Json(req) = payload?;
    let catalog = state.catalog.clone();
    let review =
        blocking(move || catalog.update_review(&id, &user, req.rating, req.comment)).await?;

    Ok(Json(review))
}

/// Delete one's own review.
pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MessageResponse>> {
    let catalog = state.catalog.clone();
    blocking(move || catalog.delete_review(&id, &user)).await?;

    Ok(Json(MessageResponse {
        message: "Review deleted".to_string(),
    }))
}
