mod schema;

pub use schema::Database;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Default number of books per page.
pub const DEFAULT_BOOK_PAGE_SIZE: u32 = 10;
/// Default number of reviews per page on a book detail.
pub const DEFAULT_REVIEW_PAGE_SIZE: u32 = 5;
/// Upper bound for any requested page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// User account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email, stored normalized.
    pub email: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account creation timestamp.
    pub created_at: i64,
}

/// Book entry in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Book ID.
    pub id: String,
    /// Book title.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Genre.
    pub genre: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// ID of the user who added the book.
    pub created_by: String,
    /// Creation timestamp.
    pub created_at: i64,
}

/// A user's rating and comment on a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Review ID.
    pub id: String,
    /// Reviewed book ID.
    #[serde(rename = "book")]
    pub book_id: String,
    /// Reviewer user ID.
    #[serde(rename = "user")]
    pub user_id: String,
    /// Rating, 1 to 5.
    pub rating: i64,
    /// Optional comment.
    pub comment: Option<String>,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Public part of a reviewer, embedded in book details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAuthor {
    /// User ID.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Review joined with its author's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithAuthor {
    /// Review ID.
    pub id: String,
    /// Reviewed book ID.
    #[serde(rename = "book")]
    pub book_id: String,
    /// Reviewer.
    pub user: ReviewAuthor,
    /// Rating, 1 to 5.
    pub rating: i64,
    /// Optional comment.
    pub comment: Option<String>,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Optional listing filters, each a case-insensitive substring.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Author substring.
    pub author: Option<String>,
    /// Genre substring.
    pub genre: Option<String>,
}

impl BookFilter {
    /// Build a filter, treating blank values as absent.
    pub fn new(author: Option<String>, genre: Option<String>) -> Self {
        Self {
            author: non_blank(author),
            genre: non_blank(genre),
        }
    }
}

/// One page of a listing. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Page number, at least 1.
    pub number: u32,
    /// Page size, 1 to `MAX_PAGE_SIZE`.
    pub limit: u32,
}

impl Page {
    /// Build a page from raw query values, clamping out-of-range input.
    pub fn new(number: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Number of records to skip.
    pub fn offset(&self) -> i64 {
        i64::from(self.number.saturating_sub(1)) * i64::from(self.limit)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}
