//! Book catalog and review ledger.

use crate::db::{
    Book, BookFilter, Database, Page, Review, ReviewWithAuthor, User, now_timestamp,
};
use crate::error::{AppError, Result};
use serde::Serialize;

/// Lowest accepted rating.
pub const MIN_RATING: i64 = 1;
/// Highest accepted rating.
pub const MAX_RATING: i64 = 5;

/// Fields of a book to create.
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    /// Book title.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Genre.
    pub genre: Option<String>,
    /// Description.
    pub description: Option<String>,
}

/// A book with its average rating and one page of reviews.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    /// The book itself.
    #[serde(flatten)]
    pub book: Book,
    /// Mean rating over all reviews, 0 without reviews.
    pub average_rating: f64,
    /// Requested page of reviews.
    pub reviews: Vec<ReviewWithAuthor>,
}

/// Catalog service over the database.
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    /// Create a new catalog service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add a book on behalf of `user`.
    pub fn add_book(&self, new_book: NewBook, user: &User) -> Result<Book> {
        let title = new_book.title.trim();
        let author = new_book.author.trim();
        if title.is_empty() || author.is_empty() {
            return Err(AppError::BadRequest(
                "Title and author are required".to_string(),
            ));
        }

        let book = Book {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            author: author.to_string(),
            genre: new_book.genre,
            description: new_book.description,
            created_by: user.id.clone(),
            created_at: now_timestamp(),
        };

        self.db.create_book(&book)?;
        tracing::info!(book_id = %book.id, user_id = %user.id, "Book added");
        Ok(book)
    }

    /// List books matching `filter`.
    pub fn list_books(&self, filter: &BookFilter, page: Page) -> Result<Vec<Book>> {
        self.db.list_books(filter, page)
    }

    /// Search titles and authors for `query`.
    pub fn search_books(&self, query: Option<&str>, page: Page) -> Result<Vec<Book>> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::BadRequest("Search query is required".to_string()))?;

        self.db.search_books(query, page)
    }

    /// Book details with average rating and a page of reviews.
    pub fn get_book_by_id(&self, id: &str, page: Page) -> Result<BookDetail> {
        let book = self
            .db
            .get_book(id)?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        let reviews = self.db.get_book_reviews(&book.id, page)?;
        let average_rating = self.db.average_rating(&book.id)?;

        Ok(BookDetail {
            book,
            average_rating,
            reviews,
        })
    }

    /// Review a book. Each user may review a book once.
    pub fn add_review(
        &self,
        book_id: &str,
        user: &User,
        rating: i64,
        comment: Option<String>,
    ) -> Result<Review> {
        validate_rating(rating)?;

        if self.db.get_book(book_id)?.is_none() {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        // Fast path; the unique index still catches concurrent inserts.
        if self.db.find_review(book_id, &user.id)?.is_some() {
            return Err(AppError::Conflict(
                "You have already reviewed this book.".to_string(),
            ));
        }

        let now = now_timestamp();
        let review = Review {
            id: uuid::Uuid::new_v4().to_string(),
            book_id: book_id.to_string(),
            user_id: user.id.clone(),
            rating,
            comment,
            created_at: now,
            updated_at: now,
        };

        self.db.create_review(&review)?;
        tracing::info!(review_id = %review.id, book_id, user_id = %user.id, "Review added");
        Ok(review)
    }

    /// Update the rating and/or comment of the user's own review.
    pub fn update_review(
        &self,
        review_id: &str,
        user: &User,
        rating: Option<i64>,
        comment: Option<String>,
    ) -> Result<Review> {
        let mut review = self.owned_review(review_id, user)?;

        if let Some(rating) = rating {
            validate_rating(rating)?;
            review.rating = rating;
        }
        if let Some(comment) = comment {
            review.comment = Some(comment);
        }
        review.updated_at = now_timestamp();

        if !self.db.update_review(&review)? {
            return Err(AppError::NotFound("Review not found".to_string()));
        }
        Ok(review)
    }

    /// Delete the user's own review.
    pub fn delete_review(&self, review_id: &str, user: &User) -> Result<()> {
        let review = self.owned_review(review_id, user)?;

        if !self.db.delete_review(&review.id)? {
            return Err(AppError::NotFound("Review not found".to_string()));
        }
        tracing::info!(review_id, user_id = %user.id, "Review deleted");
        Ok(())
    }

    fn owned_review(&self, review_id: &str, user: &User) -> Result<Review> {
        let review = self
            .db
            .get_review(review_id)?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        if review.user_id != user.id {
            return Err(AppError::Forbidden("Not authorized".to_string()));
        }
        Ok(review)
    }
}

fn validate_rating(rating: i64) -> Result<()> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )))
    }
}
