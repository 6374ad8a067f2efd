use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, ffi, params};
use std::path::Path;
use std::sync::Arc;

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        Self::from_connection(conn)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            -- Books table
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                genre TEXT,
                description TEXT,
                created_by TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            -- Reviews table, one per (book, user)
            CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                book_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                rating INTEGER NOT NULL,
                comment TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (book_id, user_id),
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_books_created_by ON books(created_by);
            CREATE INDEX IF NOT EXISTS idx_reviews_book ON reviews(book_id);
            "#,
        )
        .map_err(|e| AppError::Internal(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== USER OPERATIONS ==========

    /// Create a new user.
    pub fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                user.created_at,
            ],
        )
        .map_err(|e| {
            if is_constraint(&e, ffi::SQLITE_CONSTRAINT_UNIQUE) {
                AppError::Conflict("User already exists".to_string())
            } else {
                AppError::Internal(format!("Failed to create user: {}", e))
            }
        })?;
        Ok(())
    }

    /// Get user by email.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?1",
            params![email],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// Get user by ID.
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?1",
            params![id],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, email, password_hash, created_at FROM users ORDER BY email",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map([], Self::row_to_user)
            .map_err(|e| AppError::Internal(format!("Failed to list users: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect users: {}", e)))?;

        Ok(users)
    }

    /// Delete user by email. Their reviews go with them.
    pub fn delete_user(&self, email: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM users WHERE email = ?1", params![email])
            .map_err(|e| AppError::Internal(format!("Failed to delete user: {}", e)))?;
        Ok(rows > 0)
    }

    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    // ========== BOOK OPERATIONS ==========

    /// Insert a new book.
    pub fn create_book(&self, book: &Book) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO books (id, title, author, genre, description, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                book.id,
                book.title,
                book.author,
                book.genre,
                book.description,
                book.created_by,
                book.created_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to create book: {}", e)))?;
        Ok(())
    }

    /// Get book by ID.
    pub fn get_book(&self, id: &str) -> Result<Option<Book>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, title, author, genre, description, created_by, created_at
             FROM books WHERE id = ?1",
            params![id],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get book: {}", e)))
    }

    /// List books in insertion order, optionally filtered by author and genre.
    pub fn list_books(&self, filter: &BookFilter, page: Page) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, author, genre, description, created_by, created_at
                 FROM books
                 WHERE (?1 IS NULL OR instr(fold_case(author), ?1) > 0)
                   AND (?2 IS NULL OR instr(fold_case(coalesce(genre, '')), ?2) > 0)
                 ORDER BY rowid
                 LIMIT ?3 OFFSET ?4",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let author = filter.author.as_deref().map(str::to_lowercase);
        let genre = filter.genre.as_deref().map(str::to_lowercase);

        let books = stmt
            .query_map(
                params![author, genre, page.limit, page.offset()],
                Self::row_to_book,
            )
            .map_err(|e| AppError::Internal(format!("Failed to list books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Books whose title or author contains `query`, in insertion order.
    pub fn search_books(&self, query: &str, page: Page) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, author, genre, description, created_by, created_at
                 FROM books
                 WHERE instr(fold_case(title), ?1) > 0
                    OR instr(fold_case(author), ?1) > 0
                 ORDER BY rowid
                 LIMIT ?2 OFFSET ?3",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(
                params![query.to_lowercase(), page.limit, page.offset()],
                Self::row_to_book,
            )
            .map_err(|e| AppError::Internal(format!("Failed to search books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            genre: row.get(3)?,
            description: row.get(4)?,
            created_by: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    // ========== REVIEW OPERATIONS ==========

    /// Insert a review.
    ///
    /// The (book, user) uniqueness constraint is the final word on duplicates:
    /// a violation comes back as `Conflict` even if a pre-check raced.
    pub fn create_review(&self, review: &Review) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reviews (id, book_id, user_id, rating, comment, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                review.id,
                review.book_id,
                review.user_id,
                review.rating,
                review.comment,
                review.created_at,
                review.updated_at,
            ],
        )
        .map_err(|e| {
            if is_constraint(&e, ffi::SQLITE_CONSTRAINT_UNIQUE) {
                AppError::Conflict("You have already reviewed this book.".to_string())
            } else if is_constraint(&e, ffi::SQLITE_CONSTRAINT_FOREIGNKEY) {
                AppError::NotFound("Book not found".to_string())
            } else {
                AppError::Internal(format!("Failed to create review: {}", e))
            }
        })?;
        Ok(())
    }

    /// Get review by ID.
    pub fn get_review(&self, id: &str) -> Result<Option<Review>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, book_id, user_id, rating, comment, created_at, updated_at
             FROM reviews WHERE id = ?1",
            params![id],
            Self::row_to_review,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get review: {}", e)))
    }

    /// Find the review a user left on a book, if any.
    pub fn find_review(&self, book_id: &str, user_id: &str) -> Result<Option<Review>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, book_id, user_id, rating, comment, created_at, updated_at
             FROM reviews WHERE book_id = ?1 AND user_id = ?2",
            params![book_id, user_id],
            Self::row_to_review,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to find review: {}", e)))
    }

    /// Overwrite rating, comment and update time of a review.
    pub fn update_review(&self, review: &Review) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE reviews SET rating = ?1, comment = ?2, updated_at = ?3 WHERE id = ?4",
                params![review.rating, review.comment, review.updated_at, review.id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update review: {}", e)))?;
        Ok(rows > 0)
    }

    /// Delete a review.
    pub fn delete_review(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM reviews WHERE id = ?1", params![id])
            .map_err(|e| AppError::Internal(format!("Failed to delete review: {}", e)))?;
        Ok(rows > 0)
    }

    /// One page of a book's reviews with reviewer names, in insertion order.
    pub fn get_book_reviews(&self, book_id: &str, page: Page) -> Result<Vec<ReviewWithAuthor>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT r.id, r.book_id, r.user_id, u.name, r.rating, r.comment,
                        r.created_at, r.updated_at
                 FROM reviews r
                 JOIN users u ON u.id = r.user_id
                 WHERE r.book_id = ?1
                 ORDER BY r.rowid
                 LIMIT ?2 OFFSET ?3",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let reviews = stmt
            .query_map(params![book_id, page.limit, page.offset()], |row| {
                Ok(ReviewWithAuthor {
                    id: row.get(0)?,
                    book_id: row.get(1)?,
                    user: ReviewAuthor {
                        id: row.get(2)?,
                        name: row.get(3)?,
                    },
                    rating: row.get(4)?,
                    comment: row.get(5)?,
                    created_at: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            })
            .map_err(|e| AppError::Internal(format!("Failed to get reviews: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect reviews: {}", e)))?;

        Ok(reviews)
    }

    /// Mean rating over all reviews of a book, 0 when there are none.
    pub fn average_rating(&self, book_id: &str) -> Result<f64> {
        let conn = self.conn.lock();
        let avg: Option<f64> = conn
            .query_row(
                "SELECT AVG(rating) FROM reviews WHERE book_id = ?1",
                params![book_id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Internal(format!("Failed to compute rating: {}", e)))?;
        Ok(avg.unwrap_or(0.0))
    }

    fn row_to_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
        Ok(Review {
            id: row.get(0)?,
            book_id: row.get(1)?,
            user_id: row.get(2)?,
            rating: row.get(3)?,
            comment: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

/// Register `fold_case(text)`, a Unicode-aware lowercase. SQLite's own
/// `lower()` only folds ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
    .map_err(|e| AppError::Internal(format!("Failed to register functions: {}", e)))
}

/// Whether `e` is a constraint failure with the given extended code.
fn is_constraint(e: &rusqlite::Error, extended_code: i32) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.extended_code == extended_code)
}
