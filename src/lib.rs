//! bookshelf-rs: A lightweight book catalog and review service.
//!
//! Users sign up, log in with a bearer token, add books, browse and
//! search the catalog, and rate and review books.
//!
//! # Features
//!
//! - Account signup and login with Argon2 password hashing
//! - Stateless HS256 identity tokens
//! - Book listing with author/genre filters and pagination
//! - Title/author search
//! - One review per user per book, with average rating on book details

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and user management.
pub mod auth;
/// Book catalog and reviews.
pub mod catalog;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// HTTP server.
pub mod server;


pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
