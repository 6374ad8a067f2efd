//! Authentication module.

use crate::db::{Database, User, now_timestamp};
use crate::error::{AppError, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Emails are matched case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Claims carried by an identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// Issues and verifies HS256 identity tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenService {
    /// Create a token service signing with `secret`.
    pub fn new(secret: &str, lifetime_hours: u32) -> Result<Self> {
        if secret.is_empty() {
            return Err(AppError::Config(
                "JWT signing secret must not be empty".to_string(),
            ));
        }
        if lifetime_hours == 0 {
            return Err(AppError::Config(
                "Token lifetime must be at least one hour".to_string(),
            ));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(lifetime_hours as i64),
        })
    }

    /// Issue a token for `user_id`, valid from now.
    pub fn issue(&self, user_id: &str) -> Result<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify a token and return the user ID it was issued for.
    pub fn verify(&self, token: &str) -> Result<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims.sub)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::InvalidToken
            })
    }
}

/// Account management. Needs no signing secret, so the CLI uses it directly.
#[derive(Clone)]
pub struct Accounts {
    db: Database,
}

impl Accounts {
    /// Create an account manager over `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new account.
    pub fn create_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let name = name.trim();
        let email = normalize_email(email);

        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::BadRequest(
                "Name, email and password are required".to_string(),
            ));
        }

        if self.db.get_user_by_email(&email)?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email,
            password_hash: hash_password(password)?,
            created_at: now_timestamp(),
        };

        self.db.create_user(&user)?;
        Ok(user)
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.db.list_users()
    }

    /// Delete a user by email.
    pub fn delete_user(&self, email: &str) -> Result<bool> {
        self.db.delete_user(&normalize_email(email))
    }
}

/// Signup, login and token authentication.
pub struct AuthService {
    accounts: Accounts,
    tokens: TokenService,
}

impl AuthService {
    /// Create a new auth service.
    pub fn new(db: Database, tokens: TokenService) -> Self {
        Self {
            accounts: Accounts::new(db),
            tokens,
        }
    }

    /// Token service used to sign and verify identities.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Underlying account manager.
    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    /// Register a new account and return it with a fresh token.
    pub fn signup(&self, name: &str, email: &str, password: &str) -> Result<(User, String)> {
        let user = self.accounts.create_user(name, email, password)?;
        let token = self.tokens.issue(&user.id)?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok((user, token))
    }

    /// Check credentials and issue a token.
    pub fn login(&self, email: &str, password: &str) -> Result<(User, String)> {
        let user = self
            .accounts
            .db
            .get_user_by_email(&normalize_email(email))?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.id)?;
        Ok((user, token))
    }

    /// Resolve a bearer token to the user it belongs to.
    pub fn authenticate(&self, token: &str) -> Result<User> {
        let user_id = self
            .tokens
            .verify(token)
            .map_err(|_| AppError::Unauthenticated("Invalid or expired token".to_string()))?;

        self.accounts
            .db
            .get_user_by_id(&user_id)?
            .ok_or_else(|| AppError::Unauthenticated("User no longer exists".to_string()))
    }
}
