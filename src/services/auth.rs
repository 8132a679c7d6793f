//! Authentication service: password checks and JWT issuance

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};

use super::users::UsersService;
use crate::{
    config::{AuthConfig, LendingConfig},
    error::{AppError, AppResult},
    models::user::{RegisterUser, TokenKind, TokenPair, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    users: UsersService,
    config: AuthConfig,
    min_reader_age: u32,
}

impl AuthService {
    pub fn new(
        repository: Repository,
        users: UsersService,
        config: AuthConfig,
        lending: &LendingConfig,
    ) -> Self {
        Self {
            repository,
            users,
            config,
            min_reader_age: lending.min_reader_age,
        }
    }

    /// Check credentials and issue a token pair
    pub async fn login(&self, username: &str, password: &str) -> AppResult<TokenPair> {
        let user = self
            .repository
            .users
            .get_active_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        tracing::info!(user_id = user.id, "User logged in");
        self.token_pair(&user)
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let claims = self.decode(refresh_token)?;
        if claims.token_type != TokenKind::Refresh {
            return Err(AppError::Authentication("Refresh token required".to_string()));
        }

        let user = self.repository.users.get_by_id(claims.user_id).await?;
        if !user.is_active {
            return Err(AppError::Authentication("Account is inactive".to_string()));
        }

        self.sign(&user, TokenKind::Access)
    }

    /// Check signature and expiry of any token we issued
    pub fn verify(&self, token: &str) -> AppResult<()> {
        self.decode(token).map(|_| ())
    }

    /// Register a reader and log them in
    pub async fn register(&self, request: RegisterUser) -> AppResult<(TokenPair, User)> {
        let user = self
            .users
            .register(request, self.min_reader_age, Utc::now().date_naive())
            .await?;

        let tokens = self.token_pair(&user)?;
        Ok((tokens, user))
    }

    /// Currently authenticated user
    pub async fn me(&self, claims: &UserClaims) -> AppResult<User> {
        self.repository.users.get_by_id(claims.user_id).await
    }

    /// Decode an access token presented on a request and check it against the account
    pub async fn authenticate(&self, token: &str) -> AppResult<UserClaims> {
        let mut claims = self.decode(token)?;
        if claims.token_type != TokenKind::Access {
            return Err(AppError::Authentication("Access token required".to_string()));
        }

        let user = match self.repository.users.get_by_id(claims.user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication("Account no longer exists".to_string()))
            }
            Err(e) => return Err(e),
        };
        claims.apply_account(&user)?;
        Ok(claims)
    }

    fn decode(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))
    }

    fn token_pair(&self, user: &User) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access: self.sign(user, TokenKind::Access)?,
            refresh: self.sign(user, TokenKind::Refresh)?,
        })
    }

    fn sign(&self, user: &User, kind: TokenKind) -> AppResult<String> {
        let lifetime = match kind {
            TokenKind::Access => Duration::minutes(self.config.access_token_minutes),
            TokenKind::Refresh => Duration::days(self.config.refresh_token_days),
        };

        UserClaims::new(user, kind, lifetime)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

/// Verify a password against the stored argon2 hash
pub fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Role;

    fn user_with_password(password: &str) -> User {
        User {
            id: 1,
            username: "librarian".to_string(),
            password: hash_password(password).unwrap(),
            first_name: String::new(),
            last_name: String::new(),
            middle_name: String::new(),
            email: String::new(),
            birth_date: None,
            passport: None,
            phone: None,
            address: None,
            role: Role::Librarian,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_verifies() {
        let user = user_with_password("s3cret");
        assert!(user.password.starts_with("$argon2"));
        assert!(verify_password(&user, "s3cret").unwrap());
        assert!(!verify_password(&user, "wrong").unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }
}
