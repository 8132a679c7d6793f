//! User model, registration rules and JWT claims

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::enums::Role;
use crate::error::AppError;

/// Two letters (latin or cyrillic) followed by six digits, e.g. AN123456
static PASSPORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-ZА-Я]{2}[0-9]{6}$").unwrap());

/// Kyrgyz mobile number, e.g. +996555123456
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+996[0-9]{9}$").unwrap());

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn validate_passport(value: &str) -> Result<(), ValidationError> {
    if PASSPORT_RE.is_match(value) {
        Ok(())
    } else {
        Err(invalid(
            "passport",
            "Passport must contain 2 letters and 6 digits (e.g. AN123456)",
        ))
    }
}

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(value) {
        Ok(())
    } else {
        Err(invalid("phone", "Phone must be in the format +996XXXXXXXXX"))
    }
}

pub fn validate_address(value: &str) -> Result<(), ValidationError> {
    if value.trim().chars().count() >= 5 {
        Ok(())
    } else {
        Err(invalid("address", "Address is too short"))
    }
}

pub fn validate_birth_date(value: &NaiveDate) -> Result<(), ValidationError> {
    if *value > Utc::now().date_naive() {
        Err(invalid("birth_date", "Birth date cannot be in the future"))
    } else {
        Ok(())
    }
}

/// Age in full years on the given day
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing, default)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub passport: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// Short user representation embedded in issues and reports
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// User query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Search in names, passport, phone and username
    pub search: Option<String>,
    pub role: Option<Role>,
    /// `last_name`, `username`, prefixed by `-` for descending order
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create user request (librarian)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3 to 150 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: Option<NaiveDate>,
    #[validate(custom(function = "validate_passport"))]
    pub passport: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(custom(function = "validate_address"))]
    pub address: Option<String>,
    pub role: Option<Role>,
}

/// Update user request (librarian); absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3 to 150 characters"))]
    pub username: Option<String>,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: Option<NaiveDate>,
    #[validate(custom(function = "validate_passport"))]
    pub passport: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(custom(function = "validate_address"))]
    pub address: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Public self-registration request; the role is always `reader`
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3 to 150 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub birth_date: NaiveDate,
    #[validate(custom(function = "validate_passport"))]
    pub passport: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(custom(function = "validate_address"))]
    pub address: String,
}

impl RegisterUser {
    /// Reject registrants younger than `min_age` on `today`
    pub fn check_age(&self, min_age: u32, today: NaiveDate) -> Result<(), AppError> {
        if age_on(self.birth_date, today) < min_age as i32 {
            return Err(AppError::Validation(format!(
                "birth_date: Registration is only allowed from the age of {}",
                min_age
            )));
        }
        Ok(())
    }

    pub fn into_create(self) -> CreateUser {
        CreateUser {
            username: self.username,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            middle_name: self.middle_name,
            email: self.email,
            birth_date: Some(self.birth_date),
            passport: Some(self.passport),
            phone: Some(self.phone),
            address: Some(self.address),
            role: Some(Role::Reader),
        }
    }
}

/// Kind of JWT, so that a refresh token cannot be used as an access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Access and refresh tokens issued together at login or registration
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub token_type: TokenKind,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(user: &User, token_type: TokenKind, lifetime: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            token_type,
            jti: uuid::Uuid::new_v4().to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Bring the claims in line with the stored account: inactive accounts are
    /// rejected and the role is the one currently in the database
    pub fn apply_account(&mut self, user: &User) -> Result<(), AppError> {
        if !user.is_active {
            return Err(AppError::Authentication("Account is inactive".to_string()));
        }
        self.role = user.role;
        Ok(())
    }

    pub fn is_librarian(&self) -> bool {
        self.role == Role::Librarian
    }

    /// Require the librarian role
    pub fn require_librarian(&self) -> Result<(), AppError> {
        if self.is_librarian() {
            Ok(())
        } else {
            Err(AppError::Authorization("Librarian role required".to_string()))
        }
    }

    /// Allow the owner of a record or any librarian
    pub fn require_owner_or_librarian(&self, owner_id: i32) -> Result<(), AppError> {
        if self.is_librarian() || self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "You do not have permission to access this record".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_user(role: Role) -> User {
        User {
            id: 7,
            username: "aibek".to_string(),
            password: String::new(),
            first_name: "Aibek".to_string(),
            last_name: "Osmonov".to_string(),
            middle_name: "Talantovich".to_string(),
            email: String::new(),
            birth_date: None,
            passport: None,
            phone: None,
            address: None,
            role,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_passport_format() {
        assert!(validate_passport("AN123456").is_ok());
        assert!(validate_passport("ИД654321").is_ok());
        assert!(validate_passport("an123456").is_err());
        assert!(validate_passport("A1234567").is_err());
        assert!(validate_passport("AN12345").is_err());
    }

    #[test]
    fn test_phone_format() {
        assert!(validate_phone("+996555123456").is_ok());
        assert!(validate_phone("996555123456").is_err());
        assert!(validate_phone("+99655512345").is_err());
        assert!(validate_phone("+7555123456").is_err());
    }

    #[test]
    fn test_address_length() {
        assert!(validate_address("Bishkek").is_ok());
        assert!(validate_address("  ab  ").is_err());
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        assert_eq!(age_on(date(2010, 6, 15), date(2024, 6, 14)), 13);
        assert_eq!(age_on(date(2010, 6, 15), date(2024, 6, 15)), 14);
        assert_eq!(age_on(date(2010, 6, 15), date(2024, 12, 1)), 14);
    }

    #[test]
    fn test_register_rejects_underage() {
        let request = RegisterUser {
            username: "young".to_string(),
            password: "secret".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            middle_name: String::new(),
            email: None,
            birth_date: date(2012, 1, 1),
            passport: "AN123456".to_string(),
            phone: "+996555123456".to_string(),
            address: "Bishkek, Chui 1".to_string(),
        };
        assert!(request.validate().is_ok());
        assert!(request.check_age(14, date(2025, 12, 31)).is_err());
        assert!(request.check_age(14, date(2026, 1, 1)).is_ok());
        assert_eq!(request.into_create().role, Some(Role::Reader));
    }

    #[test]
    fn test_create_user_validation_collects_fields() {
        let request = CreateUser {
            username: "ab".to_string(),
            password: "secret".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            middle_name: String::new(),
            email: None,
            birth_date: None,
            passport: Some("bad".to_string()),
            phone: None,
            address: None,
            role: None,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("passport"));
        assert!(!fields.contains_key("phone"));
    }

    #[test]
    fn test_token_round_trip() {
        let user = sample_user(Role::Librarian);
        let claims = UserClaims::new(&user, TokenKind::Access, chrono::Duration::minutes(5));
        let token = claims.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.role, Role::Librarian);
        assert_eq!(parsed.token_type, TokenKind::Access);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let user = sample_user(Role::Reader);
        let claims = UserClaims::new(&user, TokenKind::Access, chrono::Duration::hours(-2));
        let token = claims.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn test_apply_account_uses_stored_state() {
        let librarian = sample_user(Role::Librarian);
        let mut claims = UserClaims::new(&librarian, TokenKind::Access, chrono::Duration::minutes(5));

        let mut demoted = librarian.clone();
        demoted.role = Role::Reader;
        claims.apply_account(&demoted).unwrap();
        assert_eq!(claims.role, Role::Reader);
        assert!(claims.require_librarian().is_err());

        let mut inactive = librarian.clone();
        inactive.is_active = false;
        let mut claims = UserClaims::new(&librarian, TokenKind::Access, chrono::Duration::minutes(5));
        assert!(matches!(
            claims.apply_account(&inactive),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_owner_or_librarian() {
        let reader = UserClaims::new(&sample_user(Role::Reader), TokenKind::Access, chrono::Duration::minutes(5));
        assert!(reader.require_owner_or_librarian(7).is_ok());
        assert!(reader.require_owner_or_librarian(8).is_err());
        assert!(reader.require_librarian().is_err());

        let librarian = UserClaims::new(&sample_user(Role::Librarian), TokenKind::Access, chrono::Duration::minutes(5));
        assert!(librarian.require_owner_or_librarian(8).is_ok());
    }
}
