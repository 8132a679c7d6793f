//! User management service

use chrono::NaiveDate;
use validator::Validate;

use super::auth::hash_password;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::Role,
        user::{CreateUser, RegisterUser, UpdateUser, User, UserQuery},
    },
    repository::{users::UniqueColumn, Repository},
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users
    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.search(query).await
    }

    /// Create a new user (librarian)
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;

        self.ensure_unique(
            &[
                (UniqueColumn::Username, Some(user.username.as_str())),
                (UniqueColumn::Passport, user.passport.as_deref()),
                (UniqueColumn::Phone, user.phone.as_deref()),
            ],
            None,
        )
        .await?;

        let password = hash_password(&user.password)?;
        let created = self.repository.users.create(&user, &password).await?;

        tracing::info!(user_id = created.id, role = %created.role, "User created");
        Ok(created)
    }

    /// Self-registration: same checks as creation plus a minimum age, always as a reader
    pub async fn register(
        &self,
        request: RegisterUser,
        min_age: u32,
        today: NaiveDate,
    ) -> AppResult<User> {
        request.validate()?;
        request.check_age(min_age, today)?;

        self.create_user(request.into_create()).await
    }

    /// Update an existing user
    pub async fn update_user(&self, id: i32, user: UpdateUser) -> AppResult<User> {
        user.validate()?;

        // Check if user exists
        self.repository.users.get_by_id(id).await?;

        self.ensure_unique(
            &[
                (UniqueColumn::Username, user.username.as_deref()),
                (UniqueColumn::Passport, user.passport.as_deref()),
                (UniqueColumn::Phone, user.phone.as_deref()),
            ],
            Some(id),
        )
        .await?;

        let password = match user.password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };

        self.repository
            .users
            .update(id, &user, password.as_deref())
            .await
    }

    /// Create the initial librarian account unless the username is already used
    pub async fn ensure_librarian(&self, username: &str, password: &str) -> AppResult<()> {
        if self
            .repository
            .users
            .value_taken(UniqueColumn::Username, username, None)
            .await?
        {
            return Ok(());
        }

        self.create_user(CreateUser {
            username: username.to_string(),
            password: password.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            middle_name: String::new(),
            email: None,
            birth_date: None,
            passport: None,
            phone: None,
            address: None,
            role: Some(Role::Librarian),
        })
        .await?;
        Ok(())
    }

    /// Deactivate a user
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.deactivate(id).await?;
        tracing::info!(user_id = id, "User deactivated");
        Ok(())
    }

    async fn ensure_unique(
        &self,
        values: &[(UniqueColumn, Option<&str>)],
        exclude_id: Option<i32>,
    ) -> AppResult<()> {
        for (column, value) in values {
            let Some(value) = value else { continue };
            if self
                .repository
                .users
                .value_taken(*column, value, exclude_id)
                .await?
            {
                return Err(AppError::Conflict(format!(
                    "A user with this {} already exists",
                    column.label()
                )));
            }
        }
        Ok(())
    }
}
