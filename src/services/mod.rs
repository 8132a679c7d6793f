//! Business logic services

pub mod auth;
pub mod catalog;
pub mod lending;
pub mod reports;
pub mod users;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
    pub reports: reports::ReportsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let users = users::UsersService::new(repository.clone());
        Self {
            auth: auth::AuthService::new(
                repository.clone(),
                users.clone(),
                config.auth.clone(),
                &config.lending,
            ),
            users,
            catalog: catalog::CatalogService::new(repository.clone()),
            lending: lending::LendingService::new(repository.clone(), config.lending.clone()),
            reports: reports::ReportsService::new(repository.clone(), config.lending.fine_per_day),
            repository,
        }
    }

    /// Database round-trip for the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
