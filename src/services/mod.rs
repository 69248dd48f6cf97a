//! Business logic services

pub mod auth;
pub mod catalog;
pub mod email;
pub mod lending;
pub mod members;
pub mod notifier;
pub mod reservations;
pub mod scan;
pub mod stats;

use std::sync::Arc;

use crate::{
    config::{AuthConfig, EmailConfig, LendingConfig},
    error::AppResult,
    repository::{LedgerStore, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub members: members::MembersService,
    pub lending: lending::LendingService,
    pub reservations: reservations::ReservationsService,
    pub scan: scan::ScanService,
    pub stats: stats::StatsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        email_config: EmailConfig,
        lending_config: LendingConfig,
    ) -> Self {
        let store: Arc<dyn LedgerStore> = Arc::new(repository.clone());
        let notifier: Arc<dyn notifier::Notifier> = Arc::new(email::EmailService::new(email_config));
        let reservations = reservations::ReservationsService::new(store.clone(), notifier.clone());

        let lending =
            lending::LendingService::new(store.clone(), reservations.clone(), notifier, lending_config);

        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone(), reservations.clone()),
            members: members::MembersService::new(repository.clone()),
            scan: scan::ScanService::new(store, lending.clone()),
            lending,
            reservations,
            stats: stats::StatsService::new(repository.clone()),
            repository,
        }
    }

    /// Database round-trip for readiness checks
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
