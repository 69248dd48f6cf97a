//! Statistics service

use crate::{
    error::AppResult,
    models::{member::Actor, stats::StatsResponse},
    repository::Repository,
};

const POPULAR_BOOKS: i64 = 5;

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Dashboard counters (staff only)
    pub async fn dashboard(&self, actor: &Actor) -> AppResult<StatsResponse> {
        actor.require_staff()?;
        let counters = self.repository.stats.counters().await?;
        let popular_books = self.repository.stats.popular_books(POPULAR_BOOKS).await?;
        Ok(StatsResponse {
            counters,
            popular_books,
        })
    }
}
