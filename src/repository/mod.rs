//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod categories;
pub mod ledger;
pub mod loans;
pub mod members;
pub mod publishers;
pub mod reservations;
pub mod stats;

#[cfg(test)]
pub(crate) mod memory;

use sqlx::{Pool, Postgres};

pub use ledger::{CheckIn, LedgerStore};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub authors: authors::AuthorsRepository,
    pub publishers: publishers::PublishersRepository,
    pub categories: categories::CategoriesRepository,
    pub members: members::MembersRepository,
    pub loans: loans::LoansRepository,
    pub reservations: reservations::ReservationsRepository,
    pub stats: stats::StatsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            authors: authors::AuthorsRepository::new(pool.clone()),
            publishers: publishers::PublishersRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            members: members::MembersRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            stats: stats::StatsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Page size of loan, reservation and member listings
pub(crate) const DEFAULT_PER_PAGE: i64 = 20;

const MAX_PER_PAGE: i64 = 200;

/// Clamp pagination parameters to (page, per_page, offset)
pub(crate) fn paginate(page: Option<i64>, per_page: Option<i64>, default_per_page: i64) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).clamp(1, i64::MAX / MAX_PER_PAGE);
    let per_page = per_page.unwrap_or(default_per_page).clamp(1, MAX_PER_PAGE);
    (page, per_page, (page - 1) * per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_defaults_and_bounds() {
        assert_eq!(paginate(None, None, DEFAULT_PER_PAGE), (1, 20, 0));
        assert_eq!(paginate(Some(2), None, DEFAULT_PER_PAGE), (2, 20, 20));
        assert_eq!(paginate(Some(0), Some(0), 12), (1, 1, 0));
        assert_eq!(paginate(Some(-4), Some(10_000), 12), (1, 200, 0));
    }

    #[test]
    fn test_paginate_huge_page_does_not_overflow() {
        let (page, per_page, offset) = paginate(Some(i64::MAX), Some(200), DEFAULT_PER_PAGE);
        assert_eq!(per_page, 200);
        assert_eq!(page, i64::MAX / 200);
        assert!(offset >= 0);
    }
}
