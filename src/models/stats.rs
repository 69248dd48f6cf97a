//! Dashboard statistics

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Library-wide counters
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LibraryStats {
    pub books_total: i64,
    pub books_available: i64,
    pub books_borrowed: i64,
    /// Books with one or two copies left on the shelf
    pub books_low_stock: i64,
    pub members_total: i64,
    pub members_active: i64,
    pub open_loans: i64,
    pub overdue_loans: i64,
    pub active_reservations: i64,
    /// Sum of negative fine balances, as a positive amount
    pub outstanding_debt: Decimal,
}

/// Most borrowed titles
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PopularBook {
    pub book_id: i32,
    pub title: String,
    pub borrow_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: LibraryStats,
    pub popular_books: Vec<PopularBook>,
}
