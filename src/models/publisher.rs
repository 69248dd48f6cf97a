//! Publisher model

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Publisher record with derived book count
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Publisher {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub established_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub book_count: i64,
}

/// Publisher reference embedded in book details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PublisherShort {
    pub id: i32,
    pub name: String,
}

/// Founding year must lie between 1000 and the current year
pub fn check_established_year(year: Option<i32>) -> AppResult<()> {
    match year {
        Some(y) if !(1000..=Utc::now().year()).contains(&y) => Err(AppError::Validation(
            "Established year must be between 1000 and the current year".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePublisher {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
    pub address: Option<String>,
    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(url(message = "Invalid website URL"))]
    pub website: Option<String>,
    pub established_year: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePublisher {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(url(message = "Invalid website URL"))]
    pub website: Option<String>,
    pub established_year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_established_year_bounds() {
        assert!(check_established_year(Some(999)).is_err());
        assert!(check_established_year(Some(1450)).is_ok());
        assert!(check_established_year(None).is_ok());
        assert!(check_established_year(Some(Utc::now().year() + 1)).is_err());
    }
}
