//! Category model

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

static COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

pub const DEFAULT_COLOR: &str = "#6c757d";

/// Category record with derived book count
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub book_count: i64,
}

/// Category reference embedded in book details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CategoryShort {
    pub id: i32,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct CategoryQuery {
    /// Include inactive categories
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(regex(path = *COLOR_RE, message = "Color must be a #rrggbb hex value"))]
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(regex(path = *COLOR_RE, message = "Color must be a #rrggbb hex value"))]
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_validation() {
        let ok = CreateCategory {
            name: "Poetry".to_string(),
            description: None,
            color: Some("#1a2B3c".to_string()),
            is_active: None,
        };
        assert!(ok.validate().is_ok());

        let bad = CreateCategory {
            name: "Poetry".to_string(),
            description: None,
            color: Some("blue".to_string()),
            is_active: None,
        };
        assert!(bad.validate().is_err());
    }
}
