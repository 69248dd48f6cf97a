//! Member model, roles and the authenticated actor

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::text_enum_sqlx;
use crate::error::{AppError, AppResult};

/// A membership is valid for this many days after `membership_date`
pub const MEMBERSHIP_PERIOD_DAYS: i64 = 365;

/// Member role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest,
    Student,
    Teacher,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    /// Library staff: may manage the catalog, members and other members' loans
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "guest" => Ok(Role::Guest),
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

text_enum_sqlx!(Role);

/// Library member (one row per user identity)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub login: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub card_number: Option<String>,
    pub role: Role,
    pub is_active: bool,
    /// Negative balance is a debt
    pub fine_balance: Decimal,
    pub membership_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn expiration_date(&self) -> NaiveDate {
        self.membership_date + Duration::days(MEMBERSHIP_PERIOD_DAYS)
    }

    pub fn is_membership_valid(&self, today: NaiveDate) -> bool {
        self.expiration_date() >= today
    }

    /// Staff always may borrow; everyone else needs an active, unexpired membership
    pub fn can_borrow(&self, today: NaiveDate) -> bool {
        if self.role.is_staff() {
            return true;
        }
        self.is_active && self.is_membership_valid(today)
    }

    pub fn display_name(&self) -> String {
        match (&self.firstname, &self.lastname) {
            (Some(first), Some(last)) if !first.is_empty() || !last.is_empty() => {
                format!("{} {}", first, last).trim().to_string()
            }
            (Some(first), None) if !first.is_empty() => first.clone(),
            (None, Some(last)) if !last.is_empty() => last.clone(),
            _ => self.login.clone(),
        }
    }
}

/// Member with derived membership fields
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberDetails {
    #[serde(flatten)]
    pub member: Member,
    pub expiration_date: NaiveDate,
    pub can_borrow: bool,
    pub open_loans: i64,
}

impl MemberDetails {
    pub fn new(member: Member, open_loans: i64, today: NaiveDate) -> Self {
        Self {
            expiration_date: member.expiration_date(),
            can_borrow: member.can_borrow(today),
            open_loans,
            member,
        }
    }
}

/// Short member representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MemberShort {
    pub id: i32,
    pub login: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub card_number: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub fine_balance: Decimal,
    pub open_loans: Option<i64>,
}

/// Member search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct MemberQuery {
    /// Search in names, login and card number
    pub q: Option<String>,
    /// "active" or "inactive"
    pub status: Option<String>,
    pub role: Option<Role>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create member request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[validate(length(min = 3, max = 150, message = "Login must be 3 to 150 characters"))]
    pub login: String,
    /// Optional: staff may register members who never log in
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Generated from the member id when absent
    #[validate(length(min = 1, max = 10, message = "Card number must be 1 to 10 characters"))]
    pub card_number: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub membership_date: Option<NaiveDate>,
}

/// Self-service registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterMember {
    #[validate(length(min = 3, max = 150, message = "Login must be 3 to 150 characters"))]
    pub login: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 30, message = "First name must be 1 to 30 characters"))]
    pub firstname: String,
    #[validate(length(min = 1, max = 30, message = "Last name must be 1 to 30 characters"))]
    pub lastname: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: Option<String>,
}

/// Registered members start as active students with a generated card number
impl From<RegisterMember> for CreateMember {
    fn from(r: RegisterMember) -> Self {
        CreateMember {
            login: r.login,
            password: Some(r.password),
            firstname: Some(r.firstname),
            lastname: Some(r.lastname),
            email: Some(r.email),
            phone: r.phone,
            address: None,
            card_number: None,
            role: Some(Role::Student),
            is_active: Some(true),
            membership_date: None,
        }
    }
}

/// Update member request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMember {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(min = 1, max = 10, message = "Card number must be 1 to 10 characters"))]
    pub card_number: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub membership_date: Option<NaiveDate>,
}

/// Top-up request
#[derive(Debug, Deserialize, ToSchema)]
pub struct TopUpRequest {
    /// Positive amount credited to the fine balance
    pub amount: Decimal,
}

/// JWT claims for authenticated members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberClaims {
    pub sub: String,
    pub member_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl MemberClaims {
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

    pub fn actor(&self) -> Actor {
        Actor {
            member_id: self.member_id,
            role: self.role,
        }
    }
}

/// The member on whose behalf an operation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub member_id: i32,
    pub role: Role,
}

impl Actor {
    pub fn new(member_id: i32, role: Role) -> Self {
        Self { member_id, role }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn require_staff(&self) -> AppResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Library staff privileges required".to_string()))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Members act for themselves; staff act for anyone
    pub fn require_self_or_staff(&self, member_id: i32) -> AppResult<()> {
        if self.member_id == member_id || self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "You can only perform this operation for your own account".to_string(),
            ))
        }
    }
}
