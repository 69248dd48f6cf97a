//! Authentication: password hashing, login and JWT issuance

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, MemberClaims, RegisterMember},
    repository::Repository,
};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Members registered without a password cannot log in
pub fn verify_password(member: &Member, password: &str) -> AppResult<bool> {
    let Some(ref hash) = member.password else {
        return Ok(false);
    };
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate a member by login and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, Member)> {
        let member = self
            .repository
            .members
            .get_by_login(login.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if !verify_password(&member, password)? {
            tracing::warn!(login = %login, "Failed login attempt");
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let token = self.issue_token(&member)?;
        tracing::info!(member_id = member.id, "Member logged in");
        Ok((token, member))
    }

    /// Self-service registration; the new student is logged in straight away
    pub async fn register(&self, request: RegisterMember) -> AppResult<(String, Member)> {
        request.validate()?;
        let hash = hash_password(&request.password)?;
        let member = self
            .repository
            .members
            .create(&CreateMember::from(request), Some(hash))
            .await?;

        let token = self.issue_token(&member)?;
        tracing::info!(member_id = member.id, card_number = ?member.card_number, "Member registered");
        Ok((token, member))
    }

    fn issue_token(&self, member: &Member) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = MemberClaims {
            sub: member.login.clone(),
            member_id: member.id,
            role: member.role,
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };
        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Create or reset the configured administrator account
    pub async fn ensure_admin(&self) -> AppResult<Option<Member>> {
        let Some(ref password) = self.config.admin_password else {
            return Ok(None);
        };
        let hash = hash_password(password)?;
        let admin = self
            .repository
            .members
            .upsert_admin(&self.config.admin_login, &hash)
            .await?;
        tracing::info!(member_id = admin.id, login = %admin.login, "Administrator account ready");
        Ok(Some(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::member::{tests::member, Role};

    #[test]
    fn test_password_round_trip() {
        let mut m = member(1, Role::Student, Utc::now().date_naive());
        m.password = Some(hash_password("correct horse").unwrap());
        assert!(verify_password(&m, "correct horse").unwrap());
        assert!(!verify_password(&m, "wrong horse").unwrap());
    }

    #[test]
    fn test_member_without_password_cannot_log_in() {
        let m = member(1, Role::Student, Utc::now().date_naive());
        assert!(!verify_password(&m, "").unwrap());
    }

    #[test]
    fn test_token_carries_role() {
        let now = Utc::now().timestamp();
        let claims = MemberClaims {
            sub: "ada".to_string(),
            member_id: 7,
            role: Role::Staff,
            exp: now + 3600,
            iat: now,
        };
        let token = claims.create_token("secret").unwrap();
        let parsed = MemberClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.actor().member_id, 7);
        assert!(parsed.actor().is_staff());
        assert!(MemberClaims::from_token(&token, "other").is_err());
    }
}
