//! Member management service

use chrono::Utc;
use validator::Validate;

use super::auth::hash_password;
use crate::{
    error::{AppError, AppResult},
    models::member::{
        Actor, CreateMember, Member, MemberDetails, MemberQuery, MemberShort, Role, UpdateMember,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    async fn details(&self, member: Member) -> AppResult<MemberDetails> {
        let open_loans = self.repository.loans.count_open_for_member(member.id).await?;
        Ok(MemberDetails::new(member, open_loans, Utc::now().date_naive()))
    }

    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<MemberDetails> {
        actor.require_self_or_staff(id)?;
        let member = self.repository.members.get_by_id(id).await?;
        self.details(member).await
    }

    pub async fn search(&self, actor: &Actor, query: &MemberQuery) -> AppResult<(Vec<MemberShort>, i64)> {
        actor.require_staff()?;
        self.repository.members.search(query).await
    }

    /// Register a member (staff only; only admins hand out staff roles)
    pub async fn create(&self, actor: &Actor, request: CreateMember) -> AppResult<MemberDetails> {
        actor.require_staff()?;
        request.validate()?;
        if request.role.map_or(false, |r| r.is_staff()) {
            actor.require_admin()?;
        }

        let password = match request.password {
            Some(ref p) => Some(hash_password(p)?),
            None => None,
        };

        let member = self.repository.members.create(&request, password).await?;
        tracing::info!(member_id = member.id, role = %member.role, "Member created");
        self.details(member).await
    }

    /// Members may edit their contact details and password; staff edit everything
    pub async fn update(&self, actor: &Actor, id: i32, request: UpdateMember) -> AppResult<MemberDetails> {
        actor.require_self_or_staff(id)?;
        request.validate()?;
        let target = self.repository.members.get_by_id(id).await?;
        check_update_rights(actor, &target, &request)?;

        let password = match request.password {
            Some(ref p) => Some(hash_password(p)?),
            None => None,
        };

        let member = self.repository.members.update(id, &request, password).await?;
        tracing::info!(member_id = id, "Member updated");
        self.details(member).await
    }

    pub async fn delete(&self, actor: &Actor, id: i32) -> AppResult<()> {
        actor.require_staff()?;
        let target = self.repository.members.get_by_id(id).await?;
        check_delete_rights(actor, &target)?;
        self.repository.members.delete(id).await?;
        tracing::info!(member_id = id, "Member deleted");
        Ok(())
    }

    /// Restart the membership period today
    pub async fn renew(&self, actor: &Actor, id: i32) -> AppResult<MemberDetails> {
        actor.require_staff()?;
        let member = self
            .repository
            .members
            .renew(id, Utc::now().date_naive())
            .await?;
        tracing::info!(member_id = id, expires = %member.expiration_date(), "Membership renewed");
        self.details(member).await
    }
}

/// Field-level rules for editing `target`, on top of the self-or-staff check
fn check_update_rights(actor: &Actor, target: &Member, request: &UpdateMember) -> AppResult<()> {
    let restricted = request.role.is_some()
        || request.is_active.is_some()
        || request.membership_date.is_some()
        || request.card_number.is_some();
    if restricted {
        actor.require_staff()?;
    }

    if actor.member_id == target.id {
        if request.role.map_or(false, |r| r != actor.role) {
            return Err(AppError::Authorization("You cannot change your own role".to_string()));
        }
        return Ok(());
    }

    // Staff accounts and staff roles are the admin's business
    let grants_staff = request.role.map_or(false, |r| r.is_staff());
    if grants_staff || target.role.is_staff() {
        actor.require_admin()?;
    }
    Ok(())
}

fn check_delete_rights(actor: &Actor, target: &Member) -> AppResult<()> {
    if actor.member_id == target.id {
        return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
    }
    if target.role == Role::Admin {
        actor.require_admin()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::member::tests::member;

    fn account(id: i32, role: Role) -> Member {
        member(id, role, Utc::now().date_naive())
    }

    fn role_change(role: Role) -> UpdateMember {
        UpdateMember {
            role: Some(role),
            ..Default::default()
        }
    }

    #[test]
    fn test_member_edits_own_contact_details() {
        let actor = Actor::new(5, Role::Student);
        let update = UpdateMember {
            email: Some("new@example.org".to_string()),
            ..Default::default()
        };
        assert!(check_update_rights(&actor, &account(5, Role::Student), &update).is_ok());
    }

    #[test]
    fn test_member_cannot_touch_restricted_fields() {
        let actor = Actor::new(5, Role::Student);
        let update = UpdateMember {
            is_active: Some(true),
            ..Default::default()
        };
        let err = check_update_rights(&actor, &account(5, Role::Student), &update).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[test]
    fn test_nobody_changes_their_own_role() {
        let staff = Actor::new(1, Role::Staff);
        let err = check_update_rights(&staff, &account(1, Role::Staff), &role_change(Role::Admin)).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let admin = Actor::new(2, Role::Admin);
        assert!(check_update_rights(&admin, &account(2, Role::Admin), &role_change(Role::Student)).is_err());
        assert!(check_update_rights(&admin, &account(2, Role::Admin), &role_change(Role::Admin)).is_ok());
    }

    #[test]
    fn test_granting_staff_role_needs_admin() {
        let target = account(9, Role::Student);
        let staff = Actor::new(1, Role::Staff);
        assert!(check_update_rights(&staff, &target, &role_change(Role::Staff)).is_err());
        assert!(check_update_rights(&staff, &target, &role_change(Role::Teacher)).is_ok());

        let admin = Actor::new(2, Role::Admin);
        assert!(check_update_rights(&admin, &target, &role_change(Role::Staff)).is_ok());
    }

    #[test]
    fn test_staff_accounts_are_edited_by_admins_only() {
        let update = UpdateMember {
            phone: Some("555-0100".to_string()),
            ..Default::default()
        };
        let colleague = account(3, Role::Staff);
        assert!(check_update_rights(&Actor::new(1, Role::Staff), &colleague, &update).is_err());
        assert!(check_update_rights(&Actor::new(2, Role::Admin), &colleague, &update).is_ok());
    }

    #[test]
    fn test_self_delete_is_refused() {
        let err = check_delete_rights(&Actor::new(2, Role::Admin), &account(2, Role::Admin)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_only_admins_delete_admins() {
        let admin_account = account(7, Role::Admin);
        assert!(check_delete_rights(&Actor::new(1, Role::Staff), &admin_account).is_err());
        assert!(check_delete_rights(&Actor::new(2, Role::Admin), &admin_account).is_ok());
        assert!(check_delete_rights(&Actor::new(1, Role::Staff), &account(8, Role::Student)).is_ok());
    }
}
