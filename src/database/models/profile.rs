use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role within a company. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoleType {
    /// Company-wide access, company administration.
    Corporativo,
    /// Department manager.
    Gerencial,
    /// Individual contributor.
    Colaborador,
}

impl RoleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::Corporativo => "corporativo",
            RoleType::Gerencial => "gerencial",
            RoleType::Colaborador => "colaborador",
        }
    }

    /// Whether this role may create invitations at all.
    pub fn can_invite(&self) -> bool {
        matches!(self, RoleType::Corporativo | RoleType::Gerencial)
    }

    /// Whether this role may hand out the given role in an invitation.
    /// Managers can only bring in contributors; corporativo can grant
    /// anything.
    pub fn can_grant(&self, invited: RoleType) -> bool {
        match self {
            RoleType::Corporativo => true,
            RoleType::Gerencial => invited == RoleType::Colaborador,
            RoleType::Colaborador => false,
        }
    }

    pub fn can_edit_company(&self) -> bool {
        matches!(self, RoleType::Corporativo)
    }
}

impl std::fmt::Display for RoleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application user record, linked 1:1 to an identity-provider user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    /// Identity-provider subject. Unique; the JWT `sub` claim maps here.
    pub auth_user_id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role_type: RoleType,
    pub department: Option<String>,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Whether this profile may edit the target profile. Role changes are
    /// reserved for corporativo; managers may edit non-role fields of
    /// profiles inside their own department.
    pub fn can_manage(&self, target: &Profile, changes_role: bool) -> bool {
        match self.role_type {
            RoleType::Corporativo => true,
            RoleType::Gerencial => {
                !changes_role && self.department.is_some() && self.department == target.department
            }
            RoleType::Colaborador => false,
        }
    }

    /// Whether this profile may mutate an OKR row: its owner, corporativo,
    /// or gerencial inside the row's department. For initiatives and
    /// activities the department is the parent objective's.
    pub fn can_modify_okr(&self, owner_id: Option<Uuid>, department: Option<&str>) -> bool {
        if owner_id == Some(self.id) {
            return true;
        }
        match self.role_type {
            RoleType::Corporativo => true,
            RoleType::Gerencial => {
                self.department.is_some() && self.department.as_deref() == department
            }
            RoleType::Colaborador => false,
        }
    }
}

/// Static permission granted when a profile is created.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfilePermission {
    pub profile_id: Uuid,
    pub permission: String,
    pub granted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: RoleType, department: Option<&str>) -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::new_v4(),
            auth_user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            email: "person@example.com".to_string(),
            full_name: "Test Person".to_string(),
            role_type: role,
            department: department.map(|s| s.to_string()),
            onboarding_completed: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn corporativo_manages_everyone() {
        let boss = profile(RoleType::Corporativo, None);
        let other = profile(RoleType::Colaborador, Some("sales"));
        assert!(boss.can_manage(&other, true));
        assert!(boss.can_manage(&other, false));
    }

    #[test]
    fn gerencial_manages_own_department_without_role_changes() {
        let manager = profile(RoleType::Gerencial, Some("sales"));
        let same_dept = profile(RoleType::Colaborador, Some("sales"));
        let other_dept = profile(RoleType::Colaborador, Some("engineering"));

        assert!(manager.can_manage(&same_dept, false));
        assert!(!manager.can_manage(&same_dept, true));
        assert!(!manager.can_manage(&other_dept, false));
    }

    #[test]
    fn gerencial_without_department_manages_nobody() {
        let manager = profile(RoleType::Gerencial, None);
        let target = profile(RoleType::Colaborador, None);
        assert!(!manager.can_manage(&target, false));
    }

    #[test]
    fn colaborador_manages_nobody() {
        let worker = profile(RoleType::Colaborador, Some("sales"));
        let peer = profile(RoleType::Colaborador, Some("sales"));
        assert!(!worker.can_manage(&peer, false));
    }

    #[test]
    fn okr_mutation_rule() {
        let owner = profile(RoleType::Colaborador, Some("sales"));
        assert!(owner.can_modify_okr(Some(owner.id), Some("engineering")));
        assert!(!owner.can_modify_okr(Some(Uuid::new_v4()), Some("sales")));

        let manager = profile(RoleType::Gerencial, Some("sales"));
        assert!(manager.can_modify_okr(None, Some("sales")));
        assert!(!manager.can_modify_okr(None, Some("engineering")));
        assert!(!manager.can_modify_okr(None, None));

        let boss = profile(RoleType::Corporativo, None);
        assert!(boss.can_modify_okr(None, Some("anything")));
    }

    #[test]
    fn invitation_role_grants() {
        assert!(RoleType::Corporativo.can_grant(RoleType::Corporativo));
        assert!(RoleType::Corporativo.can_grant(RoleType::Gerencial));
        assert!(RoleType::Gerencial.can_grant(RoleType::Colaborador));
        assert!(!RoleType::Gerencial.can_grant(RoleType::Gerencial));
        assert!(!RoleType::Colaborador.can_invite());
    }
}
