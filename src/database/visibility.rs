use uuid::Uuid;

use crate::database::list::{ListBuilder, SqlParam};
use crate::database::models::{Profile, RoleType};

/// What slice of the company a caller can read.
///
/// Row-level security already walls off other companies; this narrows the
/// view *inside* the company by role. Corporativo sees everything, everyone
/// else sees their own department plus rows they own. Child tables follow
/// their parent objective's visibility.
#[derive(Debug, Clone, PartialEq)]
pub enum Visibility {
    Company,
    DepartmentOrOwn {
        department: Option<String>,
        profile_id: Uuid,
    },
}

impl Visibility {
    pub fn for_profile(profile: &Profile) -> Self {
        match profile.role_type {
            RoleType::Corporativo => Visibility::Company,
            RoleType::Gerencial | RoleType::Colaborador => Visibility::DepartmentOrOwn {
                department: profile.department.clone(),
                profile_id: profile.id,
            },
        }
    }

    /// Append the read predicate for the objectives table.
    pub fn apply_objectives(&self, b: &mut ListBuilder) {
        match self {
            Visibility::Company => {}
            Visibility::DepartmentOrOwn {
                department,
                profile_id,
            } => {
                let me = b.bind(SqlParam::Uuid(*profile_id));
                match department {
                    Some(dept) => {
                        let dept = b.bind(SqlParam::Text(dept.clone()));
                        b.push(&format!(
                            " AND (department = ${dept} OR owner_id = ${me})"
                        ));
                    }
                    None => {
                        b.push(&format!(" AND owner_id = ${me}"));
                    }
                }
            }
        }
    }

    /// Append the read predicate for the profiles table. The "own row"
    /// column is `id` here: the profile is the person.
    pub fn apply_profiles(&self, b: &mut ListBuilder) {
        match self {
            Visibility::Company => {}
            Visibility::DepartmentOrOwn {
                department,
                profile_id,
            } => {
                let me = b.bind(SqlParam::Uuid(*profile_id));
                match department {
                    Some(dept) => {
                        let dept = b.bind(SqlParam::Text(dept.clone()));
                        b.push(&format!(" AND (department = ${dept} OR id = ${me})"));
                    }
                    None => {
                        b.push(&format!(" AND id = ${me}"));
                    }
                }
            }
        }
    }

    /// Append the read predicate for the initiatives table: own rows, plus
    /// rows under a visible objective.
    pub fn apply_initiatives(&self, b: &mut ListBuilder) {
        match self {
            Visibility::Company => {}
            Visibility::DepartmentOrOwn {
                department,
                profile_id,
            } => {
                let me = b.bind(SqlParam::Uuid(*profile_id));
                match department {
                    Some(dept) => {
                        let dept = b.bind(SqlParam::Text(dept.clone()));
                        b.push(&format!(
                            " AND (owner_id = ${me} OR objective_id IN \
                             (SELECT id FROM objectives WHERE deleted_at IS NULL \
                             AND (department = ${dept} OR owner_id = ${me})))"
                        ));
                    }
                    None => {
                        b.push(&format!(" AND owner_id = ${me}"));
                    }
                }
            }
        }
    }

    /// Append the read predicate for the activities table: own rows, plus
    /// rows whose initiative is visible.
    pub fn apply_activities(&self, b: &mut ListBuilder) {
        match self {
            Visibility::Company => {}
            Visibility::DepartmentOrOwn {
                department,
                profile_id,
            } => {
                let me = b.bind(SqlParam::Uuid(*profile_id));
                match department {
                    Some(dept) => {
                        let dept = b.bind(SqlParam::Text(dept.clone()));
                        b.push(&format!(
                            " AND (owner_id = ${me} OR initiative_id IN \
                             (SELECT i.id FROM initiatives i \
                             JOIN objectives o ON o.id = i.objective_id \
                             WHERE o.deleted_at IS NULL \
                             AND (i.owner_id = ${me} OR o.department = ${dept} OR o.owner_id = ${me})))"
                        ));
                    }
                    None => {
                        b.push(&format!(" AND owner_id = ${me}"));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(role: RoleType, department: Option<&str>) -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::new_v4(),
            auth_user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            email: "p@example.com".to_string(),
            full_name: "P".to_string(),
            role_type: role,
            department: department.map(|s| s.to_string()),
            onboarding_completed: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn corporativo_gets_no_extra_predicate() {
        let vis = Visibility::for_profile(&profile(RoleType::Corporativo, Some("hq")));
        let mut b = ListBuilder::new("SELECT * FROM objectives WHERE deleted_at IS NULL");
        vis.apply_objectives(&mut b);
        assert_eq!(b.sql(), "SELECT * FROM objectives WHERE deleted_at IS NULL");
        assert!(b.params().is_empty());
    }

    #[test]
    fn colaborador_sees_department_or_own_objectives() {
        let vis = Visibility::for_profile(&profile(RoleType::Colaborador, Some("sales")));
        let mut b = ListBuilder::new("SELECT * FROM objectives WHERE deleted_at IS NULL");
        vis.apply_objectives(&mut b);
        assert_eq!(
            b.sql(),
            "SELECT * FROM objectives WHERE deleted_at IS NULL \
             AND (department = $2 OR owner_id = $1)"
        );
        assert_eq!(b.params().len(), 2);
    }

    #[test]
    fn member_without_department_sees_only_own_rows() {
        let vis = Visibility::for_profile(&profile(RoleType::Gerencial, None));
        let mut b = ListBuilder::new("SELECT * FROM objectives WHERE deleted_at IS NULL");
        vis.apply_objectives(&mut b);
        assert_eq!(
            b.sql(),
            "SELECT * FROM objectives WHERE deleted_at IS NULL AND owner_id = $1"
        );
    }

    #[test]
    fn initiative_predicate_follows_parent_objective() {
        let vis = Visibility::for_profile(&profile(RoleType::Colaborador, Some("sales")));
        let mut b = ListBuilder::new("SELECT * FROM initiatives WHERE true");
        vis.apply_initiatives(&mut b);
        let sql = b.sql();
        assert!(sql.contains("owner_id = $1"));
        assert!(sql.contains("objective_id IN (SELECT id FROM objectives"));
        assert!(sql.contains("department = $2"));
        assert_eq!(sql.matches('(').count(), sql.matches(')').count());
    }

    #[test]
    fn activity_predicate_goes_through_initiative_join() {
        let vis = Visibility::for_profile(&profile(RoleType::Colaborador, Some("sales")));
        let mut b = ListBuilder::new("SELECT * FROM activities WHERE true");
        vis.apply_activities(&mut b);
        let sql = b.sql();
        assert!(sql.contains("JOIN objectives o ON o.id = i.objective_id"));
        assert!(sql.contains("o.department = $2"));
        assert_eq!(sql.matches('(').count(), sql.matches(')').count());
    }

    #[test]
    fn profile_predicate_matches_on_id() {
        let vis = Visibility::for_profile(&profile(RoleType::Colaborador, Some("sales")));
        let mut b = ListBuilder::new("SELECT * FROM profiles WHERE true");
        vis.apply_profiles(&mut b);
        assert_eq!(
            b.sql(),
            "SELECT * FROM profiles WHERE true AND (department = $2 OR id = $1)"
        );
    }

    #[test]
    fn visibility_same_for_gerencial_and_colaborador_reads() {
        let a = Visibility::for_profile(&profile(RoleType::Gerencial, Some("ops")));
        let b = Visibility::for_profile(&profile(RoleType::Colaborador, Some("ops")));
        match (&a, &b) {
            (
                Visibility::DepartmentOrOwn { department: d1, .. },
                Visibility::DepartmentOrOwn { department: d2, .. },
            ) => assert_eq!(d1, d2),
            _ => panic!("both roles should read department-or-own"),
        }
    }
}
