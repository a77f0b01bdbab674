//! Coarse, system-wide role checks over a ranked role table.

use std::collections::HashMap;

use qaflow_core::DomainError;

use crate::{Decision, Denial, Principal, Role};

/// Role → rank table (1 = lowest).
///
/// Built once at startup. Roles absent from the table have no rank and never
/// satisfy a rank requirement, in either position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRanks {
    ranks: HashMap<Role, u8>,
}

impl RoleRanks {
    /// `ft_tester < at_tester < qa < project_lead < admin < super_admin`.
    pub fn standard() -> Self {
        Self::from_order(&Role::ALL)
    }

    fn from_order(order: &[Role]) -> Self {
        let ranks = order
            .iter()
            .zip(1u8..)
            .map(|(role, rank)| (*role, rank))
            .collect();
        Self { ranks }
    }

    /// Build from role names, lowest first. Unknown or repeated names are an error.
    pub fn from_names(names: &[&str]) -> Result<Self, DomainError> {
        if names.is_empty() {
            return Err(DomainError::validation("role rank table is empty"));
        }
        let mut order: Vec<Role> = Vec::with_capacity(names.len());
        for name in names {
            let role: Role = name.parse()?;
            if order.contains(&role) {
                return Err(DomainError::validation(format!("role '{role}' ranked twice")));
            }
            order.push(role);
        }
        Ok(Self::from_order(&order))
    }

    pub fn rank(&self, role: Role) -> Option<u8> {
        self.ranks.get(&role).copied()
    }
}

impl Default for RoleRanks {
    fn default() -> Self {
        Self::standard()
    }
}

/// What a role check demands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Rank at least that of the given role.
    AtLeast(Role),
    /// Membership in a set of sibling roles; rank is ignored.
    AnyOf(Vec<Role>),
}

impl RoleRequirement {
    pub fn describe(&self) -> String {
        match self {
            RoleRequirement::AtLeast(role) => format!("role {role} or higher"),
            RoleRequirement::AnyOf(roles) => {
                let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
                format!("one of roles [{}]", names.join(", "))
            }
        }
    }
}

impl From<Role> for RoleRequirement {
    fn from(role: Role) -> Self {
        RoleRequirement::AtLeast(role)
    }
}

#[derive(Debug, Clone)]
pub struct RoleHierarchyAuthorizer {
    ranks: RoleRanks,
    denied_redirect: String,
}

impl RoleHierarchyAuthorizer {
    pub fn new(ranks: RoleRanks, denied_redirect: impl Into<String>) -> Self {
        Self {
            ranks,
            denied_redirect: denied_redirect.into(),
        }
    }

    pub fn ranks(&self) -> &RoleRanks {
        &self.ranks
    }

    pub fn satisfies(&self, user_role: Role, requirement: &RoleRequirement) -> bool {
        match requirement {
            RoleRequirement::AnyOf(roles) => roles.contains(&user_role),
            RoleRequirement::AtLeast(required) => {
                match (self.ranks.rank(user_role), self.ranks.rank(*required)) {
                    (Some(have), Some(need)) => have >= need,
                    _ => false,
                }
            }
        }
    }

    /// String-boundary variant: any name that is not a known role denies.
    pub fn satisfies_names(&self, user_role: &str, required_role: &str) -> bool {
        match (user_role.parse::<Role>(), required_role.parse::<Role>()) {
            (Ok(have), Ok(need)) => self.satisfies(have, &RoleRequirement::AtLeast(need)),
            _ => false,
        }
    }

    pub fn require_role(&self, principal: &Principal, requirement: &RoleRequirement) -> Decision {
        if self.satisfies(principal.role, requirement) {
            return Decision::Allow;
        }
        tracing::info!(
            user_id = %principal.id,
            role = %principal.role,
            required = %requirement.describe(),
            "role requirement not met"
        );
        Decision::Deny(Denial::insufficient_role(&requirement.describe(), &self.denied_redirect))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use qaflow_core::UserId;

    use crate::{Capabilities, DenialKind};

    use super::*;

    fn authorizer() -> RoleHierarchyAuthorizer {
        RoleHierarchyAuthorizer::new(RoleRanks::standard(), "/dashboard")
    }

    fn principal(role: Role) -> Principal {
        Principal {
            id: UserId::new(11),
            username: "tess".to_string(),
            display_name: "Tess".to_string(),
            role,
            force_password_reset: false,
            capabilities: Capabilities::default(),
        }
    }

    #[test]
    fn standard_ranks_follow_declaration_order() {
        let ranks = RoleRanks::standard();
        assert_eq!(ranks.rank(Role::FtTester), Some(1));
        assert_eq!(ranks.rank(Role::ProjectLead), Some(4));
        assert_eq!(ranks.rank(Role::SuperAdmin), Some(6));
    }

    #[test]
    fn set_membership_ignores_rank() {
        let a = authorizer();
        let siblings = RoleRequirement::AnyOf(vec![Role::Admin, Role::SuperAdmin]);
        assert!(a.satisfies(Role::Admin, &siblings));
        assert!(!a.satisfies(Role::ProjectLead, &siblings));

        let testers = RoleRequirement::AnyOf(vec![Role::FtTester]);
        assert!(!a.satisfies(Role::SuperAdmin, &testers));
    }

    #[test]
    fn unranked_roles_never_pass() {
        let ranks = RoleRanks::from_names(&["qa", "admin"]).unwrap();
        let a = RoleHierarchyAuthorizer::new(ranks, "/dashboard");
        assert!(!a.satisfies(Role::SuperAdmin, &RoleRequirement::AtLeast(Role::Qa)));
        assert!(!a.satisfies(Role::Admin, &RoleRequirement::AtLeast(Role::FtTester)));
        assert!(a.satisfies(Role::Admin, &RoleRequirement::AtLeast(Role::Qa)));
    }

    #[test]
    fn unknown_role_names_never_pass() {
        let a = authorizer();
        assert!(a.satisfies_names("admin", "qa"));
        assert!(!a.satisfies_names("root", "qa"));
        assert!(!a.satisfies_names("super_admin", "wizard"));
    }

    #[test]
    fn duplicate_rank_entries_are_rejected() {
        assert!(RoleRanks::from_names(&["qa", "admin", "qa"]).is_err());
        assert!(RoleRanks::from_names(&[]).is_err());
    }

    #[test]
    fn qa_is_denied_admin_with_redirect() {
        let decision = authorizer().require_role(&principal(Role::Qa), &Role::Admin.into());
        let Decision::Deny(denial) = decision else {
            panic!("expected deny");
        };
        assert_eq!(denial.kind, DenialKind::InsufficientRole);
        assert_eq!(denial.redirect_target.as_deref(), Some("/dashboard"));
        assert!(denial.message.contains("admin"));
    }

    #[test]
    fn super_admin_passes_admin_requirement() {
        assert!(authorizer().require_role(&principal(Role::SuperAdmin), &Role::Admin.into()).is_allowed());
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn rank_checks_are_transitive(a in any_role(), b in any_role(), c in any_role()) {
            let auth = authorizer();
            let mut sorted = [a, b, c];
            sorted.sort();
            let [low, mid, high] = sorted;

            prop_assert!(auth.satisfies(high, &RoleRequirement::AtLeast(mid)));
            prop_assert!(auth.satisfies(mid, &RoleRequirement::AtLeast(low)));
            prop_assert!(auth.satisfies(high, &RoleRequirement::AtLeast(low)));
            prop_assert_eq!(auth.satisfies(low, &RoleRequirement::AtLeast(high)), low == high);
        }
    }
}
