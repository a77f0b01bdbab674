use core::str::FromStr;

use serde::{Deserialize, Serialize};

use qaflow_core::DomainError;

use crate::Permission;

/// Global role of a principal.
///
/// The declaration order is the canonical rank order (lowest first); the rank
/// table actually used for decisions is [`crate::RoleRanks`], loaded at startup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    FtTester,
    AtTester,
    Qa,
    ProjectLead,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::FtTester,
        Role::AtTester,
        Role::Qa,
        Role::ProjectLead,
        Role::Admin,
        Role::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::FtTester => "ft_tester",
            Role::AtTester => "at_tester",
            Role::Qa => "qa",
            Role::ProjectLead => "project_lead",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Roles that pass every project permission check.
    pub fn is_global_override(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| DomainError::unknown("role", s))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project-scoped role held through a team assignment.
///
/// Distinct from the global [`Role`]: a global `qa` may lead one project and
/// test on another.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Qa,
    AtTester,
    FtTester,
    ProjectLead,
}

const QA_PERMISSIONS: &[Permission] = &[
    Permission::ProjectView,
    Permission::PagesView,
    Permission::IssuesView,
    Permission::IssuesCreate,
    Permission::IssuesEdit,
    Permission::QaStatusUpdate,
    Permission::CommentsCreate,
    Permission::Chat,
    Permission::HoursLog,
];

const AT_TESTER_PERMISSIONS: &[Permission] = &[
    Permission::ProjectView,
    Permission::PagesView,
    Permission::IssuesView,
    Permission::IssuesCreate,
    Permission::AtStatusUpdate,
    Permission::CommentsCreate,
    Permission::Chat,
    Permission::HoursLog,
];

const FT_TESTER_PERMISSIONS: &[Permission] = &[
    Permission::ProjectView,
    Permission::PagesView,
    Permission::IssuesView,
    Permission::IssuesCreate,
    Permission::FtStatusUpdate,
    Permission::CommentsCreate,
    Permission::Chat,
    Permission::HoursLog,
];

const TEAM_LEAD_PERMISSIONS: &[Permission] = &[
    Permission::ProjectView,
    Permission::ProjectEdit,
    Permission::PagesView,
    Permission::PagesCreate,
    Permission::PagesEdit,
    Permission::PagesDelete,
    Permission::IssuesView,
    Permission::IssuesCreate,
    Permission::IssuesEdit,
    Permission::IssuesDelete,
    Permission::IssuesAssign,
    Permission::QaStatusUpdate,
    Permission::AtStatusUpdate,
    Permission::FtStatusUpdate,
    Permission::CommentsCreate,
    Permission::Chat,
    Permission::HoursLog,
    Permission::HoursView,
    Permission::FilesUpload,
    Permission::TeamManage,
];

impl TeamRole {
    pub const ALL: [TeamRole; 4] = [
        TeamRole::Qa,
        TeamRole::AtTester,
        TeamRole::FtTester,
        TeamRole::ProjectLead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Qa => "qa",
            TeamRole::AtTester => "at_tester",
            TeamRole::FtTester => "ft_tester",
            TeamRole::ProjectLead => "project_lead",
        }
    }

    /// Static basic-permission set granted by holding this team role.
    pub fn basic_permissions(&self) -> &'static [Permission] {
        match self {
            TeamRole::Qa => QA_PERMISSIONS,
            TeamRole::AtTester => AT_TESTER_PERMISSIONS,
            TeamRole::FtTester => FT_TESTER_PERMISSIONS,
            TeamRole::ProjectLead => TEAM_LEAD_PERMISSIONS,
        }
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.basic_permissions().contains(&permission)
    }
}

impl FromStr for TeamRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TeamRole::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| DomainError::unknown("team role", s))
    }
}

impl core::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
