use core::str::FromStr;

use serde::{Deserialize, Serialize};

use qaflow_core::DomainError;

/// Project-scoped permission catalog.
///
/// This is a closed set: an unknown permission string is rejected where it is
/// parsed (config, request input), never silently denied later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ProjectView,
    ProjectEdit,
    ProjectSettings,
    ProjectDelete,
    PagesView,
    PagesCreate,
    PagesEdit,
    PagesDelete,
    IssuesView,
    IssuesCreate,
    IssuesEdit,
    IssuesDelete,
    IssuesAssign,
    QaStatusUpdate,
    AtStatusUpdate,
    FtStatusUpdate,
    CommentsCreate,
    Chat,
    HoursLog,
    HoursView,
    FilesUpload,
    TeamManage,
    PermissionsManage,
}

/// Permissions a project lead does not receive through the lead designation.
pub const LEAD_DENYLIST: [Permission; 2] = [Permission::ProjectDelete, Permission::ProjectSettings];

impl Permission {
    pub const ALL: [Permission; 23] = [
        Permission::ProjectView,
        Permission::ProjectEdit,
        Permission::ProjectSettings,
        Permission::ProjectDelete,
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
        Permission::PermissionsManage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ProjectView => "project_view",
            Permission::ProjectEdit => "project_edit",
            Permission::ProjectSettings => "project_settings",
            Permission::ProjectDelete => "project_delete",
            Permission::PagesView => "pages_view",
            Permission::PagesCreate => "pages_create",
            Permission::PagesEdit => "pages_edit",
            Permission::PagesDelete => "pages_delete",
            Permission::IssuesView => "issues_view",
            Permission::IssuesCreate => "issues_create",
            Permission::IssuesEdit => "issues_edit",
            Permission::IssuesDelete => "issues_delete",
            Permission::IssuesAssign => "issues_assign",
            Permission::QaStatusUpdate => "qa_status_update",
            Permission::AtStatusUpdate => "at_status_update",
            Permission::FtStatusUpdate => "ft_status_update",
            Permission::CommentsCreate => "comments_create",
            Permission::Chat => "chat",
            Permission::HoursLog => "hours_log",
            Permission::HoursView => "hours_view",
            Permission::FilesUpload => "files_upload",
            Permission::TeamManage => "team_manage",
            Permission::PermissionsManage => "permissions_manage",
        }
    }

    /// Whether the project-lead designation carries this permission.
    pub fn lead_may_exercise(&self) -> bool {
        !LEAD_DENYLIST.contains(self)
    }

    /// Catalog grouping, e.g. `pages` for `pages_create` (for audit/display).
    pub fn category(&self) -> &'static str {
        match self {
            Permission::ProjectView
            | Permission::ProjectEdit
            | Permission::ProjectSettings
            | Permission::ProjectDelete => "project",
            Permission::PagesView
            | Permission::PagesCreate
            | Permission::PagesEdit
            | Permission::PagesDelete => "pages",
            Permission::IssuesView
            | Permission::IssuesCreate
            | Permission::IssuesEdit
            | Permission::IssuesDelete
            | Permission::IssuesAssign
            | Permission::QaStatusUpdate
            | Permission::AtStatusUpdate
            | Permission::FtStatusUpdate => "issues",
            Permission::CommentsCreate | Permission::Chat => "collaboration",
            Permission::HoursLog | Permission::HoursView => "hours",
            Permission::FilesUpload => "files",
            Permission::TeamManage | Permission::PermissionsManage => "team",
        }
    }
}

impl FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| DomainError::unknown("permission", s))
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn catalog_names_are_unique_and_parse_back() {
        let names: HashSet<_> = Permission::ALL.iter().map(Permission::as_str).collect();
        assert_eq!(names.len(), Permission::ALL.len());
        for p in Permission::ALL {
            assert_eq!(p.as_str().parse::<Permission>().unwrap(), p);
        }
    }

    #[test]
    fn unknown_permission_is_a_parse_error() {
        let err = "pages_destroy".parse::<Permission>().unwrap_err();
        assert_eq!(err, DomainError::unknown("permission", "pages_destroy"));
    }

    #[test]
    fn lead_denylist_is_delete_and_settings() {
        assert!(!Permission::ProjectDelete.lead_may_exercise());
        assert!(!Permission::ProjectSettings.lead_may_exercise());
        assert!(Permission::ProjectEdit.lead_may_exercise());
        assert!(Permission::PermissionsManage.lead_may_exercise());
    }
}
