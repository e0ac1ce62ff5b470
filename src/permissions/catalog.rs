//! The fixed catalogue of workspace permission fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Workspace,
    Board,
    List,
    Card,
    Comment,
    Attachment,
    Checklist,
    Label,
    CustomField,
    Member,
    Role,
    Template,
    Report,
    Admin,
}

/// What is being done to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Archive,
    Move,
    Assign,
    Upload,
    Invite,
    Remove,
    Workload,
    Activity,
    Export,
    Roles,
    Users,
    Settings,
}

macro_rules! permission_catalog {
    ($($variant:ident => $field:literal, $resource:ident, $action:ident;)*) => {
        /// One permission field of a workspace role.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Permission {
            $($variant,)*
        }

        impl Permission {
            pub const ALL: &'static [Permission] = &[$(Permission::$variant,)*];

            /// Backend attribute name.
            pub fn field(self) -> &'static str {
                match self {
                    $(Permission::$variant => $field,)*
                }
            }

            pub fn resource(self) -> Resource {
                match self {
                    $(Permission::$variant => Resource::$resource,)*
                }
            }

            pub fn action(self) -> Action {
                match self {
                    $(Permission::$variant => Action::$action,)*
                }
            }
        }
    };
}

permission_catalog! {
    WorkspaceView => "workspaceView", Workspace, View;
    WorkspaceEdit => "workspaceEdit", Workspace, Edit;
    WorkspaceDelete => "workspaceDelete", Workspace, Delete;
    WorkspaceArchive => "workspaceArchive", Workspace, Archive;

    BoardView => "boardView", Board, View;
    BoardCreate => "boardCreate", Board, Create;
    BoardEdit => "boardEdit", Board, Edit;
    BoardDelete => "boardDelete", Board, Delete;
    BoardArchive => "boardArchive", Board, Archive;

    ListView => "listView", List, View;
    ListCreate => "listCreate", List, Create;
    ListEdit => "listEdit", List, Edit;
    ListDelete => "listDelete", List, Delete;
    ListArchive => "listArchive", List, Archive;
    ListMove => "listMove", List, Move;

    CardView => "cardView", Card, View;
    CardCreate => "cardCreate", Card, Create;
    CardEdit => "cardEdit", Card, Edit;
    CardDelete => "cardDelete", Card, Delete;
    CardArchive => "cardArchive", Card, Archive;
    CardMove => "cardMove", Card, Move;
    CardAssign => "cardAssign", Card, Assign;

    CommentView => "commentView", Comment, View;
    CommentCreate => "commentCreate", Comment, Create;
    CommentEdit => "commentEdit", Comment, Edit;
    CommentDelete => "commentDelete", Comment, Delete;

    AttachmentView => "attachmentView", Attachment, View;
    AttachmentUpload => "attachmentUpload", Attachment, Upload;
    AttachmentDelete => "attachmentDelete", Attachment, Delete;

    ChecklistView => "checklistView", Checklist, View;
    ChecklistCreate => "checklistCreate", Checklist, Create;
    ChecklistEdit => "checklistEdit", Checklist, Edit;
    ChecklistDelete => "checklistDelete", Checklist, Delete;

    LabelCreate => "labelCreate", Label, Create;
    LabelEdit => "labelEdit", Label, Edit;
    LabelDelete => "labelDelete", Label, Delete;

    CustomFieldCreate => "customFieldCreate", CustomField, Create;
    CustomFieldEdit => "customFieldEdit", CustomField, Edit;
    CustomFieldDelete => "customFieldDelete", CustomField, Delete;

    MemberView => "memberView", Member, View;
    MemberInvite => "memberInvite", Member, Invite;
    MemberEdit => "memberEdit", Member, Edit;
    MemberRemove => "memberRemove", Member, Remove;

    RoleView => "roleView", Role, View;
    RoleCreate => "roleCreate", Role, Create;
    RoleEdit => "roleEdit", Role, Edit;
    RoleDelete => "roleDelete", Role, Delete;

    TemplateView => "templateView", Template, View;
    TemplateCreate => "templateCreate", Template, Create;
    TemplateEdit => "templateEdit", Template, Edit;
    TemplateDelete => "templateDelete", Template, Delete;

    ReportView => "reportView", Report, View;
    ReportWorkload => "reportWorkload", Report, Workload;
    ReportActivity => "reportActivity", Report, Activity;
    ReportExport => "reportExport", Report, Export;

    AdminRoles => "adminRoles", Admin, Roles;
    AdminUsers => "adminUsers", Admin, Users;
    AdminSettings => "adminSettings", Admin, Settings;
}

impl Permission {
    /// Report and admin fields fail closed: they are denied whenever the
    /// real role is unknown.
    pub fn is_sensitive(self) -> bool {
        matches!(self.resource(), Resource::Report | Resource::Admin)
    }

    pub fn from_field(field: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.field() == field)
    }

    pub fn lookup(resource: Resource, action: Action) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.resource() == resource && p.action() == action)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Workspace => "workspace",
            Resource::Board => "board",
            Resource::List => "list",
            Resource::Card => "card",
            Resource::Comment => "comment",
            Resource::Attachment => "attachment",
            Resource::Checklist => "checklist",
            Resource::Label => "label",
            Resource::CustomField => "custom_field",
            Resource::Member => "member",
            Resource::Role => "role",
            Resource::Template => "template",
            Resource::Report => "report",
            Resource::Admin => "admin",
        }
    }
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Archive => "archive",
            Action::Move => "move",
            Action::Assign => "assign",
            Action::Upload => "upload",
            Action::Invite => "invite",
            Action::Remove => "remove",
            Action::Workload => "workload",
            Action::Activity => "activity",
            Action::Export => "export",
            Action::Roles => "roles",
            Action::Users => "users",
            Action::Settings => "settings",
        }
    }
}

/// Lowercase and drop `_`/`-` so `custom_field`, `customField` and
/// `custom-field` all match.
fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {what} '{value}'")]
pub struct ParseCatalogError {
    pub what: &'static str,
    pub value: String,
}

const RESOURCES: [Resource; 14] = [
    Resource::Workspace,
    Resource::Board,
    Resource::List,
    Resource::Card,
    Resource::Comment,
    Resource::Attachment,
    Resource::Checklist,
    Resource::Label,
    Resource::CustomField,
    Resource::Member,
    Resource::Role,
    Resource::Template,
    Resource::Report,
    Resource::Admin,
];

const ACTIONS: [Action; 16] = [
    Action::View,
    Action::Create,
    Action::Edit,
    Action::Delete,
    Action::Archive,
    Action::Move,
    Action::Assign,
    Action::Upload,
    Action::Invite,
    Action::Remove,
    Action::Workload,
    Action::Activity,
    Action::Export,
    Action::Roles,
    Action::Users,
    Action::Settings,
];

impl FromStr for Resource {
    type Err = ParseCatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        RESOURCES
            .into_iter()
            .find(|r| normalize(r.as_str()) == wanted)
            .ok_or_else(|| ParseCatalogError {
                what: "resource",
                value: s.to_string(),
            })
    }
}

impl FromStr for Action {
    type Err = ParseCatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        ACTIONS
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| ParseCatalogError {
                what: "action",
                value: s.to_string(),
            })
    }
}

impl FromStr for Permission {
    type Err = ParseCatalogError;

    /// Accepts the backend field name (`cardEdit`) or `resource:action`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ParseCatalogError {
            what: "permission",
            value: s.to_string(),
        };
        if let Some((resource, action)) = s.split_once(':') {
            let resource: Resource = resource.parse()?;
            let action: Action = action.parse()?;
            return Permission::lookup(resource, action).ok_or_else(unknown);
        }
        let wanted = normalize(s);
        Permission::ALL
            .iter()
            .copied()
            .find(|p| normalize(p.field()) == wanted)
            .ok_or_else(unknown)
    }
}
