// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::*;
use crate::view::{FieldValue, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    Manager,
    #[default]
    #[serde(other)]
    Member,
}

impl MemberRole {
    pub const ALL: [Self; 3] = [Self::Admin, Self::Manager, Self::Member];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    #[default]
    Active,
    Invited,
    #[serde(other)]
    Inactive,
}

impl MemberStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Invited, Self::Inactive];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Invited => "invited",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "invited" => Some(Self::Invited),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    OnTrack,
    AtRisk,
    Completed,
    #[default]
    #[serde(other)]
    NotStarted,
}

impl GoalStatus {
    pub const ALL: [Self; 4] = [
        Self::NotStarted,
        Self::OnTrack,
        Self::AtRisk,
        Self::Completed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::OnTrack => "on_track",
            Self::AtRisk => "at_risk",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_started" => Some(Self::NotStarted),
            "on_track" => Some(Self::OnTrack),
            "at_risk" => Some(Self::AtRisk),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Service,
    #[default]
    #[serde(other)]
    Item,
}

impl ItemKind {
    pub const ALL: [Self; 2] = [Self::Item, Self::Service];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Service => "service",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "item" => Some(Self::Item),
            "service" => Some(Self::Service),
            _ => None,
        }
    }
}

/// The backend collections a list view can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Members,
    Goals,
    Items,
}

impl ResourceKind {
    pub const ALL: [Self; 3] = [Self::Members, Self::Goals, Self::Items];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Goals => "goals",
            Self::Items => "items",
        }
    }

    /// Path segment of the collection endpoint.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Members => "team-members",
            Self::Goals => "goals",
            Self::Items => "items",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "members" => Some(Self::Members),
            "goals" => Some(Self::Goals),
            "items" => Some(Self::Items),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: TeamMemberId,
    #[serde(default, deserialize_with = "crate::wire::text")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::wire::text")]
    pub email: String,
    #[serde(default, deserialize_with = "crate::wire::text")]
    pub username: String,
    #[serde(default, deserialize_with = "crate::wire::choice")]
    pub role: MemberRole,
    #[serde(default, deserialize_with = "crate::wire::text")]
    pub department: String,
    #[serde(default, deserialize_with = "crate::wire::choice")]
    pub status: MemberStatus,
    #[serde(default, deserialize_with = "crate::wire::number")]
    pub efficiency_score: Option<f64>,
    #[serde(default, deserialize_with = "crate::wire::integer")]
    pub open_tasks: Option<i64>,
    #[serde(
        default,
        serialize_with = "time::serde::rfc3339::option::serialize",
        deserialize_with = "crate::wire::timestamp"
    )]
    pub joined_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemberField {
    Name,
    Email,
    Username,
    Role,
    Department,
    Status,
    EfficiencyScore,
    OpenTasks,
    JoinedAt,
}

impl MemberField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Username => "username",
            Self::Role => "role",
            Self::Department => "department",
            Self::Status => "status",
            Self::EfficiencyScore => "efficiency_score",
            Self::OpenTasks => "open_tasks",
            Self::JoinedAt => "joined_at",
        }
    }
}

impl Record for TeamMember {
    type Field = MemberField;

    fn id(&self) -> i64 {
        self.id.get()
    }

    fn value(&self, field: MemberField) -> FieldValue {
        match field {
            MemberField::Name => FieldValue::text(&self.name),
            MemberField::Email => FieldValue::text(&self.email),
            MemberField::Username => FieldValue::text(&self.username),
            MemberField::Role => FieldValue::text(self.role.as_str()),
            MemberField::Department => FieldValue::text(&self.department),
            MemberField::Status => FieldValue::text(self.status.as_str()),
            MemberField::EfficiencyScore => FieldValue::Number(self.efficiency_score),
            MemberField::OpenTasks => FieldValue::Number(self.open_tasks.map(|tasks| tasks as f64)),
            MemberField::JoinedAt => FieldValue::Timestamp(self.joined_at),
        }
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.name, self.email, self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    #[serde(default, deserialize_with = "crate::wire::text")]
    pub title: String,
    #[serde(default, deserialize_with = "crate::wire::text")]
    pub owner: String,
    #[serde(default, deserialize_with = "crate::wire::choice")]
    pub status: GoalStatus,
    #[serde(default, deserialize_with = "crate::wire::number")]
    pub target_value: Option<f64>,
    #[serde(default, deserialize_with = "crate::wire::number")]
    pub current_value: Option<f64>,
    #[serde(
        default,
        serialize_with = "time::serde::rfc3339::option::serialize",
        deserialize_with = "crate::wire::timestamp"
    )]
    pub due_at: Option<OffsetDateTime>,
}

impl Goal {
    /// Completion percentage in `[0, 100]`.
    ///
    /// Completed goals report 100; a missing or non-positive target reports 0.
    pub fn progress_percent(&self) -> f64 {
        if self.status == GoalStatus::Completed {
            return 100.0;
        }
        let target = self.target_value.unwrap_or(0.0);
        if !target.is_finite() || target <= 0.0 {
            return 0.0;
        }
        let current = self.current_value.unwrap_or(0.0);
        (current / target * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GoalField {
    Title,
    Owner,
    Status,
    Progress,
    DueAt,
}

impl GoalField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Owner => "owner",
            Self::Status => "status",
            Self::Progress => "progress",
            Self::DueAt => "due_at",
        }
    }
}

impl Record for Goal {
    type Field = GoalField;

    fn id(&self) -> i64 {
        self.id.get()
    }

    fn value(&self, field: GoalField) -> FieldValue {
        match field {
            GoalField::Title => FieldValue::text(&self.title),
            GoalField::Owner => FieldValue::text(&self.owner),
            GoalField::Status => FieldValue::text(self.status.as_str()),
            GoalField::Progress => FieldValue::Number(Some(self.progress_percent())),
            GoalField::DueAt => FieldValue::Timestamp(self.due_at),
        }
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.title, self.owner)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemService {
    pub id: ItemServiceId,
    #[serde(default, deserialize_with = "crate::wire::text")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::wire::choice")]
    pub kind: ItemKind,
    #[serde(default, deserialize_with = "crate::wire::text")]
    pub category: String,
    #[serde(default, deserialize_with = "crate::wire::integer")]
    pub unit_price_cents: Option<i64>,
    #[serde(default, deserialize_with = "crate::wire::integer")]
    pub stock: Option<i64>,
    #[serde(default = "default_active", deserialize_with = "crate::wire::active_flag")]
    pub active: bool,
    #[serde(
        default,
        serialize_with = "time::serde::rfc3339::option::serialize",
        deserialize_with = "crate::wire::timestamp"
    )]
    pub created_at: Option<OffsetDateTime>,
}

const fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemField {
    Name,
    Kind,
    Category,
    UnitPrice,
    Stock,
    Active,
    CreatedAt,
}

impl ItemField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Kind => "kind",
            Self::Category => "category",
            Self::UnitPrice => "unit_price_cents",
            Self::Stock => "stock",
            Self::Active => "active",
            Self::CreatedAt => "created_at",
        }
    }
}

impl Record for ItemService {
    type Field = ItemField;

    fn id(&self) -> i64 {
        self.id.get()
    }

    fn value(&self, field: ItemField) -> FieldValue {
        match field {
            ItemField::Name => FieldValue::text(&self.name),
            ItemField::Kind => FieldValue::text(self.kind.as_str()),
            ItemField::Category => FieldValue::text(&self.category),
            ItemField::UnitPrice => {
                FieldValue::Number(self.unit_price_cents.map(|cents| cents as f64 / 100.0))
            }
            ItemField::Stock => FieldValue::Number(self.stock.map(|stock| stock as f64)),
            ItemField::Active => FieldValue::Bool(self.active),
            ItemField::CreatedAt => FieldValue::Timestamp(self.created_at),
        }
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.name, self.category)
    }
}

/// One fetched collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    Members(Vec<TeamMember>),
    Goals(Vec<Goal>),
    Items(Vec<ItemService>),
}

impl Collection {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Members(_) => ResourceKind::Members,
            Self::Goals(_) => ResourceKind::Goals,
            Self::Items(_) => ResourceKind::Items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Members(rows) => rows.len(),
            Self::Goals(rows) => rows.len(),
            Self::Items(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
