// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::Serialize;

use crate::{GoalStatus, ItemKind, MemberRole, MemberStatus, ResourceKind, TenantContext};

static MEMBER_ROLES: [&str; 3] = [
    MemberRole::Admin.as_str(),
    MemberRole::Manager.as_str(),
    MemberRole::Member.as_str(),
];
static MEMBER_STATUSES: [&str; 3] = [
    MemberStatus::Active.as_str(),
    MemberStatus::Invited.as_str(),
    MemberStatus::Inactive.as_str(),
];
static GOAL_STATUSES: [&str; 4] = [
    GoalStatus::NotStarted.as_str(),
    GoalStatus::OnTrack.as_str(),
    GoalStatus::AtRisk.as_str(),
    GoalStatus::Completed.as_str(),
];
static ITEM_KINDS: [&str; 2] = [ItemKind::Item.as_str(), ItemKind::Service.as_str()];
static BOOLEAN_CHOICES: [&str; 2] = ["true", "false"];

/// Choices offered by the inline editor for `field`, or `None` when the field
/// is only editable through a full form.
pub fn editable_options(kind: ResourceKind, field: &str) -> Option<&'static [&'static str]> {
    match (kind, field) {
        (ResourceKind::Members, "role") => Some(&MEMBER_ROLES),
        (ResourceKind::Members, "status") => Some(&MEMBER_STATUSES),
        (ResourceKind::Goals, "status") => Some(&GOAL_STATUSES),
        (ResourceKind::Items, "kind") => Some(&ITEM_KINDS),
        (ResourceKind::Items, "active") => Some(&BOOLEAN_CHOICES),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EditValue {
    Text(String),
    Bool(bool),
}

impl EditValue {
    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Bool(value) => value.to_string(),
        }
    }
}

/// A single-field change committed straight from a table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub kind: ResourceKind,
    pub record_id: i64,
    pub field: String,
    pub value: EditValue,
}

impl FieldEdit {
    pub fn new(kind: ResourceKind, record_id: i64, field: &str, raw: &str) -> Self {
        let raw = raw.trim();
        let value = match (kind, field) {
            (ResourceKind::Items, "active") => match raw {
                "true" => EditValue::Bool(true),
                "false" => EditValue::Bool(false),
                _ => EditValue::Text(raw.to_owned()),
            },
            _ => EditValue::Text(raw.to_owned()),
        };
        Self {
            kind,
            record_id,
            field: field.to_owned(),
            value,
        }
    }

    pub fn validate(&self, context: &TenantContext) -> Result<()> {
        if self.record_id <= 0 {
            bail!("{} record id must be positive", self.kind.label());
        }
        let Some(options) = editable_options(self.kind, &self.field) else {
            bail!(
                "{} field {:?} is not inline-editable -- open the full edit form instead",
                self.kind.label(),
                self.field
            );
        };
        let value = self.value.display();
        if !options.contains(&value.as_str()) {
            bail!(
                "{value:?} is not a valid {} -- choose one of: {}",
                self.field,
                options.join(", ")
            );
        }
        if !context.can_edit(self.kind, &self.field) {
            bail!(
                "role {} cannot edit {} {} -- ask a workspace admin",
                context.role.as_str(),
                self.kind.label(),
                self.field
            );
        }
        Ok(())
    }
}
