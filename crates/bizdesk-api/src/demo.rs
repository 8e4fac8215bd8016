// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use bizdesk_app::{
    Collection, EditValue, FieldEdit, Goal, GoalStatus, ItemKind, ItemService, MemberRole,
    MemberStatus, ResourceKind, TeamMember, TenantContext,
};
use tracing::debug;

use crate::Backend;

#[derive(Debug, Default)]
struct DemoData {
    members: Vec<TeamMember>,
    goals: Vec<Goal>,
    items: Vec<ItemService>,
}

/// In-memory backend for `--demo`. Edits are applied to the seeded data and
/// checked the way the real backend checks them.
#[derive(Debug)]
pub struct DemoBackend {
    context: TenantContext,
    data: Mutex<DemoData>,
}

impl DemoBackend {
    pub fn new(context: TenantContext, collections: Vec<Collection>) -> Self {
        let mut data = DemoData::default();
        for collection in collections {
            match collection {
                Collection::Members(rows) => data.members = rows,
                Collection::Goals(rows) => data.goals = rows,
                Collection::Items(rows) => data.items = rows,
            }
        }
        Self {
            context,
            data: Mutex::new(data),
        }
    }

    pub fn context(&self) -> &TenantContext {
        &self.context
    }

    fn lock(&self) -> Result<MutexGuard<'_, DemoData>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("demo data lock poisoned"))
    }
}

impl Backend for DemoBackend {
    fn list(&self, kind: ResourceKind) -> Result<Collection> {
        let data = self.lock()?;
        Ok(match kind {
            ResourceKind::Members => Collection::Members(data.members.clone()),
            ResourceKind::Goals => Collection::Goals(data.goals.clone()),
            ResourceKind::Items => Collection::Items(data.items.clone()),
        })
    }

    fn update_field(&self, edit: &FieldEdit) -> Result<()> {
        edit.validate(&self.context)?;
        debug!(
            resource = edit.kind.label(),
            record_id = edit.record_id,
            field = %edit.field,
            "demo update"
        );

        let mut data = self.lock()?;
        match edit.kind {
            ResourceKind::Members => update_member(&mut data.members, edit),
            ResourceKind::Goals => update_goal(&mut data.goals, edit),
            ResourceKind::Items => update_item(&mut data.items, edit),
        }
    }
}

fn update_member(members: &mut [TeamMember], edit: &FieldEdit) -> Result<()> {
    let index = members
        .iter()
        .position(|member| member.id.get() == edit.record_id)
        .ok_or_else(|| not_found(edit))?;

    let mut updated = members[index].clone();
    let value = edit.value.display();
    match edit.field.as_str() {
        "role" => updated.role = MemberRole::parse(&value).ok_or_else(|| invalid(edit))?,
        "status" => updated.status = MemberStatus::parse(&value).ok_or_else(|| invalid(edit))?,
        _ => return Err(invalid(edit)),
    }

    let is_active_admin = |member: &TeamMember| {
        member.role == MemberRole::Admin && member.status == MemberStatus::Active
    };
    let remaining_admins = members
        .iter()
        .enumerate()
        .filter(|(position, member)| *position != index && is_active_admin(*member))
        .count();
    if is_active_admin(&members[index]) && !is_active_admin(&updated) && remaining_admins == 0 {
        bail!("A workspace must keep at least one active admin.");
    }

    members[index] = updated;
    Ok(())
}

fn update_goal(goals: &mut [Goal], edit: &FieldEdit) -> Result<()> {
    let goal = goals
        .iter_mut()
        .find(|goal| goal.id.get() == edit.record_id)
        .ok_or_else(|| not_found(edit))?;
    match edit.field.as_str() {
        "status" => {
            goal.status = GoalStatus::parse(&edit.value.display()).ok_or_else(|| invalid(edit))?;
        }
        _ => return Err(invalid(edit)),
    }
    Ok(())
}

fn update_item(items: &mut [ItemService], edit: &FieldEdit) -> Result<()> {
    let item = items
        .iter_mut()
        .find(|item| item.id.get() == edit.record_id)
        .ok_or_else(|| not_found(edit))?;
    match (edit.field.as_str(), &edit.value) {
        ("kind", value) => {
            let kind = ItemKind::parse(&value.display()).ok_or_else(|| invalid(edit))?;
            if kind == ItemKind::Service {
                item.stock = None;
            }
            item.kind = kind;
        }
        ("active", EditValue::Bool(active)) => item.active = *active,
        _ => return Err(invalid(edit)),
    }
    Ok(())
}

fn not_found(edit: &FieldEdit) -> anyhow::Error {
    anyhow!("Not found: {} record {}.", edit.kind.label(), edit.record_id)
}

fn invalid(edit: &FieldEdit) -> anyhow::Error {
    anyhow!(
        "Invalid value {:?} for {}.",
        edit.value.display(),
        edit.field
    )
}
