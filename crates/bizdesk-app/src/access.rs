// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRole {
    Viewer,
    Member,
    Manager,
    Admin,
    Owner,
}

impl AccessRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Member => "member",
            Self::Manager => "manager",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "viewer" => Some(Self::Viewer),
            "member" => Some(Self::Member),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }
}

/// Who is acting, and in which tenant. Handed to the views and the API client
/// explicitly; nothing reads it from a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: String,
    pub role: AccessRole,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<String>, role: AccessRole) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            role,
        }
    }

    /// Whether this role may inline-edit `field` on `kind`. Fields that are
    /// not inline-editable at all are decided by [`crate::editable_options`].
    pub fn can_edit(&self, kind: ResourceKind, field: &str) -> bool {
        match self.role {
            AccessRole::Viewer => false,
            AccessRole::Member => kind == ResourceKind::Goals && field == "status",
            AccessRole::Manager => !(kind == ResourceKind::Members && field == "role"),
            AccessRole::Admin | AccessRole::Owner => true,
        }
    }
}
