//! Role → permission policy.
//!
//! The mapping is a total function over the closed `Role` × `Permission`
//! space, hardcoded here. Decisions are pure lookups (no IO, no panics).

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier naming one class of action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// List and view customers, contracts and events.
    ReadAccess,
    /// Sort/filter listed records.
    SortRecords,
    CreateUser,
    EditUser,
    DeactivateUser,
    CreateCustomer,
    EditCustomer,
    CreateContract,
    EditContract,
    CreateEvent,
    EditEvent,
    DeleteEvent,
    /// Assign a support contact to an event.
    AssignSupport,
}

impl Permission {
    /// Every permission, in a fixed order (used by exhaustive checks).
    pub const ALL: [Permission; 13] = [
        Permission::ReadAccess,
        Permission::SortRecords,
        Permission::CreateUser,
        Permission::EditUser,
        Permission::DeactivateUser,
        Permission::CreateCustomer,
        Permission::EditCustomer,
        Permission::CreateContract,
        Permission::EditContract,
        Permission::CreateEvent,
        Permission::EditEvent,
        Permission::DeleteEvent,
        Permission::AssignSupport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadAccess => "read_access",
            Permission::SortRecords => "sort_records",
            Permission::CreateUser => "create_user",
            Permission::EditUser => "edit_user",
            Permission::DeactivateUser => "deactivate_user",
            Permission::CreateCustomer => "create_customer",
            Permission::EditCustomer => "edit_customer",
            Permission::CreateContract => "create_contract",
            Permission::EditContract => "edit_contract",
            Permission::CreateEvent => "create_event",
            Permission::EditEvent => "edit_event",
            Permission::DeleteEvent => "delete_event",
            Permission::AssignSupport => "assign_support",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

const GESTION_PERMISSIONS: &[Permission] = &[
    Permission::ReadAccess,
    Permission::SortRecords,
    Permission::CreateUser,
    Permission::EditUser,
    Permission::DeactivateUser,
    Permission::CreateContract,
    Permission::EditContract,
    Permission::EditEvent,
    Permission::DeleteEvent,
    Permission::AssignSupport,
];

const COMMERCIAL_PERMISSIONS: &[Permission] = &[
    Permission::ReadAccess,
    Permission::SortRecords,
    Permission::CreateCustomer,
    Permission::EditCustomer,
    Permission::EditContract,
    Permission::CreateEvent,
];

const SUPPORT_PERMISSIONS: &[Permission] = &[
    Permission::ReadAccess,
    Permission::SortRecords,
    Permission::EditEvent,
];

impl Role {
    /// Permissions granted to this role.
    ///
    /// Admin holds every permission; the superset relation over the other
    /// roles is intended, not derived; see the invariant test below.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin => &Permission::ALL,
            Role::Gestion => GESTION_PERMISSIONS,
            Role::Commercial => COMMERCIAL_PERMISSIONS,
            Role::Support => SUPPORT_PERMISSIONS,
        }
    }
}

/// Decide whether `role` may perform `permission`.
pub fn is_allowed(role: Role, permission: Permission) -> bool {
    role.permissions().contains(&permission)
}

/// Reverse query: which roles hold `permission`.
///
/// Used e.g. when listing users eligible as a gestion or support contact.
pub fn roles_with(permission: Permission) -> Vec<Role> {
    Role::ALL
        .into_iter()
        .filter(|role| is_allowed(*role, permission))
        .collect()
}
