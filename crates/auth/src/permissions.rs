use serde::{Deserialize, Serialize};

use crate::Role;

/// An action guarded by the permission gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    ListPeople,
    UpdatePerson,
    ListUsers,
    CreateUser,
    UpdateUser,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ListPeople => "people.list",
            Capability::UpdatePerson => "people.update",
            Capability::ListUsers => "users.list",
            Capability::CreateUser => "users.create",
            Capability::UpdateUser => "users.update",
        }
    }

    /// Least privileged role allowed to perform this action.
    pub fn required_role(&self) -> Role {
        match self {
            Capability::ListPeople | Capability::UpdatePerson | Capability::ListUsers => {
                Role::Administrator
            }
            Capability::CreateUser | Capability::UpdateUser => Role::Operator,
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    pub fn grants(&self, capability: Capability) -> bool {
        *self >= capability.required_role()
    }
}
