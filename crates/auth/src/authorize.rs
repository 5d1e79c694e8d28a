use thiserror::Error;

use crate::{Capability, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: '{capability}' requires {required}, caller is {actual}")]
    Forbidden {
        capability: Capability,
        required: Role,
        actual: Role,
    },
}

/// Check that a principal may perform a capability.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, capability: Capability) -> Result<(), AuthzError> {
    if principal.role.grants(capability) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            capability,
            required: capability.required_role(),
            actual: principal.role,
        })
    }
}
