use rollcall_auth::{Principal, Role};
use rollcall_core::UserId;

/// Principal context for a request (authenticated user + classified role).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn profile_level(&self) -> i32 {
        self.principal.profile_level
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }
}
