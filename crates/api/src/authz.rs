//! API-side permission gate.
//!
//! Handlers call [`require`] before touching any store, so a rejected caller
//! causes no side effects.

use rollcall_auth::{Capability, authorize};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

pub fn require(principal: &PrincipalContext, capability: Capability) -> Result<(), ApiError> {
    authorize(principal.principal(), capability).map_err(|e| {
        tracing::info!(
            user_id = %principal.user_id(),
            profile = principal.profile_level(),
            capability = %capability,
            reason = %e,
            "permission denied"
        );
        ApiError::Forbidden
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_auth::{Principal, ProfileThresholds};
    use rollcall_core::UserId;

    fn ctx(level: i32) -> PrincipalContext {
        PrincipalContext::new(Principal::new(UserId::new(), level, &ProfileThresholds::default()))
    }

    #[test]
    fn administrators_pass_every_gate() {
        for cap in [
            Capability::ListPeople,
            Capability::UpdatePerson,
            Capability::ListUsers,
            Capability::CreateUser,
            Capability::UpdateUser,
        ] {
            assert!(require(&ctx(3), cap).is_ok());
        }
    }

    #[test]
    fn members_are_turned_away() {
        assert!(matches!(
            require(&ctx(1), Capability::CreateUser),
            Err(ApiError::Forbidden)
        ));
    }
}
