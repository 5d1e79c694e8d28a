use rollcall_core::UserId;

use crate::{JwtClaims, ProfileThresholds, Role};

/// A fully resolved caller for authorization decisions.
///
/// Construction is decoupled from transport: the API derives it from verified
/// claims and the configured thresholds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub profile_level: i32,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, profile_level: i32, thresholds: &ProfileThresholds) -> Self {
        Self {
            user_id,
            profile_level,
            role: thresholds.classify(profile_level),
        }
    }

    pub fn from_claims(claims: &JwtClaims, thresholds: &ProfileThresholds) -> Self {
        Self::new(claims.sub, claims.profile, thresholds)
    }
}
