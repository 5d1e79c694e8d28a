//! `rollcall-auth`: authentication/authorization boundary and the account model.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtIssuer, Hs256JwtValidator, JwtError, JwtValidator};
pub use password::{PasswordError, PasswordHash, PasswordHasher};
pub use permissions::Capability;
pub use principal::Principal;
pub use roles::{ProfileThresholds, Role, ThresholdError};
pub use user::{
    AvatarFile, CreateUser, DEFAULT_PROFILE, MIN_PASSWORD_LEN, UpdateUser, User, UserChangeRequest,
    is_valid_email,
};
