use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authorization tier derived from a numeric profile level.
///
/// Variants are declared from least to most privileged; the derived ordering
/// is relied on by [`crate::Capability::required_role`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Operator,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Operator => "operator",
            Role::Administrator => "administrator",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("operator threshold ({operator}) must not exceed administrator threshold ({administrator})")]
    Inverted { operator: i32, administrator: i32 },
}

/// Configured profile levels at which a caller becomes operator / administrator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProfileThresholds {
    administrator: i32,
    operator: i32,
}

impl ProfileThresholds {
    pub fn new(administrator: i32, operator: i32) -> Result<Self, ThresholdError> {
        if operator > administrator {
            return Err(ThresholdError::Inverted {
                operator,
                administrator,
            });
        }
        Ok(Self {
            administrator,
            operator,
        })
    }

    pub fn administrator(&self) -> i32 {
        self.administrator
    }

    pub fn operator(&self) -> i32 {
        self.operator
    }

    /// Classify a raw profile level.
    pub fn classify(&self, level: i32) -> Role {
        if level >= self.administrator {
            Role::Administrator
        } else if level >= self.operator {
            Role::Operator
        } else {
            Role::Member
        }
    }
}

impl Default for ProfileThresholds {
    fn default() -> Self {
        Self {
            administrator: 3,
            operator: 2,
        }
    }
}
