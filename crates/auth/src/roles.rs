use core::str::FromStr;

use serde::{Deserialize, Serialize};

use solstice_core::DomainError;

/// Role identifier used for RBAC.
///
/// The role set is closed and defined at build time. Every comparison in the
/// system goes through this type; the lowercase string below is the one
/// canonical serialization (tokens, stored records, CLI input all use it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access; superset of every other role.
    Admin,
    /// Management: staffing, contracts, event assignment.
    Gestion,
    /// Sales: customers, their contracts and events.
    Commercial,
    /// Event support staff.
    Support,
}

impl Role {
    /// Every role, in a fixed order (used by exhaustive checks).
    pub const ALL: [Role; 4] = [Role::Admin, Role::Gestion, Role::Commercial, Role::Support];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Gestion => "gestion",
            Role::Commercial => "commercial",
            Role::Support => "support",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "gestion" => Ok(Role::Gestion),
            "commercial" => Ok(Role::Commercial),
            "support" => Ok(Role::Support),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_canonical_and_mixed_case() {
        assert_eq!("gestion".parse::<Role>().unwrap(), Role::Gestion);
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("COMMERCIAL".parse::<Role>().unwrap(), Role::Commercial);
    }

    #[test]
    fn parse_rejects_unknown_role() {
        assert!("adm".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn serde_uses_the_canonical_lowercase_form() {
        let json = serde_json::to_string(&Role::Support).unwrap();
        assert_eq!(json, "\"support\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::Support);
    }
}
