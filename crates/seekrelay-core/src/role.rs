//! Client roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::UnknownRole;

/// The category a client registers under.
///
/// Determines which broadcast reaches it and which command frames it acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Controls a local media player and acts on `/seek`.
    Seeker,
    /// Performs a local action on `/switch`.
    Switcher,
}

impl Role {
    /// Wire name (`"seeker"` / `"switcher"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seeker => "seeker",
            Self::Switcher => "switcher",
        }
    }

    /// Wire name with a leading capital, used in operator notifications.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Seeker => "Seeker",
            Self::Switcher => "Switcher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; surrounding whitespace is not stripped.
impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seeker" => Ok(Self::Seeker),
            "switcher" => Ok(Self::Switcher),
            _ => Err(UnknownRole(s.to_lowercase())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("seeker".parse::<Role>().unwrap(), Role::Seeker);
        assert_eq!("SEEKER".parse::<Role>().unwrap(), Role::Seeker);
        assert_eq!("Switcher".parse::<Role>().unwrap(), Role::Switcher);
    }

    #[test]
    fn rejects_unknown_role() {
        let err = "watcher".parse::<Role>().unwrap_err();
        assert_eq!(err.0, "watcher");
    }

    #[test]
    fn whitespace_is_significant() {
        assert!(" seeker".parse::<Role>().is_err());
        assert!("seeker\n".parse::<Role>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for role in [Role::Seeker, Role::Switcher] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Switcher).unwrap(), "\"switcher\"");
        let back: Role = serde_json::from_str("\"seeker\"").unwrap();
        assert_eq!(back, Role::Seeker);
    }

    #[test]
    fn title_is_capitalised() {
        assert_eq!(Role::Seeker.title(), "Seeker");
        assert_eq!(Role::Switcher.title(), "Switcher");
    }
}
