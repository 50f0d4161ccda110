use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role name used for RBAC.
///
/// Names are opaque at this layer. Comparison for authorization purposes is
/// case-insensitive (`"admin"` satisfies a requirement for `"Admin"`); use
/// [`Role::matches`] rather than `==` when checking holdings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Build a role name in a `const`/`static` context.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive name match.
    pub fn matches(&self, other: &Role) -> bool {
        self.0.eq_ignore_ascii_case(&other.0) || self.0.to_lowercase() == other.0.to_lowercase()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Role {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case() {
        assert!(Role::new("Admin").matches(&Role::new("aDMIN")));
        assert!(Role::new("Überprüfer").matches(&Role::new("überprüfer")));
        assert!(!Role::new("Admin").matches(&Role::new("Administrator")));
    }
}
