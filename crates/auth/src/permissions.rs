use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission name (e.g. `"permissions.delete"`).
///
/// Permission names are unique within a tenant and compared exactly; the
/// conventional shape is `<resource>.<action>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a `resource.action` name at its last dot.
    pub fn resource_and_action(&self) -> Option<(&str, &str)> {
        let (resource, action) = self.0.rsplit_once('.')?;
        if resource.is_empty() || action.is_empty() {
            return None;
        }
        Some((resource, action))
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}
