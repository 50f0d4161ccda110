//! Declarative authorization requirements attached to operation types.

use serde::Serialize;

use crate::{Permission, Role};

/// A single declared requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Skip every other check, including authentication.
    AllowAnonymous,
    /// Holding this role (or any other declared role) satisfies RBAC.
    RequireRole(Role),
    /// This permission must resolve as held (in addition to every other one).
    RequirePermission(Permission),
}

/// The full requirement set of one operation type.
///
/// Roles are OR-ed, permissions are AND-ed and evaluated in declaration
/// order. Duplicates are dropped on insert so the declared order of first
/// occurrence is what the gate sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Requirements {
    allow_anonymous: bool,
    roles: Vec<Role>,
    permissions: Vec<Permission>,
}

impl Requirements {
    /// No declared requirement: any authenticated-or-not caller passes.
    pub const fn none() -> Self {
        Self {
            allow_anonymous: false,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            allow_anonymous: true,
            ..Self::none()
        }
    }

    pub fn role(mut self, role: impl Into<Role>) -> Self {
        self.push(Requirement::RequireRole(role.into()));
        self
    }

    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.push(Requirement::RequirePermission(permission.into()));
        self
    }

    /// Compose with a shared base definition.
    ///
    /// The base's entries are appended at this point of the declaration, so
    /// `Requirements::none().include(&base).permission("x")` checks the base's
    /// permissions before `x`.
    pub fn include(mut self, base: &Requirements) -> Self {
        for requirement in base.iter() {
            self.push(requirement);
        }
        self
    }

    pub fn push(&mut self, requirement: Requirement) {
        match requirement {
            Requirement::AllowAnonymous => self.allow_anonymous = true,
            Requirement::RequireRole(role) => {
                if !self.roles.iter().any(|r| r.matches(&role)) {
                    self.roles.push(role);
                }
            }
            Requirement::RequirePermission(permission) => {
                if !self.permissions.contains(&permission) {
                    self.permissions.push(permission);
                }
            }
        }
    }

    pub fn allows_anonymous(&self) -> bool {
        self.allow_anonymous
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// True when neither roles nor permissions are declared.
    pub fn is_unconstrained(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Requirement> + '_ {
        let anonymous = self
            .allow_anonymous
            .then_some(Requirement::AllowAnonymous)
            .into_iter();
        let roles = self.roles.iter().cloned().map(Requirement::RequireRole);
        let permissions = self
            .permissions
            .iter()
            .cloned()
            .map(Requirement::RequirePermission);
        anonymous.chain(roles).chain(permissions)
    }
}

impl FromIterator<Requirement> for Requirements {
    fn from_iter<I: IntoIterator<Item = Requirement>>(iter: I) -> Self {
        let mut requirements = Requirements::none();
        for requirement in iter {
            requirements.push(requirement);
        }
        requirements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_appends_base_in_place_and_dedupes() {
        let base = Requirements::none().role("Admin").permission("roles.read");

        let reqs = Requirements::none()
            .permission("audit.read")
            .include(&base)
            .role("admin")
            .permission("roles.read")
            .permission("roles.delete");

        assert_eq!(reqs.roles(), &[Role::new("Admin")]);
        assert_eq!(
            reqs.permissions(),
            &[
                Permission::new("audit.read"),
                Permission::new("roles.read"),
                Permission::new("roles.delete"),
            ]
        );
        assert!(!reqs.allows_anonymous());
    }

    #[test]
    fn collecting_requirements_preserves_anonymous_flag() {
        let reqs: Requirements = vec![
            Requirement::RequirePermission(Permission::new("a.read")),
            Requirement::AllowAnonymous,
        ]
        .into_iter()
        .collect();

        assert!(reqs.allows_anonymous());
        assert_eq!(reqs.iter().count(), 2);
    }

    #[test]
    fn none_is_unconstrained() {
        assert!(Requirements::none().is_unconstrained());
        assert!(Requirements::anonymous().is_unconstrained());
        assert!(!Requirements::none().role("x").is_unconstrained());
    }
}
