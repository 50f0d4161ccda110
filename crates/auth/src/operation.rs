//! Operation descriptors and the startup-time requirement registry.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::Requirements;

/// An operation type (command or query) that passes through the gate.
///
/// `NAME` is the stable registry key; `requirements()` is the static
/// declaration for the type. Shared requirements are pulled in with
/// [`Requirements::include`] rather than through any type hierarchy.
pub trait Operation: Send + Sync + 'static {
    const NAME: &'static str;

    /// What a successful handler returns.
    type Output: Send;

    fn requirements() -> Requirements;
}

/// Immutable (name, requirements) pair, created once at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    name: &'static str,
    requirements: Requirements,
}

impl OperationDescriptor {
    pub fn new(name: &'static str, requirements: Requirements) -> Self {
        Self { name, requirements }
    }

    pub fn of<O: Operation>() -> Self {
        Self::new(O::NAME, O::requirements())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operation '{0}' registered more than once")]
    Duplicate(&'static str),

    #[error("operation name must not be empty")]
    EmptyName,
}

/// Read-only map from operation name to its descriptor.
///
/// Built once through [`OperationRegistryBuilder`]; there is no way to add or
/// change entries afterwards, so a shared `Arc<OperationRegistry>` can be read
/// from every request without locking.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    descriptors: HashMap<&'static str, OperationDescriptor>,
}

impl OperationRegistry {
    pub fn builder() -> OperationRegistryBuilder {
        OperationRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.descriptors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors sorted by name.
    pub fn descriptors(&self) -> Vec<&OperationDescriptor> {
        let mut all: Vec<_> = self.descriptors.values().collect();
        all.sort_by_key(|d| d.name());
        all
    }
}

#[derive(Debug, Default)]
pub struct OperationRegistryBuilder {
    descriptors: HashMap<&'static str, OperationDescriptor>,
    errors: Vec<RegistryError>,
}

impl OperationRegistryBuilder {
    pub fn register<O: Operation>(self) -> Self {
        self.register_descriptor(OperationDescriptor::of::<O>())
    }

    pub fn register_descriptor(mut self, descriptor: OperationDescriptor) -> Self {
        let name = descriptor.name();
        if name.trim().is_empty() {
            self.errors.push(RegistryError::EmptyName);
        } else if self.descriptors.insert(name, descriptor).is_some() {
            self.errors.push(RegistryError::Duplicate(name));
        }
        self
    }

    /// Freeze the registry. The first registration error wins.
    pub fn build(self) -> Result<OperationRegistry, RegistryError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        tracing::debug!(operations = self.descriptors.len(), "operation registry built");
        Ok(OperationRegistry {
            descriptors: self.descriptors,
        })
    }
}
