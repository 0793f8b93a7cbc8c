// ============================================================================
// Metadata Registry
// ============================================================================
//
// Holds the descriptors of all registered resource types in registration
// order. A type may only reference owners/refers registered before it, so
// the order is a valid table creation order and its reverse a valid drop
// order.
//
// ============================================================================

use log::{debug, warn};
use std::any::{TypeId, type_name};
use std::collections::HashMap;

use crate::core::{DbError, Result};
use crate::schema::{DescriptorBuilder, Resource, ResourceDescriptor};

/// Rust type bound to a registered resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeType {
    pub type_id: TypeId,
    pub rust_name: &'static str,
}

impl RuntimeType {
    pub fn of<R: Resource>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            rust_name: type_name::<R>(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResourceMeta {
    order: Vec<String>,
    descriptors: HashMap<String, ResourceDescriptor>,
    runtime_types: HashMap<String, RuntimeType>,
}

impl ResourceMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and registers the descriptor of `R`.
    ///
    /// Returns the non-fatal field failures (already logged).
    pub fn register<R: Resource>(&mut self) -> Result<Vec<DbError>> {
        let schema = R::schema();
        let built = DescriptorBuilder::build(&schema)?;
        let descriptor = built.descriptor;
        let name = descriptor.type_name.clone();

        if self.descriptors.contains_key(&name) {
            return Err(DbError::DuplicateType(name));
        }
        for target in descriptor.references() {
            if !self.descriptors.contains_key(target) {
                return Err(DbError::UnknownReference {
                    resource: name,
                    target: target.to_string(),
                });
            }
        }

        for skipped in &built.skipped {
            warn!("{}", skipped);
        }
        debug!(
            "registered resource '{}' ({} fields, {} owners, {} refers)",
            name,
            descriptor.fields.len(),
            descriptor.owners.len(),
            descriptor.refers.len()
        );

        self.order.push(name.clone());
        self.runtime_types.insert(name.clone(), RuntimeType::of::<R>());
        self.descriptors.insert(name, descriptor);
        Ok(built.skipped)
    }

    pub fn get_descriptor(&self, name: &str) -> Result<&ResourceDescriptor> {
        self.descriptors
            .get(name)
            .ok_or_else(|| DbError::UnknownResource(name.to_string()))
    }

    pub fn get_runtime_type(&self, name: &str) -> Result<RuntimeType> {
        self.runtime_types
            .get(name)
            .copied()
            .ok_or_else(|| DbError::UnknownResource(name.to_string()))
    }

    /// Descriptor of `R`, after checking the name is bound to `R` itself.
    pub fn descriptor_of<R: Resource>(&self) -> Result<&ResourceDescriptor> {
        self.check_runtime_type::<R>()?;
        self.get_descriptor(R::type_name())
    }

    pub fn check_runtime_type<R: Resource>(&self) -> Result<()> {
        let registered = self.get_runtime_type(R::type_name())?;
        let requested = RuntimeType::of::<R>();
        if registered != requested {
            return Err(DbError::RuntimeTypeMismatch {
                resource: R::type_name().to_string(),
                registered: registered.rust_name,
                requested: requested.rust_name,
            });
        }
        Ok(())
    }

    /// Registered type names in registration order.
    pub fn resources(&self) -> &[String] {
        &self.order
    }

    pub fn has(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl DoubleEndedIterator<Item = &ResourceDescriptor> {
        self.order.iter().filter_map(|name| self.descriptors.get(name))
    }

    /// The relationship type joining `owner` to `owned`.
    pub fn relationship(&self, owner: &str, owned: &str) -> Result<&ResourceDescriptor> {
        self.get_descriptor(owner)?;
        self.get_descriptor(owned)?;
        self.descriptors()
            .find(|d| {
                d.is_relationship
                    && d.owners.first().is_some_and(|o| o == owner)
                    && d.refers.first().is_some_and(|r| r == owned)
            })
            .ok_or_else(|| {
                DbError::UnknownResource(format!("relationship between '{}' and '{}'", owner, owned))
            })
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.descriptors.clear();
        self.runtime_types.clear();
    }

    /// All descriptors as JSON, in registration order.
    pub fn describe(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.descriptors()
                .filter_map(|d| serde_json::to_value(d).ok())
                .collect(),
        )
    }
}
