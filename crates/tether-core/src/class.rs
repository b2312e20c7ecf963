#![forbid(unsafe_code)]

//! Object classes: an immutable, named table of property descriptors.
//!
//! A class is built once and shared (`Rc`) by every object created from it.
//! Name lookup happens through a hash index; after resolution callers keep
//! the returned [`PropertyId`] and index the table directly.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Invalid name | Empty, leading digit, bad char | `ClassError::InvalidPropertyName` |
//! | Duplicate | Same canonical name twice | `ClassError::DuplicateProperty` |
//! | Bad default | Default not of the declared type | `ClassError::DefaultTypeMismatch` |
//! | Out-of-range default | Violates the constraint | Clamped silently |

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::property::{PropertyDescriptor, PropertyId, canonical_name, is_valid_name};
use crate::value::ValueType;

/// Errors from class registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassError {
    #[error("class '{class}': invalid property name '{name}'")]
    InvalidPropertyName { class: String, name: String },
    #[error("class '{class}': duplicate property '{name}'")]
    DuplicateProperty { class: String, name: String },
    #[error("class '{class}': default of property '{name}' is {found}, expected {expected}")]
    DefaultTypeMismatch {
        class: String,
        name: String,
        expected: ValueType,
        found: ValueType,
    },
}

/// A named set of property descriptors shared by its instances.
pub struct ObjectClass {
    name: String,
    properties: Vec<PropertyDescriptor>,
    index: AHashMap<String, PropertyId>,
}

impl ObjectClass {
    /// Start building a class called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ObjectClassBuilder {
        ObjectClassBuilder {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a property by name (underscores and dashes are equivalent).
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<PropertyId> {
        self.index.get(canonical_name(name).as_ref()).copied()
    }

    /// Descriptor for a resolved id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was resolved against a different class with more
    /// properties.
    #[must_use]
    pub fn property(&self, id: PropertyId) -> &PropertyDescriptor {
        &self.properties[id.index()]
    }

    /// Descriptor lookup that tolerates foreign ids.
    #[must_use]
    pub fn try_property(&self, id: PropertyId) -> Option<&PropertyDescriptor> {
        self.properties.get(id.index())
    }

    /// All descriptors with their ids, in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (PropertyId, &PropertyDescriptor)> {
        self.properties
            .iter()
            .enumerate()
            .map(|(i, d)| (PropertyId(i as u32), d))
    }

    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

impl fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectClass")
            .field("name", &self.name)
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Builder for [`ObjectClass`].
#[derive(Debug)]
pub struct ObjectClassBuilder {
    name: String,
    properties: Vec<PropertyDescriptor>,
}

impl ObjectClassBuilder {
    /// Install a property. Declaration order defines [`PropertyId`] order.
    #[must_use]
    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.properties.push(descriptor);
        self
    }

    /// Validate the descriptors and freeze the class.
    pub fn build(self) -> Result<Rc<ObjectClass>, ClassError> {
        let mut index = AHashMap::with_capacity(self.properties.len());
        let mut properties = Vec::with_capacity(self.properties.len());
        for mut desc in self.properties {
            if !is_valid_name(desc.name()) {
                return Err(ClassError::InvalidPropertyName {
                    class: self.name,
                    name: desc.name().to_owned(),
                });
            }
            let found = desc.initial_value().value_type();
            if found != desc.value_type() {
                return Err(ClassError::DefaultTypeMismatch {
                    class: self.name,
                    name: desc.name().to_owned(),
                    expected: desc.value_type(),
                    found,
                });
            }
            let mut initial = desc.initial_value().clone();
            if desc.validate(&mut initial) {
                desc = desc.default_value(initial);
            }
            let id = PropertyId(properties.len() as u32);
            if index.insert(desc.name().to_owned(), id).is_some() {
                return Err(ClassError::DuplicateProperty {
                    class: self.name,
                    name: desc.name().to_owned(),
                });
            }
            properties.push(desc);
        }
        Ok(Rc::new(ObjectClass {
            name: self.name,
            properties,
            index,
        }))
    }
}
