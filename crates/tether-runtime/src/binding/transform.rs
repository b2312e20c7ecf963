#![forbid(unsafe_code)]

//! Transform functions applied while a value crosses a binding.
//!
//! A binding has one transform per direction. When the caller supplies none,
//! [`default_transform`] is used: it copies identical types, widens
//! assignable ones and otherwise consults the conversion table in
//! [`tether_core::convert`].

use std::any::Any;
use std::fmt;

use tether_core::convert::{self, ConvertError};
use tether_core::{Value, ValueType};

/// Direction a value travels through a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Source property to target property.
    Forward,
    /// Target property back to source property (bidirectional only).
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forward => "source->target",
            Self::Backward => "target->source",
        })
    }
}

/// Why a transform produced no value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Convert(#[from] ConvertError),
    /// A custom transform chose not to propagate this value.
    #[error("transform declined the value")]
    Declined,
    #[error("{0}")]
    Custom(String),
}

/// What a transform may know about the hop it serves.
pub struct TransformContext<'a> {
    pub(crate) direction: Direction,
    pub(crate) from_property: &'a str,
    pub(crate) to_property: &'a str,
    pub(crate) to_type: ValueType,
    pub(crate) user_data: Option<&'a dyn Any>,
}

impl<'a> TransformContext<'a> {
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Name of the property the value was read from.
    #[must_use]
    pub fn from_property(&self) -> &'a str {
        self.from_property
    }

    /// Name of the property the value will be written to.
    #[must_use]
    pub fn to_property(&self) -> &'a str {
        self.to_property
    }

    /// Declared type of the destination property.
    #[must_use]
    pub fn to_type(&self) -> ValueType {
        self.to_type
    }

    /// User data attached at bind time, if any.
    #[must_use]
    pub fn user_data(&self) -> Option<&'a dyn Any> {
        self.user_data
    }

    /// User data downcast to `T`.
    #[must_use]
    pub fn user_data_as<T: Any>(&self) -> Option<&'a T> {
        self.user_data.and_then(|d| d.downcast_ref::<T>())
    }
}

impl fmt::Debug for TransformContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformContext")
            .field("direction", &self.direction)
            .field("from_property", &self.from_property)
            .field("to_property", &self.to_property)
            .field("to_type", &self.to_type)
            .field("has_user_data", &self.user_data.is_some())
            .finish()
    }
}

/// A custom transform.
pub type TransformFn = Box<dyn Fn(&Value, &TransformContext<'_>) -> Result<Value, TransformError>>;

/// The transform used when the caller supplies none.
pub fn default_transform(value: &Value, cx: &TransformContext<'_>) -> Result<Value, TransformError> {
    Ok(convert::transform_value(value, cx.to_type)?)
}

/// Run `custom` (or the default) and make sure the result has the
/// destination type.
pub(crate) fn apply(
    custom: Option<&TransformFn>,
    value: &Value,
    cx: &TransformContext<'_>,
) -> Result<Value, TransformError> {
    match custom {
        Some(f) => {
            let out = f(value, cx)?;
            if out.value_type() == cx.to_type {
                Ok(out)
            } else {
                // Custom transforms may return a convenient type; coerce it.
                default_transform(&out, cx)
            }
        }
        None => default_transform(value, cx),
    }
}
