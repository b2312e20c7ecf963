#![forbid(unsafe_code)]

//! Typed property stores for tether.
//!
//! This crate provides the collaborators the binding engine consumes:
//!
//! - [`Value`] / [`ValueType`]: dynamically typed property values.
//! - [`convert`]: the process-wide conversion table behind the default
//!   transform.
//! - [`PropertyDescriptor`]: name, type, access flags and constraint.
//! - [`ObjectClass`]: an immutable table of descriptors.
//! - [`Object`]: a property store with ordered change notification and
//!   destruction hooks, plus its non-owning [`WeakObject`] handle.
//!
//! # Architecture
//!
//! Objects use `Rc` for single-threaded shared ownership, like the rest of
//! tether. An object graph belongs to one thread; `Object` is `!Send`.

pub mod class;
pub mod convert;
pub mod object;
pub mod property;
pub mod value;

pub use class::{ClassError, ObjectClass, ObjectClassBuilder};
pub use convert::{ConvertError, ConvertFn, register_conversion, transform_value};
pub use object::{
    DestroyHookId, NotifyFreeze, Object, ObjectBuilder, ObjectId, PropertyError, SubscriptionId,
    WeakObject,
};
pub use property::{Constraint, PropertyDescriptor, PropertyFlags, PropertyId};
pub use value::{Value, ValueType};
