#![forbid(unsafe_code)]

//! tether public facade.
//!
//! Bind a property of one object to a property of another; writes flow
//! across, optionally transformed and optionally in both directions. The
//! binding disconnects itself when either object goes away.
//!
//! ```
//! use tether::prelude::*;
//!
//! let class = ObjectClass::builder("Gauge")
//!     .property(PropertyDescriptor::new("level", ValueType::I32))
//!     .property(PropertyDescriptor::new("label", ValueType::Str))
//!     .build()
//!     .unwrap();
//! let gauge = Object::new(&class);
//! let view = Object::new(&class);
//!
//! bind(&gauge, "level", &view, "label", BindingFlags::DEFAULT).unwrap();
//! gauge.set("level", 7).unwrap();
//! assert_eq!(view.get("label").unwrap(), Value::from("7"));
//!
//! drop(view);
//! gauge.set("level", 8).unwrap();
//! assert_eq!(binding_count(&gauge), 0);
//! ```

pub use tether_core as store;
pub use tether_runtime as runtime;

#[cfg(feature = "auth")]
pub use tether_auth as auth;

pub use tether_core::{
    ClassError, Constraint, ConvertError, Object, ObjectBuilder, ObjectClass, ObjectId,
    PropertyDescriptor, PropertyError, PropertyFlags, PropertyId, Value, ValueType, WeakObject,
    register_conversion,
};
pub use tether_runtime::{
    BindError, BindOptions, Binding, BindingBuilder, BindingConfig, BindingFlags, BindingId,
    BindingScope, ConfigError, DiagnosticLevel, Direction, TransformContext, TransformError,
    TransformFn, bind, bind_full, binding_count, bindings_of, default_transform, unbind,
};

/// Common imports.
pub mod prelude {
    pub use crate::{
        Binding, BindingBuilder, BindingFlags, BindingScope, Object, ObjectClass,
        PropertyDescriptor, PropertyFlags, TransformContext, TransformError, Value, ValueType,
        bind, binding_count, unbind,
    };
}
