#![forbid(unsafe_code)]

//! Property bindings between objects.
//!
//! A binding watches one property of a *source* object and writes every new
//! value (optionally transformed) into one property of a *target* object.
//! With [`BindingFlags::BIDIRECTIONAL`] it also writes target changes back.
//!
//! # Usage
//!
//! ```ignore
//! let binding = bind(&slider, "value", &label, "text", BindingFlags::DEFAULT)?;
//! slider.set("value", 42)?;
//! assert_eq!(label.get("text")?, Value::from("42"));
//! ```
//!
//! Keeping the returned [`Binding`] is optional. The binding stays active
//! until [`unbind`] is called or either object is destroyed.
//!
//! # Failure Modes
//!
//! | Situation | Behavior |
//! |-----------|----------|
//! | Invalid endpoints at bind time | `Err(BindError)`, warning logged, nothing registered |
//! | Transform fails | Warning (or debug) logged, value not propagated, binding kept |
//! | Destination rejects the write | Warning logged, binding kept |
//! | Endpoint destroyed | Binding torn down, user data released |
//! | Depth limit reached | Hop skipped with a warning |

mod link;
pub(crate) mod registry;
mod scope;
pub mod transform;

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use tether_core::{Object, PropertyId, Value};

pub use link::{Binding, BindingId, ReleaseFn};
pub use registry::{binding_count, bindings_of};
pub use scope::BindingScope;
pub use transform::{Direction, TransformContext, TransformError, TransformFn, default_transform};

use link::{Endpoint, LinkInner};

bitflags! {
    /// How a binding propagates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BindingFlags: u8 {
        /// Source to target only.
        const DEFAULT = 0;
        /// Also target to source.
        const BIDIRECTIONAL = 1 << 0;
    }
}

/// Why a binding could not be created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("class '{class}' has no property named '{property}'")]
    UnknownProperty { class: String, property: String },
    #[error("property '{class}:{property}' is not readable")]
    NotReadable { class: String, property: String },
    #[error("property '{class}:{property}' is not writable")]
    NotWritable { class: String, property: String },
    #[error("cannot bind property '{property}' to itself on the same object")]
    SelfBindingRejected { property: String },
}

/// Optional parts of a binding.
#[derive(Default)]
pub struct BindOptions {
    /// Source to target transform. `None` uses [`default_transform`].
    pub transform_to: Option<TransformFn>,
    /// Target to source transform (bidirectional bindings only).
    pub transform_from: Option<TransformFn>,
    /// Data handed to transforms through [`TransformContext::user_data`].
    pub user_data: Option<Rc<dyn Any>>,
    /// Called with `user_data` exactly once, when the binding goes away or
    /// when bind fails.
    pub release: Option<ReleaseFn>,
}

impl BindOptions {
    fn release_now(self) {
        if let (Some(data), Some(release)) = (self.user_data, self.release) {
            release(data.as_ref());
        }
    }
}

impl fmt::Debug for BindOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindOptions")
            .field("transform_to", &self.transform_to.is_some())
            .field("transform_from", &self.transform_from.is_some())
            .field("user_data", &self.user_data.is_some())
            .field("release", &self.release.is_some())
            .finish()
    }
}

/// Bind `source_property` of `source` to `target_property` of `target`
/// using the default transforms.
pub fn bind(
    source: &Object,
    source_property: &str,
    target: &Object,
    target_property: &str,
    flags: BindingFlags,
) -> Result<Binding, BindError> {
    bind_full(
        source,
        source_property,
        target,
        target_property,
        flags,
        BindOptions::default(),
    )
}

/// Bind with custom transforms and user data.
///
/// Creation is atomic: on error nothing was subscribed or registered, and
/// the user data has already been released.
pub fn bind_full(
    source: &Object,
    source_property: &str,
    target: &Object,
    target_property: &str,
    flags: BindingFlags,
    options: BindOptions,
) -> Result<Binding, BindError> {
    let (source_id, target_id) =
        match resolve(source, source_property, target, target_property, flags) {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(
                    source = %source.id(),
                    target = %target.id(),
                    error = %err,
                    "cannot create binding"
                );
                options.release_now();
                return Err(err);
            }
        };

    let BindOptions {
        transform_to,
        transform_from,
        user_data,
        release,
    } = options;
    let link = Rc::new(LinkInner::new(
        flags,
        Endpoint::new(source, source_id),
        Endpoint::new(target, target_id),
        transform_to,
        transform_from,
        user_data,
        release,
    ));

    let sub = source.subscribe_id(Some(source_id), forward_to(&link, Direction::Forward));
    link.source().subscription.set(Some(sub));
    if flags.contains(BindingFlags::BIDIRECTIONAL) {
        let sub = target.subscribe_id(Some(target_id), forward_to(&link, Direction::Backward));
        link.target().subscription.set(Some(sub));
    }
    registry::register(source, &link);
    registry::register(target, &link);

    let binding = Binding::from_inner(link);
    tracing::debug!(
        binding = %binding.id(),
        source = %format_args!("{}:{}", source.id(), binding.source_property()),
        target = %format_args!("{}:{}", target.id(), binding.target_property()),
        bidirectional = flags.contains(BindingFlags::BIDIRECTIONAL),
        "binding created"
    );
    Ok(binding)
}

/// Subscription callback holding the link weakly.
fn forward_to(link: &Rc<LinkInner>, direction: Direction) -> impl Fn(&Object, PropertyId) + 'static {
    let weak = Rc::downgrade(link);
    move |object, property| {
        if let Some(link) = weak.upgrade() {
            link.on_notify(direction, object, property);
        }
    }
}

fn resolve(
    source: &Object,
    source_property: &str,
    target: &Object,
    target_property: &str,
    flags: BindingFlags,
) -> Result<(PropertyId, PropertyId), BindError> {
    let bidirectional = flags.contains(BindingFlags::BIDIRECTIONAL);

    if source.ptr_eq(target)
        && tether_core::property::canonical_name(source_property)
            == tether_core::property::canonical_name(target_property)
    {
        return Err(BindError::SelfBindingRejected {
            property: source_property.to_owned(),
        });
    }

    let source_id = lookup(source, source_property)?;
    let desc = source.descriptor(source_id);
    if !desc.is_readable() {
        return Err(not_readable(source, source_property));
    }
    if bidirectional && !desc.is_writable() {
        return Err(not_writable(source, source_property));
    }

    let target_id = lookup(target, target_property)?;
    let desc = target.descriptor(target_id);
    if !desc.is_writable() {
        return Err(not_writable(target, target_property));
    }
    if bidirectional && !desc.is_readable() {
        return Err(not_readable(target, target_property));
    }

    Ok((source_id, target_id))
}

fn lookup(object: &Object, property: &str) -> Result<PropertyId, BindError> {
    object
        .class()
        .find_property(property)
        .ok_or_else(|| BindError::UnknownProperty {
            class: object.class().name().to_owned(),
            property: property.to_owned(),
        })
}

fn not_readable(object: &Object, property: &str) -> BindError {
    BindError::NotReadable {
        class: object.class().name().to_owned(),
        property: property.to_owned(),
    }
}

fn not_writable(object: &Object, property: &str) -> BindError {
    BindError::NotWritable {
        class: object.class().name().to_owned(),
        property: property.to_owned(),
    }
}

/// Disconnect `binding`. Same as [`Binding::unbind`].
pub fn unbind(binding: &Binding) {
    binding.unbind();
}

/// Chained construction of a binding.
///
/// ```ignore
/// let binding = BindingBuilder::new(&thermo, "celsius", &display, "fahrenheit")
///     .bidirectional()
///     .transform_to(|v, _| Ok(Value::F64(v.as_f64().unwrap_or(0.0) * 9.0 / 5.0 + 32.0)))
///     .transform_from(|v, _| Ok(Value::F64((v.as_f64().unwrap_or(0.0) - 32.0) * 5.0 / 9.0)))
///     .build()?;
/// ```
#[must_use = "a BindingBuilder does nothing until build() is called"]
pub struct BindingBuilder<'a> {
    source: &'a Object,
    source_property: &'a str,
    target: &'a Object,
    target_property: &'a str,
    flags: BindingFlags,
    options: BindOptions,
}

impl<'a> BindingBuilder<'a> {
    pub fn new(
        source: &'a Object,
        source_property: &'a str,
        target: &'a Object,
        target_property: &'a str,
    ) -> Self {
        Self {
            source,
            source_property,
            target,
            target_property,
            flags: BindingFlags::DEFAULT,
            options: BindOptions::default(),
        }
    }

    pub fn flags(mut self, flags: BindingFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn bidirectional(mut self) -> Self {
        self.flags |= BindingFlags::BIDIRECTIONAL;
        self
    }

    pub fn transform_to(
        mut self,
        f: impl Fn(&Value, &TransformContext<'_>) -> Result<Value, TransformError> + 'static,
    ) -> Self {
        self.options.transform_to = Some(Box::new(f));
        self
    }

    pub fn transform_from(
        mut self,
        f: impl Fn(&Value, &TransformContext<'_>) -> Result<Value, TransformError> + 'static,
    ) -> Self {
        self.options.transform_from = Some(Box::new(f));
        self
    }

    pub fn user_data<T: Any>(mut self, data: T) -> Self {
        self.options.user_data = Some(Rc::new(data));
        self
    }

    pub fn on_release(mut self, f: impl FnOnce(&dyn Any) + 'static) -> Self {
        self.options.release = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<Binding, BindError> {
        bind_full(
            self.source,
            self.source_property,
            self.target,
            self.target_property,
            self.flags,
            self.options,
        )
    }
}

impl fmt::Debug for BindingBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingBuilder")
            .field("source", &format_args!("{}:{}", self.source.id(), self.source_property))
            .field("target", &format_args!("{}:{}", self.target.id(), self.target_property))
            .field("flags", &self.flags)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tether_core::{
        Constraint, ObjectClass, PropertyDescriptor, PropertyFlags, ValueType,
    };

    fn class() -> Rc<ObjectClass> {
        ObjectClass::builder("Widget")
            .property(PropertyDescriptor::new("x", ValueType::I32))
            .property(PropertyDescriptor::new("y", ValueType::I32))
            .property(
                PropertyDescriptor::new("label", ValueType::Str)
                    .flags(PropertyFlags::READABLE),
            )
            .property(
                PropertyDescriptor::new("sink", ValueType::I32)
                    .flags(PropertyFlags::WRITABLE),
            )
            .property(
                PropertyDescriptor::new("level", ValueType::I32)
                    .constraint(Constraint::IntRange { min: 0, max: 10 }),
            )
            .property(
                PropertyDescriptor::new("serial", ValueType::I32)
                    .flags(PropertyFlags::READABLE | PropertyFlags::CONSTRUCT_ONLY),
            )
            .property(
                PropertyDescriptor::new("ident", ValueType::I32)
                    .flags(PropertyFlags::READWRITE | PropertyFlags::CONSTRUCT_ONLY),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn one_way_propagates_forward_only() {
        let class = class();
        let a = Object::new(&class);
        let b = Object::new(&class);
        let _binding = bind(&a, "x", &b, "y", BindingFlags::DEFAULT).unwrap();

        a.set("x", 5).unwrap();
        assert_eq!(b.get("y").unwrap(), Value::I32(5));

        b.set("y", 9).unwrap();
        assert_eq!(a.get("x").unwrap(), Value::I32(5));
    }

    #[test]
    fn no_initial_push() {
        let class = class();
        let a = Object::builder(&class).with("x", 7).build().unwrap();
        let b = Object::new(&class);
        bind(&a, "x", &b, "y", BindingFlags::DEFAULT).unwrap();
        assert_eq!(b.get("y").unwrap(), Value::I32(0));
    }

    #[test]
    fn bidirectional_propagates_both_ways() {
        let class = class();
        let a = Object::new(&class);
        let b = Object::new(&class);
        bind(&a, "x", &b, "y", BindingFlags::BIDIRECTIONAL).unwrap();

        a.set("x", 3).unwrap();
        assert_eq!(b.get("y").unwrap(), Value::I32(3));
        b.set("y", 4).unwrap();
        assert_eq!(a.get("x").unwrap(), Value::I32(4));
    }

    #[test]
    fn same_object_different_properties_allowed() {
        let class = class();
        let a = Object::new(&class);
        let binding = bind(&a, "x", &a, "y", BindingFlags::BIDIRECTIONAL).unwrap();
        a.set("y", 11).unwrap();
        assert_eq!(a.get("x").unwrap(), Value::I32(11));
        assert_eq!(binding_count(&a), 1);
        binding.unbind();
        assert_eq!(binding_count(&a), 0);
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(a.destroy_hook_count(), 0);
    }

    #[test]
    fn self_binding_rejected_before_lookup() {
        let class = class();
        let a = Object::new(&class);
        let err = bind(&a, "x", &a, "x", BindingFlags::DEFAULT).unwrap_err();
        assert_eq!(
            err,
            BindError::SelfBindingRejected {
                property: "x".into()
            }
        );
        // Unknown names are still reported as self-binding first.
        let err = bind(&a, "nope", &a, "nope", BindingFlags::DEFAULT).unwrap_err();
        assert!(matches!(err, BindError::SelfBindingRejected { .. }));
        assert_eq!(a.subscriber_count(), 0);
    }

    #[test]
    fn validation_errors() {
        let class = class();
        let a = Object::new(&class);
        let b = Object::new(&class);

        assert!(matches!(
            bind(&a, "missing", &b, "y", BindingFlags::DEFAULT),
            Err(BindError::UnknownProperty { .. })
        ));
        assert!(matches!(
            bind(&a, "sink", &b, "y", BindingFlags::DEFAULT),
            Err(BindError::NotReadable { .. })
        ));
        assert!(matches!(
            bind(&a, "label", &b, "y", BindingFlags::BIDIRECTIONAL),
            Err(BindError::NotWritable { .. })
        ));
        assert!(matches!(
            bind(&a, "x", &b, "missing", BindingFlags::DEFAULT),
            Err(BindError::UnknownProperty { .. })
        ));
        assert!(matches!(
            bind(&a, "x", &b, "label", BindingFlags::DEFAULT),
            Err(BindError::NotWritable { .. })
        ));
        assert!(matches!(
            bind(&a, "x", &b, "serial", BindingFlags::DEFAULT),
            Err(BindError::NotWritable { .. })
        ));
        assert!(matches!(
            bind(&a, "x", &b, "sink", BindingFlags::BIDIRECTIONAL),
            Err(BindError::NotReadable { .. })
        ));
        // Writable but construct-only, on either end.
        assert!(matches!(
            bind(&a, "x", &b, "ident", BindingFlags::DEFAULT),
            Err(BindError::NotWritable { .. })
        ));
        assert!(matches!(
            bind(&a, "ident", &b, "y", BindingFlags::BIDIRECTIONAL),
            Err(BindError::NotWritable { .. })
        ));
        bind(&a, "ident", &b, "y", BindingFlags::DEFAULT).unwrap().unbind();
        assert_eq!(a.subscriber_count() + b.subscriber_count(), 0);
        assert_eq!(binding_count(&a) + binding_count(&b), 0);
    }

    #[test]
    fn failed_bind_releases_user_data() {
        let class = class();
        let a = Object::new(&class);
        let released = Rc::new(Cell::new(0));
        let r = Rc::clone(&released);
        let result = BindingBuilder::new(&a, "x", &a, "x")
            .user_data(5u8)
            .on_release(move |data| {
                assert_eq!(data.downcast_ref::<u8>(), Some(&5));
                r.set(r.get() + 1);
            })
            .build();
        assert!(result.is_err());
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn propagation_clamps_to_destination() {
        let class = class();
        let a = Object::new(&class);
        let b = Object::new(&class);
        bind(&a, "x", &b, "level", BindingFlags::DEFAULT).unwrap();
        a.set("x", 99).unwrap();
        assert_eq!(b.get("level").unwrap(), Value::I32(10));
        a.set("x", -4).unwrap();
        assert_eq!(b.get("level").unwrap(), Value::I32(0));
    }

    #[test]
    fn underscore_and_dash_name_the_same_property() {
        let class = ObjectClass::builder("Range")
            .property(PropertyDescriptor::new("max-value", ValueType::F64))
            .property(PropertyDescriptor::new("upper", ValueType::F64))
            .build()
            .unwrap();
        let a = Object::new(&class);
        let b = Object::new(&class);
        let binding = bind(&a, "max_value", &b, "upper", BindingFlags::DEFAULT).unwrap();
        assert_eq!(binding.source_property(), "max-value");
        a.set("max-value", 2.5).unwrap();
        assert_eq!(b.get("upper").unwrap(), Value::F64(2.5));
    }

    #[test]
    fn builder_debug_does_not_expose_closures() {
        let class = class();
        let a = Object::new(&class);
        let b = Object::new(&class);
        let builder = BindingBuilder::new(&a, "x", &b, "y")
            .bidirectional()
            .transform_to(|v, _| Ok(v.clone()));
        let dbg = format!("{builder:?}");
        assert!(dbg.contains("BIDIRECTIONAL"));
        assert!(dbg.contains("transform_to: true"));
    }
}
