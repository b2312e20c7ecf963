#![forbid(unsafe_code)]

//! Property stores with change notification and destruction hooks.
//!
//! # Design
//!
//! [`Object`] is a cheap-clone handle to shared, reference-counted storage
//! (`Rc<ObjectInner>`). The storage holds one [`Value`] per property of its
//! [`ObjectClass`], an ordered subscriber list and a list of destroy hooks.
//! [`WeakObject`] is the non-owning counterpart; it never keeps storage alive
//! and must be upgraded (and checked) before every use.
//!
//! Destruction happens when the last `Object` handle is dropped. Destroy hooks
//! run exactly once, in registration order, before the storage is reclaimed.
//! While they run, every `WeakObject` for the dying object already fails to
//! upgrade, so no hook can re-enter it.
//!
//! # Invariants
//!
//! 1. Every successful `set` stores the value, then notifies subscribers of
//!    that property in subscription order, on the caller's stack.
//! 2. A subscriber added during a dispatch is not invoked by that dispatch.
//! 3. A subscriber removed during a dispatch is not invoked afterwards.
//! 4. Within a [`NotifyFreeze`] scope values update immediately; each changed
//!    property is notified once when the outermost scope ends.
//! 5. Subscription and hook ids are unique process-wide, so a stale id can
//!    never remove another object's entry.
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: allowed. Callbacks may set properties on any object,
//!   including the one dispatching. Unbounded recursion is the caller's
//!   problem (bindings guard themselves).
//! - **Panicking subscriber**: unwinds through `set`; the value is already
//!   stored and later subscribers are skipped for that dispatch.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::class::ObjectClass;
use crate::property::{PropertyDescriptor, PropertyFlags, PropertyId};
use crate::value::{Value, ValueType};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_handle() -> u64 {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Stable identity of an object. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle returned by [`Object::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Handle returned by [`Object::on_destroy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestroyHookId(u64);

/// Errors from property access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("object of type {class} has no property called '{property}'")]
    UnknownProperty { class: String, property: String },
    #[error("property '{property}' of type {class} is not readable")]
    NotReadable { class: String, property: String },
    #[error("property '{property}' of type {class} is not writable")]
    NotWritable { class: String, property: String },
    #[error("construct-only property '{property}' of type {class} can't be set after construction")]
    ConstructOnly { class: String, property: String },
    #[error("property '{property}' of type {class} holds {expected}, got {found}")]
    TypeMismatch {
        class: String,
        property: String,
        expected: ValueType,
        found: ValueType,
    },
}

type NotifyFn = dyn Fn(&Object, PropertyId);
type DestroyFn = Box<dyn FnOnce(ObjectId)>;

struct Subscriber {
    id: SubscriptionId,
    filter: Option<PropertyId>,
    active: Cell<bool>,
    callback: Box<NotifyFn>,
}

struct ObjectInner {
    id: ObjectId,
    class: Rc<ObjectClass>,
    values: RefCell<Vec<Value>>,
    subscribers: RefCell<Vec<Rc<Subscriber>>>,
    destroy_hooks: RefCell<Vec<(DestroyHookId, DestroyFn)>>,
    freeze_count: Cell<u32>,
    pending: RefCell<SmallVec<[PropertyId; 4]>>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        let hooks = std::mem::take(self.destroy_hooks.get_mut());
        if !hooks.is_empty() {
            tracing::trace!(
                object = %self.id,
                class = self.class.name(),
                hooks = hooks.len(),
                "running destroy hooks"
            );
        }
        for (_, hook) in hooks {
            hook(self.id);
        }
    }
}

/// A shared property store.
///
/// Cloning an `Object` creates a new handle to the **same** storage.
#[derive(Clone)]
pub struct Object {
    inner: Rc<ObjectInner>,
}

impl Object {
    /// Create an object with every property at its initial value.
    #[must_use]
    pub fn new(class: &Rc<ObjectClass>) -> Self {
        let values = class
            .properties()
            .map(|(_, d)| d.initial_value().clone())
            .collect();
        Self::from_values(class, values)
    }

    /// Start building an object, supplying construct-time values.
    #[must_use]
    pub fn builder(class: &Rc<ObjectClass>) -> ObjectBuilder {
        ObjectBuilder {
            class: Rc::clone(class),
            values: Vec::new(),
        }
    }

    fn from_values(class: &Rc<ObjectClass>, values: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                id: ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)),
                class: Rc::clone(class),
                values: RefCell::new(values),
                subscribers: RefCell::new(Vec::new()),
                destroy_hooks: RefCell::new(Vec::new()),
                freeze_count: Cell::new(0),
                pending: RefCell::new(SmallVec::new()),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    #[must_use]
    pub fn class(&self) -> &Rc<ObjectClass> {
        &self.inner.class
    }

    /// Non-owning handle to this object.
    #[must_use]
    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            id: self.inner.id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Resolve a property name against this object's class.
    pub fn find_property(&self, name: &str) -> Result<PropertyId, PropertyError> {
        self.inner
            .class
            .find_property(name)
            .ok_or_else(|| PropertyError::UnknownProperty {
                class: self.inner.class.name().to_owned(),
                property: name.to_owned(),
            })
    }

    /// Descriptor of a resolved property.
    ///
    /// # Panics
    ///
    /// Panics if `id` was resolved against a different class with more
    /// properties. Use [`Object::try_descriptor`] for ids of unknown origin.
    #[must_use]
    pub fn descriptor(&self, id: PropertyId) -> &PropertyDescriptor {
        self.inner.class.property(id)
    }

    /// Descriptor of a resolved property, or `UnknownProperty` if `id` does
    /// not belong to this object's class.
    pub fn try_descriptor(&self, id: PropertyId) -> Result<&PropertyDescriptor, PropertyError> {
        self.inner
            .class
            .try_property(id)
            .ok_or_else(|| PropertyError::UnknownProperty {
                class: self.inner.class.name().to_owned(),
                property: format!("#{}", id.index()),
            })
    }

    /// Read a property by name.
    pub fn get(&self, name: &str) -> Result<Value, PropertyError> {
        let id = self.find_property(name)?;
        self.get_by_id(id)
    }

    /// Read a resolved property.
    pub fn get_by_id(&self, id: PropertyId) -> Result<Value, PropertyError> {
        let desc = self.try_descriptor(id)?;
        if !desc.is_readable() {
            return Err(self.error(desc, ErrorKind::NotReadable));
        }
        Ok(self.inner.values.borrow()[id.index()].clone())
    }

    /// Write a property by name and notify its subscribers.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), PropertyError> {
        let id = self.find_property(name)?;
        self.set_by_id(id, value)
    }

    /// Write a resolved property and notify its subscribers.
    ///
    /// The value must be of the declared type or assignable to it. It is
    /// clamped into the property's constraint before being stored.
    pub fn set_by_id(&self, id: PropertyId, value: impl Into<Value>) -> Result<(), PropertyError> {
        let desc = self.try_descriptor(id)?;
        if desc.is_construct_only() {
            return Err(self.error(desc, ErrorKind::ConstructOnly));
        }
        if !desc.is_writable() {
            return Err(self.error(desc, ErrorKind::NotWritable));
        }
        let mut value = coerce_for(desc, value.into())
            .map_err(|found| self.error(desc, ErrorKind::TypeMismatch(found)))?;
        desc.validate(&mut value);
        tracing::trace!(
            object = %self.inner.id,
            class = self.inner.class.name(),
            property = desc.name(),
            value = %value,
            "property set"
        );
        self.inner.values.borrow_mut()[id.index()] = value;
        self.notify(id);
        Ok(())
    }

    /// Emit a change notification for `id` without changing its value.
    pub fn notify(&self, id: PropertyId) {
        if self.inner.freeze_count.get() > 0 {
            let mut pending = self.inner.pending.borrow_mut();
            if !pending.contains(&id) {
                pending.push(id);
            }
            return;
        }
        self.dispatch(id);
    }

    fn dispatch(&self, id: PropertyId) {
        // Snapshot outside the borrow so callbacks may (un)subscribe.
        let targets: SmallVec<[Rc<Subscriber>; 8]> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.filter.is_none_or(|f| f == id))
            .cloned()
            .collect();
        for sub in &targets {
            if sub.active.get() {
                (sub.callback)(self, id);
            }
        }
    }

    /// Subscribe to changes of one property (`Some(name)`) or of all of them.
    pub fn subscribe(
        &self,
        property: Option<&str>,
        callback: impl Fn(&Object, PropertyId) + 'static,
    ) -> Result<SubscriptionId, PropertyError> {
        let filter = property.map(|name| self.find_property(name)).transpose()?;
        Ok(self.subscribe_id(filter, callback))
    }

    /// Subscribe with an already resolved filter.
    pub fn subscribe_id(
        &self,
        filter: Option<PropertyId>,
        callback: impl Fn(&Object, PropertyId) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(next_handle());
        self.inner.subscribers.borrow_mut().push(Rc::new(Subscriber {
            id,
            filter,
            active: Cell::new(true),
            callback: Box::new(callback),
        }));
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered here.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut subs = self.inner.subscribers.borrow_mut();
            subs.iter()
                .position(|s| s.id == id)
                .map(|pos| subs.remove(pos))
        };
        match removed {
            Some(sub) => {
                sub.active.set(false);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Register a callback to run when this object is destroyed.
    pub fn on_destroy(&self, hook: impl FnOnce(ObjectId) + 'static) -> DestroyHookId {
        let id = DestroyHookId(next_handle());
        self.inner
            .destroy_hooks
            .borrow_mut()
            .push((id, Box::new(hook)));
        id
    }

    /// Remove a destroy hook without running it.
    pub fn remove_destroy_hook(&self, id: DestroyHookId) -> bool {
        let removed = {
            let mut hooks = self.inner.destroy_hooks.borrow_mut();
            let pos = hooks.iter().position(|(h, _)| *h == id);
            pos.map(|pos| hooks.remove(pos))
        };
        // Dropped outside the borrow: the closure may own other objects.
        removed.is_some()
    }

    #[must_use]
    pub fn destroy_hook_count(&self) -> usize {
        self.inner.destroy_hooks.borrow().len()
    }

    /// Defer notifications until the returned guard (and any outer one) drops.
    #[must_use = "dropping this guard immediately thaws notifications"]
    pub fn freeze_notify(&self) -> NotifyFreeze {
        self.inner.freeze_count.set(self.inner.freeze_count.get() + 1);
        NotifyFreeze {
            object: self.clone(),
        }
    }

    /// Whether two handles refer to the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn error(&self, desc: &PropertyDescriptor, kind: ErrorKind) -> PropertyError {
        let class = self.inner.class.name().to_owned();
        let property = desc.name().to_owned();
        match kind {
            ErrorKind::NotReadable => PropertyError::NotReadable { class, property },
            ErrorKind::NotWritable => PropertyError::NotWritable { class, property },
            ErrorKind::ConstructOnly => PropertyError::ConstructOnly { class, property },
            ErrorKind::TypeMismatch(found) => PropertyError::TypeMismatch {
                class,
                property,
                expected: desc.value_type(),
                found,
            },
        }
    }
}

enum ErrorKind {
    NotReadable,
    NotWritable,
    ConstructOnly,
    TypeMismatch(ValueType),
}

fn coerce_for(desc: &PropertyDescriptor, value: Value) -> Result<Value, ValueType> {
    if value.value_type() == desc.value_type() {
        return Ok(value);
    }
    value
        .coerce_to(desc.value_type())
        .ok_or(value.value_type())
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Object {}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.inner.id)
            .field("class", &self.inner.class.name())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Non-owning handle to an [`Object`].
#[derive(Clone)]
pub struct WeakObject {
    id: ObjectId,
    inner: Weak<ObjectInner>,
}

impl WeakObject {
    /// Identity of the referenced object, valid even after it is gone.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// A strong handle, if the object is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Object> {
        self.inner.upgrade().map(|inner| Object { inner })
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakObject")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// RAII guard returned by [`Object::freeze_notify`].
pub struct NotifyFreeze {
    object: Object,
}

impl Drop for NotifyFreeze {
    fn drop(&mut self) {
        let inner = &self.object.inner;
        let depth = inner.freeze_count.get().saturating_sub(1);
        inner.freeze_count.set(depth);
        if depth > 0 {
            return;
        }
        let pending = std::mem::take(&mut *inner.pending.borrow_mut());
        for id in pending {
            self.object.dispatch(id);
        }
    }
}

impl fmt::Debug for NotifyFreeze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyFreeze")
            .field("object", &self.object.id())
            .finish()
    }
}

/// Builder for objects with construct-time values.
pub struct ObjectBuilder {
    class: Rc<ObjectClass>,
    values: Vec<(String, Value)>,
}

impl ObjectBuilder {
    /// Supply a construct-time value. Construct-only properties may only be
    /// set this way.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    /// Create the object. No notifications are emitted for supplied values.
    pub fn build(self) -> Result<Object, PropertyError> {
        let mut values: Vec<Value> = self
            .class
            .properties()
            .map(|(_, d)| d.initial_value().clone())
            .collect();
        for (name, value) in self.values {
            let class = self.class.name().to_owned();
            let id = self
                .class
                .find_property(&name)
                .ok_or_else(|| PropertyError::UnknownProperty {
                    class: class.clone(),
                    property: name.clone(),
                })?;
            let desc = self.class.property(id);
            if !desc
                .access()
                .intersects(PropertyFlags::WRITABLE | PropertyFlags::CONSTRUCT_ONLY)
            {
                return Err(PropertyError::NotWritable {
                    class,
                    property: desc.name().to_owned(),
                });
            }
            let mut value =
                coerce_for(desc, value).map_err(|found| PropertyError::TypeMismatch {
                    class,
                    property: desc.name().to_owned(),
                    expected: desc.value_type(),
                    found,
                })?;
            desc.validate(&mut value);
            values[id.index()] = value;
        }
        Ok(Object::from_values(&self.class, values))
    }
}

impl fmt::Debug for ObjectBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBuilder")
            .field("class", &self.class.name())
            .field("values", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Constraint;

    fn widget_class() -> Rc<ObjectClass> {
        ObjectClass::builder("Widget")
            .property(PropertyDescriptor::new("width", ValueType::I32))
            .property(PropertyDescriptor::new("label", ValueType::Str))
            .property(
                PropertyDescriptor::new("opacity", ValueType::F64)
                    .default_value(1.0)
                    .constraint(Constraint::FloatRange { min: 0.0, max: 1.0 }),
            )
            .property(
                PropertyDescriptor::new("serial", ValueType::U64)
                    .flags(PropertyFlags::READWRITE | PropertyFlags::CONSTRUCT_ONLY),
            )
            .property(PropertyDescriptor::new("secret", ValueType::Str).flags(PropertyFlags::WRITABLE))
            .build()
            .unwrap()
    }

    #[test]
    fn get_set_basic() {
        let obj = Object::new(&widget_class());
        assert_eq!(obj.get("width").unwrap(), Value::I32(0));
        obj.set("width", 42).unwrap();
        assert_eq!(obj.get("width").unwrap(), Value::I32(42));
        assert_eq!(obj.get("opacity").unwrap(), Value::F64(1.0));
    }

    #[test]
    fn set_widens_assignable_values() {
        let obj = Object::new(&widget_class());
        obj.set("opacity", 0.5f32).unwrap();
        assert_eq!(obj.get("opacity").unwrap(), Value::F64(0.5));
    }

    #[test]
    fn set_rejects_wrong_type() {
        let obj = Object::new(&widget_class());
        let err = obj.set("width", "wide").unwrap_err();
        assert!(matches!(
            err,
            PropertyError::TypeMismatch {
                expected: ValueType::I32,
                found: ValueType::Str,
                ..
            }
        ));
    }

    #[test]
    fn set_clamps_to_constraint() {
        let obj = Object::new(&widget_class());
        obj.set("opacity", 3.0).unwrap();
        assert_eq!(obj.get("opacity").unwrap(), Value::F64(1.0));
    }

    #[test]
    fn unknown_and_unreadable() {
        let obj = Object::new(&widget_class());
        assert!(matches!(
            obj.get("height"),
            Err(PropertyError::UnknownProperty { .. })
        ));
        assert!(matches!(
            obj.get("secret"),
            Err(PropertyError::NotReadable { .. })
        ));
        obj.set("secret", "hunter2").unwrap();
    }

    #[test]
    fn foreign_property_id_is_unknown() {
        let wide = widget_class();
        let narrow = ObjectClass::builder("Dot")
            .property(PropertyDescriptor::new("x", ValueType::I32))
            .build()
            .unwrap();
        let obj = Object::new(&narrow);
        let foreign = wide.find_property("secret").unwrap();

        assert!(matches!(
            obj.get_by_id(foreign),
            Err(PropertyError::UnknownProperty { .. })
        ));
        let err = obj.set_by_id(foreign, 1).unwrap_err();
        assert!(err.to_string().contains("Dot"), "{err}");
        assert!(obj.try_descriptor(foreign).is_err());
    }

    #[test]
    fn construct_only_via_builder() {
        let class = widget_class();
        let obj = Object::builder(&class).with("serial", 7u64).build().unwrap();
        assert_eq!(obj.get("serial").unwrap(), Value::U64(7));
        assert!(matches!(
            obj.set("serial", 8u64),
            Err(PropertyError::ConstructOnly { .. })
        ));
    }

    #[test]
    fn notification_fires_on_every_set_in_order() {
        let obj = Object::new(&widget_class());
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = Rc::clone(&log);
        obj.subscribe(Some("width"), move |_, _| l1.borrow_mut().push('A'))
            .unwrap();
        let l2 = Rc::clone(&log);
        obj.subscribe(None, move |_, _| l2.borrow_mut().push('B')).unwrap();
        let l3 = Rc::clone(&log);
        obj.subscribe(Some("label"), move |_, _| l3.borrow_mut().push('C'))
            .unwrap();

        obj.set("width", 1).unwrap();
        obj.set("width", 1).unwrap();
        assert_eq!(*log.borrow(), vec!['A', 'B', 'A', 'B']);
    }

    #[test]
    fn callback_receives_emitter_and_property() {
        let obj = Object::new(&widget_class());
        let seen = Rc::new(Cell::new(None));
        let s = Rc::clone(&seen);
        obj.subscribe(None, move |o, id| {
            s.set(Some((o.id(), id)));
        })
        .unwrap();
        obj.set("label", "x").unwrap();
        let label = obj.find_property("label").unwrap();
        assert_eq!(seen.get(), Some((obj.id(), label)));
    }

    #[test]
    fn unsubscribe_during_dispatch_skips_later_subscriber() {
        let obj = Object::new(&widget_class());
        let fired = Rc::new(Cell::new(false));
        let victim: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));

        let v = Rc::clone(&victim);
        obj.subscribe(None, move |o, _| {
            if let Some(id) = v.get() {
                o.unsubscribe(id);
            }
        })
        .unwrap();
        let f = Rc::clone(&fired);
        let id = obj.subscribe(None, move |_, _| f.set(true)).unwrap();
        victim.set(Some(id));

        obj.set("width", 3).unwrap();
        assert!(!fired.get());
        assert_eq!(obj.subscriber_count(), 1);
    }

    #[test]
    fn subscribe_during_dispatch_waits_for_next_set() {
        let obj = Object::new(&widget_class());
        let count = Rc::new(Cell::new(0u32));
        let once = Rc::new(Cell::new(false));

        let c = Rc::clone(&count);
        let o = Rc::clone(&once);
        obj.subscribe(None, move |emitter, _| {
            if !o.replace(true) {
                let c = Rc::clone(&c);
                emitter.subscribe_id(None, move |_, _| c.set(c.get() + 1));
            }
        })
        .unwrap();

        obj.set("width", 1).unwrap();
        assert_eq!(count.get(), 0);
        obj.set("width", 2).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn unsubscribe_unknown_id_is_false() {
        let a = Object::new(&widget_class());
        let b = Object::new(&widget_class());
        let id = a.subscribe(None, |_, _| {}).unwrap();
        assert!(!b.unsubscribe(id));
        assert!(a.unsubscribe(id));
        assert!(!a.unsubscribe(id));
    }

    #[test]
    fn destroy_hooks_run_once_in_order_after_last_handle() {
        let obj = Object::new(&widget_class());
        let log = Rc::new(RefCell::new(Vec::new()));
        let expected_id = obj.id();

        let l1 = Rc::clone(&log);
        obj.on_destroy(move |id| l1.borrow_mut().push((1, id)));
        let l2 = Rc::clone(&log);
        obj.on_destroy(move |id| l2.borrow_mut().push((2, id)));

        let second = obj.clone();
        drop(obj);
        assert!(log.borrow().is_empty());
        drop(second);
        assert_eq!(*log.borrow(), vec![(1, expected_id), (2, expected_id)]);
    }

    #[test]
    fn weak_fails_to_upgrade_inside_destroy_hook() {
        let obj = Object::new(&widget_class());
        let weak = obj.downgrade();
        let upgraded = Rc::new(Cell::new(true));
        let u = Rc::clone(&upgraded);
        let w = weak.clone();
        obj.on_destroy(move |_| u.set(w.upgrade().is_some()));
        drop(obj);
        assert!(!upgraded.get());
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn removed_hook_does_not_run() {
        let obj = Object::new(&widget_class());
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        let hook = obj.on_destroy(move |_| r.set(true));
        assert!(obj.remove_destroy_hook(hook));
        assert!(!obj.remove_destroy_hook(hook));
        drop(obj);
        assert!(!ran.get());
    }

    #[test]
    fn freeze_coalesces_notifications() {
        let obj = Object::new(&widget_class());
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        obj.subscribe(Some("width"), move |_, _| c.set(c.get() + 1))
            .unwrap();
        {
            let _outer = obj.freeze_notify();
            {
                let _inner = obj.freeze_notify();
                obj.set("width", 1).unwrap();
                obj.set("width", 2).unwrap();
            }
            assert_eq!(count.get(), 0);
            assert_eq!(obj.get("width").unwrap(), Value::I32(2));
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn object_ids_are_unique() {
        let class = widget_class();
        let a = Object::new(&class);
        let b = Object::new(&class);
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn debug_format() {
        let obj = Object::new(&widget_class());
        let dbg = format!("{obj:?}");
        assert!(dbg.contains("Widget"));
        assert!(dbg.contains("subscriber_count"));
    }
}
