#![forbid(unsafe_code)]

//! The binding entity: guarded propagation and weak-lifetime teardown.
//!
//! A [`Binding`] is a handle to shared link state. The link references both
//! endpoints through [`WeakObject`]s only; what keeps it alive is its entry
//! in the [registry](super::registry) of each endpoint. Dropping every
//! `Binding` handle therefore does **not** disconnect anything. The link goes
//! away on [`Binding::unbind`] or when either endpoint is destroyed.
//!
//! # Invariants
//!
//! 1. At most one propagation per link is in flight (the `frozen` flag).
//! 2. Subscription callbacks hold the link weakly and re-check the watched
//!    `PropertyId` before doing anything.
//! 3. Teardown runs at most once: endpoints are invalidated, the survivor is
//!    unsubscribed and unregistered, user data is released exactly once.
//! 4. A torn-down link never touches either endpoint again.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tether_core::{Object, ObjectId, PropertyId, SubscriptionId, ValueType, WeakObject};

use super::BindingFlags;
use super::registry;
use super::transform::{self, Direction, TransformContext, TransformError, TransformFn};
use crate::config::{self, BindingConfig, DiagnosticLevel};

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding-{}", self.0)
    }
}

/// Callback releasing user data, run once at teardown.
pub type ReleaseFn = Box<dyn FnOnce(&dyn Any)>;

/// One end of a link.
pub(crate) struct Endpoint {
    pub(crate) object: RefCell<Option<WeakObject>>,
    pub(crate) object_id: ObjectId,
    pub(crate) class_name: String,
    pub(crate) property: PropertyId,
    pub(crate) property_name: String,
    pub(crate) value_type: ValueType,
    pub(crate) subscription: Cell<Option<SubscriptionId>>,
}

impl Endpoint {
    pub(crate) fn new(object: &Object, property: PropertyId) -> Self {
        let desc = object.descriptor(property);
        Self {
            object: RefCell::new(Some(object.downgrade())),
            object_id: object.id(),
            class_name: object.class().name().to_owned(),
            property,
            property_name: desc.name().to_owned(),
            value_type: desc.value_type(),
            subscription: Cell::new(None),
        }
    }

    fn upgrade(&self) -> Option<Object> {
        self.object.borrow().as_ref().and_then(WeakObject::upgrade)
    }
}

pub(crate) struct LinkInner {
    id: BindingId,
    flags: BindingFlags,
    source: Endpoint,
    target: Endpoint,
    transform_to: Option<TransformFn>,
    transform_from: Option<TransformFn>,
    user_data: RefCell<Option<Rc<dyn Any>>>,
    release: Cell<Option<ReleaseFn>>,
    frozen: Cell<bool>,
    finalized: Cell<bool>,
}

impl LinkInner {
    pub(crate) fn new(
        flags: BindingFlags,
        source: Endpoint,
        target: Endpoint,
        transform_to: Option<TransformFn>,
        transform_from: Option<TransformFn>,
        user_data: Option<Rc<dyn Any>>,
        release: Option<ReleaseFn>,
    ) -> Self {
        Self {
            id: BindingId::next(),
            flags,
            source,
            target,
            transform_to,
            transform_from,
            user_data: RefCell::new(user_data),
            release: Cell::new(release),
            frozen: Cell::new(false),
            finalized: Cell::new(false),
        }
    }

    pub(crate) fn id(&self) -> BindingId {
        self.id
    }

    pub(crate) fn source(&self) -> &Endpoint {
        &self.source
    }

    pub(crate) fn target(&self) -> &Endpoint {
        &self.target
    }

    /// Subscription callback body for both directions.
    pub(crate) fn on_notify(&self, direction: Direction, emitter: &Object, property: PropertyId) {
        if self.frozen.get() || self.finalized.get() {
            return;
        }
        let (from, to, custom) = match direction {
            Direction::Forward => (&self.source, &self.target, self.transform_to.as_ref()),
            Direction::Backward => (&self.target, &self.source, self.transform_from.as_ref()),
        };
        if property != from.property || emitter.id() != from.object_id {
            return;
        }
        if to.upgrade().is_none() {
            return;
        }

        let value = match emitter.get_by_id(from.property) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(binding = %self.id, %direction, error = %err, "cannot read bound property");
                return;
            }
        };

        // Cloned so a transform may unbind this link while it runs.
        let user_data = self.user_data.borrow().clone();
        let cx = TransformContext {
            direction,
            from_property: &from.property_name,
            to_property: &to.property_name,
            to_type: to.value_type,
            user_data: user_data.as_deref(),
        };
        let mut out = match transform::apply(custom, &value, &cx) {
            Ok(v) => v,
            Err(err) => {
                self.report_transform_failure(direction, from, to, &err);
                return;
            }
        };
        // User code ran; the link may have been torn down or the
        // destination destroyed in the meantime.
        if self.finalized.get() {
            return;
        }
        let Some(dest) = to.upgrade() else {
            return;
        };
        if dest.descriptor(to.property).validate(&mut out) {
            tracing::trace!(binding = %self.id, to = %to.property_name, value = %out, "clamped");
        }

        let config = BindingConfig::current();
        let Some(_depth) = config::enter_propagation(config.max_propagation_depth) else {
            tracing::warn!(
                binding = %self.id,
                %direction,
                limit = ?config.max_propagation_depth,
                "propagation depth limit reached; skipping write"
            );
            return;
        };

        tracing::trace!(
            binding = %self.id,
            %direction,
            from = %from.property_name,
            to = %to.property_name,
            value = %out,
            "propagating"
        );
        let _frozen = FrozenGuard::enter(&self.frozen);
        if let Err(err) = dest.set_by_id(to.property, out) {
            tracing::warn!(binding = %self.id, %direction, error = %err, "bound write rejected");
        }
    }

    fn report_transform_failure(
        &self,
        direction: Direction,
        from: &Endpoint,
        to: &Endpoint,
        err: &TransformError,
    ) {
        match BindingConfig::current().transform_failure_level {
            DiagnosticLevel::Warn => tracing::warn!(
                binding = %self.id,
                %direction,
                from = %format_args!("{}:{}", from.class_name, from.property_name),
                to = %format_args!("{}:{}", to.class_name, to.property_name),
                error = %err,
                "binding transform failed; value not propagated"
            ),
            DiagnosticLevel::Debug => tracing::debug!(
                binding = %self.id,
                %direction,
                from = %format_args!("{}:{}", from.class_name, from.property_name),
                to = %format_args!("{}:{}", to.class_name, to.property_name),
                error = %err,
                "binding transform failed; value not propagated"
            ),
        }
    }

    /// Disconnect the link. `destroyed` names the endpoint being reclaimed,
    /// which must not be touched; `None` means an explicit unbind.
    pub(crate) fn teardown(&self, destroyed: Option<ObjectId>) {
        if self.finalized.replace(true) {
            return;
        }
        for endpoint in [&self.source, &self.target] {
            let weak = endpoint.object.borrow_mut().take();
            let subscription = endpoint.subscription.take();
            if destroyed == Some(endpoint.object_id) {
                continue;
            }
            let survivor = weak.as_ref().and_then(WeakObject::upgrade);
            if let (Some(object), Some(sub)) = (&survivor, subscription) {
                object.unsubscribe(sub);
            }
            registry::unregister(endpoint.object_id, self.id, survivor.as_ref());
        }
        self.release_user_data();
        tracing::debug!(
            binding = %self.id,
            source = %self.source.object_id,
            target = %self.target.object_id,
            destroyed = ?destroyed,
            "binding finalized"
        );
    }

    pub(crate) fn release_user_data(&self) {
        let data = self.user_data.borrow_mut().take();
        let release = self.release.take();
        if let (Some(data), Some(release)) = (&data, release) {
            release(data.as_ref());
        }
    }

    pub(crate) fn is_finalized(&self) -> bool {
        self.finalized.get()
    }
}

struct FrozenGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> FrozenGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for FrozenGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Handle to a property binding.
///
/// Cloning shares the same link. Dropping handles never unbinds; see the
/// [module docs](self).
#[derive(Clone)]
pub struct Binding {
    inner: Rc<LinkInner>,
}

impl Binding {
    pub(crate) fn from_inner(inner: Rc<LinkInner>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    #[must_use]
    pub fn flags(&self) -> BindingFlags {
        self.inner.flags
    }

    /// The source object, while the binding is active and it is alive.
    #[must_use]
    pub fn source(&self) -> Option<Object> {
        self.inner.source.upgrade()
    }

    /// The target object, while the binding is active and it is alive.
    #[must_use]
    pub fn target(&self) -> Option<Object> {
        self.inner.target.upgrade()
    }

    #[must_use]
    pub fn source_property(&self) -> &str {
        &self.inner.source.property_name
    }

    #[must_use]
    pub fn target_property(&self) -> &str {
        &self.inner.target.property_name
    }

    #[must_use]
    pub fn source_id(&self) -> ObjectId {
        self.inner.source.object_id
    }

    #[must_use]
    pub fn target_id(&self) -> ObjectId {
        self.inner.target.object_id
    }

    /// Whether the binding still connects its endpoints.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        !self.inner.is_finalized()
    }

    /// Disconnect the binding now. Idempotent.
    pub fn unbind(&self) {
        if self.inner.is_finalized() {
            return;
        }
        tracing::debug!(binding = %self.inner.id, "unbind requested");
        self.inner.teardown(None);
    }

    /// Whether two handles refer to the same binding.
    #[must_use]
    pub fn ptr_eq(&self, other: &Binding) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Binding {}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.inner.id)
            .field(
                "source",
                &format_args!("{}:{}", self.inner.source.object_id, self.source_property()),
            )
            .field(
                "target",
                &format_args!("{}:{}", self.inner.target.object_id, self.target_property()),
            )
            .field("flags", &self.inner.flags)
            .field("bound", &self.is_bound())
            .finish()
    }
}
