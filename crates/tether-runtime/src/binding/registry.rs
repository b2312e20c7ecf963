#![forbid(unsafe_code)]

//! Per-thread index from object identity to the bindings attached to it.
//!
//! The registry answers one question: "which bindings must be torn down when
//! this object is destroyed?". It is never consulted while values propagate;
//! the subscription callbacks reach their binding directly.
//!
//! # Ownership
//!
//! Entries hold **strong** references to bindings and none to objects. This
//! is what keeps a binding alive after the caller discards the handle
//! returned by `bind`. The entry for an object owns exactly one destroy hook
//! on that object, installed with the first binding and removed together with
//! the last one.
//!
//! # Re-entrancy
//!
//! The registry's `RefCell` is never borrowed across a call into user code or
//! into an object. Removed bindings are always dropped after the borrow ends.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use smallvec::SmallVec;
use tether_core::{DestroyHookId, Object, ObjectId};

use super::link::{Binding, BindingId, LinkInner};

struct RegistryEntry {
    hook: DestroyHookId,
    links: SmallVec<[Rc<LinkInner>; 2]>,
}

#[derive(Default)]
struct BindingRegistry {
    entries: AHashMap<ObjectId, RegistryEntry>,
}

thread_local! {
    static REGISTRY: RefCell<BindingRegistry> = RefCell::new(BindingRegistry::default());
}

/// Record `link` under `object`, installing the destroy hook on first use.
pub(crate) fn register(object: &Object, link: &Rc<LinkInner>) {
    let id = object.id();
    let appended = REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        match reg.entries.get_mut(&id) {
            Some(entry) => {
                if !entry.links.iter().any(|l| l.id() == link.id()) {
                    entry.links.push(Rc::clone(link));
                }
                true
            }
            None => false,
        }
    });
    if appended {
        return;
    }
    let hook = object.on_destroy(on_object_destroyed);
    REGISTRY.with(|reg| {
        let mut links = SmallVec::new();
        links.push(Rc::clone(link));
        reg.borrow_mut()
            .entries
            .insert(id, RegistryEntry { hook, links });
    });
}

/// Remove `link` from the entry of `object_id`.
///
/// When the entry empties it is dropped, and its destroy hook is removed from
/// `object` if the object is still alive.
pub(crate) fn unregister(object_id: ObjectId, link: BindingId, object: Option<&Object>) {
    let (removed, emptied) = REGISTRY
        .try_with(|reg| {
            let mut reg = reg.borrow_mut();
            let Some(entry) = reg.entries.get_mut(&object_id) else {
                return (None, None);
            };
            let removed = entry
                .links
                .iter()
                .position(|l| l.id() == link)
                .map(|pos| entry.links.remove(pos));
            let emptied = if entry.links.is_empty() {
                reg.entries.remove(&object_id)
            } else {
                None
            };
            (removed, emptied)
        })
        .unwrap_or((None, None));
    if let (Some(entry), Some(object)) = (&emptied, object) {
        object.remove_destroy_hook(entry.hook);
    }
    drop(removed);
    drop(emptied);
}

/// Destroy hook installed on every object that has bindings.
fn on_object_destroyed(object_id: ObjectId) {
    let Ok(Some(entry)) = REGISTRY.try_with(|reg| reg.borrow_mut().entries.remove(&object_id))
    else {
        return;
    };
    let _span = tracing::debug_span!(
        "binding_teardown",
        object = %object_id,
        bindings = entry.links.len()
    )
    .entered();
    for link in &entry.links {
        link.teardown(Some(object_id));
    }
}

/// Bindings currently attached to `object`, as source or target.
#[must_use]
pub fn bindings_of(object: &Object) -> Vec<Binding> {
    REGISTRY.with(|reg| {
        reg.borrow()
            .entries
            .get(&object.id())
            .map(|entry| entry.links.iter().cloned().map(Binding::from_inner).collect())
            .unwrap_or_default()
    })
}

/// Number of bindings currently attached to `object`.
#[must_use]
pub fn binding_count(object: &Object) -> usize {
    REGISTRY.with(|reg| {
        reg.borrow()
            .entries
            .get(&object.id())
            .map_or(0, |entry| entry.links.len())
    })
}
