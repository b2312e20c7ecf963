#![forbid(unsafe_code)]

//! Lifetime scopes for groups of bindings.

use tether_core::Object;

use super::{BindError, Binding, BindingFlags, bind};

/// Collects bindings for a logical owner (e.g., a dialog or a view model).
///
/// When the scope is dropped, every held binding is unbound, disconnecting
/// the owner's objects from each other without waiting for either side to be
/// destroyed.
///
/// # Usage
///
/// ```ignore
/// let mut scope = BindingScope::new();
/// scope.bind(&model, "volume", &slider, "value", BindingFlags::BIDIRECTIONAL)?;
/// scope.hold(bind(&model, "muted", &icon, "dimmed", BindingFlags::DEFAULT)?);
///
/// // When the scope drops, both bindings are unbound.
/// ```
///
/// # Invariants
///
/// 1. Bindings are unbound in reverse registration order on drop.
/// 2. After drop, no binding held by this scope propagates.
/// 3. `clear()` unbinds everything immediately (reusable scope).
/// 4. Bindings torn down elsewhere are skipped silently.
pub struct BindingScope {
    bindings: Vec<Binding>,
}

impl BindingScope {
    /// Create an empty binding scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Add a binding to this scope.
    pub fn hold(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }

    /// Create a binding and hold it in this scope.
    ///
    /// Returns a handle to the binding as well.
    pub fn bind(
        &mut self,
        source: &Object,
        source_property: &str,
        target: &Object,
        target_property: &str,
        flags: BindingFlags,
    ) -> Result<Binding, BindError> {
        let binding = bind(source, source_property, target, target_property, flags)?;
        self.bindings.push(binding.clone());
        Ok(binding)
    }

    /// Number of bindings held, including ones already torn down elsewhere.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Number of held bindings that are still bound.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_bound()).count()
    }

    /// Unbind everything now (scope becomes empty but reusable).
    pub fn clear(&mut self) {
        while let Some(binding) = self.bindings.pop() {
            binding.unbind();
        }
    }
}

impl Default for BindingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("len", &self.bindings.len())
            .field("active", &self.active_count())
            .finish()
    }
}
