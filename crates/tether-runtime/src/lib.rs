#![forbid(unsafe_code)]

//! Binding engine for tether.
//!
//! Links a property of one [`Object`](tether_core::Object) to a property of
//! another so that writes flow across, optionally through a transform and
//! optionally in both directions.
//!
//! # Architecture
//!
//! - [`binding`]: [`Binding`] handles, [`bind`] / [`bind_full`] /
//!   [`BindingBuilder`], transforms, the per-thread registry used for
//!   teardown, and [`BindingScope`].
//! - [`config`]: per-thread [`BindingConfig`] (depth limit, diagnostic
//!   level).
//!
//! Everything here is single-threaded; bindings and objects are `!Send`.

pub mod binding;
pub mod config;

pub use binding::{
    BindError, BindOptions, Binding, BindingBuilder, BindingFlags, BindingId, BindingScope,
    Direction, ReleaseFn, TransformContext, TransformError, TransformFn, bind, bind_full,
    binding_count, bindings_of, default_transform, unbind,
};
pub use config::{BindingConfig, ConfigError, DiagnosticLevel};
