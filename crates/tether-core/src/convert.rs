#![forbid(unsafe_code)]

//! Process-wide value conversion table and the default transform.
//!
//! Binding transforms fall back to [`transform_value`] when the caller does
//! not supply one. The lookup order is:
//!
//! 1. identical types: the value is copied;
//! 2. assignable types: the value is widened ([`Value::coerce_to`]);
//! 3. a conversion registered for `(from, to)`: the function is applied;
//! 4. otherwise the transform fails with [`ConvertError::NoConversion`].
//!
//! The table starts with lossy numeric casts, bool/number conversions and
//! "anything to string". Strings are never parsed by default; register a
//! conversion with [`register_conversion`] to opt in.
//!
//! # Concurrency
//!
//! Reads are lock-free (`ArcSwap::load`). Registration clones the table and
//! swaps it in, so a conversion registered on one thread becomes visible to
//! every later lookup on all threads.

use std::sync::{Arc, LazyLock};

use ahash::AHashMap;
use arc_swap::ArcSwap;

use crate::value::{Value, ValueType};

/// A registered conversion. Returning `None` reports that this particular
/// value could not be converted.
pub type ConvertFn = fn(&Value) -> Option<Value>;

/// Errors from the default transform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// No conversion path exists between the two types.
    #[error("no conversion from {from} to {to}")]
    NoConversion { from: ValueType, to: ValueType },
    /// A conversion exists but rejected this value.
    #[error("unable to convert a value of type {from} to a value of type {to}")]
    Failed { from: ValueType, to: ValueType },
}

#[derive(Clone, Default)]
struct ConversionTable {
    entries: AHashMap<(ValueType, ValueType), ConvertFn>,
}

static TABLE: LazyLock<ArcSwap<ConversionTable>> =
    LazyLock::new(|| ArcSwap::from_pointee(builtin_table()));

/// Register (or replace) the conversion used for `from -> to`.
///
/// Conversions between identical or assignable types are never consulted,
/// since those pairs are handled before the table lookup.
pub fn register_conversion(from: ValueType, to: ValueType, f: ConvertFn) {
    TABLE.rcu(|current| {
        let mut next = ConversionTable::clone(current);
        next.entries.insert((from, to), f);
        next
    });
    tracing::debug!(%from, %to, "registered value conversion");
}

/// Whether a value of type `from` can reach type `to` through the default
/// transform.
#[must_use]
pub fn is_transformable(from: ValueType, to: ValueType) -> bool {
    from.is_assignable_to(to) || TABLE.load().entries.contains_key(&(from, to))
}

/// Apply the registered conversion for `(value type, to)` only.
///
/// Returns `None` when no conversion is registered or it declined the value.
#[must_use]
pub fn convert(value: &Value, to: ValueType) -> Option<Value> {
    let f = TABLE.load().entries.get(&(value.value_type(), to)).copied()?;
    f(value).filter(|out| out.value_type() == to)
}

/// The default transform: copy, widen or convert `value` into `to`.
pub fn transform_value(value: &Value, to: ValueType) -> Result<Value, ConvertError> {
    let from = value.value_type();
    if let Some(widened) = value.coerce_to(to) {
        return Ok(widened);
    }
    let registered = TABLE.load().entries.get(&(from, to)).copied();
    match registered {
        Some(f) => f(value)
            .filter(|out| out.value_type() == to)
            .ok_or(ConvertError::Failed { from, to }),
        None => Err(ConvertError::NoConversion { from, to }),
    }
}

fn builtin_table() -> ConversionTable {
    let mut entries: AHashMap<(ValueType, ValueType), ConvertFn> = AHashMap::new();
    for from in ValueType::ALL {
        if from == ValueType::Str {
            continue;
        }
        for to in ValueType::ALL {
            if from == to || from.is_assignable_to(to) {
                continue;
            }
            let f: ConvertFn = match to {
                ValueType::Bool => to_bool,
                ValueType::I32 => to_i32,
                ValueType::I64 => to_i64,
                ValueType::U32 => to_u32,
                ValueType::U64 => to_u64,
                ValueType::F32 => to_f32,
                ValueType::F64 => to_f64,
                ValueType::Str => to_str,
            };
            entries.insert((from, to), f);
        }
    }
    ConversionTable { entries }
}

/// Numeric view used by the builtin casts; bools count as 0 or 1.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64(),
    }
}

fn to_bool(value: &Value) -> Option<Value> {
    numeric(value).map(|n| Value::Bool(n != 0.0))
}

// Integer targets go through i64/u64 first so large integers are not
// rounded by the f64 path.
fn to_i32(value: &Value) -> Option<Value> {
    match value {
        Value::I64(v) => Some(Value::I32(*v as i32)),
        Value::U32(v) => Some(Value::I32(*v as i32)),
        Value::U64(v) => Some(Value::I32(*v as i32)),
        other => numeric(other).map(|n| Value::I32(n as i32)),
    }
}

fn to_i64(value: &Value) -> Option<Value> {
    match value {
        Value::U64(v) => Some(Value::I64(*v as i64)),
        other => numeric(other).map(|n| Value::I64(n as i64)),
    }
}

fn to_u32(value: &Value) -> Option<Value> {
    match value {
        Value::I32(v) => Some(Value::U32(*v as u32)),
        Value::I64(v) => Some(Value::U32(*v as u32)),
        Value::U64(v) => Some(Value::U32(*v as u32)),
        other => numeric(other).map(|n| Value::U32(n as u32)),
    }
}

fn to_u64(value: &Value) -> Option<Value> {
    match value {
        Value::I32(v) => Some(Value::U64(*v as u64)),
        Value::I64(v) => Some(Value::U64(*v as u64)),
        other => numeric(other).map(|n| Value::U64(n as u64)),
    }
}

fn to_f32(value: &Value) -> Option<Value> {
    numeric(value).map(|n| Value::F32(n as f32))
}

fn to_f64(value: &Value) -> Option<Value> {
    numeric(value).map(Value::F64)
}

fn to_str(value: &Value) -> Option<Value> {
    let s = match value {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    };
    Some(Value::Str(s))
}
