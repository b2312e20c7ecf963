#![forbid(unsafe_code)]

//! Dynamically typed property values.
//!
//! A [`Value`] is the unit stored in an object's property slots and carried
//! through binding transforms. Every value knows its [`ValueType`]; property
//! descriptors declare one, and the store refuses writes whose type is
//! neither identical nor [assignable](ValueType::is_assignable_to).
//!
//! # Invariants
//!
//! 1. `Value::default_for(t).value_type() == t` for every `t`.
//! 2. Assignability is reflexive and only covers lossless widenings.
//! 3. [`Value::coerce_to`] succeeds exactly when the source type is
//!    assignable to the requested type.

use std::fmt;

/// Declared type of a property slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ValueType {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    Str,
}

impl ValueType {
    /// All value types, in declaration order.
    pub const ALL: [ValueType; 8] = [
        Self::Bool,
        Self::I32,
        Self::I64,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::Str,
    ];

    /// Short lowercase name, used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Str => "str",
        }
    }

    /// Whether this is one of the integer or floating point types.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Bool | Self::Str)
    }

    /// Whether a value of this type can be stored in a slot of type `dest`
    /// without loss.
    ///
    /// Identical types are always assignable. The remaining pairs are the
    /// lossless widenings: `i32 -> i64`, `u32 -> u64`, `u32 -> i64`,
    /// `f32 -> f64`, `i32 -> f64` and `u32 -> f64`.
    #[must_use]
    pub const fn is_assignable_to(self, dest: ValueType) -> bool {
        matches!(
            (self, dest),
            (Self::Bool, Self::Bool)
                | (Self::I32, Self::I32)
                | (Self::I64, Self::I64)
                | (Self::U32, Self::U32)
                | (Self::U64, Self::U64)
                | (Self::F32, Self::F32)
                | (Self::F64, Self::F64)
                | (Self::Str, Self::Str)
                | (Self::I32, Self::I64)
                | (Self::U32, Self::U64)
                | (Self::U32, Self::I64)
                | (Self::F32, Self::F64)
                | (Self::I32, Self::F64)
                | (Self::U32, Self::F64)
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value", rename_all = "lowercase"))]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl Value {
    /// The zero value for a type: `false`, `0`, `0.0` or the empty string.
    #[must_use]
    pub fn default_for(ty: ValueType) -> Self {
        match ty {
            ValueType::Bool => Self::Bool(false),
            ValueType::I32 => Self::I32(0),
            ValueType::I64 => Self::I64(0),
            ValueType::U32 => Self::U32(0),
            ValueType::U64 => Self::U64(0),
            ValueType::F32 => Self::F32(0.0),
            ValueType::F64 => Self::F64(0.0),
            ValueType::Str => Self::Str(String::new()),
        }
    }

    /// The type tag of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::U32(_) => ValueType::U32,
            Self::U64(_) => ValueType::U64,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
            Self::Str(_) => ValueType::Str,
        }
    }

    /// Widen this value into `dest` if its type is assignable to it.
    ///
    /// Returns `None` for any pair outside the assignability table; lossy
    /// conversions live in [`crate::convert`].
    #[must_use]
    pub fn coerce_to(&self, dest: ValueType) -> Option<Value> {
        if self.value_type() == dest {
            return Some(self.clone());
        }
        if !self.value_type().is_assignable_to(dest) {
            return None;
        }
        let widened = match (self, dest) {
            (Self::I32(v), ValueType::I64) => Self::I64(i64::from(*v)),
            (Self::U32(v), ValueType::U64) => Self::U64(u64::from(*v)),
            (Self::U32(v), ValueType::I64) => Self::I64(i64::from(*v)),
            (Self::F32(v), ValueType::F64) => Self::F64(f64::from(*v)),
            (Self::I32(v), ValueType::F64) => Self::F64(f64::from(*v)),
            (Self::U32(v), ValueType::F64) => Self::F64(f64::from(*v)),
            _ => return None,
        };
        Some(widened)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Signed integer view of any integer value that fits in `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I32(v) => Some(i64::from(*v)),
            Self::I64(v) => Some(*v),
            Self::U32(v) => Some(i64::from(*v)),
            Self::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Unsigned integer view of any non-negative integer value.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::I32(v) => u64::try_from(*v).ok(),
            Self::I64(v) => u64::try_from(*v).ok(),
            Self::U32(v) => Some(u64::from(*v)),
            Self::U64(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating point view of any numeric value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::I32(v) => Some(f64::from(*v)),
            Self::I64(v) => Some(*v as f64),
            Self::U32(v) => Some(f64::from(*v)),
            Self::U64(v) => Some(*v as f64),
            Self::F32(v) => Some(f64::from(*v)),
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}
