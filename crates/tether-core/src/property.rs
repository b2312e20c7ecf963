#![forbid(unsafe_code)]

//! Property descriptors: name, type, access flags and value constraints.
//!
//! Descriptors are created once, handed to an
//! [`ObjectClassBuilder`](crate::class::ObjectClassBuilder) and are immutable
//! afterwards. Lookups after class registration go through [`PropertyId`],
//! an index into the class's descriptor table.
//!
//! # Naming
//!
//! Property names start with an ASCII letter and continue with letters,
//! digits, `-` or `_`. Underscores are canonicalized to dashes, so
//! `"max_value"` and `"max-value"` address the same property.

use std::borrow::Cow;
use std::fmt;

use bitflags::bitflags;

use crate::value::{Value, ValueType};

bitflags! {
    /// Access flags of a property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        /// The value can be read through `get`.
        const READABLE = 1 << 0;
        /// The value can be written through `set`.
        const WRITABLE = 1 << 1;
        /// The value can only be supplied while the object is constructed.
        const CONSTRUCT_ONLY = 1 << 2;
        /// Shorthand for `READABLE | WRITABLE`.
        const READWRITE = Self::READABLE.bits() | Self::WRITABLE.bits();
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self::READWRITE
    }
}

/// Index of a property within its class's descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub(crate) u32);

impl PropertyId {
    /// Raw index into the class's descriptor table.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Value constraint applied by [`PropertyDescriptor::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Constraint {
    #[default]
    None,
    /// Inclusive range for signed integer properties.
    IntRange { min: i64, max: i64 },
    /// Inclusive range for unsigned integer properties.
    UIntRange { min: u64, max: u64 },
    /// Inclusive range for floating point properties. NaN is clamped to `min`.
    FloatRange { min: f64, max: f64 },
    /// Maximum length in bytes for string properties (cut on a char boundary).
    MaxLen(usize),
}

/// Static description of a property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    name: String,
    nick: Option<String>,
    blurb: Option<String>,
    value_type: ValueType,
    flags: PropertyFlags,
    default: Value,
    constraint: Constraint,
}

impl PropertyDescriptor {
    /// Create a read-write descriptor with the zero default for `value_type`.
    ///
    /// The name is canonicalized; it is checked when the class is built.
    #[must_use]
    pub fn new(name: impl AsRef<str>, value_type: ValueType) -> Self {
        Self {
            name: canonical_name(name.as_ref()).into_owned(),
            nick: None,
            blurb: None,
            value_type,
            flags: PropertyFlags::READWRITE,
            default: Value::default_for(value_type),
            constraint: Constraint::None,
        }
    }

    #[must_use]
    pub fn flags(mut self, flags: PropertyFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Short human-readable name.
    #[must_use]
    pub fn nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self
    }

    /// One-line description.
    #[must_use]
    pub fn blurb(mut self, blurb: impl Into<String>) -> Self {
        self.blurb = Some(blurb.into());
        self
    }

    /// Canonical property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn nick_text(&self) -> Option<&str> {
        self.nick.as_deref()
    }

    #[must_use]
    pub fn blurb_text(&self) -> Option<&str> {
        self.blurb.as_deref()
    }

    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    #[must_use]
    pub const fn access(&self) -> PropertyFlags {
        self.flags
    }

    /// Value a freshly constructed object holds for this property.
    #[must_use]
    pub fn initial_value(&self) -> &Value {
        &self.default
    }

    #[must_use]
    pub const fn value_constraint(&self) -> Constraint {
        self.constraint
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.flags.contains(PropertyFlags::READABLE)
    }

    /// Writable after construction: `WRITABLE` and not `CONSTRUCT_ONLY`.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.flags.contains(PropertyFlags::WRITABLE)
            && !self.flags.contains(PropertyFlags::CONSTRUCT_ONLY)
    }

    #[must_use]
    pub fn is_construct_only(&self) -> bool {
        self.flags.contains(PropertyFlags::CONSTRUCT_ONLY)
    }

    /// Clamp `value` into this property's constraint.
    ///
    /// Returns `true` if the value was modified. Values of a different type
    /// than the constraint expects are left untouched.
    pub fn validate(&self, value: &mut Value) -> bool {
        match (self.constraint, value) {
            (Constraint::None, _) => false,
            (Constraint::IntRange { min, max }, Value::I32(v)) => {
                let clamped = i64::from(*v).clamp(min, max);
                let clamped = clamped.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
                replace_if_changed(v, clamped)
            }
            (Constraint::IntRange { min, max }, Value::I64(v)) => {
                replace_if_changed(v, (*v).clamp(min, max))
            }
            (Constraint::UIntRange { min, max }, Value::U32(v)) => {
                let clamped = u64::from(*v).clamp(min, max).min(u64::from(u32::MAX)) as u32;
                replace_if_changed(v, clamped)
            }
            (Constraint::UIntRange { min, max }, Value::U64(v)) => {
                replace_if_changed(v, (*v).clamp(min, max))
            }
            (Constraint::FloatRange { min, max }, Value::F32(v)) => {
                let clamped = clamp_float(f64::from(*v), min, max) as f32;
                replace_if_changed(v, clamped)
            }
            (Constraint::FloatRange { min, max }, Value::F64(v)) => {
                replace_if_changed(v, clamp_float(*v, min, max))
            }
            (Constraint::MaxLen(limit), Value::Str(s)) => {
                if s.len() <= limit {
                    return false;
                }
                let mut cut = limit;
                while !s.is_char_boundary(cut) {
                    cut -= 1;
                }
                s.truncate(cut);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value_type)
    }
}

fn replace_if_changed<T: PartialEq + Copy>(slot: &mut T, next: T) -> bool {
    if *slot == next {
        false
    } else {
        *slot = next;
        true
    }
}

fn clamp_float(v: f64, min: f64, max: f64) -> f64 {
    if v.is_nan() { min } else { v.clamp(min, max) }
}

/// Canonicalize a property name (`_` becomes `-`).
#[must_use]
pub fn canonical_name(name: &str) -> Cow<'_, str> {
    if name.contains('_') {
        Cow::Owned(name.replace('_', "-"))
    } else {
        Cow::Borrowed(name)
    }
}

/// Whether `name` is a valid property name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_name_replaces_underscores() {
        assert_eq!(canonical_name("max_value"), "max-value");
        assert!(matches!(canonical_name("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn name_validation() {
        assert!(is_valid_name("celsius"));
        assert!(is_valid_name("x-1_y"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1abc"));
        assert!(!is_valid_name("with space"));
    }

    #[test]
    fn construct_only_is_not_writable() {
        let desc = PropertyDescriptor::new("id", ValueType::U64)
            .flags(PropertyFlags::READWRITE | PropertyFlags::CONSTRUCT_ONLY);
        assert!(desc.is_readable());
        assert!(!desc.is_writable());
        assert!(desc.is_construct_only());
    }

    #[test]
    fn validate_clamps_ints() {
        let desc = PropertyDescriptor::new("level", ValueType::I32)
            .constraint(Constraint::IntRange { min: 0, max: 10 });
        let mut v = Value::I32(42);
        assert!(desc.validate(&mut v));
        assert_eq!(v, Value::I32(10));
        let mut v = Value::I32(3);
        assert!(!desc.validate(&mut v));
    }

    #[test]
    fn validate_clamps_nan_to_min() {
        let desc = PropertyDescriptor::new("ratio", ValueType::F64)
            .constraint(Constraint::FloatRange { min: 0.0, max: 1.0 });
        let mut v = Value::F64(f64::NAN);
        assert!(desc.validate(&mut v));
        assert_eq!(v, Value::F64(0.0));
    }

    #[test]
    fn validate_truncates_on_char_boundary() {
        let desc = PropertyDescriptor::new("label", ValueType::Str).constraint(Constraint::MaxLen(3));
        let mut v = Value::from("héllo");
        assert!(desc.validate(&mut v));
        assert_eq!(v, Value::from("hé"));
    }

    proptest! {
        #[test]
        fn validated_floats_stay_in_range(x in proptest::num::f64::ANY) {
            let desc = PropertyDescriptor::new("t", ValueType::F64)
                .constraint(Constraint::FloatRange { min: -40.0, max: 120.0 });
            let mut v = Value::F64(x);
            desc.validate(&mut v);
            let out = v.as_f64().unwrap();
            prop_assert!((-40.0..=120.0).contains(&out));
        }

        #[test]
        fn validated_u32_stays_in_range(x in any::<u32>()) {
            let desc = PropertyDescriptor::new("n", ValueType::U32)
                .constraint(Constraint::UIntRange { min: 5, max: 500 });
            let mut v = Value::U32(x);
            desc.validate(&mut v);
            prop_assert!((5..=500).contains(&v.as_u64().unwrap()));
        }
    }
}
