#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tether_core::{Constraint, Object, ObjectClass, PropertyDescriptor, Value, ValueType};
use tether_runtime::{Binding, BindingFlags, bind, binding_count};

const SLOTS: usize = 4;
const PROPS: [&str; 4] = ["count", "ratio", "label", "flag"];

#[derive(Debug, Arbitrary)]
enum Op {
    Bind { src: u8, src_prop: u8, dst: u8, dst_prop: u8, bidirectional: bool },
    Unbind { binding: u8 },
    SetCount { object: u8, value: i64 },
    SetRatio { object: u8, value: f64 },
    SetFlag { object: u8, value: bool },
    Destroy { object: u8 },
    Recreate { object: u8 },
}

fuzz_target!(|ops: Vec<Op>| {
    let class = ObjectClass::builder("Node")
        .property(
            PropertyDescriptor::new("count", ValueType::I64)
                .constraint(Constraint::IntRange { min: -1000, max: 1000 }),
        )
        .property(PropertyDescriptor::new("ratio", ValueType::F64))
        .property(
            PropertyDescriptor::new("label", ValueType::Str).constraint(Constraint::MaxLen(8)),
        )
        .property(PropertyDescriptor::new("flag", ValueType::Bool))
        .build()
        .unwrap();

    let mut slots: Vec<Option<Object>> = (0..SLOTS).map(|_| Some(Object::new(&class))).collect();
    let mut bindings: Vec<Binding> = Vec::new();
    let slot = |i: u8| usize::from(i) % SLOTS;

    for op in ops.into_iter().take(256) {
        match op {
            Op::Bind { src, src_prop, dst, dst_prop, bidirectional } => {
                let (Some(s), Some(d)) = (&slots[slot(src)], &slots[slot(dst)]) else {
                    continue;
                };
                let flags = if bidirectional {
                    BindingFlags::BIDIRECTIONAL
                } else {
                    BindingFlags::DEFAULT
                };
                let sp = PROPS[usize::from(src_prop) % PROPS.len()];
                let dp = PROPS[usize::from(dst_prop) % PROPS.len()];
                if let Ok(b) = bind(s, sp, d, dp, flags) {
                    bindings.push(b);
                }
            }
            Op::Unbind { binding } => {
                if !bindings.is_empty() {
                    bindings[usize::from(binding) % bindings.len()].unbind();
                }
            }
            Op::SetCount { object, value } => set(&slots[slot(object)], "count", value),
            Op::SetRatio { object, value } => set(&slots[slot(object)], "ratio", value),
            Op::SetFlag { object, value } => set(&slots[slot(object)], "flag", value),
            Op::Destroy { object } => slots[slot(object)] = None,
            Op::Recreate { object } => {
                let s = &mut slots[slot(object)];
                if s.is_none() {
                    *s = Some(Object::new(&class));
                }
            }
        }

        for b in &bindings {
            if b.is_bound() {
                assert!(b.source().is_some() && b.target().is_some());
            }
        }
        for object in slots.iter().flatten() {
            let bound = binding_count(object);
            assert_eq!(object.destroy_hook_count(), usize::from(bound > 0));
        }
    }

    slots.clear();
    assert!(bindings.iter().all(|b| !b.is_bound()));
});

fn set(object: &Option<Object>, property: &str, value: impl Into<Value>) {
    if let Some(object) = object {
        object.set(property, value).unwrap();
    }
}
