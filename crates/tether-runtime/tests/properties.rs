#![forbid(unsafe_code)]

//! Property-based tests for binding invariants.

use std::rc::Rc;

use proptest::prelude::*;
use tether_core::{Constraint, Object, ObjectClass, PropertyDescriptor, Value, ValueType};
use tether_runtime::{BindingFlags, bind, binding_count};

fn class() -> Rc<ObjectClass> {
    ObjectClass::builder("Knob")
        .property(
            PropertyDescriptor::new("position", ValueType::I64)
                .constraint(Constraint::IntRange { min: -1000, max: 1000 }),
        )
        .build()
        .unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    SetSource(i64),
    SetTarget(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-2000i64..2000).prop_map(Op::SetSource),
        (-2000i64..2000).prop_map(Op::SetTarget),
    ]
}

proptest! {
    #[test]
    fn bidirectional_endpoints_stay_equal(ops in prop::collection::vec(op(), 1..40)) {
        let class = class();
        let a = Object::new(&class);
        let b = Object::new(&class);
        bind(&a, "position", &b, "position", BindingFlags::BIDIRECTIONAL).unwrap();

        for op in ops {
            match op {
                Op::SetSource(v) => a.set("position", v).unwrap(),
                Op::SetTarget(v) => b.set("position", v).unwrap(),
            }
            prop_assert_eq!(a.get("position").unwrap(), b.get("position").unwrap());
        }
    }

    #[test]
    fn one_way_target_tracks_last_source_write(ops in prop::collection::vec(op(), 1..40)) {
        let class = class();
        let a = Object::new(&class);
        let b = Object::new(&class);
        bind(&a, "position", &b, "position", BindingFlags::DEFAULT).unwrap();

        let mut expected_a = 0i64;
        let mut expected_b = 0i64;
        for op in ops {
            match op {
                Op::SetSource(v) => {
                    a.set("position", v).unwrap();
                    expected_a = v.clamp(-1000, 1000);
                    expected_b = expected_a;
                }
                Op::SetTarget(v) => {
                    b.set("position", v).unwrap();
                    expected_b = v.clamp(-1000, 1000);
                }
            }
            prop_assert_eq!(a.get("position").unwrap(), Value::I64(expected_a));
            prop_assert_eq!(b.get("position").unwrap(), Value::I64(expected_b));
        }
    }

    #[test]
    fn dropping_any_subset_leaves_no_residue(keep in prop::collection::vec(any::<bool>(), 2..8)) {
        let class = class();
        let objects: Vec<Object> = keep.iter().map(|_| Object::new(&class)).collect();
        for pair in objects.windows(2) {
            bind(&pair[0], "position", &pair[1], "position", BindingFlags::BIDIRECTIONAL).unwrap();
        }

        let survivors: Vec<Object> = objects
            .into_iter()
            .zip(&keep)
            .filter_map(|(object, keep)| keep.then_some(object))
            .collect();

        // Survivors were chained only through destroyed neighbours or each other.
        for object in &survivors {
            let bound = binding_count(object);
            prop_assert!(bound <= 2);
            prop_assert_eq!(object.subscriber_count(), bound);
            prop_assert_eq!(object.destroy_hook_count(), usize::from(bound > 0));
        }
    }
}
