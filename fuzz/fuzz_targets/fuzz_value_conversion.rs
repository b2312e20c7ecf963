#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tether_core::{Value, ValueType, transform_value};

#[derive(Debug, Arbitrary)]
enum Input {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
}

fuzz_target!(|data: (Input, u8)| {
    let (input, to) = data;
    let value = match input {
        Input::Bool(v) => Value::Bool(v),
        Input::I32(v) => Value::I32(v),
        Input::I64(v) => Value::I64(v),
        Input::U32(v) => Value::U32(v),
        Input::U64(v) => Value::U64(v),
        Input::F32(v) => Value::F32(v),
        Input::F64(v) => Value::F64(v),
        Input::Str(v) => Value::Str(v),
    };
    let to = ValueType::ALL[usize::from(to) % ValueType::ALL.len()];
    if let Ok(out) = transform_value(&value, to) {
        assert_eq!(out.value_type(), to);
    }
});
