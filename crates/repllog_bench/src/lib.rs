//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::Rng;
use repllog_core::{Oid, Value};

/// Generate a random primary-key value.
pub fn random_key() -> Value {
    let mut rng = rand::thread_rng();
    match rng.gen_range(0..3) {
        0 => Value::Int(rng.gen()),
        1 => Value::BigInt(rng.gen()),
        _ => Value::Text(format!("K-{:08}", rng.gen_range(0..100_000_000u32))),
    }
}

/// Generate `count` instance identifiers drawn from `distinct` slots.
pub fn generate_instances(count: usize, distinct: i16) -> Vec<Oid> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| Oid::new(0, 500, rng.gen_range(0..distinct.max(1))))
        .collect()
}
