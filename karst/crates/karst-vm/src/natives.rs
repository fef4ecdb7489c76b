//! Built-in native functions.
//!
//! Natives receive their arguments as a slice and return a value; they
//! cannot raise runtime errors and must not hold object references past
//! the call.

use std::time::{SystemTime, UNIX_EPOCH};

use karst_bc::Value;

/// Seconds since the Unix epoch, as a number. Registered as `clock`.
pub fn clock(_args: &[Value]) -> Value {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);
    Value::Number(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_returns_a_positive_number() {
        match clock(&[]) {
            Value::Number(n) => assert!(n > 0.0),
            other => panic!("clock returned {:?}", other),
        }
    }

    #[test]
    fn test_clock_is_monotonic_enough() {
        let a = clock(&[]).as_number().unwrap();
        let b = clock(&[]).as_number().unwrap();
        assert!(b >= a);
    }
}
