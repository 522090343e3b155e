//! JSON number normalization.
//!
//! The table service stores numbers as arbitrary precision decimals. When
//! they are rendered back to clients, integral values become JSON integers
//! and everything else becomes a JSON float.

use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::{Number, Value};

/// Render a decimal as a JSON number.
pub fn decimal_to_json(value: Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(int) = value.to_i64() {
            return Value::from(int);
        }
        if let Some(int) = value.to_u64() {
            return Value::from(int);
        }
    }
    value
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Parse a decimal string (as the table service returns it) into a JSON number.
pub fn number_from_str(raw: &str) -> Option<Value> {
    match Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)) {
        Ok(decimal) => Some(decimal_to_json(decimal)),
        Err(_) => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
    }
}

/// Apply the integer/float rule to every number in a JSON document.
pub fn normalize_numbers(value: Value) -> Value {
    match value {
        Value::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() => Decimal::from_f64(float)
                .map(decimal_to_json)
                .unwrap_or(Value::Number(number)),
            _ => Value::Number(number),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, normalize_numbers(value)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integral_decimal_becomes_integer() {
        assert_eq!(decimal_to_json(Decimal::from_str("1.0").unwrap()), json!(1));
        assert_eq!(decimal_to_json(Decimal::from_str("-42").unwrap()), json!(-42));
    }

    #[test]
    fn test_integral_decimal_beyond_i64() {
        let value = decimal_to_json(Decimal::from_str("18446744073709551615").unwrap());
        assert!(value.is_u64());
        assert_eq!(value, json!(u64::MAX));
        assert_eq!(number_from_str("18446744073709551615"), Some(json!(u64::MAX)));
    }

    #[test]
    fn test_fractional_decimal_becomes_float() {
        assert_eq!(decimal_to_json(Decimal::from_str("1.1").unwrap()), json!(1.1));
    }

    #[test]
    fn test_number_from_str() {
        assert_eq!(number_from_str("5"), Some(json!(5)));
        assert_eq!(number_from_str("0.25"), Some(json!(0.25)));
        assert_eq!(number_from_str("abc"), None);
    }

    #[test]
    fn test_normalize_nested_document() {
        let doc = json!({
            "a": 1.0,
            "b": [2.5, 3.0, "x"],
            "c": {"d": 7}
        });
        assert_eq!(
            normalize_numbers(doc),
            json!({"a": 1, "b": [2.5, 3, "x"], "c": {"d": 7}})
        );
    }
}
