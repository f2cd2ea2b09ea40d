//! The environment threaded explicitly through `parse`/`pack`, rather than
//! kept as global mutable state.

use bitfmt_base::{value_err, Result};
use bitfmt_dtype::Value as DValue;
use bitfmt_expr::Value as EValue;

pub type Env = bitfmt_expr::Env;

/// Converts a dtype value into an expression value so a named Field can
/// publish its parsed value for use by a later sibling's expression. Only
/// scalar numeric/boolean dtypes are representable; anything else (bytes,
/// hex strings, nested arrays of those) is simply not bound.
pub fn bind(env: &mut Env, name: &str, value: &DValue) {
    if let Some(ev) = to_expr_value(value) {
        env.insert(name.to_string(), ev);
    }
}

pub fn to_expr_value(value: &DValue) -> Option<EValue> {
    match value {
        DValue::Scalar(bitfmt_bits::Value::UInt(n)) => Some(EValue::Int(*n as i128)),
        DValue::Scalar(bitfmt_bits::Value::Int(n)) => Some(EValue::Int(*n)),
        DValue::Scalar(bitfmt_bits::Value::Bool(b)) => Some(EValue::Bool(*b)),
        DValue::Scalar(bitfmt_bits::Value::Float(f)) => Some(EValue::Float(f.0)),
        DValue::Array(items) => {
            let converted: Option<Vec<EValue>> = items.iter().map(to_expr_value).collect();
            converted.map(EValue::List)
        }
        _ => None,
    }
}

pub fn expr_to_uint(v: &EValue) -> Result<u128> {
    match v {
        EValue::Int(n) if *n >= 0 => Ok(*n as u128),
        EValue::Int(n) => Err(value_err(format!("expected a non-negative integer, got {n}"))),
        EValue::Bool(b) => Ok(*b as u128),
        other => Err(value_err(format!("expected an integer, got {other:?}"))),
    }
}
