use std::collections::HashMap;

use bitfmt_base::{expression_err, value_err, Result};

use crate::ast::{BinOp, BoolOp, CmpOp, Expr, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i128),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    pub fn as_i128(&self) -> Result<i128> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Bool(b) => Ok(*b as i128),
            Value::Float(f) => Err(value_err(format!("expected an integer, found float {f}"))),
            Value::List(_) => Err(value_err("expected an integer, found a list")),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Int(n) => *n as f64,
            Value::Float(f) => *f,
            Value::Bool(b) => *b as i32 as f64,
            Value::List(_) => f64::NAN,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::List(l) => !l.is_empty(),
        }
    }

    fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v as i128)
    }
}
impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Value::Int(v)
    }
}
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

pub type Env = HashMap<String, Value>;

pub fn eval(expr: &Expr, env: &Env) -> Result<Value> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Name(n) => env
            .get(n)
            .cloned()
            .ok_or_else(|| expression_err(format!("name '{n}' is not defined"))),
        Expr::Unary(UnaryOp::Neg, inner) => {
            let v = eval(inner, env)?;
            if v.is_float() {
                Ok(Value::Float(-v.as_f64()))
            } else {
                Ok(Value::Int(-v.as_i128()?))
            }
        }
        Expr::Unary(UnaryOp::Not, inner) => Ok(Value::Bool(!eval(inner, env)?.truthy())),
        Expr::BoolOp(BoolOp::And, operands) => {
            let mut last = Value::Bool(true);
            for op in operands {
                last = eval(op, env)?;
                if !last.truthy() {
                    return Ok(last);
                }
            }
            Ok(last)
        }
        Expr::BoolOp(BoolOp::Or, operands) => {
            let mut last = Value::Bool(false);
            for op in operands {
                last = eval(op, env)?;
                if last.truthy() {
                    return Ok(last);
                }
            }
            Ok(last)
        }
        Expr::Compare(op, l, r) => {
            let lv = eval(l, env)?;
            let rv = eval(r, env)?;
            Ok(Value::Bool(compare(*op, &lv, &rv)?))
        }
        Expr::Binary(op, l, r) => {
            let lv = eval(l, env)?;
            let rv = eval(r, env)?;
            binary(*op, &lv, &rv)
        }
        Expr::Subscript(base, index) => {
            let b = eval(base, env)?;
            let i = eval(index, env)?.as_i128()?;
            match b {
                Value::List(items) => {
                    let n = items.len() as i128;
                    let idx = if i < 0 { i + n } else { i };
                    if idx < 0 || idx >= n {
                        return Err(value_err(format!("index {i} out of range")));
                    }
                    Ok(items[idx as usize].clone())
                }
                _ => Err(value_err("subscript target is not a list")),
            }
        }
    }
}

fn compare(op: CmpOp, l: &Value, r: &Value) -> Result<bool> {
    let ord = if l.is_float() || r.is_float() {
        l.as_f64().partial_cmp(&r.as_f64())
    } else {
        l.as_i128()?.partial_cmp(&r.as_i128()?)
    };
    let Some(ord) = ord else {
        return Ok(matches!(op, CmpOp::Ne));
    };
    Ok(match op {
        CmpOp::Eq => ord.is_eq(),
        CmpOp::Ne => !ord.is_eq(),
        CmpOp::Lt => ord.is_lt(),
        CmpOp::Le => ord.is_le(),
        CmpOp::Gt => ord.is_gt(),
        CmpOp::Ge => ord.is_ge(),
    })
}

fn binary(op: BinOp, l: &Value, r: &Value) -> Result<Value> {
    use BinOp::*;
    let float_mode = matches!(op, Div) || l.is_float() || r.is_float();
    match op {
        Add if float_mode => Ok(Value::Float(l.as_f64() + r.as_f64())),
        Add => Ok(Value::Int(l.as_i128()?.wrapping_add(r.as_i128()?))),
        Sub if float_mode => Ok(Value::Float(l.as_f64() - r.as_f64())),
        Sub => Ok(Value::Int(l.as_i128()?.wrapping_sub(r.as_i128()?))),
        Mul if float_mode => Ok(Value::Float(l.as_f64() * r.as_f64())),
        Mul => Ok(Value::Int(l.as_i128()?.wrapping_mul(r.as_i128()?))),
        Div => {
            let rhs = r.as_f64();
            if rhs == 0.0 {
                return Err(value_err("division by zero"));
            }
            Ok(Value::Float(l.as_f64() / rhs))
        }
        FloorDiv if float_mode => Ok(Value::Float((l.as_f64() / r.as_f64()).floor())),
        FloorDiv => {
            let rhs = r.as_i128()?;
            if rhs == 0 {
                return Err(value_err("division by zero"));
            }
            Ok(Value::Int(floor_div(l.as_i128()?, rhs)))
        }
        Mod if float_mode => Ok(Value::Float(l.as_f64() % r.as_f64())),
        Mod => {
            let rhs = r.as_i128()?;
            if rhs == 0 {
                return Err(value_err("modulo by zero"));
            }
            Ok(Value::Int(floor_mod(l.as_i128()?, rhs)))
        }
        Pow if float_mode => Ok(Value::Float(l.as_f64().powf(r.as_f64()))),
        Pow => {
            let exp = r.as_i128()?;
            if exp < 0 {
                return Ok(Value::Float(l.as_f64().powf(exp as f64)));
            }
            Ok(Value::Int(l.as_i128()?.pow(exp as u32)))
        }
        BitAnd => Ok(Value::Int(l.as_i128()? & r.as_i128()?)),
        BitOr => Ok(Value::Int(l.as_i128()? | r.as_i128()?)),
        BitXor => Ok(Value::Int(l.as_i128()? ^ r.as_i128()?)),
        Shl => Ok(Value::Int(l.as_i128()?.wrapping_shl(r.as_i128()? as u32))),
        Shr => Ok(Value::Int(l.as_i128()?.wrapping_shr(r.as_i128()? as u32))),
    }
}

/// `//`'s result always rounds toward negative infinity and its sign
/// matches the divisor, not Rust's `div_euclid` (which always keeps the
/// remainder non-negative regardless of the divisor's sign).
fn floor_div(l: i128, r: i128) -> i128 {
    let q = l / r;
    let rem = l % r;
    if rem != 0 && (rem < 0) != (r < 0) {
        q - 1
    } else {
        q
    }
}

fn floor_mod(l: i128, r: i128) -> i128 {
    let rem = l % r;
    if rem != 0 && (rem < 0) != (r < 0) {
        rem + r
    } else {
        rem
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::parse;
    use test_log::test;

    fn env_of(pairs: &[(&str, i128)]) -> Env {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::Int(*v))).collect()
    }

    #[test]
    fn evaluate_arithmetic_with_bound_names() {
        let e = parse("x + y*2").unwrap();
        let env = env_of(&[("x", 3), ("y", 4)]);
        assert_eq!(eval(&e, &env).unwrap(), Value::Int(11));

        let env2 = env_of(&[("x", 3)]);
        assert!(eval(&e, &env2).is_err());
    }

    #[test]
    fn comparisons() {
        let e = parse("1 < 2").unwrap();
        assert_eq!(eval(&e, &Env::new()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn boolean_short_circuit() {
        let e = parse("False and undefined_name").unwrap();
        assert_eq!(eval(&e, &Env::new()).unwrap(), Value::Bool(false));
    }

    #[test]
    fn floor_division_and_modulo_follow_the_divisor_sign_on_negative_rhs() {
        let e = parse("7 // -2").unwrap();
        assert_eq!(eval(&e, &Env::new()).unwrap(), Value::Int(-4));
        let e = parse("7 % -2").unwrap();
        assert_eq!(eval(&e, &Env::new()).unwrap(), Value::Int(-1));
        let e = parse("-7 // 2").unwrap();
        assert_eq!(eval(&e, &Env::new()).unwrap(), Value::Int(-4));
        let e = parse("-7 % 2").unwrap();
        assert_eq!(eval(&e, &Env::new()).unwrap(), Value::Int(1));
    }
}
