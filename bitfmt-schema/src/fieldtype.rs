//! The `FieldType` tree: a single tagged union dispatched by `match`, rather
//! than a trait object per node kind.

use std::collections::{HashMap, VecDeque};

use bitfmt_base::{value_err, Result};
use bitfmt_bits::BitSeq;
use bitfmt_dtype::{Dtype, Value as DValue};
use bitfmt_expr::Expression;

use crate::env::{bind, expr_to_uint, Env};

/// What `unpack` returns for a subtree: a leaf value, an ordered list (a
/// Format's children or a Repeat/While's iterations), or nothing (Pass,
/// Let).
#[derive(Debug, Clone, PartialEq)]
pub enum TreeValue {
    Scalar(DValue),
    List(Vec<TreeValue>),
    Empty,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: Option<String>,
    pub dtype: Dtype,
    pub const_value: Option<DValue>,
    parsed: Option<(BitSeq, DValue)>,
}

impl Field {
    pub fn new(name: Option<String>, dtype: Dtype, const_value: Option<DValue>) -> Self {
        Field { name, dtype, const_value, parsed: None }
    }
}

#[derive(Debug, Clone)]
pub struct Format {
    pub name: Option<String>,
    pub children: Vec<FieldType>,
}

#[derive(Debug, Clone)]
pub struct If {
    pub condition: Expression,
    pub then_branch: FieldType,
    pub else_branch: Option<FieldType>,
    taken: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Repeat {
    pub count: Expression,
    pub body: FieldType,
    iterations: Vec<FieldType>,
}

#[derive(Debug, Clone)]
pub struct While {
    pub condition: Expression,
    pub body: FieldType,
    iterations: Vec<FieldType>,
}

#[derive(Debug, Clone)]
pub struct Let {
    pub name: String,
    pub expr: Expression,
}

#[derive(Debug, Clone)]
pub enum FieldType {
    Field(Field),
    Format(Format),
    If(Box<If>),
    Repeat(Box<Repeat>),
    While(Box<While>),
    Let(Let),
    Pass,
}

impl FieldType {
    pub fn name(&self) -> Option<&str> {
        match self {
            FieldType::Field(f) => f.name.as_deref(),
            FieldType::Format(f) => f.name.as_deref(),
            FieldType::Let(l) => Some(&l.name),
            FieldType::If(_) | FieldType::Repeat(_) | FieldType::While(_) | FieldType::Pass => None,
        }
    }

    pub fn is_const(&self) -> bool {
        match self {
            FieldType::Field(f) => f.const_value.is_some(),
            FieldType::Format(f) => f.children.iter().all(FieldType::is_const),
            FieldType::Pass => true,
            FieldType::Let(_) => true,
            FieldType::If(_) | FieldType::Repeat(_) | FieldType::While(_) => false,
        }
    }

    pub fn has_dynamic_size(&self) -> bool {
        match self {
            FieldType::Field(f) => f.dtype.is_stretchy(),
            FieldType::Format(f) => f.children.iter().any(FieldType::has_dynamic_size),
            FieldType::If(i) => i.then_branch.bit_length().is_none() || i.condition.has_const_value(),
            FieldType::Repeat(_) | FieldType::While(_) => true,
            FieldType::Let(_) | FieldType::Pass => false,
        }
    }

    pub fn bit_length(&self) -> Option<usize> {
        match self {
            FieldType::Field(f) => f.dtype.bit_length(),
            FieldType::Format(f) => {
                let mut total = 0;
                for c in &f.children {
                    total += c.bit_length()?;
                }
                Some(total)
            }
            FieldType::If(i) => {
                let then_len = i.then_branch.bit_length();
                let else_len = i.else_branch.as_ref().and_then(FieldType::bit_length);
                match (then_len, else_len, i.condition.try_const_value()) {
                    (Some(t), Some(e), _) if t == e => Some(t),
                    (Some(t), None, Some(_)) => Some(t),
                    (Some(t), Some(e), Some(c)) => Some(if c.truthy() { t } else { e }),
                    _ => None,
                }
            }
            FieldType::Repeat(r) => {
                let per = r.body.bit_length()?;
                let n = r.count.try_const_value()?;
                let n = n.as_i128().ok()?.max(0) as usize;
                Some(per * n)
            }
            FieldType::While(_) => None,
            FieldType::Let(_) | FieldType::Pass => Some(0),
        }
    }

    pub fn clear(&mut self) {
        match self {
            FieldType::Field(f) => f.parsed = None,
            FieldType::Format(f) => f.children.iter_mut().for_each(FieldType::clear),
            FieldType::If(i) => {
                i.taken = None;
                i.then_branch.clear();
                if let Some(e) = &mut i.else_branch {
                    e.clear();
                }
            }
            FieldType::Repeat(r) => r.iterations.clear(),
            FieldType::While(w) => w.iterations.clear(),
            FieldType::Let(_) | FieldType::Pass => {}
        }
    }

    pub fn parse(&mut self, bits: &BitSeq, env: &mut Env) -> Result<usize> {
        match self {
            FieldType::Field(field) => {
                let n = field.dtype.bit_length().unwrap_or(bits.len());
                if n > bits.len() {
                    return Err(value_err(format!(
                        "field requires {n} bits but only {} remain",
                        bits.len()
                    )));
                }
                let chunk = bits.slice(0, n as isize)?;
                let value = field.dtype.unpack(&chunk)?;
                if let Some(expected) = &field.const_value {
                    if &value != expected {
                        return Err(value_err("parsed value does not match the declared constant"));
                    }
                }
                if let Some(name) = &field.name {
                    bind(env, name, &value);
                }
                field.parsed = Some((chunk, value));
                Ok(n)
            }
            FieldType::Format(format) => {
                let span = tracing::debug_span!("format_parse", name = format.name.as_deref().unwrap_or("<anon>"), bits = bits.len());
                let _enter = span.enter();
                let mut pos = 0;
                for child in &mut format.children {
                    let remaining = bits.slice(pos as isize, bits.len() as isize)?;
                    pos += child.parse(&remaining, env)?;
                }
                tracing::debug!(consumed = pos, "format_parse complete");
                Ok(pos)
            }
            FieldType::If(node) => {
                let taken = node.condition.evaluate(env)?.truthy();
                node.taken = Some(taken);
                if taken {
                    node.then_branch.parse(bits, env)
                } else if let Some(else_branch) = &mut node.else_branch {
                    else_branch.parse(bits, env)
                } else {
                    Ok(0)
                }
            }
            FieldType::Repeat(node) => {
                let count = expr_to_uint(&node.count.evaluate(env)?)? as usize;
                node.iterations.clear();
                let mut pos = 0;
                for _ in 0..count {
                    let mut iteration = node.body.clone();
                    let remaining = bits.slice(pos as isize, bits.len() as isize)?;
                    pos += iteration.parse(&remaining, env)?;
                    node.iterations.push(iteration);
                }
                Ok(pos)
            }
            FieldType::While(node) => {
                node.iterations.clear();
                let mut pos = 0;
                while node.condition.evaluate(env)?.truthy() {
                    let mut iteration = node.body.clone();
                    let remaining = bits.slice(pos as isize, bits.len() as isize)?;
                    pos += iteration.parse(&remaining, env)?;
                    node.iterations.push(iteration);
                }
                Ok(pos)
            }
            FieldType::Let(node) => {
                let value = node.expr.evaluate(env)?;
                env.insert(node.name.clone(), value);
                Ok(0)
            }
            FieldType::Pass => Ok(0),
        }
    }

    /// `overrides` overlays positional consumption at each named child: a
    /// name present in the map supplies that field's value directly and is
    /// not also drawn from `values`.
    pub fn pack(
        &mut self,
        values: &mut VecDeque<DValue>,
        overrides: &HashMap<String, DValue>,
        env: &mut Env,
    ) -> Result<()> {
        match self {
            FieldType::Field(field) => {
                let value = if let Some(c) = &field.const_value {
                    c.clone()
                } else if let Some(v) = field.name.as_deref().and_then(|n| overrides.get(n)) {
                    v.clone()
                } else {
                    values
                        .pop_front()
                        .ok_or_else(|| value_err("not enough values supplied to pack this field"))?
                };
                let bits = field.dtype.pack(&value)?;
                if let Some(name) = &field.name {
                    bind(env, name, &value);
                }
                field.parsed = Some((bits, value));
                Ok(())
            }
            FieldType::Format(format) => {
                for child in &mut format.children {
                    child.pack(values, overrides, env)?;
                }
                Ok(())
            }
            FieldType::If(node) => {
                let taken = node.condition.evaluate(env)?.truthy();
                node.taken = Some(taken);
                if taken {
                    node.then_branch.pack(values, overrides, env)
                } else if let Some(else_branch) = &mut node.else_branch {
                    else_branch.pack(values, overrides, env)
                } else {
                    Ok(())
                }
            }
            FieldType::Repeat(node) => {
                let count = expr_to_uint(&node.count.evaluate(env)?)? as usize;
                node.iterations.clear();
                for _ in 0..count {
                    let mut iteration = node.body.clone();
                    iteration.pack(values, overrides, env)?;
                    node.iterations.push(iteration);
                }
                Ok(())
            }
            FieldType::While(node) => {
                node.iterations.clear();
                while node.condition.evaluate(env)?.truthy() {
                    let mut iteration = node.body.clone();
                    if values.is_empty() {
                        return Err(value_err("while loop's condition is still true but no values remain"));
                    }
                    iteration.pack(values, overrides, env)?;
                    node.iterations.push(iteration);
                }
                Ok(())
            }
            FieldType::Let(node) => {
                let value = node.expr.evaluate(env)?;
                env.insert(node.name.clone(), value);
                Ok(())
            }
            FieldType::Pass => Ok(()),
        }
    }

    pub fn unpack(&self) -> TreeValue {
        match self {
            FieldType::Field(field) => match &field.parsed {
                Some((_, v)) => TreeValue::Scalar(v.clone()),
                None => TreeValue::Empty,
            },
            FieldType::Format(format) => TreeValue::List(format.children.iter().map(FieldType::unpack).collect()),
            FieldType::If(node) => match node.taken {
                Some(true) => node.then_branch.unpack(),
                Some(false) => node.else_branch.as_ref().map(FieldType::unpack).unwrap_or(TreeValue::Empty),
                None => TreeValue::Empty,
            },
            FieldType::Repeat(node) => TreeValue::List(node.iterations.iter().map(FieldType::unpack).collect()),
            FieldType::While(node) => TreeValue::List(node.iterations.iter().map(FieldType::unpack).collect()),
            FieldType::Let(_) | FieldType::Pass => TreeValue::Empty,
        }
    }

    pub fn to_bits(&self) -> BitSeq {
        match self {
            FieldType::Field(field) => field.parsed.as_ref().map(|(b, _)| b.clone()).unwrap_or_else(BitSeq::empty),
            FieldType::Format(format) => {
                format.children.iter().fold(BitSeq::empty(), |acc, c| acc.concat(&c.to_bits()))
            }
            FieldType::If(node) => match node.taken {
                Some(true) => node.then_branch.to_bits(),
                Some(false) => node.else_branch.as_ref().map(FieldType::to_bits).unwrap_or_else(BitSeq::empty),
                None => BitSeq::empty(),
            },
            FieldType::Repeat(node) => {
                node.iterations.iter().fold(BitSeq::empty(), |acc, it| acc.concat(&it.to_bits()))
            }
            FieldType::While(node) => {
                node.iterations.iter().fold(BitSeq::empty(), |acc, it| acc.concat(&it.to_bits()))
            }
            FieldType::Let(_) | FieldType::Pass => BitSeq::empty(),
        }
    }
}

impl Format {
    pub fn get(&self, name: &str) -> Option<&FieldType> {
        self.children.iter().find(|c| c.name() == Some(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldType> {
        self.children.iter_mut().find(|c| c.name() == Some(name))
    }

    pub fn set(&mut self, name: &str, replacement: FieldType) -> Result<()> {
        let idx = self
            .children
            .iter()
            .position(|c| c.name() == Some(name))
            .ok_or_else(|| value_err(format!("no child named '{name}' in this format")))?;
        self.children[idx] = replacement;
        Ok(())
    }
}

impl If {
    pub fn new(condition: Expression, then_branch: FieldType, else_branch: Option<FieldType>) -> Self {
        If { condition, then_branch, else_branch, taken: None }
    }
}

impl Repeat {
    pub fn new(count: Expression, body: FieldType) -> Self {
        Repeat { count, body, iterations: Vec::new() }
    }
}

impl While {
    pub fn new(condition: Expression, body: FieldType) -> Self {
        While { condition, body, iterations: Vec::new() }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bitfmt_bits::{Endianness, Kind, SingleSpec};
    use test_log::test;

    fn uint_field(name: &str, size: usize) -> FieldType {
        let dtype = Dtype::single(SingleSpec::new(Kind::Uint, size, Endianness::Unspecified).unwrap()).unwrap();
        FieldType::Field(Field::new(Some(name.to_string()), dtype, None))
    }

    #[test]
    fn if_resolves_bit_length_and_parses_then_branch() {
        let cond = Expression::from_string("{1 > 0}").unwrap();
        let u2 = Dtype::single(SingleSpec::new(Kind::Uint, 2, Endianness::Unspecified).unwrap()).unwrap();
        let i2 = Dtype::single(SingleSpec::new(Kind::Int, 2, Endianness::Unspecified).unwrap()).unwrap();
        let mut node = FieldType::If(Box::new(If::new(
            cond,
            FieldType::Field(Field::new(None, u2, None)),
            Some(FieldType::Field(Field::new(None, i2, None))),
        )));
        assert_eq!(node.bit_length(), Some(2));
        let mut env = Env::new();
        let bits = BitSeq::from_bin("11").unwrap();
        node.parse(&bits, &mut env).unwrap();
        assert_eq!(node.unpack(), TreeValue::Scalar(DValue::Scalar(bitfmt_bits::Value::UInt(3))));
    }

    #[test]
    fn repeat_parses_fixed_count() {
        let body = uint_field("item", 8);
        let mut node = FieldType::Repeat(Box::new(Repeat::new(Expression::from_string("{3}").unwrap(), body)));
        let mut env = Env::new();
        let bits = BitSeq::from_bytes(vec![1, 2, 3]);
        let consumed = node.parse(&bits, &mut env).unwrap();
        assert_eq!(consumed, 24);
        let TreeValue::List(items) = node.unpack() else { panic!() };
        let values: Vec<u128> = items
            .iter()
            .map(|t| match t {
                TreeValue::Scalar(DValue::Scalar(bitfmt_bits::Value::UInt(n))) => *n,
                _ => panic!(),
            })
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn pass_is_identity_in_a_format() {
        let mut with_pass = FieldType::Format(Format {
            name: None,
            children: vec![FieldType::Pass, uint_field("x", 8), FieldType::Pass],
        });
        let mut without_pass = FieldType::Format(Format { name: None, children: vec![uint_field("x", 8)] });
        let bits = BitSeq::from_bytes(vec![42]);
        let mut env1 = Env::new();
        let mut env2 = Env::new();
        let c1 = with_pass.parse(&bits, &mut env1).unwrap();
        let c2 = without_pass.parse(&bits, &mut env2).unwrap();
        assert_eq!(c1, c2);
        assert_eq!(with_pass.to_bits(), without_pass.to_bits());
    }

    #[test]
    fn const_mismatch_is_an_error() {
        let dtype = Dtype::single(SingleSpec::new(Kind::Uint, 8, Endianness::Unspecified).unwrap()).unwrap();
        let mut field = FieldType::Field(Field::new(
            None,
            dtype,
            Some(DValue::Scalar(bitfmt_bits::Value::UInt(0x47))),
        ));
        let mut env = Env::new();
        assert!(field.parse(&BitSeq::from_bytes(vec![0x48]), &mut env).is_err());
    }

    #[test]
    fn parse_then_pack_round_trips_bits() {
        let mut field = FieldType::Field(Field::new(
            Some("x".to_string()),
            Dtype::single(SingleSpec::new(Kind::Uint, 8, Endianness::Unspecified).unwrap()).unwrap(),
            None,
        ));
        let bits = BitSeq::from_bytes(vec![200]);
        let mut env = Env::new();
        field.parse(&bits, &mut env).unwrap();
        assert_eq!(field.to_bits(), bits);
        field.clear();
        assert_eq!(field.to_bits(), BitSeq::empty());
    }

    #[test]
    fn named_override_takes_priority_over_positional_values() {
        let mut format = FieldType::Format(Format {
            name: None,
            children: vec![uint_field("a", 8), uint_field("b", 8)],
        });
        let mut values = VecDeque::from(vec![
            DValue::Scalar(bitfmt_bits::Value::UInt(1)),
            DValue::Scalar(bitfmt_bits::Value::UInt(2)),
        ]);
        let mut overrides = HashMap::new();
        overrides.insert("b".to_string(), DValue::Scalar(bitfmt_bits::Value::UInt(99)));
        let mut env = Env::new();
        format.pack(&mut values, &overrides, &mut env).unwrap();
        assert!(values.is_empty(), "the overridden field must not also consume a positional value");
        let TreeValue::List(items) = format.unpack() else { panic!() };
        assert_eq!(items[0], TreeValue::Scalar(DValue::Scalar(bitfmt_bits::Value::UInt(1))));
        assert_eq!(items[1], TreeValue::Scalar(DValue::Scalar(bitfmt_bits::Value::UInt(99))));
    }
}
