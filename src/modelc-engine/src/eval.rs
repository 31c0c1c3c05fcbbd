// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Evaluation of index sets and filter predicates.
//!
//! Names resolve first against the index variables bound by enclosing
//! loops (innermost first), then against caller-supplied parameters.

use std::collections::HashMap;

use float_cmp::approx_eq;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::common::{Ident, Result};
use crate::datamodel::{IndexValue, Key};
use crate::spec_err;

/// The result of evaluating an index expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(IndexValue),
    Bool(bool),
    Set(Vec<IndexValue>),
}

/// Named values visible to index sets and filters, such as `N` in `1..N`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    values: HashMap<Ident, Value>,
}

impl Params {
    pub fn new() -> Self {
        Params::default()
    }

    pub fn scalar(mut self, name: &str, value: impl Into<IndexValue>) -> Self {
        self.values
            .insert(Ident::new(name), Value::Scalar(value.into()));
        self
    }

    pub fn set<I, V>(mut self, name: &str, elements: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<IndexValue>,
    {
        let elements = elements.into_iter().map(Into::into).collect();
        self.values.insert(Ident::new(name), Value::Set(elements));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Index variables bound by the loops enclosing the current element.
#[derive(Clone, Debug)]
pub struct Bindings<'a> {
    params: &'a Params,
    stack: Vec<(Ident, IndexValue)>,
}

impl<'a> Bindings<'a> {
    pub fn new(params: &'a Params) -> Self {
        Bindings {
            params,
            stack: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: &Ident, value: IndexValue) {
        self.stack.push((name.clone(), value));
    }

    pub(crate) fn pop(&mut self) {
        self.stack.pop();
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.stack.truncate(len);
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn params(&self) -> &'a Params {
        self.params
    }

    /// Current value of an index variable.
    pub fn get(&self, name: &str) -> Option<&IndexValue> {
        self.stack
            .iter()
            .rev()
            .find(|(ident, _)| ident.as_str() == name)
            .map(|(_, value)| value)
    }

    pub fn value(&self, name: &str) -> Result<&IndexValue> {
        match self.get(name) {
            Some(value) => Ok(value),
            None => spec_err!(UnknownIdentifier, format!("no index variable named `{name}`")),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        let value = self.value(name)?;
        match value.as_int() {
            Some(n) => Ok(n),
            None => spec_err!(
                ExpectedScalar,
                format!("index `{name}` is {value}, not an integer")
            ),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        let value = self.value(name)?;
        match value.as_f64() {
            Some(n) => Ok(n),
            None => spec_err!(
                ExpectedScalar,
                format!("index `{name}` is {value}, not a number")
            ),
        }
    }

    /// The index tuple bound so far, outermost first.
    pub fn key(&self) -> Key {
        self.stack.iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        Evaluator { bindings: self }.eval(expr)
    }

    pub fn eval_set(&self, expr: &Expr) -> Result<Vec<IndexValue>> {
        match self.eval(expr)? {
            Value::Set(elements) => Ok(elements),
            _ => spec_err!(ExpectedSet, format!("`{expr}` is not an iterable set")),
        }
    }

    pub fn eval_bool(&self, expr: &Expr) -> Result<bool> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            _ => spec_err!(ExpectedBool, format!("`{expr}` is not a boolean condition")),
        }
    }

    pub fn eval_scalar(&self, expr: &Expr) -> Result<IndexValue> {
        match self.eval(expr)? {
            Value::Scalar(n) => Ok(n),
            _ => spec_err!(ExpectedScalar, format!("`{expr}` is not a scalar")),
        }
    }
}

struct Evaluator<'b, 'a> {
    bindings: &'b Bindings<'a>,
}

impl Evaluator<'_, '_> {
    fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Const(n) => Ok(Value::Scalar(n.clone())),
            Expr::Var(ident) => {
                if let Some(value) = self.bindings.get(ident.as_str()) {
                    return Ok(Value::Scalar(value.clone()));
                }
                match self.bindings.params.get(ident.as_str()) {
                    Some(value) => Ok(value.clone()),
                    None => spec_err!(UnknownIdentifier, format!("unknown name `{ident}`")),
                }
            }
            Expr::Range(lo, hi) => {
                let lo = self.int(lo)?;
                let hi = self.int(hi)?;
                Ok(Value::Set((lo..=hi).map(IndexValue::Int).collect()))
            }
            Expr::Collection(elements) => {
                let elements = elements
                    .iter()
                    .map(|e| self.scalar(e))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Set(elements))
            }
            Expr::App(func, args) => self.apply(func, args),
            Expr::Op1(op, r) => match op {
                UnaryOp::Not => Ok(Value::Bool(!self.bool(r)?)),
                UnaryOp::Positive => Ok(Value::Scalar(self.number(r)?)),
                UnaryOp::Negative => {
                    let r = self.number(r)?;
                    match r {
                        IndexValue::Int(n) => match n.checked_neg() {
                            Some(n) => Ok(Value::Scalar(IndexValue::Int(n))),
                            None => overflow(format!("-({n})")),
                        },
                        other => Ok(Value::Scalar(IndexValue::from(
                            -other.as_f64().unwrap_or_default(),
                        ))),
                    }
                }
            },
            Expr::Op2(op, l, r) => self.op2(*op, l, r),
            Expr::If(cond, t, f) => {
                if self.bool(cond)? {
                    self.eval(t)
                } else {
                    self.eval(f)
                }
            }
        }
    }

    fn op2(&self, op: BinaryOp, l: &Expr, r: &Expr) -> Result<Value> {
        match op {
            BinaryOp::And => Ok(Value::Bool(self.bool(l)? && self.bool(r)?)),
            BinaryOp::Or => Ok(Value::Bool(self.bool(l)? || self.bool(r)?)),
            BinaryOp::Eq | BinaryOp::Neq => {
                let eq = values_equal(&self.scalar(l)?, &self.scalar(r)?);
                Ok(Value::Bool(if op == BinaryOp::Eq { eq } else { !eq }))
            }
            BinaryOp::Gt | BinaryOp::Gte | BinaryOp::Lt | BinaryOp::Lte => {
                let l = self.scalar(l)?;
                let r = self.scalar(r)?;
                let ord = match (&l, &r) {
                    (IndexValue::Str(a), IndexValue::Str(b)) => a.cmp(b),
                    _ => match (l.as_f64(), r.as_f64()) {
                        (Some(a), Some(b)) => a.total_cmp(&b),
                        _ => {
                            return spec_err!(
                                ExpectedScalar,
                                format!("cannot compare {l} with {r}")
                            );
                        }
                    },
                };
                use std::cmp::Ordering::*;
                Ok(Value::Bool(match op {
                    BinaryOp::Gt => ord == Greater,
                    BinaryOp::Gte => ord != Less,
                    BinaryOp::Lt => ord == Less,
                    _ => ord != Greater,
                }))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = self.number(l)?;
                let r = self.number(r)?;
                arith(op, &l, &r).map(Value::Scalar)
            }
        }
    }

    fn apply(&self, func: &Ident, args: &[Expr]) -> Result<Value> {
        match (func.as_str(), args) {
            ("len", [set]) => {
                let n = self.set(set)?.len();
                Ok(Value::Scalar(IndexValue::Int(n as i64)))
            }
            ("abs", [arg]) => match self.number(arg)? {
                IndexValue::Int(n) => match n.checked_abs() {
                    Some(n) => Ok(Value::Scalar(IndexValue::Int(n))),
                    None => overflow(format!("abs({n})")),
                },
                other => Ok(Value::Scalar(IndexValue::from(
                    other.as_f64().unwrap_or_default().abs(),
                ))),
            },
            ("min" | "max", []) => spec_err!(
                BadBuiltinArgs,
                format!("{func}() needs at least one argument")
            ),
            ("min" | "max", _) => {
                // min(S) over a set, or min(a, b, ...) over scalars
                let candidates = match args {
                    [only] => match self.eval(only)? {
                        Value::Set(elements) => elements,
                        Value::Scalar(n) => vec![n],
                        Value::Bool(_) => {
                            return spec_err!(BadBuiltinArgs, format!("{func}() of a boolean"));
                        }
                    },
                    _ => args
                        .iter()
                        .map(|arg| self.number(arg))
                        .collect::<Result<Vec<_>>>()?,
                };
                let mut best: Option<(f64, IndexValue)> = None;
                for candidate in candidates {
                    let Some(n) = candidate.as_f64() else {
                        return spec_err!(
                            BadBuiltinArgs,
                            format!("{func}() of non-numeric {candidate}")
                        );
                    };
                    let better = match best {
                        None => true,
                        Some((b, _)) if func.as_str() == "min" => n < b,
                        Some((b, _)) => n > b,
                    };
                    if better {
                        best = Some((n, candidate));
                    }
                }
                match best {
                    Some((_, n)) => Ok(Value::Scalar(n)),
                    None => spec_err!(BadBuiltinArgs, format!("{func}() of an empty set")),
                }
            }
            ("len" | "abs", _) => spec_err!(
                BadBuiltinArgs,
                format!("{func}() takes exactly one argument")
            ),
            _ => spec_err!(UnknownBuiltin, format!("unknown function `{func}`")),
        }
    }

    fn scalar(&self, expr: &Expr) -> Result<IndexValue> {
        match self.eval(expr)? {
            Value::Scalar(n) => Ok(n),
            _ => spec_err!(ExpectedScalar, format!("`{expr}` is not a scalar")),
        }
    }

    fn number(&self, expr: &Expr) -> Result<IndexValue> {
        let n = self.scalar(expr)?;
        if let IndexValue::Str(_) = n {
            return spec_err!(ExpectedScalar, format!("`{expr}` is not a number"));
        }
        Ok(n)
    }

    fn int(&self, expr: &Expr) -> Result<i64> {
        let n = self.scalar(expr)?;
        match n.as_int() {
            Some(n) => Ok(n),
            None => spec_err!(
                ExpectedScalar,
                format!("range bound `{expr}` is {n}, not an integer")
            ),
        }
    }

    fn bool(&self, expr: &Expr) -> Result<bool> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            _ => spec_err!(ExpectedBool, format!("`{expr}` is not a boolean condition")),
        }
    }

    fn set(&self, expr: &Expr) -> Result<Vec<IndexValue>> {
        match self.eval(expr)? {
            Value::Set(elements) => Ok(elements),
            _ => spec_err!(ExpectedSet, format!("`{expr}` is not an iterable set")),
        }
    }
}

fn values_equal(l: &IndexValue, r: &IndexValue) -> bool {
    match (l, r) {
        (IndexValue::Int(a), IndexValue::Int(b)) => a == b,
        (IndexValue::Str(a), IndexValue::Str(b)) => a == b,
        _ => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => approx_eq!(f64, a, b),
            _ => false,
        },
    }
}

fn overflow<T>(expr: String) -> Result<T> {
    spec_err!(IntegerOverflow, format!("`{expr}` overflows a 64-bit integer"))
}

fn arith(op: BinaryOp, l: &IndexValue, r: &IndexValue) -> Result<IndexValue> {
    if let (IndexValue::Int(a), IndexValue::Int(b)) = (l, r) {
        let (a, b) = (*a, *b);
        if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
            return spec_err!(DivisionByZero, format!("{a} divided by zero"));
        }
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            // exact integer division stays an integer so it can index arrays
            BinaryOp::Div => match a.checked_rem(b) {
                Some(0) => a.checked_div(b),
                Some(_) => return Ok(IndexValue::from(a as f64 / b as f64)),
                None => None,
            },
            BinaryOp::Mod => a.checked_rem_euclid(b),
            _ => unreachable!("arith called with non-arithmetic operator"),
        };
        return match result {
            Some(n) => Ok(IndexValue::Int(n)),
            None => overflow(format!("{a} {} {b}", op.symbol())),
        };
    }

    let a = l.as_f64().unwrap_or_default();
    let b = r.as_f64().unwrap_or_default();
    match op {
        BinaryOp::Add => Ok(IndexValue::from(a + b)),
        BinaryOp::Sub => Ok(IndexValue::from(a - b)),
        BinaryOp::Mul => Ok(IndexValue::from(a * b)),
        BinaryOp::Div | BinaryOp::Mod if b == 0.0 => {
            spec_err!(DivisionByZero, format!("{a} divided by zero"))
        }
        BinaryOp::Div => Ok(IndexValue::from(a / b)),
        BinaryOp::Mod => Ok(IndexValue::from(a.rem_euclid(b))),
        _ => unreachable!("arith called with non-arithmetic operator"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Ident {
        Ident::new(name)
    }

    #[test]
    fn ranges_are_inclusive() {
        let params = Params::new().scalar("N", 3);
        let b = Bindings::new(&params);
        let set = b.eval_set(&Expr::one_to(Expr::var("N"))).unwrap();
        assert_eq!(
            vec![IndexValue::Int(1), IndexValue::Int(2), IndexValue::Int(3)],
            set
        );

        let empty = b
            .eval_set(&Expr::range(Expr::int(4), Expr::var("N")))
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn index_bindings_shadow_params() {
        let params = Params::new().scalar("i", 10);
        let mut b = Bindings::new(&params);
        assert_eq!(IndexValue::Int(10), b.eval_scalar(&Expr::var("i")).unwrap());

        b.push(&ident("i"), IndexValue::Int(2));
        assert_eq!(IndexValue::Int(2), b.eval_scalar(&Expr::var("i")).unwrap());
        assert_eq!(2, b.int("i").unwrap());

        b.pop();
        assert!(b.get("i").is_none());
    }

    #[test]
    fn dependent_range_uses_outer_binding() {
        let params = Params::new().scalar("N", 4);
        let mut b = Bindings::new(&params);
        b.push(&ident("i"), IndexValue::Int(3));
        let set = b
            .eval_set(&Expr::range(Expr::var("i"), Expr::var("N")))
            .unwrap();
        assert_eq!(vec![IndexValue::Int(3), IndexValue::Int(4)], set);
    }

    #[test]
    fn filters_evaluate_to_booleans() {
        let params = Params::new();
        let mut b = Bindings::new(&params);
        b.push(&ident("i"), IndexValue::Int(2));
        b.push(&ident("j"), IndexValue::from("a"));

        let neq = Expr::op2(BinaryOp::Neq, Expr::var("i"), Expr::int(2));
        assert!(!b.eval_bool(&neq).unwrap());

        let both = Expr::op2(
            BinaryOp::And,
            Expr::op2(BinaryOp::Lte, Expr::var("i"), Expr::int(5)),
            Expr::op2(BinaryOp::Eq, Expr::var("j"), Expr::string("a")),
        );
        assert!(b.eval_bool(&both).unwrap());

        let not_bool = b.eval_bool(&Expr::var("i")).unwrap_err();
        assert_eq!(crate::common::ErrorCode::ExpectedBool, not_bool.code);
    }

    #[test]
    fn mixed_numeric_equality() {
        let params = Params::new();
        let b = Bindings::new(&params);
        let eq = Expr::op2(BinaryOp::Eq, Expr::int(2), Expr::float(2.0));
        assert!(b.eval_bool(&eq).unwrap());
        let lt = Expr::op2(BinaryOp::Lt, Expr::string("a"), Expr::string("b"));
        assert!(b.eval_bool(&lt).unwrap());
        let bad = Expr::op2(BinaryOp::Lt, Expr::string("a"), Expr::int(1));
        assert!(b.eval_bool(&bad).is_err());
    }

    #[test]
    fn arithmetic() {
        let params = Params::new();
        let b = Bindings::new(&params);
        let eval = |e: Expr| b.eval_scalar(&e).unwrap();

        assert_eq!(
            IndexValue::Int(3),
            eval(Expr::op2(BinaryOp::Div, Expr::int(6), Expr::int(2)))
        );
        assert_eq!(
            IndexValue::from(2.5),
            eval(Expr::op2(BinaryOp::Div, Expr::int(5), Expr::int(2)))
        );
        assert_eq!(
            IndexValue::Int(1),
            eval(Expr::op2(BinaryOp::Mod, Expr::int(-5), Expr::int(3)))
        );
        assert_eq!(
            IndexValue::Int(-4),
            eval(Expr::op1(UnaryOp::Negative, Expr::int(4)))
        );
        let err = b
            .eval(&Expr::op2(BinaryOp::Div, Expr::int(1), Expr::int(0)))
            .unwrap_err();
        assert_eq!(crate::common::ErrorCode::DivisionByZero, err.code);
    }

    #[test]
    fn integer_overflow_is_an_error() {
        let params = Params::new().scalar("N", i64::MAX).scalar("M", i64::MIN);
        let b = Bindings::new(&params);
        let overflows = |e: Expr| {
            let err = b.eval(&e).unwrap_err();
            assert_eq!(crate::common::ErrorKind::Specification, err.kind);
            assert_eq!(crate::common::ErrorCode::IntegerOverflow, err.code);
        };

        overflows(Expr::op2(BinaryOp::Add, Expr::var("N"), Expr::int(1)));
        overflows(Expr::op2(BinaryOp::Sub, Expr::var("M"), Expr::int(1)));
        overflows(Expr::op2(BinaryOp::Mul, Expr::var("N"), Expr::int(2)));
        overflows(Expr::op2(BinaryOp::Div, Expr::var("M"), Expr::int(-1)));
        overflows(Expr::op2(BinaryOp::Mod, Expr::var("M"), Expr::int(-1)));
        overflows(Expr::op1(UnaryOp::Negative, Expr::var("M")));
        overflows(Expr::app("abs", vec![Expr::var("M")]));

        let err = b
            .eval_set(&Expr::range(
                Expr::op2(BinaryOp::Add, Expr::var("N"), Expr::int(1)),
                Expr::int(0),
            ))
            .unwrap_err();
        assert_eq!(crate::common::ErrorCode::IntegerOverflow, err.code);
        assert_eq!(
            Some("`9223372036854775807 + 1` overflows a 64-bit integer".to_owned()),
            err.get_details()
        );

        assert_eq!(
            IndexValue::Int(i64::MAX),
            b.eval_scalar(&Expr::op2(BinaryOp::Sub, Expr::var("N"), Expr::int(0)))
                .unwrap()
        );
    }

    #[test]
    fn builtins() {
        let params = Params::new().set("S", ["a", "b", "c"]).set("W", [3, 9, 4]);
        let b = Bindings::new(&params);

        assert_eq!(
            IndexValue::Int(3),
            b.eval_scalar(&Expr::app("len", vec![Expr::var("S")]))
                .unwrap()
        );
        assert_eq!(
            IndexValue::Int(9),
            b.eval_scalar(&Expr::app("max", vec![Expr::var("W")]))
                .unwrap()
        );
        assert_eq!(
            IndexValue::Int(2),
            b.eval_scalar(&Expr::app("min", vec![Expr::int(7), Expr::int(2)]))
                .unwrap()
        );
        assert_eq!(
            IndexValue::Int(5),
            b.eval_scalar(&Expr::app("abs", vec![Expr::int(-5)]))
                .unwrap()
        );

        let err = b.eval(&Expr::app("sqrt", vec![Expr::int(4)])).unwrap_err();
        assert_eq!(crate::common::ErrorCode::UnknownBuiltin, err.code);
        let err = b.eval(&Expr::app("max", vec![Expr::var("S")])).unwrap_err();
        assert_eq!(crate::common::ErrorCode::BadBuiltinArgs, err.code);
    }

    #[test]
    fn collections_and_unknown_names() {
        let params = Params::new();
        let b = Bindings::new(&params);
        let set = b
            .eval_set(&Expr::collection([Expr::string("x"), Expr::int(1)]))
            .unwrap();
        assert_eq!(vec![IndexValue::from("x"), IndexValue::Int(1)], set);

        let err = b.eval(&Expr::var("missing")).unwrap_err();
        assert_eq!(crate::common::ErrorCode::UnknownIdentifier, err.code);
        assert_eq!(crate::common::ErrorKind::Specification, err.kind);
    }
}
