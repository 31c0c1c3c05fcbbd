// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Canonicalization of relational constraint specs.
//!
//! Every one-sided comparison becomes `f in S` with `f = lhs - rhs` and the
//! additive constant of `f` moved into `S`; ranged comparisons become
//! `lb <= f <= ub` with the same relocation applied to both bounds.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::common::{Error, ErrorCode, ErrorContext, ErrorKind, Result};
use crate::func::{AffExpr, Function};
use crate::sets::{ScalarSet, Set};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comparison {
    Le,
    Ge,
    Eq,
    Lt,
    Gt,
    Ne,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Lt => "<",
            Comparison::Gt => ">",
            Comparison::Ne => "!=",
        }
    }

    /// The set `f op 0` describes, for the operators a constraint accepts.
    fn zero_set(self) -> Option<ScalarSet> {
        match self {
            Comparison::Le => Some(ScalarSet::LessThan(0.0)),
            Comparison::Ge => Some(ScalarSet::GreaterThan(0.0)),
            Comparison::Eq => Some(ScalarSet::EqualTo(0.0)),
            Comparison::Lt | Comparison::Gt | Comparison::Ne => None,
        }
    }
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim() {
            "<=" | "≤" => Comparison::Le,
            ">=" | "≥" => Comparison::Ge,
            "==" | "=" => Comparison::Eq,
            "<" => Comparison::Lt,
            ">" => Comparison::Gt,
            "!=" | "≠" => Comparison::Ne,
            other => {
                return Err(Error::new(
                    ErrorKind::Specification,
                    ErrorCode::UnrecognizedRelation,
                    Some(format!("unrecognized relation `{other}`")),
                ));
            }
        })
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A constraint as the expression builder describes it, before
/// canonicalization.  `broadcast` marks the element-wise operator forms
/// (`.<=`, `.==`, `.in`).
#[derive(Clone, Debug, PartialEq)]
pub enum RelationalSpec {
    OneSided {
        lhs: Function,
        op: Comparison,
        rhs: Function,
        broadcast: bool,
    },
    Ranged {
        lb: Function,
        op1: Comparison,
        mid: Function,
        op2: Comparison,
        ub: Function,
        broadcast: bool,
    },
    SetMembership {
        func: Function,
        set: Set,
        broadcast: bool,
    },
}

impl RelationalSpec {
    pub fn compare(lhs: impl Into<Function>, op: Comparison, rhs: impl Into<Function>) -> Self {
        RelationalSpec::OneSided {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
            broadcast: false,
        }
    }

    pub fn le(lhs: impl Into<Function>, rhs: impl Into<Function>) -> Self {
        RelationalSpec::compare(lhs, Comparison::Le, rhs)
    }

    pub fn ge(lhs: impl Into<Function>, rhs: impl Into<Function>) -> Self {
        RelationalSpec::compare(lhs, Comparison::Ge, rhs)
    }

    pub fn eq(lhs: impl Into<Function>, rhs: impl Into<Function>) -> Self {
        RelationalSpec::compare(lhs, Comparison::Eq, rhs)
    }

    pub fn ranged(
        lb: impl Into<Function>,
        op1: Comparison,
        mid: impl Into<Function>,
        op2: Comparison,
        ub: impl Into<Function>,
    ) -> Self {
        RelationalSpec::Ranged {
            lb: lb.into(),
            op1,
            mid: mid.into(),
            op2,
            ub: ub.into(),
            broadcast: false,
        }
    }

    pub fn member(func: impl Into<Function>, set: impl Into<Set>) -> Self {
        RelationalSpec::SetMembership {
            func: func.into(),
            set: set.into(),
            broadcast: false,
        }
    }

    /// Marks the relation as element-wise.
    pub fn broadcast(mut self) -> Self {
        match &mut self {
            RelationalSpec::OneSided { broadcast, .. }
            | RelationalSpec::Ranged { broadcast, .. }
            | RelationalSpec::SetMembership { broadcast, .. } => *broadcast = true,
        }
        self
    }
}

/// One side of a ranged constraint: a constant, or one constant per
/// element under broadcast.
#[derive(Clone, Debug, PartialEq)]
pub enum Bound {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Bound {
    /// The bound for element `i`; scalars apply to every element.
    pub fn at(&self, i: usize) -> Option<f64> {
        match self {
            Bound::Scalar(b) => Some(*b),
            Bound::Array(bs) => bs.get(i).copied(),
        }
    }

    fn len(&self) -> Option<usize> {
        match self {
            Bound::Scalar(_) => None,
            Bound::Array(bs) => Some(bs.len()),
        }
    }

    fn shift(self, c: f64) -> Bound {
        match self {
            Bound::Scalar(b) => Bound::Scalar(b - c),
            Bound::Array(bs) => Bound::Array(bs.into_iter().map(|b| b - c).collect()),
        }
    }
}

/// A canonical constraint, ready for dispatch.
#[derive(Clone, Debug, PartialEq)]
pub enum RelationalForm {
    SetMembership {
        func: Function,
        set: Set,
        broadcast: bool,
    },
    Ranged {
        lb: Bound,
        func: Function,
        ub: Bound,
        broadcast: bool,
    },
}

impl RelationalForm {
    pub fn is_broadcast(&self) -> bool {
        match self {
            RelationalForm::SetMembership { broadcast, .. }
            | RelationalForm::Ranged { broadcast, .. } => *broadcast,
        }
    }
}

/// Moves the additive constant of a scalar function into its set:
/// `f + c in S` becomes `f in S - c`.  Arrays and integrality sets are
/// returned unchanged; applying it twice is the same as applying it once.
pub fn relocate(func: Function, set: ScalarSet) -> (Function, ScalarSet) {
    if func.is_array() || matches!(set, ScalarSet::Integer | ScalarSet::ZeroOne) {
        return (func, set);
    }
    let c = func.constant();
    let func = match func {
        Function::Constant(_) => Function::Affine(AffExpr::new()),
        Function::Affine(mut aff) => {
            aff.set_constant(0.0);
            Function::Affine(aff)
        }
        Function::Quadratic(mut quad) => {
            quad.affine.set_constant(0.0);
            Function::Quadratic(quad)
        }
        other => other,
    };
    (func, set.shift(c))
}

/// `lhs - rhs`, element-wise when either side is an array.
fn difference(ctx: &ErrorContext, lhs: Function, rhs: Function, broadcast: bool) -> Result<Function> {
    match (lhs, rhs) {
        (Function::Array(ls), Function::Array(rs)) => {
            if ls.len() != rs.len() {
                return Err(ctx.spec(
                    ErrorCode::MismatchedDimensions,
                    format!(
                        "dimensions of the two sides do not match: {} and {}",
                        ls.len(),
                        rs.len()
                    ),
                ));
            }
            let elements = ls
                .into_iter()
                .zip(rs)
                .map(|(l, r)| difference(ctx, l, r, broadcast))
                .collect::<Result<Vec<_>>>()?;
            Ok(Function::Array(elements))
        }
        (Function::Array(ls), r) if broadcast => {
            let elements = ls
                .into_iter()
                .map(|l| difference(ctx, l, r.clone(), broadcast))
                .collect::<Result<Vec<_>>>()?;
            Ok(Function::Array(elements))
        }
        (l, Function::Array(rs)) if broadcast => {
            let elements = rs
                .into_iter()
                .map(|r| difference(ctx, l.clone(), r, broadcast))
                .collect::<Result<Vec<_>>>()?;
            Ok(Function::Array(elements))
        }
        (Function::Array(ls), _) | (_, Function::Array(ls)) => Err(ctx.spec(
            ErrorCode::MismatchedDimensions,
            format!(
                "cannot compare an array of length {} with a scalar; use the broadcast operator",
                ls.len()
            ),
        )),
        (l, r) => l.scalar_sub(r).ok_or_else(|| {
            ctx.spec(ErrorCode::Generic, "unable to subtract the two sides of the relation")
        }),
    }
}

fn bound(ctx: &ErrorContext, which: &str, f: Function, broadcast: bool) -> Result<Bound> {
    match f {
        Function::Constant(c) => Ok(Bound::Scalar(c)),
        Function::Array(elements) if broadcast => {
            let mut bounds = Vec::with_capacity(elements.len());
            for element in elements {
                match element {
                    Function::Constant(c) => bounds.push(c),
                    _ => {
                        return Err(ctx.spec(
                            ErrorCode::ExpectedScalar,
                            format!("the {which} bound of a ranged constraint must be constant"),
                        ));
                    }
                }
            }
            Ok(Bound::Array(bounds))
        }
        _ => Err(ctx.spec(
            ErrorCode::ExpectedScalar,
            format!("the {which} bound of a ranged constraint must be a constant number"),
        )),
    }
}

/// Rewrites `spec` into canonical form.  Nothing is built here.
pub fn canonicalize(ctx: &ErrorContext, spec: RelationalSpec) -> Result<RelationalForm> {
    match spec {
        RelationalSpec::OneSided {
            lhs,
            op,
            rhs,
            broadcast,
        } => {
            let Some(set) = op.zero_set() else {
                return Err(ctx.spec(
                    ErrorCode::UnrecognizedRelation,
                    format!("unrecognized relation `{op}`; expected <=, >= or =="),
                ));
            };
            let func = difference(ctx, lhs, rhs, broadcast)?;
            let (func, set) = relocate(func, set);
            debug!("{}: {op} canonicalized to {set}", ctx.label());
            Ok(RelationalForm::SetMembership {
                func,
                set: Set::Scalar(set),
                broadcast,
            })
        }
        RelationalSpec::Ranged {
            lb,
            op1,
            mid,
            op2,
            ub,
            broadcast,
        } => {
            let (lb, ub) = match (op1, op2) {
                (Comparison::Le, Comparison::Le) => (lb, ub),
                (Comparison::Ge, Comparison::Ge) => (ub, lb),
                _ => {
                    return Err(ctx.spec(
                        ErrorCode::BadRangedOperators,
                        format!(
                            "unsupported ranged operators `{op1}` and `{op2}`; both must be <= or both >="
                        ),
                    ));
                }
            };
            let lb = bound(ctx, "lower", lb, broadcast)?;
            let ub = bound(ctx, "upper", ub, broadcast)?;

            if let Function::Array(elements) = &mid {
                for bound in [&lb, &ub] {
                    if let Some(n) = bound.len() {
                        if n != elements.len() {
                            return Err(ctx.spec(
                                ErrorCode::MismatchedDimensions,
                                format!(
                                    "dimensions of the bounds and the function do not match: {n} and {}",
                                    elements.len()
                                ),
                            ));
                        }
                    }
                }
            } else if lb.len().is_some() || ub.len().is_some() {
                return Err(ctx.spec(
                    ErrorCode::MismatchedDimensions,
                    "array bounds require an array-valued function",
                ));
            }

            let c = mid.constant();
            let (func, _) = relocate(mid, ScalarSet::Interval(0.0, 0.0));
            Ok(RelationalForm::Ranged {
                lb: lb.shift(c),
                func,
                ub: ub.shift(c),
                broadcast,
            })
        }
        RelationalSpec::SetMembership {
            func,
            set,
            broadcast,
        } => Ok(RelationalForm::SetMembership {
            func,
            set,
            broadcast,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::func::{ModelId, VariableRef};

    fn ctx() -> ErrorContext {
        ErrorContext::new("constraint c")
    }

    fn vars(n: usize) -> Vec<VariableRef> {
        let model = ModelId::next();
        (0..n).map(|index| VariableRef { model, index }).collect()
    }

    #[test]
    fn one_sided_relocates_constant() {
        let x = vars(1)[0];
        // 3x + 1 >= 10
        let spec = RelationalSpec::ge(AffExpr::new().term(x, 3.0).plus(1.0), 10.0);
        let form = canonicalize(&ctx(), spec).unwrap();
        assert_eq!(
            RelationalForm::SetMembership {
                func: Function::Affine(AffExpr::new().term(x, 3.0)),
                set: Set::Scalar(ScalarSet::GreaterThan(9.0)),
                broadcast: false,
            },
            form
        );
    }

    #[test]
    fn variable_on_right() {
        let x = vars(1)[0];
        // 2 <= x  ->  2 - x <= 0  ->  -x <= -2
        let form = canonicalize(&ctx(), RelationalSpec::le(2.0, x)).unwrap();
        let RelationalForm::SetMembership { func, set, .. } = form else {
            panic!("expected set membership");
        };
        assert_eq!(Function::Affine(AffExpr::new().term(x, -1.0)), func);
        assert_eq!(Set::Scalar(ScalarSet::LessThan(-2.0)), set);
    }

    #[test]
    fn unrecognized_relation() {
        let x = vars(1)[0];
        let err = canonicalize(&ctx(), RelationalSpec::compare(x, Comparison::Lt, 1.0)).unwrap_err();
        assert_eq!(ErrorKind::Specification, err.kind);
        assert_eq!(ErrorCode::UnrecognizedRelation, err.code);
        assert!(err.get_details().unwrap().starts_with("In `constraint c`"));

        assert_eq!(Comparison::Ge, "≥".parse().unwrap());
        let err = "=>".parse::<Comparison>().unwrap_err();
        assert_eq!(ErrorCode::UnrecognizedRelation, err.code);
    }

    #[test]
    fn ranged_relocates_both_bounds() {
        let v = vars(2);
        // 1 <= x + y + 1 <= 2
        let mid = AffExpr::new().term(v[0], 1.0).term(v[1], 1.0).plus(1.0);
        let spec = RelationalSpec::ranged(1.0, Comparison::Le, mid, Comparison::Le, 2.0);
        let form = canonicalize(&ctx(), spec).unwrap();
        assert_eq!(
            RelationalForm::Ranged {
                lb: Bound::Scalar(0.0),
                func: Function::Affine(AffExpr::new().term(v[0], 1.0).term(v[1], 1.0)),
                ub: Bound::Scalar(1.0),
                broadcast: false,
            },
            form
        );
    }

    #[test]
    fn ranged_ge_swaps_bounds() {
        let x = vars(1)[0];
        let le = RelationalSpec::ranged(1.0, Comparison::Le, x, Comparison::Le, 4.0);
        let ge = RelationalSpec::ranged(4.0, Comparison::Ge, x, Comparison::Ge, 1.0);
        assert_eq!(
            canonicalize(&ctx(), le).unwrap(),
            canonicalize(&ctx(), ge).unwrap()
        );

        let mixed = RelationalSpec::ranged(1.0, Comparison::Le, x, Comparison::Ge, 4.0);
        let err = canonicalize(&ctx(), mixed).unwrap_err();
        assert_eq!(ErrorCode::BadRangedOperators, err.code);
    }

    #[test]
    fn ranged_bounds_must_be_constant() {
        let v = vars(2);
        let spec = RelationalSpec::ranged(v[1], Comparison::Le, v[0], Comparison::Le, 4.0);
        let err = canonicalize(&ctx(), spec).unwrap_err();
        assert_eq!(ErrorCode::ExpectedScalar, err.code);
    }

    #[test]
    fn broadcast_arrays() {
        let v = vars(2);
        let lhs = Function::Array(vec![v[0].into(), v[1].into()]);
        let rhs = Function::Array(vec![1.0.into(), 2.0.into()]);
        let spec = RelationalSpec::eq(lhs.clone(), rhs).broadcast();
        let form = canonicalize(&ctx(), spec).unwrap();
        assert!(form.is_broadcast());
        let RelationalForm::SetMembership { func, set, .. } = form else {
            panic!("expected set membership");
        };
        // arrays keep their per-element constants until dispatch
        assert_eq!(Set::Scalar(ScalarSet::EqualTo(0.0)), set);
        let Function::Array(elements) = func else {
            panic!("expected an array");
        };
        assert_eq!(-2.0, elements[1].constant());

        let short = Function::Array(vec![1.0.into()]);
        let err = canonicalize(&ctx(), RelationalSpec::eq(lhs, short).broadcast()).unwrap_err();
        assert_eq!(ErrorCode::MismatchedDimensions, err.code);
    }

    #[test]
    fn array_against_scalar_needs_broadcast() {
        let v = vars(2);
        let lhs = Function::Array(vec![v[0].into(), v[1].into()]);
        let err = canonicalize(&ctx(), RelationalSpec::le(lhs.clone(), 1.0)).unwrap_err();
        assert_eq!(ErrorCode::MismatchedDimensions, err.code);

        let form = canonicalize(&ctx(), RelationalSpec::le(lhs, 1.0).broadcast()).unwrap();
        let RelationalForm::SetMembership {
            func: Function::Array(elements),
            ..
        } = form
        else {
            panic!("expected an array membership");
        };
        assert_eq!(2, elements.len());
        assert_eq!(-1.0, elements[0].constant());
    }

    #[test]
    fn relocate_is_idempotent() {
        let x = vars(1)[0];
        let f = Function::Affine(AffExpr::from(x).plus(5.0));
        let once = relocate(f, ScalarSet::LessThan(7.0));
        let twice = relocate(once.0.clone(), once.1);
        assert_eq!(once, twice);
        assert_eq!(ScalarSet::LessThan(2.0), once.1);
    }

    #[test]
    fn membership_passes_through() {
        let x = vars(1)[0];
        let spec = RelationalSpec::member(x, ScalarSet::ZeroOne);
        assert_eq!(
            RelationalForm::SetMembership {
                func: Function::Variable(x),
                set: Set::Scalar(ScalarSet::ZeroOne),
                broadcast: false,
            },
            canonicalize(&ctx(), spec).unwrap()
        );
    }
}
