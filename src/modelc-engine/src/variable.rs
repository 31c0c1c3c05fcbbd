// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Variable declarations and the bounds attached to them.

use crate::common::{ErrorCode, ErrorContext, Result};
use crate::relational::Comparison;
use crate::sets::ScalarSet;

/// Everything a model needs to create one variable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableInfo {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub fixed: Option<f64>,
    pub integer: bool,
    pub binary: bool,
    pub start: Option<f64>,
}

/// A bound written next to a variable in its declaration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BoundSpec {
    /// `x op value`, or `value op x` when `variable_on_left` is false.
    OneSided {
        op: Comparison,
        value: f64,
        variable_on_left: bool,
    },
    /// `lb op1 x op2 ub`.
    Ranged {
        lb: f64,
        op1: Comparison,
        op2: Comparison,
        ub: f64,
    },
    /// `x in set`.
    Membership(ScalarSet),
}

/// The per-element result of a variable declaration's builder.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableDecl {
    pub bounds: Vec<BoundSpec>,
    pub integer: bool,
    pub binary: bool,
    pub start: Option<f64>,
}

impl VariableDecl {
    pub fn new() -> Self {
        VariableDecl::default()
    }

    pub fn bound(mut self, bound: BoundSpec) -> Self {
        self.bounds.push(bound);
        self
    }

    pub fn ge(self, value: f64) -> Self {
        self.bound(BoundSpec::OneSided {
            op: Comparison::Ge,
            value,
            variable_on_left: true,
        })
    }

    pub fn le(self, value: f64) -> Self {
        self.bound(BoundSpec::OneSided {
            op: Comparison::Le,
            value,
            variable_on_left: true,
        })
    }

    pub fn fix(self, value: f64) -> Self {
        self.bound(BoundSpec::OneSided {
            op: Comparison::Eq,
            value,
            variable_on_left: true,
        })
    }

    pub fn within(self, lb: f64, ub: f64) -> Self {
        self.bound(BoundSpec::Ranged {
            lb,
            op1: Comparison::Le,
            op2: Comparison::Le,
            ub,
        })
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    pub fn start(mut self, value: f64) -> Self {
        self.start = Some(value);
        self
    }
}

fn flip(op: Comparison) -> Comparison {
    match op {
        Comparison::Le => Comparison::Ge,
        Comparison::Ge => Comparison::Le,
        Comparison::Lt => Comparison::Gt,
        Comparison::Gt => Comparison::Lt,
        other => other,
    }
}

impl VariableInfo {
    fn set_lower(&mut self, ctx: &ErrorContext, value: f64) -> Result<()> {
        check_number(ctx, value)?;
        if self.lower.is_some() {
            return Err(ctx.spec(
                ErrorCode::BadVariableBounds,
                "cannot specify variable lower bound twice",
            ));
        }
        self.lower = Some(value);
        Ok(())
    }

    fn set_upper(&mut self, ctx: &ErrorContext, value: f64) -> Result<()> {
        check_number(ctx, value)?;
        if self.upper.is_some() {
            return Err(ctx.spec(
                ErrorCode::BadVariableBounds,
                "cannot specify variable upper bound twice",
            ));
        }
        self.upper = Some(value);
        Ok(())
    }

    fn set_fixed(&mut self, ctx: &ErrorContext, value: f64) -> Result<()> {
        check_number(ctx, value)?;
        if self.fixed.is_some() {
            return Err(ctx.spec(
                ErrorCode::BadVariableBounds,
                "cannot specify variable fixed value twice",
            ));
        }
        self.fixed = Some(value);
        Ok(())
    }

    fn apply(&mut self, ctx: &ErrorContext, bound: BoundSpec) -> Result<()> {
        match bound {
            BoundSpec::OneSided {
                op,
                value,
                variable_on_left,
            } => {
                let op = if variable_on_left { op } else { flip(op) };
                match op {
                    Comparison::Le => self.set_upper(ctx, value),
                    Comparison::Ge => self.set_lower(ctx, value),
                    Comparison::Eq => self.set_fixed(ctx, value),
                    other => Err(ctx.spec(
                        ErrorCode::UnrecognizedRelation,
                        format!("unrecognized relation `{other}` in variable bound"),
                    )),
                }
            }
            BoundSpec::Ranged { lb, op1, op2, ub } => {
                let (lb, ub) = match (op1, op2) {
                    (Comparison::Le, Comparison::Le) => (lb, ub),
                    (Comparison::Ge, Comparison::Ge) => (ub, lb),
                    _ => {
                        return Err(ctx.spec(
                            ErrorCode::BadRangedOperators,
                            format!(
                                "unsupported ranged operators `{op1}` and `{op2}` in variable bound"
                            ),
                        ));
                    }
                };
                self.set_lower(ctx, lb)?;
                self.set_upper(ctx, ub)
            }
            BoundSpec::Membership(set) => match set {
                ScalarSet::LessThan(ub) => self.set_upper(ctx, ub),
                ScalarSet::GreaterThan(lb) => self.set_lower(ctx, lb),
                ScalarSet::EqualTo(v) => self.set_fixed(ctx, v),
                ScalarSet::Interval(lb, ub) => {
                    self.set_lower(ctx, lb)?;
                    self.set_upper(ctx, ub)
                }
                ScalarSet::Integer => {
                    self.integer = true;
                    Ok(())
                }
                ScalarSet::ZeroOne => {
                    self.binary = true;
                    Ok(())
                }
            },
        }
    }

    /// Resolves a declaration's bounds, rejecting contradictory ones.
    pub fn from_decl(ctx: &ErrorContext, decl: &VariableDecl) -> Result<VariableInfo> {
        let mut info = VariableInfo {
            integer: decl.integer,
            binary: decl.binary,
            start: decl.start,
            ..VariableInfo::default()
        };
        for bound in decl.bounds.iter() {
            info.apply(ctx, *bound)?;
        }

        if info.fixed.is_some() && (info.lower.is_some() || info.upper.is_some()) {
            return Err(ctx.spec(
                ErrorCode::BadVariableBounds,
                "cannot specify variable fixed value if lower or upper bound specified",
            ));
        }
        if info.integer && info.binary {
            return Err(ctx.spec(
                ErrorCode::BadVariableBounds,
                "a variable cannot be both integer and binary",
            ));
        }
        Ok(info)
    }
}

fn check_number(ctx: &ErrorContext, value: f64) -> Result<()> {
    if value.is_nan() {
        return Err(ctx.spec(ErrorCode::BadVariableBounds, "variable bound is NaN"));
    }
    Ok(())
}
