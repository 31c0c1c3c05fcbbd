// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Selecting a constraint builder for a (function, set) pair.
//!
//! Builders are looked up by the coarse category of each side, so support
//! for a new pairing is added with [`Registry::register`] and never by
//! editing an existing case.

use std::collections::HashMap;

use log::debug;

use crate::common::{ErrorCode, ErrorContext, Result};
use crate::dispatch_err;
use crate::func::{AffExpr, Function, FunctionCategory, QuadExpr, VariableRef};
use crate::relational::{Bound, RelationalForm, relocate};
use crate::sets::{ScalarSet, Set, SetCategory};

/// The function half of a built constraint, in the form a solver accepts.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintFunction {
    SingleVariable(VariableRef),
    VectorOfVariables(Vec<VariableRef>),
    Affine(AffExpr),
    VectorAffine(Vec<AffExpr>),
    Quadratic(QuadExpr),
}

impl ConstraintFunction {
    pub fn variables(&self) -> Vec<VariableRef> {
        match self {
            ConstraintFunction::SingleVariable(var) => vec![*var],
            ConstraintFunction::VectorOfVariables(vars) => vars.clone(),
            ConstraintFunction::Affine(aff) => aff.variables().collect(),
            ConstraintFunction::VectorAffine(affs) => {
                affs.iter().flat_map(AffExpr::variables).collect()
            }
            ConstraintFunction::Quadratic(quad) => quad.variables().collect(),
        }
    }
}

/// A single constraint ready to hand to a model.
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltConstraint {
    pub func: ConstraintFunction,
    pub set: Set,
}

/// One canonical form's worth of constraints: broadcast forms expand to
/// one independent constraint per array element.
#[derive(Clone, Debug, PartialEq)]
pub enum Built {
    Single(BuiltConstraint),
    Broadcast(Vec<BuiltConstraint>),
}

pub type BuildFn = fn(&ErrorContext, Function, Set) -> Result<BuiltConstraint>;

#[cfg_attr(feature = "debug-derive", derive(Debug))]
pub struct Registry {
    builders: HashMap<(FunctionCategory, SetCategory), BuildFn>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::with_defaults()
    }
}

impl Registry {
    /// A registry with no builders at all.
    pub fn new() -> Self {
        Registry {
            builders: HashMap::new(),
        }
    }

    /// A registry covering the standard scalar and vector pairings.
    pub fn with_defaults() -> Self {
        use FunctionCategory as F;
        use SetCategory as S;

        let mut registry = Registry::new();
        for set in [S::Bound, S::Interval, S::Integrality] {
            registry.register(F::Variable, set, build_single_variable);
        }
        for set in [S::Bound, S::Interval] {
            registry.register(F::Constant, set, build_affine);
            registry.register(F::Affine, set, build_affine);
        }
        registry.register(F::Quadratic, S::Bound, build_quadratic);
        registry.register(F::Quadratic, S::Interval, reject_two_sided_quadratic);
        registry.register(F::VariableVector, S::Vector, build_vector_of_variables);
        registry.register(F::AffineVector, S::Vector, build_vector_affine);
        for func in [F::VariableVector, F::AffineVector, F::Array] {
            for set in [S::Bound, S::Interval, S::Integrality] {
                registry.register(func, set, reject_vector_in_scalar_set);
            }
        }
        registry
    }

    /// Installs `builder` for a pairing, returning the builder it replaced.
    pub fn register(
        &mut self,
        func: FunctionCategory,
        set: SetCategory,
        builder: BuildFn,
    ) -> Option<BuildFn> {
        self.builders.insert((func, set), builder)
    }

    pub fn build(&self, ctx: &ErrorContext, func: Function, set: Set) -> Result<BuiltConstraint> {
        let key = (func.category(), set.category());
        let Some(builder) = self.builders.get(&key) else {
            return Err(ctx.dispatch(
                ErrorCode::NoBuilder,
                format!(
                    "no constraint builder for a {:?} function in a {set} set",
                    key.0
                ),
            ));
        };
        debug!("{}: dispatching {:?} in {:?}", ctx.label(), key.0, key.1);
        builder(ctx, func, set).map_err(|err| ctx.attach(err))
    }

    /// Builds every constraint a canonical form describes.
    pub fn build_form(&self, ctx: &ErrorContext, form: RelationalForm) -> Result<Built> {
        match form {
            RelationalForm::SetMembership {
                func: Function::Array(elements),
                set: Set::Scalar(set),
                broadcast: true,
            } => {
                let built = elements
                    .into_iter()
                    .map(|element| {
                        let (func, set) = relocate(element, set);
                        self.build(ctx, func, Set::Scalar(set))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Built::Broadcast(built))
            }
            RelationalForm::SetMembership {
                set: set @ Set::Vector(_),
                broadcast: true,
                ..
            } => Err(ctx.dispatch(
                ErrorCode::UnexpectedVector,
                format!("cannot broadcast membership in the vector set {set}"),
            )),
            RelationalForm::SetMembership { func, set, .. } => {
                self.build(ctx, func, set).map(Built::Single)
            }
            RelationalForm::Ranged {
                lb,
                func: Function::Array(elements),
                ub,
                broadcast: true,
            } => {
                let built = elements
                    .into_iter()
                    .enumerate()
                    .map(|(i, element)| {
                        let interval = interval_at(ctx, &lb, &ub, i)?;
                        let (func, set) = relocate(element, interval);
                        self.build(ctx, func, Set::Scalar(set))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Built::Broadcast(built))
            }
            RelationalForm::Ranged { lb, func, ub, .. } => {
                let interval = interval_at(ctx, &lb, &ub, 0)?;
                self.build(ctx, func, Set::Scalar(interval))
                    .map(Built::Single)
            }
        }
    }
}

fn interval_at(ctx: &ErrorContext, lb: &Bound, ub: &Bound, i: usize) -> Result<ScalarSet> {
    match (lb.at(i), ub.at(i)) {
        (Some(lb), Some(ub)) => Ok(ScalarSet::Interval(lb, ub)),
        _ => Err(ctx.spec(
            ErrorCode::MismatchedDimensions,
            format!("no bound for element {}", i + 1),
        )),
    }
}

fn build_single_variable(_: &ErrorContext, func: Function, set: Set) -> Result<BuiltConstraint> {
    match func {
        Function::Variable(var) => Ok(BuiltConstraint {
            func: ConstraintFunction::SingleVariable(var),
            set,
        }),
        other => dispatch_err!(
            NoBuilder,
            format!("expected a single variable, got {:?}", other.category())
        ),
    }
}

/// Handles constants too: a bare number is the degenerate affine function.
fn build_affine(_: &ErrorContext, func: Function, set: Set) -> Result<BuiltConstraint> {
    let Set::Scalar(set) = set else {
        return dispatch_err!(NoBuilder, format!("expected a scalar set, got {set}"));
    };
    let (func, set) = relocate(func, set);
    match func.into_affine() {
        Some(aff) => Ok(BuiltConstraint {
            func: ConstraintFunction::Affine(aff),
            set: Set::Scalar(set),
        }),
        None => dispatch_err!(NoBuilder, "expected an affine function".to_owned()),
    }
}

fn build_quadratic(_: &ErrorContext, func: Function, set: Set) -> Result<BuiltConstraint> {
    let Set::Scalar(set) = set else {
        return dispatch_err!(NoBuilder, format!("expected a scalar set, got {set}"));
    };
    let (func, set) = relocate(func, set);
    match func {
        Function::Quadratic(quad) => Ok(BuiltConstraint {
            func: ConstraintFunction::Quadratic(quad),
            set: Set::Scalar(set),
        }),
        other => dispatch_err!(
            NoBuilder,
            format!("expected a quadratic function, got {:?}", other.category())
        ),
    }
}

fn reject_two_sided_quadratic(_: &ErrorContext, _: Function, _: Set) -> Result<BuiltConstraint> {
    dispatch_err!(
        TwoSidedQuadratic,
        "two-sided quadratic constraints are not supported; split into two constraints"
            .to_owned()
    )
}

fn reject_vector_in_scalar_set(_: &ErrorContext, _: Function, set: Set) -> Result<BuiltConstraint> {
    dispatch_err!(
        UnexpectedVector,
        format!("unexpected vector in scalar constraint with set {set}; use the broadcast operator")
    )
}

fn check_dimension(ctx: &ErrorContext, len: usize, set: &Set) -> Result<()> {
    if let Set::Vector(vector) = set {
        if vector.dimension() != len {
            return Err(ctx.spec(
                ErrorCode::MismatchedDimensions,
                format!(
                    "function has {len} components but {set} has dimension {}",
                    vector.dimension()
                ),
            ));
        }
    }
    Ok(())
}

fn build_vector_of_variables(ctx: &ErrorContext, func: Function, set: Set) -> Result<BuiltConstraint> {
    let Function::Array(elements) = func else {
        return dispatch_err!(NoBuilder, "expected a vector of variables".to_owned());
    };
    check_dimension(ctx, elements.len(), &set)?;
    let mut vars = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Function::Variable(var) => vars.push(var),
            other => {
                return dispatch_err!(
                    NoBuilder,
                    format!("expected a variable, got {:?}", other.category())
                );
            }
        }
    }
    Ok(BuiltConstraint {
        func: ConstraintFunction::VectorOfVariables(vars),
        set,
    })
}

fn build_vector_affine(ctx: &ErrorContext, func: Function, set: Set) -> Result<BuiltConstraint> {
    let Function::Array(elements) = func else {
        return dispatch_err!(NoBuilder, "expected a vector of affine functions".to_owned());
    };
    check_dimension(ctx, elements.len(), &set)?;
    // vector sets keep their constants in the function
    let mut affs = Vec::with_capacity(elements.len());
    for element in elements {
        let category = element.category();
        match element.into_affine() {
            Some(aff) => affs.push(aff),
            None => {
                return dispatch_err!(
                    NoBuilder,
                    format!("expected an affine function, got {category:?}")
                );
            }
        }
    }
    Ok(BuiltConstraint {
        func: ConstraintFunction::VectorAffine(affs),
        set,
    })
}
