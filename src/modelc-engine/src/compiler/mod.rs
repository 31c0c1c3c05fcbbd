// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Turning a [`ContainerSpec`] into a populated [`Container`].
//!
//! [`synthesize`] validates the declaration and picks a representation;
//! [`populate`] walks the index tuples and calls the element builder once
//! per surviving tuple.  Symmetric matrices take a separate path in
//! [`symmetric`].
//!
//! [`Container`]: crate::container::Container

use log::debug;

use crate::common::{ErrorCode, ErrorContext, Result};
use crate::datamodel::{ContainerKind, ContainerSpec};
use crate::dependency::first_dependency;

mod loops;
pub mod symmetric;

pub use loops::populate;
pub use symmetric::{populate_symmetric, symmetric_size};

/// The representation a plan resolved to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Representation {
    /// No indices: the container is the single element itself.
    Scalar,
    DenseArray,
    OrderedAxisArray,
    AssociativeMap,
}

/// A validated declaration plus the representation to build it into.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq)]
pub struct ContainerPlan<'a> {
    pub spec: &'a ContainerSpec,
    pub repr: Representation,
    /// Whether two tuples can land on the same key.  Only associative
    /// containers need the probe; dense axes are disjoint by construction.
    pub needs_duplicate_check: bool,
}

/// Whether every axis is `1..N` with `N` independent of other indices.
fn all_one_based(spec: &ContainerSpec) -> bool {
    spec.indices
        .iter()
        .all(|index| index.set.one_based_upper().is_some())
}

/// Validates `spec` against its requested container kind and resolves
/// `Auto`.  Nothing is evaluated and nothing is built here.
pub fn synthesize<'a>(ctx: &ErrorContext, spec: &'a ContainerSpec) -> Result<ContainerPlan<'a>> {
    let filtered = spec.filter.is_some();
    let unsupported = |name: &str| {
        ctx.spec(
            ErrorCode::UnsupportedContainer,
            format!("unable to build a container of kind `{name}`; expected auto, array, axis or map"),
        )
    };

    if let ContainerKind::Custom(name) = &spec.kind {
        return Err(unsupported(name));
    }

    if spec.is_scalar() {
        if filtered {
            return Err(ctx.spec(
                ErrorCode::ConditionalIndexing,
                "a condition requires at least one index",
            ));
        }
        debug!("{}: scalar plan", ctx.label());
        return Ok(ContainerPlan {
            spec,
            repr: Representation::Scalar,
            needs_duplicate_check: false,
        });
    }

    let vars = spec.index_names();
    let sets = spec.index_sets();
    let dependency = first_dependency(&vars, &sets);

    let repr = match &spec.kind {
        ContainerKind::Auto => {
            if filtered || dependency.is_some() {
                Representation::AssociativeMap
            } else if all_one_based(spec) {
                Representation::DenseArray
            } else {
                Representation::OrderedAxisArray
            }
        }
        ContainerKind::AssociativeMap => Representation::AssociativeMap,
        kind @ (ContainerKind::DenseArray | ContainerKind::OrderedAxisArray) => {
            if filtered {
                return Err(ctx.spec(
                    ErrorCode::ConditionalIndexing,
                    format!("conditional indexing is incompatible with container kind `{kind}`"),
                ));
            }
            if let Some((set, var)) = dependency {
                return Err(ctx.spec(
                    ErrorCode::DependentIndexSets,
                    format!(
                        "index set `{}` depends on index `{}`, which container kind `{kind}` does not support",
                        sets[set], vars[var]
                    ),
                ));
            }
            if *kind == ContainerKind::DenseArray {
                if let Some(index) = spec
                    .indices
                    .iter()
                    .find(|index| index.set.one_based_upper().is_none())
                {
                    return Err(ctx.spec(
                        ErrorCode::NotOneBasedRange,
                        format!(
                            "index set `{}` of `{}` is not of the form 1..N, required by container kind `{kind}`",
                            index.set, index.name
                        ),
                    ));
                }
                Representation::DenseArray
            } else {
                Representation::OrderedAxisArray
            }
        }
        ContainerKind::Custom(name) => return Err(unsupported(name)),
    };

    let needs_duplicate_check = repr == Representation::AssociativeMap;
    debug!(
        "{}: {:?} plan over {} indices (duplicate check: {})",
        ctx.label(),
        repr,
        spec.indices.len(),
        needs_duplicate_check
    );

    Ok(ContainerPlan {
        spec,
        repr,
        needs_duplicate_check,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Expr};
    use crate::common::ErrorKind;

    fn ctx() -> ErrorContext {
        ErrorContext::new("test")
    }

    fn one_to_n() -> Expr {
        Expr::one_to(Expr::var("N"))
    }

    #[test]
    fn auto_resolution() {
        let dense = ContainerSpec::new("x")
            .index("i", one_to_n())
            .index("j", Expr::one_to(Expr::int(3)));
        let plan = synthesize(&ctx(), &dense).unwrap();
        assert_eq!(Representation::DenseArray, plan.repr);
        assert!(!plan.needs_duplicate_check);

        let axis = ContainerSpec::new("x")
            .index("i", one_to_n())
            .index("j", Expr::range(Expr::int(2), Expr::int(4)));
        let plan = synthesize(&ctx(), &axis).unwrap();
        assert_eq!(Representation::OrderedAxisArray, plan.repr);
        assert!(!plan.needs_duplicate_check);

        let named = ContainerSpec::new("x").index("s", Expr::var("S"));
        assert_eq!(
            Representation::OrderedAxisArray,
            synthesize(&ctx(), &named).unwrap().repr
        );

        let dependent = ContainerSpec::new("x")
            .index("i", one_to_n())
            .index("j", Expr::range(Expr::var("i"), Expr::var("N")));
        let plan = synthesize(&ctx(), &dependent).unwrap();
        assert_eq!(Representation::AssociativeMap, plan.repr);
        assert!(plan.needs_duplicate_check);

        let filtered = ContainerSpec::new("x")
            .index("i", one_to_n())
            .filter(Expr::op2(BinaryOp::Neq, Expr::var("i"), Expr::int(2)));
        let plan = synthesize(&ctx(), &filtered).unwrap();
        assert_eq!(Representation::AssociativeMap, plan.repr);
        assert!(plan.needs_duplicate_check);
    }

    #[test]
    fn scalar_plan() {
        let spec = ContainerSpec::new("x");
        let plan = synthesize(&ctx(), &spec).unwrap();
        assert_eq!(Representation::Scalar, plan.repr);
    }

    #[test]
    fn explicit_kinds() {
        let spec = ContainerSpec::new("x")
            .index("i", one_to_n())
            .kind(ContainerKind::OrderedAxisArray);
        assert_eq!(
            Representation::OrderedAxisArray,
            synthesize(&ctx(), &spec).unwrap().repr
        );

        let spec = ContainerSpec::new("x")
            .index("i", one_to_n())
            .kind(ContainerKind::AssociativeMap);
        let plan = synthesize(&ctx(), &spec).unwrap();
        assert_eq!(Representation::AssociativeMap, plan.repr);
        assert!(plan.needs_duplicate_check);
    }

    #[test]
    fn filter_with_dense_kinds_fails() {
        for kind in [ContainerKind::DenseArray, ContainerKind::OrderedAxisArray] {
            let spec = ContainerSpec::new("x")
                .index("i", one_to_n())
                .filter(Expr::op2(BinaryOp::Gt, Expr::var("i"), Expr::int(1)))
                .kind(kind);
            let err = synthesize(&ctx(), &spec).unwrap_err();
            assert_eq!(ErrorKind::Specification, err.kind);
            assert_eq!(ErrorCode::ConditionalIndexing, err.code);
        }
    }

    #[test]
    fn unsupported_kind_fails() {
        let spec = ContainerSpec::new("x")
            .index("i", one_to_n())
            .kind("tensor".parse().unwrap());
        let err = synthesize(&ctx(), &spec).unwrap_err();
        assert_eq!(ErrorCode::UnsupportedContainer, err.code);
        assert!(err.get_details().unwrap().contains("tensor"));
    }

    #[test]
    fn dense_requires_one_based_independent_axes() {
        let spec = ContainerSpec::new("x")
            .index("i", Expr::range(Expr::int(0), Expr::var("N")))
            .kind(ContainerKind::DenseArray);
        let err = synthesize(&ctx(), &spec).unwrap_err();
        assert_eq!(ErrorCode::NotOneBasedRange, err.code);

        let spec = ContainerSpec::new("x")
            .index("i", one_to_n())
            .index("j", Expr::one_to(Expr::var("i")))
            .kind(ContainerKind::DenseArray);
        let err = synthesize(&ctx(), &spec).unwrap_err();
        assert_eq!(ErrorCode::DependentIndexSets, err.code);
    }
}
