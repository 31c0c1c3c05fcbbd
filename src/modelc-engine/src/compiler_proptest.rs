// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for container synthesis, population and
//! relational canonicalization.

use std::rc::Rc;

use float_cmp::approx_eq;
use proptest::prelude::*;

use crate::ast::{BinaryOp, Expr};
use crate::common::{ErrorCode, ErrorKind};
use crate::compiler::{Representation, populate, populate_symmetric, synthesize};
use crate::datamodel::{ContainerKind, ContainerSpec, IndexValue};
use crate::func::{AffExpr, Function};
use crate::relational::{Comparison, RelationalForm, RelationalSpec, canonicalize};
use crate::sets::{ScalarSet, Set};
use crate::testutils::TestModel;

fn set_strategy() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (0i64..5).prop_map(|n| Expr::one_to(Expr::int(n))),
        (-2i64..3, 0i64..5).prop_map(|(lo, hi)| Expr::range(Expr::int(lo), Expr::int(hi))),
        Just(Expr::one_to(Expr::var("N"))),
        prop::collection::vec(0i64..10, 0..4)
            .prop_map(|xs| Expr::collection(xs.into_iter().map(Expr::int))),
    ]
}

fn kind_strategy() -> impl Strategy<Value = ContainerKind> {
    prop_oneof![
        Just(ContainerKind::Auto),
        Just(ContainerKind::DenseArray),
        Just(ContainerKind::OrderedAxisArray),
        Just(ContainerKind::AssociativeMap),
    ]
}

/// Small integers as floats, so sums and differences are exact.
fn small_f64() -> impl Strategy<Value = f64> {
    (-1000i32..1000).prop_map(|x| x as f64 / 4.0)
}

fn membership(form: RelationalForm) -> (AffExpr, ScalarSet) {
    match form {
        RelationalForm::SetMembership {
            func: Function::Affine(aff),
            set: Set::Scalar(set),
            ..
        } => (aff, set),
        other => panic!("expected an affine membership, got {other:?}"),
    }
}

proptest! {
    #[test]
    fn filtered_specs_are_never_dense(
        sets in prop::collection::vec(set_strategy(), 1..4),
        kind in kind_strategy(),
    ) {
        let t = TestModel::new("filtered");
        let mut spec = ContainerSpec::new("x")
            .filter(Expr::op2(BinaryOp::Gte, Expr::var("i0"), Expr::int(1)))
            .kind(kind);
        for (i, set) in sets.into_iter().enumerate() {
            spec = spec.index(&format!("i{i}"), set);
        }
        match synthesize(&t.ctx, &spec) {
            Ok(plan) => {
                prop_assert_eq!(Representation::AssociativeMap, plan.repr);
                prop_assert!(plan.needs_duplicate_check);
            }
            Err(err) => prop_assert_eq!(ErrorCode::ConditionalIndexing, err.code),
        }
    }

    #[test]
    fn filtered_tuples_are_skipped(n in 0i64..20, m in 1i64..5, r in 0i64..5) {
        let t = TestModel::new("filtered").param("N", n);
        let filter = Expr::op2(
            BinaryOp::Neq,
            Expr::op2(BinaryOp::Mod, Expr::var("i"), Expr::int(m)),
            Expr::int(r),
        );
        let spec = ContainerSpec::new("x")
            .index("i", Expr::one_to(Expr::var("N")))
            .filter(filter);
        let plan = synthesize(&t.ctx, &spec).unwrap();

        let mut calls = 0;
        let container = populate(&t.ctx, &plan, &t.params, |b| {
            calls += 1;
            b.int("i")
        })
        .unwrap();

        let expected: Vec<i64> = (1..=n).filter(|i| i.rem_euclid(m) != r).collect();
        prop_assert_eq!(expected.len(), calls);
        prop_assert_eq!(expected.len(), container.len());
        for i in 1..=n {
            let present = container.get(&[IndexValue::Int(i)]).is_some();
            prop_assert_eq!(i.rem_euclid(m) != r, present);
        }
    }

    #[test]
    fn repeated_keys_build_nothing(xs in prop::collection::vec(0i64..4, 2..8)) {
        let t = TestModel::new("repeated");
        let spec = ContainerSpec::new("x")
            .index("i", Expr::collection(xs.iter().copied().map(Expr::int)))
            .kind(ContainerKind::AssociativeMap);
        let plan = synthesize(&t.ctx, &spec).unwrap();

        let mut calls = 0;
        let result = populate(&t.ctx, &plan, &t.params, |_| {
            calls += 1;
            Ok(())
        });
        let mut unique = xs.clone();
        unique.sort();
        unique.dedup();
        if unique.len() == xs.len() {
            prop_assert_eq!(xs.len(), result.unwrap().len());
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(ErrorKind::DuplicateKey, err.kind);
            prop_assert_eq!(0, calls);
        }
    }

    #[test]
    fn relocation_is_exact(coef in small_f64(), k in small_f64(), rhs in small_f64()) {
        let mut t = TestModel::new("constraint c");
        let x = t.free_variables(1)[0];
        let lhs = AffExpr::new().term(x, coef).plus(k);
        let (aff, set) = membership(canonicalize(&t.ctx, RelationalSpec::ge(lhs, rhs)).unwrap());
        prop_assert_eq!(0.0, aff.constant());
        prop_assert_eq!(&[(x, coef)], aff.terms());
        let ScalarSet::GreaterThan(bound) = set else {
            panic!("expected GreaterThan, got {set}");
        };
        prop_assert!(approx_eq!(f64, rhs - k, bound));
    }

    #[test]
    fn le_and_ge_are_mirror_images(coef in small_f64(), k1 in small_f64(), k2 in small_f64()) {
        let mut t = TestModel::new("constraint c");
        let x = t.free_variables(1)[0];
        let a = AffExpr::new().term(x, coef).plus(k1);

        let (le, le_set) = membership(canonicalize(&t.ctx, RelationalSpec::le(a.clone(), k2)).unwrap());
        let (ge, ge_set) = membership(canonicalize(&t.ctx, RelationalSpec::ge(k2, a)).unwrap());

        let (ScalarSet::LessThan(ub), ScalarSet::GreaterThan(lb)) = (le_set, ge_set) else {
            panic!("unexpected sets {le_set} and {ge_set}");
        };
        // a - k2 <= 0 and k2 - a >= 0 describe the same half-line
        prop_assert!(approx_eq!(f64, ub, -lb));
        prop_assert!(approx_eq!(f64, le.terms()[0].1, -ge.terms()[0].1));
    }

    #[test]
    fn ranged_direction_does_not_matter(
        coef in small_f64(),
        k in small_f64(),
        lb in small_f64(),
        width in 0i32..100,
    ) {
        let mut t = TestModel::new("constraint c");
        let x = t.free_variables(1)[0];
        let mid = Function::from(AffExpr::new().term(x, coef).plus(k));
        let ub = lb + width as f64;

        let le = RelationalSpec::ranged(lb, Comparison::Le, mid.clone(), Comparison::Le, ub);
        let ge = RelationalSpec::ranged(ub, Comparison::Ge, mid, Comparison::Ge, lb);
        prop_assert_eq!(
            canonicalize(&t.ctx, le).unwrap(),
            canonicalize(&t.ctx, ge).unwrap()
        );
    }

    #[test]
    fn symmetric_entries_alias(n in 0i64..7) {
        let t = TestModel::new("variable Q").param("N", n);
        let spec = ContainerSpec::new("Q")
            .index("i", Expr::one_to(Expr::var("N")))
            .index("j", Expr::one_to(Expr::var("N")));

        let mut calls = 0;
        let matrix = populate_symmetric(&t.ctx, &spec, &t.params, |b| {
            calls += 1;
            Ok((b.int("i")?, b.int("j")?))
        })
        .unwrap();

        prop_assert_eq!((n * (n + 1) / 2) as usize, calls);
        for i in 1..=n {
            for j in 1..=n {
                let a = matrix.get(&[IndexValue::Int(i), IndexValue::Int(j)]).unwrap();
                let b = matrix.get(&[IndexValue::Int(j), IndexValue::Int(i)]).unwrap();
                prop_assert!(Rc::ptr_eq(a, b));
            }
        }
    }
}
