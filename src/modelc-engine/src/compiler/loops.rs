// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeMap, HashSet};

use log::{debug, trace};

use crate::common::{ErrorContext, Result};
use crate::compiler::{ContainerPlan, Representation};
use crate::container::{Axis, AxisArray, Container, DenseArray};
use crate::datamodel::{ContainerSpec, IndexValue, Key, format_key};
use crate::eval::{Bindings, Params};

/// Calls `build` once for every index tuple of `axes`, outermost axis
/// first, with every index variable bound.
fn for_each_tuple<T, F>(
    spec: &ContainerSpec,
    axes: &[&[IndexValue]],
    bindings: &mut Bindings,
    out: &mut Vec<T>,
    build: &mut F,
) -> Result<()>
where
    F: FnMut(&Bindings) -> Result<T>,
{
    let level = bindings.depth();
    if level == axes.len() {
        trace!("building {}[{}]", spec.label(), format_key(&bindings.key()));
        out.push(build(&*bindings)?);
        return Ok(());
    }
    let name = &spec.indices[level].name;
    for element in axes[level].iter() {
        bindings.push(name, element.clone());
        let result = for_each_tuple(spec, axes, bindings, out, build);
        bindings.pop();
        result?;
    }
    Ok(())
}

/// Collects the keys of every tuple that survives the filter.  Each
/// index set is evaluated with the enclosing indices bound.
fn enumerate_keys(spec: &ContainerSpec, bindings: &mut Bindings, keys: &mut Vec<Key>) -> Result<()> {
    let level = bindings.depth();
    if level == spec.indices.len() {
        if let Some(filter) = &spec.filter {
            if !bindings.eval_bool(filter)? {
                trace!("{}[{}] filtered out", spec.label(), format_key(&bindings.key()));
                return Ok(());
            }
        }
        keys.push(bindings.key());
        return Ok(());
    }
    let index = &spec.indices[level];
    let elements = bindings.eval_set(&index.set)?;
    for element in elements {
        bindings.push(&index.name, element);
        let result = enumerate_keys(spec, bindings, keys);
        bindings.pop();
        result?;
    }
    Ok(())
}

fn eval_axes(ctx: &ErrorContext, spec: &ContainerSpec, params: &Params) -> Result<Vec<Vec<IndexValue>>> {
    let bindings = Bindings::new(params);
    spec.indices
        .iter()
        .map(|index| bindings.eval_set(&index.set).map_err(|err| ctx.attach(err)))
        .collect()
}

/// Executes `plan`, calling `build` once per surviving index tuple.
///
/// Associative containers enumerate and check every key before the first
/// call to `build`, so a repeated key fails without building anything.
pub fn populate<T, F>(
    ctx: &ErrorContext,
    plan: &ContainerPlan,
    params: &Params,
    mut build: F,
) -> Result<Container<T>>
where
    F: FnMut(&Bindings) -> Result<T>,
{
    let spec = plan.spec;
    let mut bindings = Bindings::new(params);

    match plan.repr {
        Representation::Scalar => {
            let element = build(&bindings).map_err(|err| ctx.attach(err))?;
            Ok(Container::Scalar(element))
        }
        Representation::DenseArray => {
            let axes = eval_axes(ctx, spec, params)?;
            let dims: Vec<usize> = axes.iter().map(Vec::len).collect();
            let slices: Vec<&[IndexValue]> = axes.iter().map(Vec::as_slice).collect();
            let mut data = Vec::with_capacity(dims.iter().product());
            for_each_tuple(spec, &slices, &mut bindings, &mut data, &mut build)
                .map_err(|err| ctx.attach(err))?;
            debug!("{}: built dense array {:?}", ctx.label(), dims);
            Ok(Container::Dense(DenseArray::from_row_major(dims, data)))
        }
        Representation::OrderedAxisArray => {
            let axes = eval_axes(ctx, spec, params)?
                .into_iter()
                .enumerate()
                .map(|(i, elements)| {
                    Axis::new(elements).map_err(|repeated| {
                        ctx.repeated_index(format!("{} in index `{}`", repeated, spec.indices[i].name))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let slices: Vec<&[IndexValue]> = axes.iter().map(Axis::elements).collect();
            let mut data = Vec::with_capacity(axes.iter().map(Axis::len).product());
            for_each_tuple(spec, &slices, &mut bindings, &mut data, &mut build)
                .map_err(|err| ctx.attach(err))?;
            debug!("{}: built axis array with {} elements", ctx.label(), data.len());
            Ok(Container::Axis(AxisArray::from_row_major(axes, data)))
        }
        Representation::AssociativeMap => {
            let mut keys = vec![];
            enumerate_keys(spec, &mut bindings, &mut keys).map_err(|err| ctx.attach(err))?;

            if plan.needs_duplicate_check {
                let mut seen = HashSet::with_capacity(keys.len());
                for key in keys.iter() {
                    if !seen.insert(key) {
                        return Err(ctx.repeated_index(format!(
                            "{}[{}]",
                            spec.label(),
                            format_key(key)
                        )));
                    }
                }
            }

            let mut map = BTreeMap::new();
            for key in keys {
                for (index, value) in spec.indices.iter().zip(key.iter()) {
                    bindings.push(&index.name, value.clone());
                }
                trace!("building {}[{}]", spec.label(), format_key(&key));
                let element = build(&bindings).map_err(|err| ctx.attach(err))?;
                bindings.truncate(0);
                map.insert(key, element);
            }
            debug!("{}: built map with {} entries", ctx.label(), map.len());
            Ok(Container::Map(map))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Expr};
    use crate::common::{ErrorCode, ErrorKind};
    use crate::compiler::synthesize;
    use crate::datamodel::ContainerKind;

    fn ctx() -> ErrorContext {
        ErrorContext::new("test")
    }

    fn key(values: &[i64]) -> Key {
        values.iter().map(|&v| IndexValue::Int(v)).collect()
    }

    /// Builds each element as the sum of its integer indices.
    fn index_sum(b: &Bindings) -> Result<i64> {
        Ok(b.key().iter().filter_map(IndexValue::as_int).sum())
    }

    #[test]
    fn dense_population_order() {
        let spec = ContainerSpec::new("x")
            .index("i", Expr::one_to(Expr::var("N")))
            .index("j", Expr::one_to(Expr::int(2)));
        let params = Params::new().scalar("N", 3);
        let plan = synthesize(&ctx(), &spec).unwrap();

        let mut seen = vec![];
        let container = populate(&ctx(), &plan, &params, |b| {
            seen.push(b.key());
            index_sum(b)
        })
        .unwrap();
        assert_eq!(6, container.len());
        assert_eq!(key(&[1, 1]), seen[0]);
        assert_eq!(key(&[1, 2]), seen[1]);
        assert_eq!(key(&[3, 2]), seen[5]);
        assert_eq!(Some(&5), container.get(&key(&[3, 2])));
        assert!(matches!(container, Container::Dense(_)));
    }

    #[test]
    fn filtered_tuples_leave_no_slot() {
        let spec = ContainerSpec::new("x")
            .index("i", Expr::one_to(Expr::int(3)))
            .filter(Expr::op2(BinaryOp::Neq, Expr::var("i"), Expr::int(2)));
        let params = Params::new();
        let plan = synthesize(&ctx(), &spec).unwrap();

        let mut calls = 0;
        let container = populate(&ctx(), &plan, &params, |b| {
            calls += 1;
            index_sum(b)
        })
        .unwrap();
        assert_eq!(2, calls);
        assert_eq!(vec![key(&[1]), key(&[3])], container.keys());
        assert_eq!(None, container.get(&key(&[2])));
    }

    #[test]
    fn dependent_sets_rebind_per_outer_iteration() {
        let spec = ContainerSpec::new("x")
            .index("i", Expr::one_to(Expr::int(3)))
            .index("j", Expr::range(Expr::var("i"), Expr::int(3)));
        let params = Params::new();
        let plan = synthesize(&ctx(), &spec).unwrap();
        let container = populate(&ctx(), &plan, &params, index_sum).unwrap();
        assert_eq!(6, container.len());
        assert_eq!(Some(&4), container.get(&key(&[2, 2])));
        assert_eq!(None, container.get(&key(&[2, 1])));
    }

    #[test]
    fn repeated_map_keys_build_nothing() {
        let spec = ContainerSpec::new("x")
            .index("i", Expr::collection([Expr::int(1), Expr::int(2), Expr::int(1)]))
            .kind(ContainerKind::AssociativeMap);
        let params = Params::new();
        let plan = synthesize(&ctx(), &spec).unwrap();

        let mut calls = 0;
        let err = populate(&ctx(), &plan, &params, |b| {
            calls += 1;
            index_sum(b)
        })
        .unwrap_err();
        assert_eq!(0, calls);
        assert_eq!(ErrorKind::DuplicateKey, err.kind);
        assert_eq!(ErrorCode::RepeatedIndex, err.code);
        assert!(err.get_details().unwrap().contains("x[1]"));
    }

    #[test]
    fn repeated_axis_elements_fail() {
        let spec = ContainerSpec::new("x")
            .index("s", Expr::collection([Expr::string("a"), Expr::string("a")]));
        let params = Params::new();
        let plan = synthesize(&ctx(), &spec).unwrap();
        assert_eq!(Representation::OrderedAxisArray, plan.repr);
        let err = populate(&ctx(), &plan, &params, |_| Ok(())).unwrap_err();
        assert_eq!(ErrorKind::DuplicateKey, err.kind);
    }

    #[test]
    fn numerically_equal_keys_are_repeats() {
        let params = Params::new();
        let one_twice = Expr::collection([Expr::int(1), Expr::float(1.0)]);

        let map = ContainerSpec::new("x")
            .index("i", one_twice.clone())
            .kind(ContainerKind::AssociativeMap);
        let plan = synthesize(&ctx(), &map).unwrap();
        let mut calls = 0;
        let err = populate(&ctx(), &plan, &params, |_| {
            calls += 1;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(0, calls);
        assert_eq!(ErrorKind::DuplicateKey, err.kind);
        assert_eq!(ErrorCode::RepeatedIndex, err.code);

        let axis = ContainerSpec::new("x").index("i", one_twice);
        let plan = synthesize(&ctx(), &axis).unwrap();
        assert_eq!(Representation::OrderedAxisArray, plan.repr);
        let err = populate(&ctx(), &plan, &params, |_| Ok(())).unwrap_err();
        assert_eq!(ErrorCode::RepeatedIndex, err.code);
    }

    #[test]
    fn float_lookups_find_integer_keys() {
        let spec = ContainerSpec::new("x")
            .index("i", Expr::collection([Expr::int(2), Expr::int(5)]))
            .filter(Expr::op2(BinaryOp::Gt, Expr::var("i"), Expr::int(0)));
        let params = Params::new();
        let plan = synthesize(&ctx(), &spec).unwrap();
        let container = populate(&ctx(), &plan, &params, index_sum).unwrap();
        assert_eq!(Some(&5), container.get(&[IndexValue::from(5.0)]));
        assert_eq!(None, container.get(&[IndexValue::from(5.5)]));
    }

    #[test]
    fn overflowing_index_sets_fail() {
        let spec = ContainerSpec::new("x").index(
            "i",
            Expr::range(
                Expr::op2(BinaryOp::Add, Expr::var("N"), Expr::int(1)),
                Expr::int(0),
            ),
        );
        let params = Params::new().scalar("N", i64::MAX);
        let plan = synthesize(&ctx(), &spec).unwrap();
        let err = populate(&ctx(), &plan, &params, index_sum).unwrap_err();
        assert_eq!(ErrorKind::Specification, err.kind);
        assert_eq!(ErrorCode::IntegerOverflow, err.code);
        assert!(err.get_details().unwrap().starts_with("In `test`"));
    }

    #[test]
    fn axis_arrays_over_named_sets() {
        let spec = ContainerSpec::new("x")
            .index("s", Expr::var("S"))
            .index("t", Expr::range(Expr::int(0), Expr::int(1)));
        let params = Params::new().set("S", ["a", "b"]);
        let plan = synthesize(&ctx(), &spec).unwrap();
        let container = populate(&ctx(), &plan, &params, |b| {
            Ok(format!("{}{}", b.value("s")?, b.int("t")?))
        })
        .unwrap();
        assert_eq!(
            Some(&"b1".to_owned()),
            container.get(&[IndexValue::from("b"), IndexValue::Int(1)])
        );
    }

    #[test]
    fn builder_errors_carry_the_label() {
        let spec = ContainerSpec::new("x").index("i", Expr::one_to(Expr::var("N")));
        let params = Params::new();
        let plan = synthesize(&ctx(), &spec).unwrap();
        let err = populate(&ctx(), &plan, &params, index_sum).unwrap_err();
        assert_eq!(ErrorCode::UnknownIdentifier, err.code);
        assert!(err.get_details().unwrap().starts_with("In `test`"));
    }

    #[test]
    fn scalar_plan_builds_once() {
        let spec = ContainerSpec::new("x");
        let params = Params::new();
        let plan = synthesize(&ctx(), &spec).unwrap();
        let container = populate(&ctx(), &plan, &params, |_| Ok(7)).unwrap();
        assert_eq!(Container::Scalar(7), container);
    }
}
