// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Symmetric square matrices: each off-diagonal entity is built once and
//! shared between `(i, j)` and `(j, i)`.

use std::rc::Rc;

use log::debug;

use crate::common::{ErrorCode, ErrorContext, Result};
use crate::container::{Container, DenseArray};
use crate::datamodel::{ContainerKind, ContainerSpec, IndexValue};
use crate::dependency::first_dependency;
use crate::eval::{Bindings, Params};

/// Checks that `spec` describes an unfiltered `1..N` by `1..N` matrix and
/// returns `N`.  Nothing is built.
pub fn symmetric_size(ctx: &ErrorContext, spec: &ContainerSpec, params: &Params) -> Result<usize> {
    if spec.filter.is_some() {
        return Err(ctx.spec(
            ErrorCode::ConditionalIndexing,
            "symmetric matrices do not support conditional indexing",
        ));
    }
    if spec.indices.len() != 2 {
        return Err(ctx.spec(
            ErrorCode::NotSquare,
            format!(
                "symmetric matrices must be two-dimensional, got {} indices",
                spec.indices.len()
            ),
        ));
    }
    if let Some((set, var)) = first_dependency(&spec.index_names(), &spec.index_sets()) {
        return Err(ctx.spec(
            ErrorCode::DependentIndexSets,
            format!(
                "index set `{}` of a symmetric matrix depends on index `{}`",
                spec.indices[set].set, spec.indices[var].name
            ),
        ));
    }

    let bindings = Bindings::new(params);
    let mut sizes = [0i64; 2];
    for (size, index) in sizes.iter_mut().zip(spec.indices.iter()) {
        let Some(hi) = index.set.one_based_upper() else {
            return Err(ctx.spec(
                ErrorCode::NotOneBasedRange,
                format!(
                    "index set `{}` of a symmetric matrix must be of the form 1..N",
                    index.set
                ),
            ));
        };
        let hi = bindings.eval_scalar(hi).map_err(|err| ctx.attach(err))?;
        *size = match hi.as_int() {
            Some(n) => n.max(0),
            None => {
                return Err(ctx.spec(
                    ErrorCode::ExpectedScalar,
                    format!("matrix size {hi} is not an integer"),
                ));
            }
        };
    }
    if sizes[0] != sizes[1] {
        return Err(ctx.spec(
            ErrorCode::MismatchedDimensions,
            format!(
                "symmetric matrices must be square, got {}x{}",
                sizes[0], sizes[1]
            ),
        ));
    }

    match spec.kind {
        ContainerKind::Auto | ContainerKind::DenseArray => Ok(sizes[0] as usize),
        ref kind => Err(ctx.spec(
            ErrorCode::UnsupportedContainer,
            format!("symmetric matrices are always dense arrays, not `{kind}`"),
        )),
    }
}

/// Builds a symmetric matrix, calling `build` for the upper triangle
/// (`i <= j`) only.  The lower triangle holds clones of the same `Rc`.
pub fn populate_symmetric<T, F>(
    ctx: &ErrorContext,
    spec: &ContainerSpec,
    params: &Params,
    mut build: F,
) -> Result<Container<Rc<T>>>
where
    F: FnMut(&Bindings) -> Result<T>,
{
    let n = symmetric_size(ctx, spec, params)?;
    let (row, col) = (&spec.indices[0].name, &spec.indices[1].name);

    let mut bindings = Bindings::new(params);
    let mut data: Vec<Rc<T>> = Vec::with_capacity(n * n);
    for i in 1..=n {
        for j in 1..=n {
            if i <= j {
                bindings.push(row, IndexValue::from(i));
                bindings.push(col, IndexValue::from(j));
                let element = build(&bindings).map_err(|err| ctx.attach(err))?;
                bindings.truncate(0);
                data.push(Rc::new(element));
            } else {
                // (j, i) is in an earlier row
                let mirror = Rc::clone(&data[(j - 1) * n + (i - 1)]);
                data.push(mirror);
            }
        }
    }
    debug!(
        "{}: built {n}x{n} symmetric matrix ({} distinct entries)",
        ctx.label(),
        n * (n + 1) / 2
    );
    Ok(Container::Dense(DenseArray::from_row_major(vec![n, n], data)))
}

/// The upper triangle of a square dense matrix, column by column:
/// `(1,1), (1,2), (2,2), (1,3), ...`.
pub fn upper_triangle<T>(matrix: &Container<T>) -> Vec<&T> {
    let Container::Dense(array) = matrix else {
        return vec![];
    };
    let n = match array.dims() {
        [rows, cols] if rows == cols => *rows,
        _ => return vec![],
    };
    let mut entries = Vec::with_capacity(n * (n + 1) / 2);
    for j in 1..=n {
        for i in 1..=j {
            if let Some(entry) = array.get(&[IndexValue::from(i), IndexValue::from(j)]) {
                entries.push(entry);
            }
        }
    }
    entries
}
