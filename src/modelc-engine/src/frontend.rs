// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Entry points that compile one container declaration into a model.
//!
//! Each function runs the whole pipeline for a single [`ContainerSpec`]:
//! plan synthesis, population, per-element canonicalization and dispatch,
//! and finally registration of the container's name with the model.

use std::rc::Rc;

use log::debug;

use crate::common::{ErrorContext, Result};
use crate::compiler::{populate, populate_symmetric, synthesize, symmetric::upper_triangle};
use crate::container::Container;
use crate::datamodel::{ContainerSpec, format_key};
use crate::dispatch::{Built, Registry};
use crate::eval::{Bindings, Params};
use crate::func::{Function, VariableRef};
use crate::model::{ConstraintRef, ModelBuilder, NamedObject};
use crate::relational::{RelationalSpec, canonicalize};
use crate::sets::VectorSet;
use crate::spec_err;
use crate::variable::{VariableDecl, VariableInfo};

/// Parses a container declaration handed over by a front end as JSON.
pub fn spec_from_json(json: &str) -> Result<ContainerSpec> {
    match serde_json::from_str(json) {
        Ok(spec) => Ok(spec),
        Err(err) => spec_err!(Generic, format!("invalid container declaration: {err}")),
    }
}

/// The name an element is created with, e.g. `x[1,a]`.  Anonymous
/// containers and models without string names get none.
fn element_name<M: ModelBuilder>(model: &M, spec: &ContainerSpec, b: &Bindings) -> Option<String> {
    let name = spec.name.as_ref().filter(|_| model.string_names())?;
    if spec.is_scalar() {
        Some(name.to_string())
    } else {
        Some(name.with_subscript(&format_key(&b.key())).to_string())
    }
}

/// Adds one variable per index tuple.  `decl` describes the bounds and
/// flags of the variable at the bound indices.
pub fn add_variables<M, F>(
    model: &mut M,
    spec: &ContainerSpec,
    params: &Params,
    mut decl: F,
) -> Result<Container<VariableRef>>
where
    M: ModelBuilder,
    F: FnMut(&Bindings) -> Result<VariableDecl>,
{
    let ctx = ErrorContext::new(format!("variable {}", spec.label()));
    let plan = synthesize(&ctx, spec)?;
    let container = populate(&ctx, &plan, params, |b| {
        let info = VariableInfo::from_decl(&ctx, &decl(b)?)?;
        let name = element_name(&*model, spec, b);
        model.add_variable(&info, name.as_deref())
    })?;

    if let Some(name) = &spec.name {
        let object = match &container {
            Container::Scalar(var) => NamedObject::Variable(*var),
            other => NamedObject::Variables(other.values().copied().collect()),
        };
        model
            .register_name(name, object)
            .map_err(|err| ctx.attach(err))?;
    }
    debug!("{}: added {} variables", ctx.label(), container.len());
    Ok(container)
}

/// The constraints one index tuple produced.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintRefs {
    Single(ConstraintRef),
    /// One constraint per element of a broadcast relation.
    Broadcast(Vec<ConstraintRef>),
}

impl ConstraintRefs {
    pub fn refs(&self) -> &[ConstraintRef] {
        match self {
            ConstraintRefs::Single(con) => std::slice::from_ref(con),
            ConstraintRefs::Broadcast(cons) => cons,
        }
    }
}

/// Adds the constraints `relation` describes for every index tuple.
pub fn add_constraints<M, F>(
    model: &mut M,
    registry: &Registry,
    spec: &ContainerSpec,
    params: &Params,
    mut relation: F,
) -> Result<Container<ConstraintRefs>>
where
    M: ModelBuilder,
    F: FnMut(&Bindings) -> Result<RelationalSpec>,
{
    let ctx = ErrorContext::new(format!("constraint {}", spec.label()));
    let plan = synthesize(&ctx, spec)?;
    let container = populate(&ctx, &plan, params, |b| {
        let form = canonicalize(&ctx, relation(b)?)?;
        let name = element_name(&*model, spec, b);
        match registry.build_form(&ctx, form)? {
            Built::Single(constraint) => model
                .add_constraint(constraint, name.as_deref())
                .map(ConstraintRefs::Single),
            Built::Broadcast(constraints) => {
                let mut refs = Vec::with_capacity(constraints.len());
                for (k, constraint) in constraints.into_iter().enumerate() {
                    let name = name.as_ref().map(|name| format!("{name}[{}]", k + 1));
                    refs.push(model.add_constraint(constraint, name.as_deref())?);
                }
                Ok(ConstraintRefs::Broadcast(refs))
            }
        }
    })?;

    if let Some(name) = &spec.name {
        let object = match &container {
            Container::Scalar(ConstraintRefs::Single(con)) => NamedObject::Constraint(*con),
            other => NamedObject::Constraints(
                other
                    .values()
                    .flat_map(|refs| refs.refs().iter().copied())
                    .collect(),
            ),
        };
        model
            .register_name(name, object)
            .map_err(|err| ctx.attach(err))?;
    }
    debug!("{}: added {} constraint groups", ctx.label(), container.len());
    Ok(container)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Symmetry {
    Symmetric,
    /// Symmetric, plus membership of the upper triangle in the
    /// positive semidefinite cone.
    Psd,
}

#[derive(Debug)]
pub struct SymmetricVariables {
    pub matrix: Container<Rc<VariableRef>>,
    pub psd_constraint: Option<ConstraintRef>,
}

/// Adds a symmetric matrix of variables, creating `N(N+1)/2` variables for
/// an `N x N` matrix.
pub fn add_symmetric_variables<M, F>(
    model: &mut M,
    registry: &Registry,
    spec: &ContainerSpec,
    params: &Params,
    symmetry: Symmetry,
    mut decl: F,
) -> Result<SymmetricVariables>
where
    M: ModelBuilder,
    F: FnMut(&Bindings) -> Result<VariableDecl>,
{
    let ctx = ErrorContext::new(format!("variable {}", spec.label()));
    let matrix = populate_symmetric(&ctx, spec, params, |b| {
        let info = VariableInfo::from_decl(&ctx, &decl(b)?)?;
        let name = element_name(&*model, spec, b);
        model.add_variable(&info, name.as_deref())
    })?;

    let upper: Vec<VariableRef> = upper_triangle(&matrix).into_iter().map(|v| **v).collect();

    let psd_constraint = match symmetry {
        Symmetry::Symmetric => None,
        Symmetry::Psd => {
            let side = match &matrix {
                Container::Dense(array) => array.dims().first().copied().unwrap_or(0),
                _ => 0,
            };
            let func = Function::Array(upper.iter().map(|&v| Function::Variable(v)).collect());
            let set = VectorSet::PositiveSemidefiniteConeTriangle(side);
            let built = registry.build(&ctx, func, set.into())?;
            let con = model
                .add_constraint(built, None)
                .map_err(|err| ctx.attach(err))?;
            Some(con)
        }
    };

    if let Some(name) = &spec.name {
        model
            .register_name(name, NamedObject::Variables(upper))
            .map_err(|err| ctx.attach(err))?;
    }
    Ok(SymmetricVariables {
        matrix,
        psd_constraint,
    })
}
