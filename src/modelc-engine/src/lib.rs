// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub use modelc_core::{ast, datamodel};

pub mod common;
pub mod compiler;
pub mod container;
pub mod dependency;
pub mod dispatch;
pub mod eval;
pub mod frontend;
pub mod func;
pub mod model;
pub mod relational;
pub mod sets;
pub mod variable;

#[cfg(test)]
mod compiler_proptest;
#[cfg(test)]
mod testutils;

pub use self::common::{Error, ErrorCode, ErrorContext, ErrorKind, Ident, Result};
pub use self::container::Container;
pub use self::datamodel::{ContainerKind, ContainerSpec, IndexSpec, IndexValue, Key};
pub use self::dispatch::{Built, BuiltConstraint, ConstraintFunction, Registry};
pub use self::eval::{Bindings, Params};
pub use self::frontend::{
    ConstraintRefs, SymmetricVariables, Symmetry, add_constraints, add_symmetric_variables,
    add_variables, spec_from_json,
};
pub use self::func::{AffExpr, Function, QuadExpr, VariableRef};
pub use self::model::{ConstraintRef, Model, ModelBuilder, ModelOptions, NamedObject};
pub use self::relational::{Comparison, RelationalForm, RelationalSpec, canonicalize};
pub use self::sets::{ScalarSet, Set, VectorSet};
pub use self::variable::{BoundSpec, VariableDecl, VariableInfo};
