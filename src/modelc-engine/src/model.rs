// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The model-construction interface entities are handed to, plus an
//! in-memory model that records them.

use std::collections::HashMap;

use crate::common::{Error, ErrorCode, ErrorKind, Ident, Result};
use crate::dispatch::BuiltConstraint;
use crate::func::{ModelId, VariableRef};
use crate::variable::VariableInfo;

/// A constraint, by position within its model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintRef {
    pub model: ModelId,
    pub index: usize,
}

/// What a registered container name refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum NamedObject {
    Variable(VariableRef),
    Variables(Vec<VariableRef>),
    Constraint(ConstraintRef),
    Constraints(Vec<ConstraintRef>),
}

/// The operations the compiler needs from a model.  Implementations own
/// validity checks on what they are given and report failures as
/// [`ErrorKind::Downstream`] errors.
pub trait ModelBuilder {
    /// Whether element names should be synthesized and passed along.
    fn string_names(&self) -> bool {
        true
    }

    fn add_variable(&mut self, info: &VariableInfo, name: Option<&str>) -> Result<VariableRef>;

    fn add_constraint(
        &mut self,
        constraint: BuiltConstraint,
        name: Option<&str>,
    ) -> Result<ConstraintRef>;

    fn register_name(&mut self, name: &Ident, object: NamedObject) -> Result<()>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModelOptions {
    /// When false, element names are neither built nor stored.
    pub string_names: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions { string_names: true }
    }
}

fn downstream(code: ErrorCode, details: String) -> Error {
    Error::new(ErrorKind::Downstream, code, Some(details))
}

#[derive(Debug)]
pub struct Model {
    id: ModelId,
    options: ModelOptions,
    variables: Vec<(VariableInfo, Option<String>)>,
    constraints: Vec<(BuiltConstraint, Option<String>)>,
    names: HashMap<Ident, NamedObject>,
}

impl Default for Model {
    fn default() -> Self {
        Model::new(ModelOptions::default())
    }
}

impl Model {
    pub fn new(options: ModelOptions) -> Self {
        Model {
            id: ModelId::next(),
            options,
            variables: vec![],
            constraints: vec![],
            names: HashMap::new(),
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn options(&self) -> ModelOptions {
        self.options
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn variable(&self, var: VariableRef) -> Option<&VariableInfo> {
        self.owned(var.model, var.index, &self.variables)
            .map(|(info, _)| info)
    }

    pub fn variable_name(&self, var: VariableRef) -> Option<&str> {
        self.owned(var.model, var.index, &self.variables)
            .and_then(|(_, name)| name.as_deref())
    }

    pub fn constraint(&self, con: ConstraintRef) -> Option<&BuiltConstraint> {
        self.owned(con.model, con.index, &self.constraints)
            .map(|(constraint, _)| constraint)
    }

    pub fn constraint_name(&self, con: ConstraintRef) -> Option<&str> {
        self.owned(con.model, con.index, &self.constraints)
            .and_then(|(_, name)| name.as_deref())
    }

    pub fn constraints(&self) -> impl Iterator<Item = &BuiltConstraint> {
        self.constraints.iter().map(|(constraint, _)| constraint)
    }

    /// The object registered under `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&NamedObject> {
        self.names.get(name)
    }

    fn owned<'a, T>(&self, model: ModelId, index: usize, items: &'a [T]) -> Option<&'a T> {
        if model != self.id {
            return None;
        }
        items.get(index)
    }

    fn check_owned(&self, var: VariableRef) -> Result<()> {
        if var.model != self.id || var.index >= self.variables.len() {
            return Err(downstream(
                ErrorCode::ForeignVariable,
                format!(
                    "variable {} does not belong to this model; it was created by another model",
                    var.index
                ),
            ));
        }
        Ok(())
    }
}

impl ModelBuilder for Model {
    fn string_names(&self) -> bool {
        self.options.string_names
    }

    fn add_variable(&mut self, info: &VariableInfo, name: Option<&str>) -> Result<VariableRef> {
        let name = name.filter(|_| self.options.string_names).map(str::to_owned);
        self.variables.push((info.clone(), name));
        Ok(VariableRef {
            model: self.id,
            index: self.variables.len() - 1,
        })
    }

    fn add_constraint(
        &mut self,
        constraint: BuiltConstraint,
        name: Option<&str>,
    ) -> Result<ConstraintRef> {
        for var in constraint.func.variables() {
            self.check_owned(var)?;
        }
        let name = name.filter(|_| self.options.string_names).map(str::to_owned);
        self.constraints.push((constraint, name));
        Ok(ConstraintRef {
            model: self.id,
            index: self.constraints.len() - 1,
        })
    }

    fn register_name(&mut self, name: &Ident, object: NamedObject) -> Result<()> {
        if self.names.contains_key(name) {
            return Err(downstream(
                ErrorCode::DuplicateName,
                format!("an object of name {name} is already attached to this model"),
            ));
        }
        self.names.insert(name.clone(), object);
        Ok(())
    }
}
