// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Algebraic function values produced by the expression builder.
//!
//! Only what constraint canonicalization needs lives here: affine and
//! quadratic sums with their additive constant, and arrays of them.

use std::ops::{Add, Mul, Neg, Sub};
use std::sync::atomic::{AtomicU32, Ordering};

/// Identity of one model.  Variables remember the model that created them
/// so a model can refuse entities built from another model's variables.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u32);

impl ModelId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        ModelId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A decision variable, by position within its model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableRef {
    pub model: ModelId,
    pub index: usize,
}

/// `sum(coef * var) + constant`.  Terms on the same variable are merged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AffExpr {
    terms: Vec<(VariableRef, f64)>,
    constant: f64,
}

impl AffExpr {
    pub fn new() -> Self {
        AffExpr::default()
    }

    pub fn constant_only(constant: f64) -> Self {
        AffExpr {
            terms: vec![],
            constant,
        }
    }

    pub fn term(mut self, var: VariableRef, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn plus(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    pub fn add_term(&mut self, var: VariableRef, coef: f64) {
        match self.terms.iter_mut().find(|(v, _)| *v == var) {
            Some((_, c)) => *c += coef,
            None => self.terms.push((var, coef)),
        }
    }

    pub fn terms(&self) -> &[(VariableRef, f64)] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn set_constant(&mut self, constant: f64) {
        self.constant = constant;
    }

    pub fn variables(&self) -> impl Iterator<Item = VariableRef> + '_ {
        self.terms.iter().map(|(v, _)| *v)
    }
}

impl From<VariableRef> for AffExpr {
    fn from(var: VariableRef) -> Self {
        AffExpr::new().term(var, 1.0)
    }
}

impl Add for AffExpr {
    type Output = AffExpr;

    fn add(mut self, rhs: AffExpr) -> AffExpr {
        for (var, coef) in rhs.terms {
            self.add_term(var, coef);
        }
        self.constant += rhs.constant;
        self
    }
}

impl Neg for AffExpr {
    type Output = AffExpr;

    fn neg(self) -> AffExpr {
        self * -1.0
    }
}

impl Sub for AffExpr {
    type Output = AffExpr;

    fn sub(self, rhs: AffExpr) -> AffExpr {
        self + (-rhs)
    }
}

impl Mul<f64> for AffExpr {
    type Output = AffExpr;

    fn mul(mut self, k: f64) -> AffExpr {
        for (_, coef) in self.terms.iter_mut() {
            *coef *= k;
        }
        self.constant *= k;
        self
    }
}

/// An affine part plus `sum(coef * a * b)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuadExpr {
    pub affine: AffExpr,
    terms: Vec<(VariableRef, VariableRef, f64)>,
}

impl QuadExpr {
    pub fn new() -> Self {
        QuadExpr::default()
    }

    pub fn term(mut self, a: VariableRef, b: VariableRef, coef: f64) -> Self {
        self.add_term(a, b, coef);
        self
    }

    pub fn add_term(&mut self, a: VariableRef, b: VariableRef, coef: f64) {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        match self
            .terms
            .iter_mut()
            .find(|(x, y, _)| *x == a && *y == b)
        {
            Some((_, _, c)) => *c += coef,
            None => self.terms.push((a, b, coef)),
        }
    }

    pub fn terms(&self) -> &[(VariableRef, VariableRef, f64)] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.affine.constant()
    }

    pub fn variables(&self) -> impl Iterator<Item = VariableRef> + '_ {
        self.affine
            .variables()
            .chain(self.terms.iter().flat_map(|(a, b, _)| [*a, *b]))
    }
}

impl From<AffExpr> for QuadExpr {
    fn from(affine: AffExpr) -> Self {
        QuadExpr {
            affine,
            terms: vec![],
        }
    }
}

impl Add for QuadExpr {
    type Output = QuadExpr;

    fn add(mut self, rhs: QuadExpr) -> QuadExpr {
        for (a, b, coef) in rhs.terms {
            self.add_term(a, b, coef);
        }
        self.affine = self.affine + rhs.affine;
        self
    }
}

impl Mul<f64> for QuadExpr {
    type Output = QuadExpr;

    fn mul(mut self, k: f64) -> QuadExpr {
        for (_, _, coef) in self.terms.iter_mut() {
            *coef *= k;
        }
        self.affine = self.affine * k;
        self
    }
}

impl Sub for QuadExpr {
    type Output = QuadExpr;

    fn sub(self, rhs: QuadExpr) -> QuadExpr {
        self + rhs * -1.0
    }
}

/// Coarse shape of a [`Function`], one half of a dispatch key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FunctionCategory {
    Constant,
    Variable,
    Affine,
    Quadratic,
    /// An array whose elements are all single variables.
    VariableVector,
    /// An array of constants, variables and affine expressions.
    AffineVector,
    /// Any other array, e.g. one containing quadratics.
    Array,
}

/// A value the expression builder hands back for one index tuple.
#[derive(Clone, Debug, PartialEq)]
pub enum Function {
    Constant(f64),
    Variable(VariableRef),
    Affine(AffExpr),
    Quadratic(QuadExpr),
    Array(Vec<Function>),
}

impl Function {
    pub fn category(&self) -> FunctionCategory {
        match self {
            Function::Constant(_) => FunctionCategory::Constant,
            Function::Variable(_) => FunctionCategory::Variable,
            Function::Affine(_) => FunctionCategory::Affine,
            Function::Quadratic(_) => FunctionCategory::Quadratic,
            Function::Array(elements) => {
                if elements.iter().all(|f| matches!(f, Function::Variable(_))) {
                    FunctionCategory::VariableVector
                } else if elements.iter().all(|f| {
                    matches!(
                        f,
                        Function::Constant(_) | Function::Variable(_) | Function::Affine(_)
                    )
                }) {
                    FunctionCategory::AffineVector
                } else {
                    FunctionCategory::Array
                }
            }
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Function::Array(_))
    }

    /// The additive constant; zero for arrays and bare variables.
    pub fn constant(&self) -> f64 {
        match self {
            Function::Constant(c) => *c,
            Function::Affine(aff) => aff.constant(),
            Function::Quadratic(quad) => quad.constant(),
            Function::Variable(_) | Function::Array(_) => 0.0,
        }
    }

    /// Widens a scalar function to affine form.  `None` for quadratics and
    /// arrays.
    pub fn into_affine(self) -> Option<AffExpr> {
        match self {
            Function::Constant(c) => Some(AffExpr::constant_only(c)),
            Function::Variable(var) => Some(AffExpr::from(var)),
            Function::Affine(aff) => Some(aff),
            Function::Quadratic(_) | Function::Array(_) => None,
        }
    }

    /// Widens a scalar function to quadratic form.  `None` for arrays.
    pub fn into_quadratic(self) -> Option<QuadExpr> {
        match self {
            Function::Quadratic(quad) => Some(quad),
            Function::Array(_) => None,
            other => other.into_affine().map(QuadExpr::from),
        }
    }

    /// `self - rhs` for two scalar functions, in the narrowest form that
    /// holds the result.  `None` if either side is an array.
    pub fn scalar_sub(self, rhs: Function) -> Option<Function> {
        match (self, rhs) {
            (Function::Array(_), _) | (_, Function::Array(_)) => None,
            (Function::Constant(a), Function::Constant(b)) => Some(Function::Constant(a - b)),
            (l @ Function::Quadratic(_), r) | (l, r @ Function::Quadratic(_)) => {
                Some(Function::Quadratic(l.into_quadratic()? - r.into_quadratic()?))
            }
            (l, r) => Some(Function::Affine(l.into_affine()? - r.into_affine()?)),
        }
    }

    /// Every variable referenced, including inside array elements.
    pub fn variables(&self) -> Vec<VariableRef> {
        match self {
            Function::Constant(_) => vec![],
            Function::Variable(var) => vec![*var],
            Function::Affine(aff) => aff.variables().collect(),
            Function::Quadratic(quad) => quad.variables().collect(),
            Function::Array(elements) => elements.iter().flat_map(Function::variables).collect(),
        }
    }
}

impl From<f64> for Function {
    fn from(c: f64) -> Self {
        Function::Constant(c)
    }
}

impl From<VariableRef> for Function {
    fn from(var: VariableRef) -> Self {
        Function::Variable(var)
    }
}

impl From<AffExpr> for Function {
    fn from(aff: AffExpr) -> Self {
        Function::Affine(aff)
    }
}

impl From<QuadExpr> for Function {
    fn from(quad: QuadExpr) -> Self {
        Function::Quadratic(quad)
    }
}
