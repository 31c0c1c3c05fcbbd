// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;

/// A set a scalar function can be constrained to.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ScalarSet {
    LessThan(f64),
    GreaterThan(f64),
    EqualTo(f64),
    Interval(f64, f64),
    Integer,
    ZeroOne,
}

impl ScalarSet {
    /// The set `{ y - c : y in self }`, so `f + c in S` iff `f in S.shift(c)`.
    pub fn shift(self, c: f64) -> ScalarSet {
        match self {
            ScalarSet::LessThan(ub) => ScalarSet::LessThan(ub - c),
            ScalarSet::GreaterThan(lb) => ScalarSet::GreaterThan(lb - c),
            ScalarSet::EqualTo(v) => ScalarSet::EqualTo(v - c),
            ScalarSet::Interval(lb, ub) => ScalarSet::Interval(lb - c, ub - c),
            integrality @ (ScalarSet::Integer | ScalarSet::ZeroOne) => integrality,
        }
    }
}

impl fmt::Display for ScalarSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarSet::LessThan(ub) => write!(f, "LessThan({ub})"),
            ScalarSet::GreaterThan(lb) => write!(f, "GreaterThan({lb})"),
            ScalarSet::EqualTo(v) => write!(f, "EqualTo({v})"),
            ScalarSet::Interval(lb, ub) => write!(f, "Interval({lb}, {ub})"),
            ScalarSet::Integer => write!(f, "Integer()"),
            ScalarSet::ZeroOne => write!(f, "ZeroOne()"),
        }
    }
}

/// A set a vector-valued function can be constrained to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VectorSet {
    Nonnegatives(usize),
    Nonpositives(usize),
    Zeros(usize),
    SecondOrderCone(usize),
    /// Upper triangle of a `side x side` PSD matrix, column by column.
    PositiveSemidefiniteConeTriangle(usize),
}

impl VectorSet {
    /// Number of function components a member has.
    pub fn dimension(&self) -> usize {
        match *self {
            VectorSet::Nonnegatives(n)
            | VectorSet::Nonpositives(n)
            | VectorSet::Zeros(n)
            | VectorSet::SecondOrderCone(n) => n,
            VectorSet::PositiveSemidefiniteConeTriangle(side) => side * (side + 1) / 2,
        }
    }
}

impl fmt::Display for VectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorSet::Nonnegatives(n) => write!(f, "Nonnegatives({n})"),
            VectorSet::Nonpositives(n) => write!(f, "Nonpositives({n})"),
            VectorSet::Zeros(n) => write!(f, "Zeros({n})"),
            VectorSet::SecondOrderCone(n) => write!(f, "SecondOrderCone({n})"),
            VectorSet::PositiveSemidefiniteConeTriangle(n) => {
                write!(f, "PositiveSemidefiniteConeTriangle({n})")
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Set {
    Scalar(ScalarSet),
    Vector(VectorSet),
}

/// Coarse shape of a [`Set`], the other half of a dispatch key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SetCategory {
    /// LessThan, GreaterThan and EqualTo.
    Bound,
    Interval,
    Integrality,
    Vector,
}

impl Set {
    pub fn category(&self) -> SetCategory {
        match self {
            Set::Scalar(ScalarSet::LessThan(_))
            | Set::Scalar(ScalarSet::GreaterThan(_))
            | Set::Scalar(ScalarSet::EqualTo(_)) => SetCategory::Bound,
            Set::Scalar(ScalarSet::Interval(..)) => SetCategory::Interval,
            Set::Scalar(ScalarSet::Integer | ScalarSet::ZeroOne) => SetCategory::Integrality,
            Set::Vector(_) => SetCategory::Vector,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Set::Scalar(_))
    }
}

impl From<ScalarSet> for Set {
    fn from(set: ScalarSet) -> Self {
        Set::Scalar(set)
    }
}

impl From<VectorSet> for Set {
    fn from(set: VectorSet) -> Self {
        Set::Vector(set)
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Set::Scalar(set) => write!(f, "{set}"),
            Set::Vector(set) => write!(f, "{set}"),
        }
    }
}

#[test]
fn test_shift() {
    assert_eq!(ScalarSet::GreaterThan(9.0), ScalarSet::GreaterThan(10.0).shift(1.0));
    assert_eq!(
        ScalarSet::Interval(0.0, 1.0),
        ScalarSet::Interval(1.0, 2.0).shift(1.0)
    );
    assert_eq!(ScalarSet::ZeroOne, ScalarSet::ZeroOne.shift(3.0));
}

#[test]
fn test_psd_triangle_dimension() {
    assert_eq!(6, VectorSet::PositiveSemidefiniteConeTriangle(3).dimension());
    assert_eq!(1, VectorSet::PositiveSemidefiniteConeTriangle(1).dimension());
    assert_eq!(4, VectorSet::Zeros(4).dimension());
}

#[test]
fn test_set_categories() {
    assert_eq!(SetCategory::Bound, Set::from(ScalarSet::EqualTo(0.0)).category());
    assert_eq!(
        SetCategory::Interval,
        Set::from(ScalarSet::Interval(0.0, 1.0)).category()
    );
    assert_eq!(SetCategory::Integrality, Set::from(ScalarSet::Integer).category());
    assert_eq!(SetCategory::Vector, Set::from(VectorSet::Zeros(2)).category());
    assert_eq!("LessThan(1)", ScalarSet::LessThan(1.0).to_string());
}
