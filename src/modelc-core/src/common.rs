// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    Generic,
    UnsupportedContainer,
    ConditionalIndexing,
    DependentIndexSets,
    NotOneBasedRange,
    MismatchedDimensions,
    NotSquare,
    ExpectedSet,
    ExpectedScalar,
    ExpectedBool,
    UnknownIdentifier,
    UnknownBuiltin,
    BadBuiltinArgs,
    DivisionByZero,
    IntegerOverflow,
    RepeatedIndex,
    UnrecognizedRelation,
    BadRangedOperators,
    UnexpectedVector,
    TwoSidedQuadratic,
    NoBuilder,
    BadVariableBounds,
    ForeignVariable,
    DuplicateName,
    ModelError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            Generic => "generic",
            UnsupportedContainer => "unsupported_container",
            ConditionalIndexing => "conditional_indexing",
            DependentIndexSets => "dependent_index_sets",
            NotOneBasedRange => "not_one_based_range",
            MismatchedDimensions => "mismatched_dimensions",
            NotSquare => "not_square",
            ExpectedSet => "expected_set",
            ExpectedScalar => "expected_scalar",
            ExpectedBool => "expected_bool",
            UnknownIdentifier => "unknown_identifier",
            UnknownBuiltin => "unknown_builtin",
            BadBuiltinArgs => "bad_builtin_args",
            DivisionByZero => "division_by_zero",
            IntegerOverflow => "integer_overflow",
            RepeatedIndex => "repeated_index",
            UnrecognizedRelation => "unrecognized_relation",
            BadRangedOperators => "bad_ranged_operators",
            UnexpectedVector => "unexpected_vector",
            TwoSidedQuadratic => "two_sided_quadratic",
            NoBuilder => "no_builder",
            BadVariableBounds => "bad_variable_bounds",
            ForeignVariable => "foreign_variable",
            DuplicateName => "duplicate_name",
            ModelError => "model_error",
        };

        write!(f, "{name}")
    }
}

/// Broad class of a failure.  Every class aborts the enclosing
/// compilation pass; none is recovered from locally.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A malformed declaration, detected before any entity is built.
    Specification,
    /// An associative container saw a second entity for an occupied key.
    DuplicateKey,
    /// No builder is registered for a (function, set) pairing.
    Dispatch,
    /// Raised by the model-construction API or the caller's element builder.
    Downstream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Specification => "SpecificationError",
            ErrorKind::DuplicateKey => "DuplicateKeyError",
            ErrorKind::Dispatch => "BuilderDispatchError",
            ErrorKind::Downstream => "DownstreamError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// The name of an index variable, container or registered object.
///
/// Names are case sensitive; surrounding whitespace is not significant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: &str) -> Self {
        Ident(name.trim().to_owned())
    }

    /// Element name for one position of an indexed container,
    /// e.g. `x` with subscript `1,2` becomes `x[1,2]`.
    pub fn with_subscript(&self, subscript: &str) -> Self {
        Ident(format!("{}[{}]", self.0, subscript))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Ident {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::new(name)
    }
}

impl PartialEq<str> for Ident {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Ident {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[test]
fn test_ident_with_subscript() {
    let ident = Ident::new("my_array");
    let subscripted = ident.with_subscript("1,2");
    assert_eq!(subscripted.as_str(), "my_array[1,2]");

    let ident2 = Ident::new("  flow ");
    assert_eq!(ident2.as_str(), "flow");
    assert_eq!(ident2.with_subscript("a").to_string(), "flow[a]");
}

#[test]
fn test_ident_is_case_sensitive() {
    assert_ne!(Ident::new("X"), Ident::new("x"));
    assert_eq!(Ident::new("x"), "x");
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Specification,
        ErrorCode::MismatchedDimensions,
        Some("2 vs 3".to_owned()),
    );
    assert_eq!(
        "SpecificationError{mismatched_dimensions: 2 vs 3}",
        format!("{err}")
    );

    let err = Error::new(ErrorKind::DuplicateKey, ErrorCode::RepeatedIndex, None);
    assert_eq!("DuplicateKeyError{repeated_index}", format!("{err}"));
}
