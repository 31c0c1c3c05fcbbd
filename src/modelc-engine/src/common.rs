// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;

// Re-export all common types from modelc-core
pub use modelc_core::common::*;

#[macro_export]
macro_rules! spec_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Specification,
            ErrorCode::$code,
            Some($str),
        ))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Specification, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! dispatch_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Dispatch, ErrorCode::$code, Some($str)))
    }};
}

const LABEL_PREFIX: &str = "In `";

/// The caller's diagnostic label, threaded through every canonicalize and
/// build call so errors name the declaration they came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorContext {
    label: String,
}

impl ErrorContext {
    pub fn new(label: impl Into<String>) -> Self {
        ErrorContext {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn error(&self, kind: ErrorKind, code: ErrorCode, msg: impl fmt::Display) -> Error {
        Error::new(kind, code, Some(format!("{LABEL_PREFIX}{}`: {msg}", self.label)))
    }

    pub fn spec(&self, code: ErrorCode, msg: impl fmt::Display) -> Error {
        self.error(ErrorKind::Specification, code, msg)
    }

    pub fn dispatch(&self, code: ErrorCode, msg: impl fmt::Display) -> Error {
        self.error(ErrorKind::Dispatch, code, msg)
    }

    pub fn repeated_index(&self, element: impl fmt::Display) -> Error {
        self.error(
            ErrorKind::DuplicateKey,
            ErrorCode::RepeatedIndex,
            format!("repeated index {element}; index values must be unique"),
        )
    }

    /// Attaches this label to an error raised elsewhere, keeping its kind
    /// and code.  Errors that already carry a label are returned as-is.
    pub fn attach(&self, err: Error) -> Error {
        match err.details {
            Some(ref details) if details.starts_with(LABEL_PREFIX) => err,
            Some(details) => Error::new(
                err.kind,
                err.code,
                Some(format!("{LABEL_PREFIX}{}`: {details}", self.label)),
            ),
            None => Error::new(
                err.kind,
                err.code,
                Some(format!("{LABEL_PREFIX}{}`", self.label)),
            ),
        }
    }
}

#[test]
fn test_error_context_labels_details() {
    let ctx = ErrorContext::new("constraint c");
    let err = ctx.spec(ErrorCode::MismatchedDimensions, "2 != 3");
    assert_eq!(ErrorKind::Specification, err.kind);
    assert_eq!(
        Some("In `constraint c`: 2 != 3".to_owned()),
        err.get_details()
    );

    let err = ctx.repeated_index("c[1]");
    assert_eq!(ErrorKind::DuplicateKey, err.kind);
    assert!(err.get_details().unwrap().contains("repeated index c[1]"));
}

#[test]
fn test_error_context_attach() {
    let ctx = ErrorContext::new("variable x");
    let raw = Error::new(
        ErrorKind::Downstream,
        ErrorCode::ForeignVariable,
        Some("variable 3 belongs to model 2".to_owned()),
    );
    let labelled = ctx.attach(raw);
    assert_eq!(ErrorKind::Downstream, labelled.kind);
    assert_eq!(ErrorCode::ForeignVariable, labelled.code);
    assert_eq!(
        Some("In `variable x`: variable 3 belongs to model 2".to_owned()),
        labelled.get_details()
    );

    // already labelled errors are not wrapped twice
    let outer = ErrorContext::new("outer");
    assert_eq!(labelled, outer.attach(labelled.clone()));

    let bare = Error::new(ErrorKind::Downstream, ErrorCode::ModelError, None);
    assert_eq!(
        Some("In `variable x`".to_owned()),
        ctx.attach(bare).get_details()
    );
}
