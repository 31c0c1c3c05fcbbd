// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod ast;
pub mod common;
pub mod datamodel;

pub use ast::{BinaryOp, Expr, UnaryOp, print_expr};
pub use common::{Error, ErrorCode, ErrorKind, Ident, Result};
pub use datamodel::{ContainerKind, ContainerSpec, IndexSpec, IndexValue, Key, format_key};
