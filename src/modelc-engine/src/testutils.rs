// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Shared fixtures for the unit tests.

use crate::common::ErrorContext;
use crate::eval::Params;
use crate::func::VariableRef;
use crate::model::{Model, ModelBuilder};
use crate::variable::VariableInfo;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A model with some free variables and the parameters index sets are
/// evaluated against.
pub(crate) struct TestModel {
    pub model: Model,
    pub params: Params,
    pub ctx: ErrorContext,
}

impl TestModel {
    pub fn new(label: &str) -> Self {
        init_logging();
        TestModel {
            model: Model::default(),
            params: Params::new(),
            ctx: ErrorContext::new(label),
        }
    }

    pub fn param(mut self, name: &str, value: i64) -> Self {
        self.params = self.params.scalar(name, value);
        self
    }

    /// Adds `n` unbounded, unnamed variables.
    pub fn free_variables(&mut self, n: usize) -> Vec<VariableRef> {
        (0..n)
            .map(|_| {
                self.model
                    .add_variable(&VariableInfo::default(), None)
                    .unwrap()
            })
            .collect()
    }
}
