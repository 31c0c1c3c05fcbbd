// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Which index sets refer to earlier index variables.
//!
//! The relation is recomputed on every query; nothing here is cached.

use std::collections::HashSet;

use crate::ast::{Expr, Visitor};
use crate::common::Ident;

struct IdentifierSetVisitor {
    identifiers: HashSet<Ident>,
}

impl Visitor<()> for IdentifierSetVisitor {
    fn walk(&mut self, e: &Expr) {
        match e {
            Expr::Const(_) => (),
            Expr::Var(id) => {
                self.identifiers.insert(id.clone());
            }
            // function names are not variable references, their arguments are
            Expr::App(_, args) | Expr::Collection(args) => {
                for arg in args.iter() {
                    self.walk(arg);
                }
            }
            Expr::Range(l, r) | Expr::Op2(_, l, r) => {
                self.walk(l);
                self.walk(r);
            }
            Expr::Op1(_, l) => self.walk(l),
            Expr::If(cond, t, f) => {
                self.walk(cond);
                self.walk(t);
                self.walk(f);
            }
        }
    }
}

/// Every name referenced anywhere in `expr`.
pub fn identifier_set(expr: &Expr) -> HashSet<Ident> {
    let mut id_visitor = IdentifierSetVisitor {
        identifiers: HashSet::new(),
    };
    id_visitor.walk(expr);
    id_visitor.identifiers
}

/// True if `name` occurs free in `expr`.
pub fn depends_on(expr: &Expr, name: &str) -> bool {
    match expr {
        Expr::Const(_) => false,
        Expr::Var(id) => id.as_str() == name,
        Expr::App(_, args) | Expr::Collection(args) => args.iter().any(|a| depends_on(a, name)),
        Expr::Range(l, r) | Expr::Op2(_, l, r) => depends_on(l, name) || depends_on(r, name),
        Expr::Op1(_, l) => depends_on(l, name),
        Expr::If(cond, t, f) => {
            depends_on(cond, name) || depends_on(t, name) || depends_on(f, name)
        }
    }
}

/// The first `(set, var)` position pair where `sets[set]` references
/// `vars[var]` with `var < set`, if any.
pub fn first_dependency(vars: &[&Ident], sets: &[&Expr]) -> Option<(usize, usize)> {
    for (i, set) in sets.iter().enumerate().skip(1) {
        let referenced = identifier_set(set);
        if let Some(j) = vars.iter().take(i).position(|var| referenced.contains(*var)) {
            return Some((i, j));
        }
    }
    None
}

/// True iff some index set references an index variable declared before it.
pub fn has_dependent_sets(vars: &[&Ident], sets: &[&Expr]) -> bool {
    first_dependency(vars, sets).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    #[test]
    fn test_identifier_sets() {
        let expr = Expr::if_then_else(
            Expr::op2(BinaryOp::Gt, Expr::var("a"), Expr::int(1)),
            Expr::range(Expr::var("b"), Expr::app("len", vec![Expr::var("S")])),
            Expr::collection([Expr::var("c"), Expr::string("d")]),
        );
        let mut ids: Vec<String> = identifier_set(&expr)
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        ids.sort();
        assert_eq!(vec!["S", "a", "b", "c"], ids);
    }

    #[test]
    fn depends_on_recurses() {
        let set = Expr::range(
            Expr::op2(BinaryOp::Add, Expr::var("i"), Expr::int(1)),
            Expr::var("N"),
        );
        assert!(depends_on(&set, "i"));
        assert!(depends_on(&set, "N"));
        assert!(!depends_on(&set, "j"));
        // function names are not references
        assert!(!depends_on(&Expr::app("i", vec![]), "i"));
    }

    #[test]
    fn dependent_sets_only_look_backwards() {
        let i = Ident::new("i");
        let j = Ident::new("j");
        let n = Expr::one_to(Expr::var("N"));
        let from_i = Expr::range(Expr::var("i"), Expr::var("N"));
        let from_j = Expr::range(Expr::var("j"), Expr::var("N"));

        assert!(!has_dependent_sets(&[&i, &j], &[&n, &n]));
        assert!(has_dependent_sets(&[&i, &j], &[&n, &from_i]));
        assert_eq!(Some((1, 0)), first_dependency(&[&i, &j], &[&n, &from_i]));

        // the first set may mention a later variable name; that is a free
        // parameter, not a dependency
        assert!(!has_dependent_sets(&[&i, &j], &[&from_j, &n]));
        // a set referencing its own variable is not a dependency either
        assert!(!has_dependent_sets(&[&i, &j], &[&n, &from_j]));
    }
}
