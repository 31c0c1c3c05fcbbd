// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The index-set and filter sublanguage.
//!
//! Index sets (`1..N`, `{"a", "b"}`, `i..N`) and filter predicates
//! (`i != j`) are small expressions over integers, floats and strings.
//! They are handed to us already parsed; this module only describes and
//! prints them.

use serde::{Deserialize, Serialize};

use crate::common::Ident;
use crate::datamodel::IndexValue;

// Boxes let the dependency analyzer and evaluator walk subexpressions
// without copying them.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub enum Expr {
    Const(IndexValue),
    Var(Ident),
    /// Inclusive integer range `lo..hi` with unit step.
    Range(Box<Expr>, Box<Expr>),
    /// Literal collection `{a, b, c}`, iterated in the order written.
    Collection(Vec<Expr>),
    App(Ident, Vec<Expr>),
    Op1(UnaryOp, Box<Expr>),
    Op2(BinaryOp, Box<Expr>, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn int(n: i64) -> Self {
        Expr::Const(IndexValue::Int(n))
    }

    pub fn float(n: f64) -> Self {
        Expr::Const(IndexValue::from(n))
    }

    pub fn string(s: &str) -> Self {
        Expr::Const(IndexValue::Str(s.to_owned()))
    }

    pub fn var(name: &str) -> Self {
        Expr::Var(Ident::new(name))
    }

    pub fn range(lo: Expr, hi: Expr) -> Self {
        Expr::Range(Box::new(lo), Box::new(hi))
    }

    /// `1..hi`, the shape dense arrays and symmetric containers require.
    pub fn one_to(hi: Expr) -> Self {
        Expr::range(Expr::int(1), hi)
    }

    pub fn collection<I: IntoIterator<Item = Expr>>(elements: I) -> Self {
        Expr::Collection(elements.into_iter().collect())
    }

    pub fn app(func: &str, args: Vec<Expr>) -> Self {
        Expr::App(Ident::new(func), args)
    }

    pub fn op1(op: UnaryOp, r: Expr) -> Self {
        Expr::Op1(op, Box::new(r))
    }

    pub fn op2(op: BinaryOp, l: Expr, r: Expr) -> Self {
        Expr::Op2(op, Box::new(l), Box::new(r))
    }

    pub fn if_then_else(cond: Expr, t: Expr, f: Expr) -> Self {
        Expr::If(Box::new(cond), Box::new(t), Box::new(f))
    }

    /// Returns the upper bound `N` if this expression is syntactically
    /// `1..N`.
    pub fn one_based_upper(&self) -> Option<&Expr> {
        match self {
            Expr::Range(lo, hi) if matches!(lo.as_ref(), Expr::Const(IndexValue::Int(1))) => {
                Some(hi)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", print_expr(self))
    }
}

pub trait Visitor<T> {
    fn walk(&mut self, e: &Expr) -> T;
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
    And,
    Or,
}

impl BinaryOp {
    // higher the precedence, the tighter the binding.
    // e.g. Mul.precedence() > Add.precedence()
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add => 4,
            BinaryOp::Sub => 4,
            BinaryOp::Mul => 5,
            BinaryOp::Div => 5,
            BinaryOp::Mod => 5,
            BinaryOp::Gt => 3,
            BinaryOp::Lt => 3,
            BinaryOp::Gte => 3,
            BinaryOp::Lte => 3,
            BinaryOp::Eq => 2,
            BinaryOp::Neq => 2,
            BinaryOp::And => 1,
            BinaryOp::Or => 1,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Gte => ">=",
            BinaryOp::Lte => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
}

fn child_needs_parens(parent: &Expr, child: &Expr) -> bool {
    match parent {
        // no children so doesn't matter
        Expr::Const(_) | Expr::Var(_) => false,
        // children are comma separated, so no ambiguity possible
        Expr::App(_, _) | Expr::Collection(_) => false,
        Expr::Range(_, _) => matches!(
            child,
            Expr::Range(_, _) | Expr::Op2(_, _, _) | Expr::If(_, _, _)
        ),
        Expr::Op1(_, _) => matches!(child, Expr::Op2(_, _, _)),
        Expr::Op2(parent_op, _, _) => match child {
            Expr::Op2(child_op, _, _) => {
                // if we have `3 * (2 + 3)`, the parent's precedence
                // is higher than the child and we need enclosing parens
                parent_op.precedence() > child_op.precedence()
            }
            Expr::Range(_, _) | Expr::If(_, _, _) => true,
            _ => false,
        },
        Expr::If(_, _, _) => false,
    }
}

fn paren_if_necessary(parent: &Expr, child: &Expr, eqn: String) -> String {
    if child_needs_parens(parent, child) {
        format!("({eqn})")
    } else {
        eqn
    }
}

struct PrintVisitor {}

impl Visitor<String> for PrintVisitor {
    fn walk(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Const(n) => match n {
                IndexValue::Str(s) => format!("{s:?}"),
                _ => n.to_string(),
            },
            Expr::Var(id) => id.to_string(),
            Expr::Range(lo, hi) => {
                let lo = paren_if_necessary(expr, lo, self.walk(lo));
                let hi = paren_if_necessary(expr, hi, self.walk(hi));
                format!("{lo}..{hi}")
            }
            Expr::Collection(elements) => {
                let elements: Vec<String> = elements.iter().map(|e| self.walk(e)).collect();
                format!("{{{}}}", elements.join(", "))
            }
            Expr::App(func, args) => {
                let args: Vec<String> = args.iter().map(|e| self.walk(e)).collect();
                format!("{}({})", func, args.join(", "))
            }
            Expr::Op1(op, l) => {
                let l = paren_if_necessary(expr, l, self.walk(l));
                let op: &str = match op {
                    UnaryOp::Positive => "+",
                    UnaryOp::Negative => "-",
                    UnaryOp::Not => "!",
                };
                format!("{op}{l}")
            }
            Expr::Op2(op, l, r) => {
                let l = paren_if_necessary(expr, l, self.walk(l));
                let r = paren_if_necessary(expr, r, self.walk(r));
                format!("{} {} {}", l, op.symbol(), r)
            }
            Expr::If(cond, t, f) => {
                let cond = self.walk(cond);
                let t = self.walk(t);
                let f = self.walk(f);
                format!("if ({cond}) then ({t}) else ({f})")
            }
        }
    }
}

pub fn print_expr(expr: &Expr) -> String {
    let mut visitor = PrintVisitor {};
    visitor.walk(expr)
}

#[test]
fn test_print_expr() {
    assert_eq!(
        "a + b",
        print_expr(&Expr::op2(BinaryOp::Add, Expr::var("a"), Expr::var("b")))
    );
    assert_eq!(
        "-a",
        print_expr(&Expr::op1(UnaryOp::Negative, Expr::var("a")))
    );
    assert_eq!(
        "(a + 1) * 2",
        print_expr(&Expr::op2(
            BinaryOp::Mul,
            Expr::op2(BinaryOp::Add, Expr::var("a"), Expr::int(1)),
            Expr::int(2),
        ))
    );
    assert_eq!("1..N", print_expr(&Expr::one_to(Expr::var("N"))));
    assert_eq!(
        "i..(N - 1)",
        print_expr(&Expr::range(
            Expr::var("i"),
            Expr::op2(BinaryOp::Sub, Expr::var("N"), Expr::int(1)),
        ))
    );
    assert_eq!(
        "{\"a\", 2}",
        print_expr(&Expr::collection([Expr::string("a"), Expr::int(2)]))
    );
    assert_eq!("i != 2", Expr::op2(BinaryOp::Neq, Expr::var("i"), Expr::int(2)).to_string());
}

#[test]
fn test_one_based_upper() {
    let n = Expr::var("N");
    assert_eq!(Some(&n), Expr::one_to(n.clone()).one_based_upper());
    assert_eq!(None, Expr::range(Expr::int(2), n).one_based_upper());
    assert_eq!(None, Expr::collection([Expr::int(1)]).one_based_upper());
}
