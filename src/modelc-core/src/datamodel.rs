// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::ast::Expr;
use crate::common::Ident;

/// One element of an index set.
///
/// Numbers compare by value, so `Int(1)` and `Float(1.0)` are the same
/// key.  Numbers order before strings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexValue {
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
}

impl IndexValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            IndexValue::Int(n) => Some(*n),
            IndexValue::Float(n) => integral(n.0),
            IndexValue::Str(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            IndexValue::Int(n) => Some(*n as f64),
            IndexValue::Float(n) => Some(n.0),
            IndexValue::Str(_) => None,
        }
    }
}

// 2^63, the first float past i64::MAX
const I64_END: f64 = 9_223_372_036_854_775_808.0;

/// Orders an integer against a float exactly, without rounding `a`.
/// NaN sorts after every number, as `OrderedFloat` does.
fn cmp_int_float(a: i64, b: f64) -> Ordering {
    if b.is_nan() || b >= I64_END {
        return Ordering::Less;
    }
    if b < -I64_END {
        return Ordering::Greater;
    }
    let whole = b.trunc();
    match a.cmp(&(whole as i64)) {
        Ordering::Equal => whole.partial_cmp(&b).unwrap_or(Ordering::Equal),
        ord => ord,
    }
}

/// The integer a float is equal to, if any.
fn integral(b: f64) -> Option<i64> {
    if b.fract() == 0.0 && (-I64_END..I64_END).contains(&b) {
        Some(b as i64)
    } else {
        None
    }
}

impl PartialEq for IndexValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexValue {}

impl PartialOrd for IndexValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use IndexValue::*;
        match (self, other) {
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.cmp(b),
            (Int(a), Float(b)) => cmp_int_float(*a, b.0),
            (Float(a), Int(b)) => cmp_int_float(*b, a.0).reverse(),
            (Str(a), Str(b)) => a.cmp(b),
            (Str(_), _) => Ordering::Greater,
            (_, Str(_)) => Ordering::Less,
        }
    }
}

impl Hash for IndexValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            IndexValue::Int(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            IndexValue::Float(n) => match integral(n.0) {
                Some(n) => {
                    0u8.hash(state);
                    n.hash(state);
                }
                None => {
                    1u8.hash(state);
                    n.hash(state);
                }
            },
            IndexValue::Str(s) => {
                2u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl From<i64> for IndexValue {
    fn from(n: i64) -> Self {
        IndexValue::Int(n)
    }
}

impl From<i32> for IndexValue {
    fn from(n: i32) -> Self {
        IndexValue::Int(n as i64)
    }
}

impl From<usize> for IndexValue {
    fn from(n: usize) -> Self {
        IndexValue::Int(n as i64)
    }
}

impl From<f64> for IndexValue {
    fn from(n: f64) -> Self {
        IndexValue::Float(OrderedFloat(n))
    }
}

impl From<&str> for IndexValue {
    fn from(s: &str) -> Self {
        IndexValue::Str(s.to_owned())
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Int(n) => write!(f, "{n}"),
            IndexValue::Float(n) => write!(f, "{}", n.0),
            IndexValue::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A resolved index tuple, one value per IndexSpec.
pub type Key = SmallVec<[IndexValue; 4]>;

/// Formats a key the way element names print it: `1,"a"` becomes `1,a`.
pub fn format_key(key: &[IndexValue]) -> String {
    key.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// One loop dimension: an index variable and the set it ranges over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: Ident,
    pub set: Expr,
}

impl IndexSpec {
    pub fn new(name: &str, set: Expr) -> Self {
        IndexSpec {
            name: Ident::new(name),
            set,
        }
    }

    /// An index spec with no user-visible variable, as written for `x[1..3]`.
    /// The synthesized name cannot collide with a user identifier.
    pub fn anonymous(position: usize, set: Expr) -> Self {
        IndexSpec {
            name: Ident::new(&format!("#{position}")),
            set,
        }
    }
}

/// Requested container representation.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContainerKind {
    #[default]
    Auto,
    DenseArray,
    OrderedAxisArray,
    AssociativeMap,
    /// A kind this compiler does not know how to build; rejected when a
    /// plan is synthesized.
    Custom(String),
}

impl FromStr for ContainerKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "auto" => ContainerKind::Auto,
            "array" | "dense" => ContainerKind::DenseArray,
            "axis" | "axis_array" => ContainerKind::OrderedAxisArray,
            "map" | "sparse" => ContainerKind::AssociativeMap,
            other => ContainerKind::Custom(other.to_owned()),
        })
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Auto => write!(f, "auto"),
            ContainerKind::DenseArray => write!(f, "array"),
            ContainerKind::OrderedAxisArray => write!(f, "axis"),
            ContainerKind::AssociativeMap => write!(f, "map"),
            ContainerKind::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// Declarative description of an indexed entity collection.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// `None` for anonymous containers, which are not registered by name.
    pub name: Option<Ident>,
    pub indices: Vec<IndexSpec>,
    #[serde(default)]
    pub filter: Option<Expr>,
    #[serde(default)]
    pub kind: ContainerKind,
}

impl ContainerSpec {
    pub fn new(name: &str) -> Self {
        ContainerSpec {
            name: Some(Ident::new(name)),
            ..Default::default()
        }
    }

    pub fn anonymous() -> Self {
        ContainerSpec::default()
    }

    pub fn index(mut self, name: &str, set: Expr) -> Self {
        self.indices.push(IndexSpec::new(name, set));
        self
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn kind(mut self, kind: ContainerKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn index_names(&self) -> Vec<&Ident> {
        self.indices.iter().map(|spec| &spec.name).collect()
    }

    pub fn index_sets(&self) -> Vec<&Expr> {
        self.indices.iter().map(|spec| &spec.set).collect()
    }

    pub fn is_scalar(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn label(&self) -> String {
        self.name
            .as_ref()
            .map(|name| name.to_string())
            .unwrap_or_else(|| "<anonymous>".to_owned())
    }
}

#[test]
fn test_container_kind_from_str() {
    assert_eq!(ContainerKind::Auto, "auto".parse().unwrap());
    assert_eq!(ContainerKind::DenseArray, "array".parse().unwrap());
    assert_eq!(ContainerKind::OrderedAxisArray, "axis".parse().unwrap());
    assert_eq!(ContainerKind::AssociativeMap, " map ".parse().unwrap());
    assert_eq!(
        ContainerKind::Custom("tensor".to_owned()),
        "tensor".parse().unwrap()
    );
}

#[test]
fn test_format_key() {
    let key: Key = smallvec::smallvec![IndexValue::Int(1), IndexValue::from("a")];
    assert_eq!("1,a", format_key(&key));
    assert_eq!("2.5", format_key(&[IndexValue::from(2.5)]));
}

#[test]
fn test_index_value_as_int() {
    assert_eq!(Some(3), IndexValue::Int(3).as_int());
    assert_eq!(Some(3), IndexValue::from(3.0).as_int());
    assert_eq!(None, IndexValue::from(3.5).as_int());
    assert_eq!(None, IndexValue::from("3").as_int());
}

#[test]
fn test_index_value_numeric_identity() {
    use std::collections::{BTreeSet, HashSet};

    let one = IndexValue::Int(1);
    let one_f = IndexValue::from(1.0);
    assert_eq!(one, one_f);
    assert_eq!(Ordering::Equal, one.cmp(&one_f));
    let hashed: HashSet<IndexValue> = [one.clone(), one_f.clone()].into_iter().collect();
    assert_eq!(1, hashed.len());

    assert_ne!(one, IndexValue::from(1.5));
    assert!(one < IndexValue::from(1.5));
    assert!(IndexValue::from(-2.5) < IndexValue::Int(-2));
    assert!(IndexValue::Int(i64::MAX) < IndexValue::from(1e19));
    assert!(IndexValue::Int(i64::MIN) > IndexValue::from(-1e19));
    assert!(IndexValue::Int(i64::MAX) < IndexValue::from(f64::NAN));
    assert_eq!(IndexValue::from(0.0), IndexValue::from(-0.0));
    assert_ne!(IndexValue::from("1"), one);

    let ordered: BTreeSet<IndexValue> = [
        IndexValue::from("a"),
        IndexValue::from(2.5),
        IndexValue::Int(3),
        IndexValue::from(3.0),
        IndexValue::Int(-1),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        vec![
            IndexValue::Int(-1),
            IndexValue::from(2.5),
            IndexValue::Int(3),
            IndexValue::from("a"),
        ],
        ordered.into_iter().collect::<Vec<_>>()
    );
}
