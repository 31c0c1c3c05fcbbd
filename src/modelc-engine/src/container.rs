// Copyright 2025 The Modelc Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The concrete containers a compiled declaration is stored in.

use std::collections::{BTreeMap, HashMap};

use crate::datamodel::{IndexValue, Key};

/// Row-major strides for the given dimension sizes.
fn contiguous_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; dims.len()];
    // Build strides from right to left for row-major order
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

/// Dense storage over axes that are all `1..N`.  Elements are stored
/// row-major with the first index outermost, which is the order the loop
/// builder produces them in.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseArray<T> {
    dims: Vec<usize>,
    strides: Vec<usize>,
    data: Vec<T>,
}

impl<T> DenseArray<T> {
    pub(crate) fn from_row_major(dims: Vec<usize>, data: Vec<T>) -> Self {
        debug_assert_eq!(dims.iter().product::<usize>(), data.len());
        let strides = contiguous_strides(&dims);
        DenseArray {
            dims,
            strides,
            data,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Looks up 1-based integer indices.
    pub fn get(&self, key: &[IndexValue]) -> Option<&T> {
        if key.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for (i, index) in key.iter().enumerate() {
            let index = index.as_int()?;
            if index < 1 || index as usize > self.dims[i] {
                return None;
            }
            offset += (index as usize - 1) * self.strides[i];
        }
        self.data.get(offset)
    }

    fn key_at(&self, offset: usize) -> Key {
        self.strides
            .iter()
            .zip(self.dims.iter())
            .map(|(stride, dim)| IndexValue::Int(((offset / stride) % dim) as i64 + 1))
            .collect()
    }
}

/// One axis of an [`AxisArray`]: its elements in declared order plus a
/// reverse lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    elements: Vec<IndexValue>,
    lookup: HashMap<IndexValue, usize>,
}

impl Axis {
    /// Builds an axis, returning the first repeated element on failure.
    pub fn new(elements: Vec<IndexValue>) -> Result<Self, IndexValue> {
        let mut lookup = HashMap::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            if lookup.insert(element.clone(), i).is_some() {
                return Err(element.clone());
            }
        }
        Ok(Axis { elements, lookup })
    }

    pub fn elements(&self) -> &[IndexValue] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn position(&self, element: &IndexValue) -> Option<usize> {
        self.lookup.get(element).copied()
    }
}

/// Dense storage over arbitrary (but duplicate-free) ordered axes.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisArray<T> {
    axes: Vec<Axis>,
    strides: Vec<usize>,
    data: Vec<T>,
}

impl<T> AxisArray<T> {
    pub(crate) fn from_row_major(axes: Vec<Axis>, data: Vec<T>) -> Self {
        let dims: Vec<usize> = axes.iter().map(Axis::len).collect();
        debug_assert_eq!(dims.iter().product::<usize>(), data.len());
        let strides = contiguous_strides(&dims);
        AxisArray {
            axes,
            strides,
            data,
        }
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn get(&self, key: &[IndexValue]) -> Option<&T> {
        if key.len() != self.axes.len() {
            return None;
        }
        let mut offset = 0;
        for (i, index) in key.iter().enumerate() {
            offset += self.axes[i].position(index)? * self.strides[i];
        }
        self.data.get(offset)
    }

    fn key_at(&self, offset: usize) -> Key {
        self.strides
            .iter()
            .zip(self.axes.iter())
            .map(|(stride, axis)| axis.elements[(offset / stride) % axis.len()].clone())
            .collect()
    }
}

/// A populated container of built entities.
#[derive(Clone, Debug, PartialEq)]
pub enum Container<T> {
    /// A declaration with no indices.
    Scalar(T),
    Dense(DenseArray<T>),
    Axis(AxisArray<T>),
    /// Only the keys that survived the filter are present.
    Map(BTreeMap<Key, T>),
}

impl<T> Container<T> {
    pub fn get(&self, key: &[IndexValue]) -> Option<&T> {
        match self {
            Container::Scalar(value) if key.is_empty() => Some(value),
            Container::Scalar(_) => None,
            Container::Dense(array) => array.get(key),
            Container::Axis(array) => array.get(key),
            Container::Map(map) => map.get(key),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Container::Scalar(_) => 1,
            Container::Dense(array) => array.data.len(),
            Container::Axis(array) => array.data.len(),
            Container::Map(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        match self {
            Container::Scalar(value) => Box::new(std::iter::once(value)),
            Container::Dense(array) => Box::new(array.data.iter()),
            Container::Axis(array) => Box::new(array.data.iter()),
            Container::Map(map) => Box::new(map.values()),
        }
    }

    /// Every (key, element) pair in storage order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (Key, &T)> + '_> {
        match self {
            Container::Scalar(value) => Box::new(std::iter::once((Key::new(), value))),
            Container::Dense(array) => Box::new(
                array
                    .data
                    .iter()
                    .enumerate()
                    .map(|(off, value)| (array.key_at(off), value)),
            ),
            Container::Axis(array) => Box::new(
                array
                    .data
                    .iter()
                    .enumerate()
                    .map(|(off, value)| (array.key_at(off), value)),
            ),
            Container::Map(map) => Box::new(map.iter().map(|(key, value)| (key.clone(), value))),
        }
    }

    pub fn keys(&self) -> Vec<Key> {
        self.iter().map(|(key, _)| key).collect()
    }
}
