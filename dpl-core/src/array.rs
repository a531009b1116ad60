//! Row-major n-dimensional arrays
//!
//! `NdArray<T>` stores a shape and a flat data vector. A scalar has an
//! empty shape. Element-wise operations broadcast a scalar against any
//! array; other operands must have identical shapes.

use crate::error::{DplError, Result};
use serde_json::Value as JsonValue;
use std::fmt;

/// Slice component for one axis: either a single index or a numpy-like range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceSpec {
    Index(isize),
    Range {
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    },
}

impl SliceSpec {
    /// Full range of an axis (`:`)
    pub const FULL: SliceSpec = SliceSpec::Range { start: None, stop: None, step: None };

    /// Parse a comma separated slice expression such as `1`, `:2`, `1:,::2`
    pub fn parse_list(s: &str) -> Result<Vec<SliceSpec>> {
        s.split(',').map(|part| SliceSpec::parse(part.trim())).collect()
    }

    /// Parse one axis component
    pub fn parse(s: &str) -> Result<SliceSpec> {
        let bound = |part: &str| -> Result<Option<isize>> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(None);
            }
            part.parse::<isize>()
                .map(Some)
                .map_err(|_| DplError::parse_error("Invalid slice").with_arg(s))
        };
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [index] => match bound(index)? {
                Some(i) => Ok(SliceSpec::Index(i)),
                None => Err(DplError::parse_error("Invalid slice").with_arg(s)),
            },
            [start, stop] => Ok(SliceSpec::Range { start: bound(start)?, stop: bound(stop)?, step: None }),
            [start, stop, step] => Ok(SliceSpec::Range {
                start: bound(start)?,
                stop: bound(stop)?,
                step: bound(step)?,
            }),
            _ => Err(DplError::parse_error("Invalid slice").with_arg(s)),
        }
    }

    /// Resolve the selected indices along an axis of length `len`
    pub fn indices(&self, len: usize) -> Result<Vec<usize>> {
        let n = len as isize;
        match *self {
            SliceSpec::Index(i) => {
                let i = if i < 0 { i + n } else { i };
                if i < 0 || i >= n {
                    return Err(DplError::invalid_input("Index out of range").with_arg(i));
                }
                Ok(vec![i as usize])
            }
            SliceSpec::Range { start, stop, step } => {
                let step = step.unwrap_or(1);
                if step == 0 {
                    return Err(DplError::invalid_input("Slice step cannot be zero"));
                }
                let clamp = |v: isize, lo: isize, hi: isize| v.max(lo).min(hi);
                let norm = |v: isize| if v < 0 { v + n } else { v };
                let (start, stop) = if step > 0 {
                    (
                        start.map(|v| clamp(norm(v), 0, n)).unwrap_or(0),
                        stop.map(|v| clamp(norm(v), 0, n)).unwrap_or(n),
                    )
                } else {
                    (
                        start.map(|v| clamp(norm(v), -1, n - 1)).unwrap_or(n - 1),
                        stop.map(|v| clamp(norm(v), -1, n - 1)).unwrap_or(-1),
                    )
                };
                let mut out = Vec::new();
                let mut i = start;
                while (step > 0 && i < stop) || (step < 0 && i > stop) {
                    out.push(i as usize);
                    i += step;
                }
                Ok(out)
            }
        }
    }
}

/// N-dimensional array stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T: Clone> NdArray<T> {
    // ========== Construction ==========

    pub fn scalar(value: T) -> Self {
        NdArray { shape: Vec::new(), data: vec![value] }
    }

    /// One-dimensional array
    pub fn from_vec(data: Vec<T>) -> Self {
        NdArray { shape: vec![data.len()], data }
    }

    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let size: usize = shape.iter().product();
        if size != data.len() {
            return Err(DplError::invalid_input("Array shape does not match data length")
                .with_arg(format!("{:?}", shape))
                .with_arg(data.len()));
        }
        Ok(NdArray { shape, data })
    }

    /// Array of the given shape filled with one value
    pub fn full(shape: &[usize], value: T) -> Self {
        let size: usize = shape.iter().product();
        NdArray { shape: shape.to_vec(), data: vec![value; size] }
    }

    /// Build from nested JSON arrays, converting each leaf
    pub fn from_json(json: &JsonValue, leaf: impl Fn(&JsonValue) -> Result<T> + Copy) -> Result<Self> {
        let mut shape = Vec::new();
        let mut probe = json;
        while let JsonValue::Array(items) = probe {
            shape.push(items.len());
            match items.first() {
                Some(first) => probe = first,
                None => break,
            }
        }
        let mut data = Vec::new();
        collect_json(json, &shape, 0, leaf, &mut data)?;
        Ok(NdArray { shape, data })
    }

    // ========== Accessors ==========

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn as_scalar(&self) -> Option<&T> {
        if self.is_scalar() {
            self.data.first()
        } else {
            None
        }
    }

    /// First element, regardless of shape
    pub fn first(&self) -> Option<&T> {
        self.data.first()
    }

    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (&idx, &dim) in index.iter().zip(&self.shape) {
            if idx >= dim {
                return None;
            }
            flat = flat * dim + idx;
        }
        self.data.get(flat)
    }

    // ========== Element-wise ==========

    pub fn map<U: Clone>(&self, f: impl Fn(&T) -> U) -> NdArray<U> {
        NdArray { shape: self.shape.clone(), data: self.data.iter().map(f).collect() }
    }

    pub fn try_map<U: Clone>(&self, f: impl Fn(&T) -> Result<U>) -> Result<NdArray<U>> {
        let data = self.data.iter().map(f).collect::<Result<Vec<U>>>()?;
        Ok(NdArray { shape: self.shape.clone(), data })
    }

    /// Combine two arrays element-wise, broadcasting scalars
    pub fn zip_with<U: Clone, V: Clone>(
        &self,
        other: &NdArray<U>,
        f: impl Fn(&T, &U) -> V,
    ) -> Result<NdArray<V>> {
        if self.is_scalar() {
            let a = &self.data[0];
            return Ok(other.map(|b| f(a, b)));
        }
        if other.is_scalar() {
            let b = &other.data[0];
            return Ok(self.map(|a| f(a, b)));
        }
        if self.shape != other.shape {
            return Err(DplError::dimension_mismatch(
                format!("{:?}", self.shape),
                format!("{:?}", other.shape),
            )
            .with_note("Array shapes cannot be broadcast"));
        }
        let data = self.data.iter().zip(&other.data).map(|(a, b)| f(a, b)).collect();
        Ok(NdArray { shape: self.shape.clone(), data })
    }

    pub fn all(&self, f: impl Fn(&T) -> bool) -> bool {
        self.data.iter().all(f)
    }

    pub fn any(&self, f: impl Fn(&T) -> bool) -> bool {
        self.data.iter().any(f)
    }

    // ========== Slicing ==========

    /// Numpy-like slicing; index components drop their axis
    pub fn slice(&self, specs: &[SliceSpec]) -> Result<NdArray<T>> {
        if specs.len() > self.shape.len() {
            return Err(DplError::invalid_input("Too many indices for array")
                .with_arg(specs.len())
                .with_arg(self.shape.len()));
        }
        let mut axes: Vec<Vec<usize>> = Vec::with_capacity(self.shape.len());
        let mut shape = Vec::new();
        for (axis, &dim) in self.shape.iter().enumerate() {
            let spec = specs.get(axis).copied().unwrap_or(SliceSpec::FULL);
            let idx = spec.indices(dim)?;
            if !matches!(spec, SliceSpec::Index(_)) {
                shape.push(idx.len());
            }
            axes.push(idx);
        }
        let strides = self.strides();
        let mut data = Vec::new();
        let mut counter = vec![0usize; axes.len()];
        if axes.iter().all(|a| !a.is_empty()) {
            loop {
                let flat: usize = counter
                    .iter()
                    .enumerate()
                    .map(|(axis, &c)| axes[axis][c] * strides[axis])
                    .sum();
                data.push(self.data[flat].clone());
                // odometer increment, last axis fastest
                let mut axis = axes.len();
                loop {
                    if axis == 0 {
                        return Ok(NdArray { shape, data });
                    }
                    axis -= 1;
                    counter[axis] += 1;
                    if counter[axis] < axes[axis].len() {
                        break;
                    }
                    counter[axis] = 0;
                }
            }
        }
        Ok(NdArray { shape, data })
    }

    /// Sub-arrays along the first axis
    pub fn rows(&self) -> Vec<NdArray<T>> {
        if self.is_scalar() {
            return vec![self.clone()];
        }
        let inner: Vec<usize> = self.shape[1..].to_vec();
        let size: usize = inner.iter().product();
        (0..self.shape[0])
            .map(|i| NdArray {
                shape: inner.clone(),
                data: self.data[i * size..(i + 1) * size].to_vec(),
            })
            .collect()
    }

    /// Convert into nested JSON arrays
    pub fn to_json(&self, leaf: impl Fn(&T) -> JsonValue + Copy) -> JsonValue {
        fn build<T>(data: &[T], shape: &[usize], leaf: impl Fn(&T) -> JsonValue + Copy) -> JsonValue {
            match shape.split_first() {
                None => data.first().map(leaf).unwrap_or(JsonValue::Null),
                Some((&dim, rest)) => {
                    let size: usize = rest.iter().product();
                    JsonValue::Array(
                        (0..dim)
                            .map(|i| build(&data[i * size..(i + 1) * size], rest, leaf))
                            .collect(),
                    )
                }
            }
        }
        build(&self.data, &self.shape, leaf)
    }

    fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.shape.len()];
        for axis in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.shape[axis + 1];
        }
        strides
    }
}

fn collect_json<T>(
    json: &JsonValue,
    shape: &[usize],
    depth: usize,
    leaf: impl Fn(&JsonValue) -> Result<T> + Copy,
    out: &mut Vec<T>,
) -> Result<()> {
    match json {
        JsonValue::Array(items) => {
            if depth >= shape.len() || items.len() != shape[depth] {
                return Err(DplError::invalid_input("Array is not rectangular").with_arg(json));
            }
            for item in items {
                collect_json(item, shape, depth + 1, leaf, out)?;
            }
            Ok(())
        }
        other => {
            if depth != shape.len() {
                return Err(DplError::invalid_input("Array is not rectangular").with_arg(json));
            }
            out.push(leaf(other)?);
            Ok(())
        }
    }
}

impl<T: fmt::Display + Clone> fmt::Display for NdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_level<T: fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            data: &[T],
            shape: &[usize],
        ) -> fmt::Result {
            match shape.split_first() {
                None => match data.first() {
                    Some(v) => write!(f, "{}", v),
                    None => Ok(()),
                },
                Some((&dim, rest)) => {
                    let size: usize = rest.iter().product();
                    write!(f, "[")?;
                    for i in 0..dim {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write_level(f, &data[i * size..(i + 1) * size], rest)?;
                    }
                    write!(f, "]")
                }
            }
        }
        write_level(f, &self.data, &self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matrix() -> NdArray<i64> {
        NdArray::new(vec![3, 3], (1..=9).collect()).unwrap()
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(NdArray::new(vec![2, 2], vec![1, 2, 3]).is_err());
    }

    #[test]
    fn test_broadcast_scalar() {
        let a = NdArray::from_vec(vec![1.0, 2.0, 3.0]);
        let b = NdArray::scalar(2.0);
        let c = a.zip_with(&b, |x, y| x * y).unwrap();
        assert_eq!(c.data(), &[2.0, 4.0, 6.0]);
        let d = b.zip_with(&a, |x, y| x - y).unwrap();
        assert_eq!(d.data(), &[1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_incompatible_shapes() {
        let a = NdArray::from_vec(vec![1.0, 2.0]);
        let b = NdArray::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(a.zip_with(&b, |x, y| x + y).is_err());
    }

    #[test]
    fn test_slice_rows() {
        let m = matrix();
        let s = m.slice(&SliceSpec::parse_list(":2").unwrap()).unwrap();
        assert_eq!(s.shape(), &[2, 3]);
        assert_eq!(s.data(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_slice_column() {
        let m = matrix();
        let s = m.slice(&SliceSpec::parse_list(":,1").unwrap()).unwrap();
        assert_eq!(s.shape(), &[3]);
        assert_eq!(s.data(), &[2, 5, 8]);
    }

    #[test]
    fn test_slice_index_and_negative() {
        let m = matrix();
        let s = m.slice(&SliceSpec::parse_list("-1,0").unwrap()).unwrap();
        assert!(s.is_scalar());
        assert_eq!(s.as_scalar(), Some(&7));
        let r = NdArray::from_vec(vec![1, 2, 3, 4, 5]);
        let s = r.slice(&SliceSpec::parse_list("::-2").unwrap()).unwrap();
        assert_eq!(s.data(), &[5, 3, 1]);
    }

    #[test]
    fn test_from_json() {
        let arr = NdArray::from_json(&json!([[1, 2], [3, 4]]), |v| {
            v.as_i64().ok_or_else(|| DplError::invalid_input("not int"))
        })
        .unwrap();
        assert_eq!(arr.shape(), &[2, 2]);
        assert_eq!(arr.get(&[1, 0]), Some(&3));
        assert_eq!(arr.to_json(|v| json!(v)), json!([[1, 2], [3, 4]]));
    }

    #[test]
    fn test_from_json_ragged() {
        let res = NdArray::from_json(&json!([[1, 2], [3]]), |v| {
            v.as_i64().ok_or_else(|| DplError::invalid_input("not int"))
        });
        assert!(res.is_err());
    }

    #[test]
    fn test_rows_and_display() {
        let m = matrix();
        let rows = m.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].data(), &[4, 5, 6]);
        assert_eq!(rows[1].to_string(), "[4, 5, 6]");
        assert_eq!(NdArray::scalar(5).to_string(), "5");
    }
}
