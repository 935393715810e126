use crate::error::{Error, Result};
use std::fmt;

/// Scalar types an `NdArray` can hold.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + fmt::Display + fmt::LowerExp + Send + 'static {
    /// numpy name of the element type
    const DTYPE: &'static str;
    const IS_FLOAT: bool;

    fn to_f64(self) -> f64;
}

impl Element for f64 {
    const DTYPE: &'static str = "float64";
    const IS_FLOAT: bool = true;

    fn to_f64(self) -> f64 {
        self
    }
}

impl Element for f32 {
    const DTYPE: &'static str = "float32";
    const IS_FLOAT: bool = true;

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Element for u8 {
    const DTYPE: &'static str = "uint8";
    const IS_FLOAT: bool = false;

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Element for u16 {
    const DTYPE: &'static str = "uint16";
    const IS_FLOAT: bool = false;

    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Row-major n-dimensional array with a fixed shape.
///
/// Two dimensional arrays are matrices; three dimensional arrays are read as
/// `(rows, cols, channels)` images by the background subtractor.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T: Element> NdArray<T> {
    pub fn from_shape_vec(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let len: usize = shape.iter().product();
        if shape.is_empty() || len != data.len() {
            return Err(Error::ShapeMismatch { shape, len: data.len() });
        }
        Ok(NdArray { shape, data })
    }

    /// Builds a matrix from nested rows, like `numpy.array([[1., 2.], [3., 4.]])`.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Self> {
        let ncols = rows.first().map(|row| row.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * ncols);

        for (idx, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != ncols {
                return Err(Error::RaggedRows { row: idx, expected: ncols, found: row.len() });
            }
            data.extend_from_slice(row);
        }

        Ok(NdArray { shape: vec![rows.len(), ncols], data })
    }

    /// Caller guarantees `data.len()` matches `shape`.
    pub(crate) fn from_parts(shape: Vec<usize>, data: Vec<T>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        NdArray { shape, data }
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        NdArray { shape: vec![data.len()], data }
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        NdArray { shape, data: vec![T::default(); len] }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
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

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }

        let mut offset = 0;
        for (&idx, &dim) in index.iter().zip(&self.shape) {
            if idx >= dim {
                return None;
            }
            offset = offset * dim + idx;
        }
        Some(offset)
    }

    pub fn get(&self, index: &[usize]) -> Option<&T> {
        self.offset(index).map(|offset| &self.data[offset])
    }

    pub fn mapv<U: Element, F: Fn(T) -> U>(&self, f: F) -> NdArray<U> {
        NdArray {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&e| f(e)).collect(),
        }
    }

    /// `(rows, cols, channels)` when the array is read as an image.
    pub fn image_shape(&self) -> Result<(usize, usize, usize)> {
        match *self.shape.as_slice() {
            [rows, cols] => Ok((rows, cols, 1)),
            [rows, cols, channels] => Ok((rows, cols, channels)),
            _ => Err(Error::UnsupportedDims(self.ndim())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_builds_row_major_matrix() {
        let a = NdArray::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(a.shape(), &[2, 3]);
        assert_eq!(a.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(a.get(&[1, 0]), Some(&4.0));
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let rows: Vec<Vec<f64>> = vec![vec![1.0, 2.0], vec![3.0]];
        match NdArray::from_rows(&rows) {
            Err(Error::RaggedRows { row, expected, found }) => {
                assert_eq!((row, expected, found), (1, 2, 1));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn from_shape_vec_checks_length() {
        assert!(NdArray::from_shape_vec(vec![2, 2], vec![1u8, 2, 3]).is_err());
        assert!(NdArray::<u8>::from_shape_vec(vec![], vec![]).is_err());
        let a = NdArray::from_shape_vec(vec![1, 2, 2], vec![1u8, 2, 3, 4]).unwrap();
        assert_eq!(a.get(&[0, 1, 0]), Some(&3));
        assert_eq!(a.get(&[0, 2, 0]), None);
        assert_eq!(a.image_shape().unwrap(), (1, 2, 2));
    }

    #[test]
    fn one_dimensional_arrays_are_not_images() {
        let a = NdArray::from_vec(vec![1.0, 2.0]);
        assert!(a.image_shape().is_err());
    }
}
