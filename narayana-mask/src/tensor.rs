//! Immutable n-dimensional tensors backed by `ndarray`

use crate::error::MaskError;
use ndarray::{ArrayD, Axis, IxDyn};

/// Immutable tensor with an explicit shape.
///
/// The backing array is always kept in standard (row-major) layout, so two
/// tensors produced by the same computation compare equal element for element
/// and `to_vec` yields data in logical order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    data: ArrayD<T>,
}

impl<T: Clone> Tensor<T> {
    /// Build a tensor from a shape and row-major data.
    pub fn from_shape_vec(shape: &[usize], data: Vec<T>) -> Result<Self, MaskError> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| MaskError::Shape(format!("shape {:?} would overflow", shape)))?;
        if expected != data.len() {
            return Err(MaskError::Shape(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        let array = ArrayD::from_shape_vec(IxDyn(shape), data)?;
        Ok(Self { data: array })
    }

    /// Wrap an array, copying its elements into a fresh standard-layout buffer.
    ///
    /// An owned array can be a window into a larger allocation (for example
    /// after `index_axis_move`), so the buffer is always rebuilt to hold
    /// exactly the tensor's elements.
    pub fn from_array(array: ArrayD<T>) -> Self {
        Self {
            data: array.as_standard_layout().into_owned(),
        }
    }

    /// Tensor of the given shape with every element set to `value`.
    pub fn full(shape: &[usize], value: T) -> Self {
        Self {
            data: ArrayD::from_elem(IxDyn(shape), value),
        }
    }

    /// Dimension sizes, outermost first.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the backing array.
    pub fn as_array(&self) -> &ArrayD<T> {
        &self.data
    }

    /// Consume the tensor, returning the backing array.
    pub fn into_array(self) -> ArrayD<T> {
        self.data
    }

    /// Elements in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }

    /// Consume the tensor, returning its elements in row-major order.
    pub fn into_vec(self) -> Vec<T> {
        // every constructor leaves a tight standard-layout buffer
        self.data.into_raw_vec()
    }

    /// Fail with a shape error unless the tensor has `rank` dimensions.
    pub fn expect_rank(&self, rank: usize, what: &str) -> Result<(), MaskError> {
        if self.rank() != rank {
            return Err(MaskError::Shape(format!(
                "{} expects rank {}, got shape {:?}",
                what,
                rank,
                self.shape()
            )));
        }
        Ok(())
    }
}

impl<T: Clone + Default> Tensor<T> {
    /// Create a new tensor filled with `T::default()`.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, T::default())
    }
}

/// Split a raw model output into single-mask channel tensors of shape `[1, H, W]`.
///
/// Accepted layouts: `[1, N, H, W]` (batched), `[N, H, W]` and `[H, W]`.
pub fn split_channels(output: Tensor<f32>) -> Result<Vec<Tensor<f32>>, MaskError> {
    let array = match output.rank() {
        4 => {
            if output.shape()[0] != 1 {
                return Err(MaskError::Shape(format!(
                    "batched output must have batch size 1, got shape {:?}",
                    output.shape()
                )));
            }
            output.into_array().index_axis_move(Axis(0), 0)
        }
        3 => output.into_array(),
        2 => output.into_array().insert_axis(Axis(0)),
        _ => {
            return Err(MaskError::Shape(format!(
                "model output must have rank 2, 3 or 4, got shape {:?}",
                output.shape()
            )))
        }
    };

    Ok(array
        .axis_iter(Axis(0))
        .map(|channel| Tensor::from_array(channel.to_owned().insert_axis(Axis(0))))
        .collect())
}
