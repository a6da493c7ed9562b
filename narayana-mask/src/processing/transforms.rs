//! Deterministic tensor transforms producing model input

use crate::error::MaskError;
use crate::tensor::Tensor;
use ndarray::{Array3, Axis, Ix3, IxDyn, Slice};
use tracing::debug;

/// Edge length of a square center crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropSize {
    /// `min(height, width)` of the incoming tensor
    ShortSide,
    Fixed(usize),
}

/// A single pure transform stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Reorder axes, e.g. `[2, 0, 1]` for HWC -> CHW
    Permute(Vec<usize>),
    /// Element-wise division
    Scale(f32),
    /// Square crop centered in the frame, on a `[C, H, W]` tensor
    CenterCrop(CropSize),
    /// Bilinear resample of a `[C, H, W]` tensor
    Resize { height: usize, width: usize },
    /// Insert a dimension of size 1
    Unsqueeze(usize),
}

impl Transform {
    pub fn apply(&self, input: &Tensor<f32>) -> Result<Tensor<f32>, MaskError> {
        match self {
            Transform::Permute(axes) => permute(input, axes),
            Transform::Scale(divisor) => scale(input, *divisor),
            Transform::CenterCrop(CropSize::ShortSide) => {
                input.expect_rank(3, "center crop")?;
                let size = input.shape()[1].min(input.shape()[2]);
                center_crop(input, size)
            }
            Transform::CenterCrop(CropSize::Fixed(size)) => center_crop(input, *size),
            Transform::Resize { height, width } => resize(input, *height, *width),
            Transform::Unsqueeze(axis) => unsqueeze(input, *axis),
        }
    }
}

/// Ordered sequence of transforms.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformPipeline {
    stages: Vec<Transform>,
}

impl TransformPipeline {
    /// Create a new pipeline applying `stages` in order.
    pub fn new(stages: Vec<Transform>) -> Self {
        Self { stages }
    }

    /// Permute HWC -> CHW, center crop to the short side, resize to
    /// `input_size` x `input_size` and add the batch dimension.
    ///
    /// There is no scale stage: frames are already in `[0, 1]` after encoding.
    pub fn standard(input_size: usize) -> Self {
        Self::new(vec![
            Transform::Permute(vec![2, 0, 1]),
            Transform::CenterCrop(CropSize::ShortSide),
            Transform::Resize {
                height: input_size,
                width: input_size,
            },
            Transform::Unsqueeze(0),
        ])
    }

    pub fn stages(&self) -> &[Transform] {
        &self.stages
    }

    pub fn apply(&self, input: &Tensor<f32>) -> Result<Tensor<f32>, MaskError> {
        let mut current = input.clone();
        for stage in &self.stages {
            current = stage.apply(&current)?;
            debug!("{:?} -> {:?}", stage, current.shape());
        }
        Ok(current)
    }
}

/// Reorder axes. `axes[i]` names the input axis that becomes output axis `i`.
pub fn permute(input: &Tensor<f32>, axes: &[usize]) -> Result<Tensor<f32>, MaskError> {
    if axes.len() != input.rank() {
        return Err(MaskError::Shape(format!(
            "permutation {:?} does not match shape {:?}",
            axes,
            input.shape()
        )));
    }
    let mut seen = vec![false; axes.len()];
    for &axis in axes {
        if axis >= axes.len() || seen[axis] {
            return Err(MaskError::Shape(format!("invalid permutation {:?}", axes)));
        }
        seen[axis] = true;
    }

    let permuted = input.as_array().view().permuted_axes(IxDyn(axes));
    Ok(Tensor::from_array(permuted.as_standard_layout().into_owned()))
}

/// Divide every element by `divisor`, which must be finite and non-zero.
pub fn scale(input: &Tensor<f32>, divisor: f32) -> Result<Tensor<f32>, MaskError> {
    if divisor == 0.0 || !divisor.is_finite() {
        return Err(MaskError::Shape(format!("invalid scale divisor {}", divisor)));
    }
    Ok(Tensor::from_array(input.as_array().mapv(|v| v / divisor)))
}

/// Crop a `size` x `size` square from the center of a `[C, H, W]` tensor.
pub fn center_crop(input: &Tensor<f32>, size: usize) -> Result<Tensor<f32>, MaskError> {
    input.expect_rank(3, "center crop")?;
    let (height, width) = (input.shape()[1], input.shape()[2]);
    if size == 0 || size > height || size > width {
        return Err(MaskError::InvalidCrop(format!(
            "crop size {} does not fit {}x{} frame",
            size, width, height
        )));
    }

    let top = (height - size) / 2;
    let left = (width - size) / 2;
    let cropped = input
        .as_array()
        .slice_axis(Axis(1), Slice::from(top..top + size))
        .slice_axis(Axis(2), Slice::from(left..left + size))
        .to_owned();
    Ok(Tensor::from_array(cropped))
}

/// Bilinear resize of a `[C, H, W]` tensor using half-pixel centers and no
/// antialiasing.
pub fn resize(input: &Tensor<f32>, height: usize, width: usize) -> Result<Tensor<f32>, MaskError> {
    input.expect_rank(3, "resize")?;
    let (channels, in_h, in_w) = (input.shape()[0], input.shape()[1], input.shape()[2]);
    if in_h == 0 || in_w == 0 {
        return Err(MaskError::Shape(format!(
            "cannot resize tensor without spatial extent {:?}",
            input.shape()
        )));
    }
    if height == 0 || width == 0 {
        return Err(MaskError::Shape(format!(
            "resize target must be non-zero, got {}x{}",
            width, height
        )));
    }

    let rows = sample_points(in_h, height);
    let cols = sample_points(in_w, width);
    let src = input.as_array().view().into_dimensionality::<Ix3>()?;

    let mut out = Array3::<f32>::zeros((channels, height, width));
    for c in 0..channels {
        for (y, &(y0, y1, fy)) in rows.iter().enumerate() {
            for (x, &(x0, x1, fx)) in cols.iter().enumerate() {
                let top = src[[c, y0, x0]] * (1.0 - fx) + src[[c, y0, x1]] * fx;
                let bottom = src[[c, y1, x0]] * (1.0 - fx) + src[[c, y1, x1]] * fx;
                out[[c, y, x]] = top * (1.0 - fy) + bottom * fy;
            }
        }
    }
    Ok(Tensor::from_array(out.into_dyn()))
}

/// Source neighbours and interpolation weight for every output coordinate.
fn sample_points(in_len: usize, out_len: usize) -> Vec<(usize, usize, f32)> {
    let ratio = in_len as f32 / out_len as f32;
    (0..out_len)
        .map(|i| {
            let src = ((i as f32 + 0.5) * ratio - 0.5).max(0.0);
            let lo = (src.floor() as usize).min(in_len - 1);
            let hi = (lo + 1).min(in_len - 1);
            (lo, hi, src - lo as f32)
        })
        .collect()
}

/// Insert a unit axis at `axis`.
pub fn unsqueeze(input: &Tensor<f32>, axis: usize) -> Result<Tensor<f32>, MaskError> {
    if axis > input.rank() {
        return Err(MaskError::Shape(format!(
            "cannot insert axis {} into shape {:?}",
            axis,
            input.shape()
        )));
    }
    Ok(Tensor::from_array(input.as_array().clone().insert_axis(Axis(axis))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(shape: &[usize]) -> Tensor<f32> {
        let len: usize = shape.iter().product();
        Tensor::from_shape_vec(shape, (0..len).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn test_permute_hwc_to_chw() {
        // 1x2 image, pixels (0,1,2) and (3,4,5)
        let input = ramp(&[1, 2, 3]);
        let output = permute(&input, &[2, 0, 1]).unwrap();
        assert_eq!(output.shape(), &[3, 1, 2]);
        assert_eq!(output.to_vec(), vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_permute_invalid_axes() {
        let input = ramp(&[1, 2, 3]);
        assert!(permute(&input, &[0, 1]).is_err());
        assert!(permute(&input, &[0, 0, 1]).is_err());
        assert!(permute(&input, &[0, 1, 3]).is_err());
    }

    #[test]
    fn test_center_crop_picks_middle() {
        let input = ramp(&[1, 2, 4]);
        let output = center_crop(&input, 2).unwrap();
        assert_eq!(output.shape(), &[1, 2, 2]);
        assert_eq!(output.to_vec(), vec![1.0, 2.0, 5.0, 6.0]);
    }

    #[test]
    fn test_center_crop_invalid() {
        let input = ramp(&[3, 4, 6]);
        assert!(matches!(center_crop(&input, 0), Err(MaskError::InvalidCrop(_))));
        assert!(matches!(center_crop(&input, 5), Err(MaskError::InvalidCrop(_))));
        assert!(matches!(center_crop(&ramp(&[4, 6]), 2), Err(MaskError::Shape(_))));
    }

    #[test]
    fn test_resize_identity() {
        let input = ramp(&[2, 3, 3]);
        let output = resize(&input, 3, 3).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_resize_constant_stays_constant() {
        let input = Tensor::full(&[3, 7, 5], 0.25f32);
        let output = resize(&input, 4, 9).unwrap();
        assert_eq!(output.shape(), &[3, 4, 9]);
        assert!(output.to_vec().iter().all(|v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_resize_downscale_averages() {
        let input = Tensor::from_shape_vec(&[1, 1, 2], vec![0.0, 1.0]).unwrap();
        let output = resize(&input, 1, 1).unwrap();
        assert!((output.to_vec()[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_unsqueeze_batch() {
        let input = ramp(&[3, 2, 2]);
        let output = unsqueeze(&input, 0).unwrap();
        assert_eq!(output.shape(), &[1, 3, 2, 2]);
        assert_eq!(output.to_vec(), input.to_vec());
        assert!(unsqueeze(&input, 4).is_err());
    }

    #[test]
    fn test_scale() {
        let input = Tensor::full(&[2], 255.0f32);
        assert_eq!(scale(&input, 255.0).unwrap().to_vec(), vec![1.0, 1.0]);
        assert!(scale(&input, 0.0).is_err());
    }

    #[test]
    fn test_standard_pipeline_has_no_scale_stage() {
        let pipeline = TransformPipeline::standard(224);
        assert!(!pipeline
            .stages()
            .iter()
            .any(|stage| matches!(stage, Transform::Scale(_))));
        assert_eq!(pipeline.stages().len(), 4);
    }

    #[test]
    fn test_standard_pipeline_output_shape() {
        let pipeline = TransformPipeline::standard(8);
        let output = pipeline.apply(&Tensor::<f32>::zeros(&[12, 20, 3])).unwrap();
        assert_eq!(output.shape(), &[1, 3, 8, 8]);
    }
}
