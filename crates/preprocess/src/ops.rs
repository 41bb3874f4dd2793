//! Image operations behind the forward steps. Images are `f32` arrays in
//! height × width × channel order.

use common::span_debug;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use ndarray::{Array3, Array4, Axis, s};
use transform::{Padding, PipelineError, Result};

pub fn standardize(image: &mut Array3<f32>, max_value: f32) {
    image.mapv_inplace(|v| v / max_value);
}

/// Per-channel `(v - mean) / std`. A single-element `mean` or `std`
/// applies to every channel.
pub fn normalize(image: &mut Array3<f32>, mean: &[f32], std: &[f32]) -> Result<()> {
    let channels = image.dim().2;
    let mean = broadcast("mean", mean, channels)?;
    let std = broadcast("std", std, channels)?;

    for (c, mut plane) in image.axis_iter_mut(Axis(2)).enumerate() {
        let (m, s) = (mean[c], std[c]);
        plane.mapv_inplace(|v| (v - m) / s);
    }
    Ok(())
}

fn broadcast(name: &str, values: &[f32], channels: usize) -> Result<Vec<f32>> {
    match values.len() {
        1 => Ok(vec![values[0]; channels]),
        n if n == channels => Ok(values.to_vec()),
        n => Err(PipelineError::configuration(format!(
            "Normalize {} has {} values for a {}-channel image",
            name, n, channels
        ))),
    }
}

/// Bilinear resize to `width` × `height`, one channel plane at a time.
pub fn resize(image: &Array3<f32>, width: u32, height: u32) -> Result<Array3<f32>> {
    let _s = span_debug!("resize");

    let (src_height, src_width, channels) = image.dim();
    let mut output = Array3::<f32>::zeros((height as usize, width as usize, channels));

    let mut resizer = Resizer::new();
    let options =
        ResizeOptions::new().resize_alg(ResizeAlg::Interpolation(FilterType::Bilinear));

    for c in 0..channels {
        let mut src = Image::new(src_width as u32, src_height as u32, PixelType::F32);
        for (bytes, value) in src
            .buffer_mut()
            .chunks_exact_mut(4)
            .zip(image.index_axis(Axis(2), c).iter())
        {
            bytes.copy_from_slice(&value.to_ne_bytes());
        }

        let mut dst = Image::new(width, height, PixelType::F32);
        resizer
            .resize(&src, &mut dst, &options)
            .map_err(|e| PipelineError::Resize(e.to_string()))?;

        for (value, bytes) in output
            .index_axis_mut(Axis(2), c)
            .iter_mut()
            .zip(dst.buffer().chunks_exact(4))
        {
            *value = f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
    }

    Ok(output)
}

/// Surround the image with a constant border.
pub fn pad(image: &Array3<f32>, padding: Padding, value: f32) -> Array3<f32> {
    let (height, width, channels) = image.dim();
    let mut output = Array3::from_elem(
        (
            padding.top + height + padding.bottom,
            padding.left + width + padding.right,
            channels,
        ),
        value,
    );

    output
        .slice_mut(s![
            padding.top..padding.top + height,
            padding.left..padding.left + width,
            ..
        ])
        .assign(image);
    output
}

/// Convert to a contiguous `[1, C, H, W]` blob, swapping the first and third
/// channel when there are at least three.
pub fn to_blob(image: Array3<f32>) -> Array4<f32> {
    let channels = image.dim().2;
    let mut order: Vec<usize> = (0..channels).collect();
    if channels >= 3 {
        order.swap(0, 2);
    }

    image
        .permuted_axes([2, 0, 1])
        .select(Axis(0), &order)
        .as_standard_layout()
        .into_owned()
        .insert_axis(Axis(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn gradient(height: usize, width: usize, channels: usize) -> Array3<f32> {
        Array::from_shape_fn((height, width, channels), |(y, x, c)| {
            (y * 100 + x * 10 + c) as f32
        })
    }

    #[test]
    fn test_standardize_divides_every_value() {
        let mut image = Array3::from_elem((2, 2, 3), 255.0);
        standardize(&mut image, 255.0);
        assert!(image.iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_normalize_per_channel() {
        let mut image = Array3::from_elem((1, 2, 3), 1.0);
        normalize(&mut image, &[0.5, 0.0, 1.0], &[0.25, 2.0, 1.0]).unwrap();

        assert_eq!(image[[0, 1, 0]], 2.0);
        assert_eq!(image[[0, 1, 1]], 0.5);
        assert_eq!(image[[0, 1, 2]], 0.0);
    }

    #[test]
    fn test_normalize_broadcasts_single_values() {
        let mut image = Array3::from_elem((2, 2, 3), 3.0);
        normalize(&mut image, &[1.0], &[2.0]).unwrap();
        assert!(image.iter().all(|v| *v == 1.0));
    }

    #[test]
    fn test_normalize_rejects_channel_mismatch() {
        let mut image = Array3::zeros((2, 2, 3));
        let result = normalize(&mut image, &[0.1, 0.2], &[1.0]);
        assert!(
            matches!(result, Err(PipelineError::Configuration(ref msg)) if msg.contains("2 values for a 3-channel")),
            "Got {:?}",
            result
        );
    }

    #[test]
    fn test_resize_output_dimensions() {
        let image = gradient(50, 100, 3);
        let resized = resize(&image, 40, 30).unwrap();
        assert_eq!(resized.dim(), (30, 40, 3));
    }

    #[test]
    fn test_resize_preserves_constant_planes() {
        let mut image = Array3::zeros((20, 10, 3));
        image.index_axis_mut(Axis(2), 0).fill(10.0);
        image.index_axis_mut(Axis(2), 1).fill(-0.5);
        image.index_axis_mut(Axis(2), 2).fill(255.0);

        let resized = resize(&image, 37, 41).unwrap();
        for (c, expected) in [10.0f32, -0.5, 255.0].into_iter().enumerate() {
            for v in resized.index_axis(Axis(2), c).iter() {
                assert!(
                    (v - expected).abs() < 1e-3,
                    "Channel {} should stay {} (got {})",
                    c,
                    expected,
                    v
                );
            }
        }
    }

    #[test]
    fn test_pad_places_image_at_offset() {
        let image = gradient(2, 3, 1);
        let padding = Padding {
            top: 1,
            bottom: 2,
            left: 3,
            right: 4,
        };
        let padded = pad(&image, padding, 114.0);

        assert_eq!(padded.dim(), (5, 10, 1));
        assert_eq!(padded[[0, 0, 0]], 114.0);
        assert_eq!(padded[[1, 3, 0]], image[[0, 0, 0]]);
        assert_eq!(padded[[2, 5, 0]], image[[1, 2, 0]]);
        assert_eq!(padded[[2, 6, 0]], 114.0);
        assert_eq!(padded[[3, 3, 0]], 114.0);
    }

    #[test]
    fn test_to_blob_is_channel_first_with_swapped_red_blue() {
        let mut image = Array3::zeros((2, 3, 3));
        image[[1, 2, 0]] = 10.0;
        image[[1, 2, 1]] = 20.0;
        image[[1, 2, 2]] = 30.0;

        let blob = to_blob(image);
        assert_eq!(blob.shape(), &[1, 3, 2, 3]);
        assert!(blob.is_standard_layout());
        assert_eq!(blob[[0, 0, 1, 2]], 30.0);
        assert_eq!(blob[[0, 1, 1, 2]], 20.0);
        assert_eq!(blob[[0, 2, 1, 2]], 10.0);
    }

    #[test]
    fn test_to_blob_single_channel_is_not_swapped() {
        let image = gradient(2, 2, 1);
        let blob = to_blob(image.clone());
        assert_eq!(blob.shape(), &[1, 1, 2, 2]);
        assert_eq!(blob[[0, 0, 1, 1]], image[[1, 1, 0]]);
    }

    #[test]
    fn test_to_blob_four_channels_keeps_alpha() {
        let image = gradient(1, 1, 4);
        let blob = to_blob(image);
        let channels: Vec<f32> = blob.iter().copied().collect();
        assert_eq!(channels, vec![2.0, 1.0, 0.0, 3.0]);
    }
}
