//! Tensor preparation and alpha matte handling for U2-Net style models.
//!
//! Input images are stretched to a square of the model's input size, scaled
//! by their brightest channel value and normalised with ImageNet statistics.
//! The prediction is min-max normalised into an 8-bit mask, resized back to
//! the source dimensions and used as the alpha channel of the cutout.

use crate::{Error, Result};
use image::{
    GrayImage, ImageError, ImageFormat, ImageReader, Limits, RgbImage, RgbaImage,
    error::LimitErrorKind, imageops::FilterType,
};
use ndarray::{Array4, ArrayViewD, Axis};
use std::io::Cursor;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decodes the model input, allocating at most `max_alloc` bytes.
///
/// Decoder memory exhaustion is [`Error::OutOfMemory`]; any other failure is
/// a model error carrying the decoder's message.
pub fn decode_rgb(bytes: &[u8], max_alloc: u64) -> Result<RgbImage> {
    let mut limits = Limits::default();
    limits.max_alloc = Some(max_alloc);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::model(format!("cannot read image: {}", e)))?;
    reader.limits(limits);

    match reader.decode() {
        Ok(decoded) => Ok(decoded.to_rgb8()),
        Err(ImageError::Limits(limit))
            if matches!(limit.kind(), LimitErrorKind::InsufficientMemory) =>
        {
            Err(Error::OutOfMemory)
        }
        Err(e) => Err(Error::model(format!("cannot decode image: {}", e))),
    }
}

/// Builds the `1 x 3 x size x size` input tensor for `image`.
pub fn prepare_input(image: &RgbImage, size: u32) -> Array4<f32> {
    let resized = image::imageops::resize(image, size, size, FilterType::Lanczos3);

    let max_value = resized
        .as_raw()
        .iter()
        .copied()
        .max()
        .map_or(0.0, f32::from)
        .max(1e-6);

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for (channel, value) in pixel.0.iter().enumerate() {
            let scaled = f32::from(*value) / max_value;
            tensor[[0, channel, y as usize, x as usize]] = (scaled - MEAN[channel]) / STD[channel];
        }
    }
    tensor
}

/// Turns a raw `1 x 1 x H x W` prediction into a mask of `width x height`.
pub fn prediction_to_mask(prediction: ArrayViewD<'_, f32>, width: u32, height: u32) -> Result<GrayImage> {
    if prediction.ndim() != 4 {
        return Err(Error::model(format!(
            "expected 4D output tensor, got {}D",
            prediction.ndim()
        )));
    }

    let plane = prediction.index_axis(Axis(0), 0);
    let plane = plane.index_axis(Axis(0), 0);
    let (rows, cols) = (plane.shape()[0], plane.shape()[1]);
    if rows == 0 || cols == 0 {
        return Err(Error::EmptyOutput);
    }

    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    // Row-major iteration matches the image buffer layout
    let pixels: Vec<u8> = plane
        .iter()
        .map(|&v| {
            let normalized = if range > f32::EPSILON { (v - min) / range } else { 0.0 };
            (normalized * 255.0).round().clamp(0.0, 255.0) as u8
        })
        .collect();

    let mask = GrayImage::from_raw(cols as u32, rows as u32, pixels)
        .ok_or_else(|| Error::model("prediction does not fit mask buffer"))?;

    if mask.dimensions() == (width, height) {
        return Ok(mask);
    }
    Ok(image::imageops::resize(&mask, width, height, FilterType::Lanczos3))
}

/// Combines the source pixels with `mask` as their alpha channel.
pub fn cutout(image: &RgbImage, mask: &GrayImage) -> Result<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(Error::model(format!(
            "mask is {:?} but image is {:?}",
            mask.dimensions(),
            image.dimensions()
        )));
    }

    let mut output = RgbaImage::new(image.width(), image.height());
    for ((src, alpha), dst) in image.pixels().zip(mask.pixels()).zip(output.pixels_mut()) {
        dst.0 = [src.0[0], src.0[1], src.0[2], alpha.0[0]];
    }
    Ok(output)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
