use crate::Result;
use image::{ImageFormat, ImageReader, imageops::FilterType};
use std::io::Cursor;
use tracing::{info, warn};

/// Shrinks `bytes` so neither side exceeds `max_dimension`.
///
/// Returns `Ok(None)` when the image already fits, otherwise the downscaled
/// image re-encoded as PNG. Aspect ratio is preserved.
pub fn downscale_to_fit(bytes: &[u8], max_dimension: u32) -> Result<Option<Vec<u8>>> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;

    if width <= max_dimension && height <= max_dimension {
        return Ok(None);
    }

    info!(
        "Resizing image from {}x{} to fit {}px",
        width, height, max_dimension
    );

    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    let resized = image.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    drop(image);

    let mut buffer = Cursor::new(Vec::new());
    resized.write_to(&mut buffer, ImageFormat::Png)?;
    let png = buffer.into_inner();

    info!(
        "Resized image to {}x{}: {} bytes",
        resized.width(),
        resized.height(),
        png.len()
    );
    Ok(Some(png))
}

/// Best-effort variant of [`downscale_to_fit`]: any failure keeps the
/// original bytes.
pub fn downscale_or_original(bytes: Vec<u8>, max_dimension: u32) -> Vec<u8> {
    match downscale_to_fit(&bytes, max_dimension) {
        Ok(Some(resized)) => resized,
        Ok(None) => bytes,
        Err(e) => {
            warn!("Resize warning: {}, using original image", e);
            bytes
        }
    }
}
