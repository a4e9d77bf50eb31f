// Tile to wire format, using the `image` crate - no C dependencies

use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder, RgbaImage};
use thiserror::Error;

use crate::tile::{Tile, BYTES_PER_PIXEL};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Tile buffer holds {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },
    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

fn check_buffer(tile: &Tile) -> Result<usize, EncodeError> {
    let edge = tile.size() as usize;
    let expected = edge * edge * BYTES_PER_PIXEL;
    let actual = tile.as_raw().len();
    if expected != actual {
        return Err(EncodeError::BufferMismatch { expected, actual });
    }
    Ok(expected)
}

/// Copy the tile into an `RgbaImage` for further processing.
pub fn to_image(tile: &Tile) -> Result<RgbaImage, EncodeError> {
    let expected = check_buffer(tile)?;
    let size = tile.size();
    RgbaImage::from_raw(size, size, tile.as_raw().to_vec()).ok_or(EncodeError::BufferMismatch {
        expected,
        actual: tile.as_raw().len(),
    })
}

/// Encode the tile as PNG
pub fn encode_png(tile: &Tile) -> Result<Vec<u8>, EncodeError> {
    check_buffer(tile)?;

    let mut out = Vec::with_capacity(tile.as_raw().len() / 4);
    PngEncoder::new(&mut out).write_image(
        tile.as_raw(),
        tile.size(),
        tile.size(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(out)
}
