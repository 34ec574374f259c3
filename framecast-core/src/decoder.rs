//! Frame decoding contract and the built-in decoders.
//!
//! A [`FrameDecoder`] turns the compressed image bytes carried in a
//! `frame` message (after base64 decoding) into a display-ready
//! [`DecodedImage`]. The session never interprets pixel data itself, so
//! alternative codecs plug in by implementing the trait.
//!
//! - [`ImageFrameDecoder`]: standard compressed images (JPEG, PNG).
//! - [`ZstdFrameDecoder`]: the raw zstd format below.
//!
//! ## Raw zstd format
//!
//! ```text
//! ┌──────────────┬───────────────┬──────────────────────────────┐
//! │ width (u32)  │ height (u32)  │ zstd(BGRA8 rows, tightly     │
//! │ little-endian│ little-endian │ packed, width*height*4 bytes)│
//! └──────────────┴───────────────┴──────────────────────────────┘
//! ```
//!
//! Both decoders reject images wider or taller than [`MAX_DIMENSION`]
//! before allocating pixel memory.

use std::io::{Cursor, Read};

use image::{ImageReader, Limits};

use crate::error::DecodeError;

/// Size of the width/height prefix.
pub const IMAGE_HEADER_SIZE: usize = 8;

/// Bytes per BGRA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Largest accepted width or height, in pixels.
pub const MAX_DIMENSION: u32 = 8192;

// ── DecodedImage ─────────────────────────────────────────────────

/// A decompressed image ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Tightly packed BGRA8 rows (`width * height * 4` bytes).
    pub data: Vec<u8>,
}

impl DecodedImage {
    /// Expected buffer length for the given dimensions.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }
}

// ── FrameDecoder ─────────────────────────────────────────────────

/// Converts compressed image bytes into a pixel buffer.
pub trait FrameDecoder: Send {
    /// Decode one image. Failures are reported, never panicked on.
    fn decode(&mut self, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;
}

impl<F> FrameDecoder for F
where
    F: FnMut(&[u8]) -> Result<DecodedImage, DecodeError> + Send,
{
    fn decode(&mut self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        self(bytes)
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyDimensions { width, height });
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(DecodeError::TooLarge {
            width,
            height,
            max: MAX_DIMENSION,
        });
    }
    Ok(())
}

// ── ImageFrameDecoder ────────────────────────────────────────────

/// Decodes JPEG or PNG payloads, sniffing the format from the bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFrameDecoder;

impl ImageFrameDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for ImageFrameDecoder {
    fn decode(&mut self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::Image(e.to_string()))?;

        let mut limits = Limits::default();
        limits.max_image_width = Some(MAX_DIMENSION);
        limits.max_image_height = Some(MAX_DIMENSION);
        reader.limits(limits);

        let rgba = reader
            .decode()
            .map_err(|e| DecodeError::Image(e.to_string()))?
            .into_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        check_dimensions(width, height)?;

        let mut data = rgba.into_raw();
        for pixel in data.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.swap(0, 2);
        }

        Ok(DecodedImage {
            width,
            height,
            data,
        })
    }
}

// ── ZstdFrameDecoder ─────────────────────────────────────────────

/// Stateless decoder for the raw zstd image format.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZstdFrameDecoder;

impl ZstdFrameDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for ZstdFrameDecoder {
    fn decode(&mut self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        let (width, height) = read_header(bytes)?;
        check_dimensions(width, height)?;
        let expected = DecodedImage::byte_len(width, height);

        // Inflate at most one byte past the expected size.
        let mut data = Vec::new();
        zstd::stream::read::Decoder::new(&bytes[IMAGE_HEADER_SIZE..])
            .and_then(|decoder| decoder.take(expected as u64 + 1).read_to_end(&mut data))
            .map_err(|e| DecodeError::Decompress(e.to_string()))?;

        if data.len() != expected {
            return Err(DecodeError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(DecodedImage {
            width,
            height,
            data,
        })
    }
}

fn read_header(bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
    let truncated = || DecodeError::Truncated {
        len: bytes.len(),
        min: IMAGE_HEADER_SIZE,
    };
    let width = bytes
        .get(0..4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(truncated)?;
    let height = bytes
        .get(4..8)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(truncated)?;
    Ok((width, height))
}

// ── Encoding ─────────────────────────────────────────────────────

/// Encode a BGRA8 image into the raw zstd format.
///
/// Used by publishers and tests. `level` is the zstd compression level
/// (1 favours speed).
pub fn encode_frame(image: &DecodedImage, level: i32) -> std::io::Result<Vec<u8>> {
    let compressed = zstd::encode_all(image.data.as_slice(), level)?;
    let mut out = Vec::with_capacity(IMAGE_HEADER_SIZE + compressed.len());
    out.extend_from_slice(&image.width.to_le_bytes());
    out.extend_from_slice(&image.height.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

// ── Tests ────────────────────────────────────────────────────────
