//! Frame decoding
//!
//! The backend encodes every annotated frame as JPEG, so the fast path
//! decodes JPEG directly. Anything else goes through a reader that sniffs
//! the format from the magic bytes first.

use std::io::Cursor;

use image::{ImageFormat, ImageReader, RgbaImage};
use tracing::debug;

use crate::DecodeError;

/// Which decoder produced the bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePath {
    Fast,
    Fallback,
}

/// A decoded RGBA bitmap ready to paint
#[derive(Debug, Clone)]
pub struct Decoded {
    pub bitmap: RgbaImage,
    pub path: DecodePath,
}

/// Turns encoded bytes into an RGBA bitmap
pub trait FrameDecoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, DecodeError>;
}

/// JPEG-only decoder, no format detection
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegDecoder;

impl FrameDecoder for JpegDecoder {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, DecodeError> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
        Ok(img.into_rgba8())
    }
}

/// Detects the format from the payload and decodes with the matching codec
#[derive(Debug, Default, Clone, Copy)]
pub struct SniffingDecoder;

impl FrameDecoder for SniffingDecoder {
    fn name(&self) -> &'static str {
        "sniffing"
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, DecodeError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::Corrupt(e.to_string()))?;

        if reader.format().is_none() {
            return Err(DecodeError::Unsupported("unrecognized image signature".to_string()));
        }

        Ok(reader.decode()?.into_rgba8())
    }
}

/// Fast decode, else fallback decode
pub struct DecodePipeline {
    fast: Box<dyn FrameDecoder>,
    fallback: Box<dyn FrameDecoder>,
}

impl DecodePipeline {
    pub fn new(fast: Box<dyn FrameDecoder>, fallback: Box<dyn FrameDecoder>) -> Self {
        Self { fast, fallback }
    }

    /// Decode a payload, reporting which stage succeeded
    pub fn decode(&self, bytes: &[u8]) -> Result<Decoded, DecodeError> {
        match self.fast.decode(bytes) {
            Ok(bitmap) => Ok(Decoded {
                bitmap,
                path: DecodePath::Fast,
            }),
            Err(e) => {
                debug!(
                    "{} decode failed ({}), retrying with {}",
                    self.fast.name(),
                    e,
                    self.fallback.name()
                );
                let bitmap = self.fallback.decode(bytes)?;
                Ok(Decoded {
                    bitmap,
                    path: DecodePath::Fallback,
                })
            }
        }
    }
}

impl Default for DecodePipeline {
    fn default() -> Self {
        Self::new(Box::new(JpegDecoder), Box::new(SniffingDecoder))
    }
}
