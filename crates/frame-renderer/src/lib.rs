//! Frame Renderer
//!
//! Turns binary stream frames into pixels on a persistent drawing surface:
//! - Two-stage decode (JPEG fast path, format-sniffing fallback)
//! - Surface resized only when the frame size changes
//! - Paints applied strictly in arrival order
//! - Rolling 1 Hz FPS counter

pub mod decode;
pub mod fps;
pub mod renderer;
pub mod surface;

pub use decode::{DecodePath, DecodePipeline, Decoded, FrameDecoder, JpegDecoder, SniffingDecoder};
pub use fps::FpsCounter;
pub use renderer::{FrameRenderer, PaintReport, RenderOutcome, RendererConfig};
pub use surface::{CanvasSurface, DrawingSurface};

use thiserror::Error;

/// Frame decode error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unsupported image format: {0}")]
    Unsupported(String),

    #[error("Corrupt frame: {0}")]
    Corrupt(String),

    #[error("Decode task cancelled: {0}")]
    Cancelled(String),
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => DecodeError::Unsupported(e.to_string()),
            other => DecodeError::Corrupt(other.to_string()),
        }
    }
}
