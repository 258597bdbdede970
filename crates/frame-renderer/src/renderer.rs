//! Frame renderer
//!
//! Decodes run on the blocking pool so `submit` never stalls the caller.
//! Completed decodes are drained through an ordered queue, which means a
//! slow frame holds back the ones behind it and the surface never shows an
//! older frame after a newer one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::{FuturesOrdered, StreamExt};
use hazard_protocol::FramePayload;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::decode::{DecodePath, DecodePipeline, Decoded};
use crate::fps::FpsCounter;
use crate::surface::DrawingSurface;
use crate::DecodeError;

type DecodeTask = Pin<Box<dyn Future<Output = Result<Decoded, DecodeError>> + Send>>;

/// Renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Maximum decodes in flight before new frames are dropped
    pub max_in_flight: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self { max_in_flight: 4 }
    }
}

/// Result of painting one frame
#[derive(Debug, Clone, PartialEq)]
pub struct PaintReport {
    pub width: u32,
    pub height: u32,
    /// Surface was reallocated for this frame
    pub resized: bool,
    pub path: DecodePath,
    /// Set when this paint closed an FPS window
    pub fps: Option<u32>,
}

/// What happened to the oldest pending frame
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Painted(PaintReport),
    Failed(DecodeError),
}

/// Owns the drawing surface and the decode queue
pub struct FrameRenderer<S: DrawingSurface> {
    surface: S,
    pipeline: Arc<DecodePipeline>,
    pending: FuturesOrdered<DecodeTask>,
    fps: FpsCounter,
    config: RendererConfig,
    painted: u64,
    failed: u64,
    dropped: u64,
}

impl<S: DrawingSurface> FrameRenderer<S> {
    pub fn new(surface: S, config: RendererConfig) -> Self {
        Self::with_pipeline(surface, DecodePipeline::default(), config)
    }

    pub fn with_pipeline(surface: S, pipeline: DecodePipeline, config: RendererConfig) -> Self {
        info!(
            "Creating frame renderer (max {} decodes in flight)",
            config.max_in_flight
        );
        Self {
            surface,
            pipeline: Arc::new(pipeline),
            pending: FuturesOrdered::new(),
            fps: FpsCounter::new(Instant::now()),
            config,
            painted: 0,
            failed: 0,
            dropped: 0,
        }
    }

    /// Queue a frame for decoding. Returns false if the frame was dropped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&mut self, payload: FramePayload) -> bool {
        if self.pending.len() >= self.config.max_in_flight {
            self.dropped += 1;
            debug!(
                "Decode queue full ({}), dropping {} byte frame",
                self.pending.len(),
                payload.as_bytes().len()
            );
            return false;
        }

        let pipeline = Arc::clone(&self.pipeline);
        let handle = tokio::task::spawn_blocking(move || pipeline.decode(payload.as_bytes()));
        self.pending.push_back(Box::pin(async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(DecodeError::Cancelled(e.to_string())),
            }
        }));
        true
    }

    /// Number of decodes not yet painted
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Wait for the oldest pending decode and paint it.
    ///
    /// Returns `None` when nothing is pending. Cancel safe.
    pub async fn next_outcome(&mut self) -> Option<RenderOutcome> {
        let result = self.pending.next().await?;
        Some(match result {
            Ok(decoded) => RenderOutcome::Painted(self.paint(decoded, Instant::now())),
            Err(e) => {
                self.failed += 1;
                warn!("Dropping undecodable frame: {}", e);
                RenderOutcome::Failed(e)
            }
        })
    }

    /// Paint a decoded bitmap and release it
    pub fn paint(&mut self, decoded: Decoded, now: Instant) -> PaintReport {
        let Decoded { bitmap, path } = decoded;
        let (width, height) = bitmap.dimensions();

        let resized = self.surface.dimensions() != (width, height);
        if resized {
            debug!("Resizing surface to {}x{}", width, height);
            self.surface.resize(width, height);
        }
        self.surface.draw(&bitmap);
        drop(bitmap);

        self.painted += 1;
        let fps = self.fps.record_paint(now);

        PaintReport {
            width,
            height,
            resized,
            path,
            fps,
        }
    }

    /// Last published FPS value
    pub fn fps(&self) -> u32 {
        self.fps.current()
    }

    pub fn painted(&self) -> u64 {
        self.painted
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Discard pending decodes and free the surface
    pub fn release(&mut self) {
        if !self.pending.is_empty() {
            debug!("Discarding {} pending decodes", self.pending.len());
        }
        self.pending = FuturesOrdered::new();
        self.surface.release();
        self.fps.reset(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tests::{jpeg_bytes, png_bytes};
    use crate::decode::FrameDecoder;
    use crate::surface::CanvasSurface;
    use image::{Rgba, RgbaImage};
    use std::time::Duration;

    fn renderer() -> FrameRenderer<CanvasSurface> {
        FrameRenderer::new(CanvasSurface::new(), RendererConfig::default())
    }

    fn bitmap(width: u32, height: u32) -> Decoded {
        Decoded {
            bitmap: RgbaImage::from_pixel(width, height, Rgba([1, 1, 1, 255])),
            path: DecodePath::Fast,
        }
    }

    #[test]
    fn test_resize_only_on_dimension_change() {
        let mut r = renderer();
        let now = Instant::now();

        assert!(r.paint(bitmap(4, 4), now).resized);
        assert!(!r.paint(bitmap(4, 4), now).resized);
        assert!(r.paint(bitmap(8, 4), now).resized);
        assert!(!r.paint(bitmap(8, 4), now).resized);
        assert_eq!(r.surface().resize_count(), 2);
        assert_eq!(r.painted(), 4);
    }

    #[test]
    fn test_paint_counts_toward_fps() {
        let mut r = renderer();
        let start = Instant::now();
        for i in 0..9u64 {
            let report = r.paint(bitmap(2, 2), start + Duration::from_millis(i * 100));
            assert_eq!(report.fps, None);
        }
        let report = r.paint(bitmap(2, 2), start + Duration::from_millis(1000));
        assert_eq!(report.fps, Some(10));
        assert_eq!(r.fps(), 10);
    }

    #[tokio::test]
    async fn test_submit_decodes_and_paints() {
        let mut r = renderer();
        assert!(r.submit(FramePayload::new(jpeg_bytes(16, 8))));

        match r.next_outcome().await {
            Some(RenderOutcome::Painted(report)) => {
                assert_eq!((report.width, report.height), (16, 8));
                assert!(report.resized);
                assert_eq!(report.path, DecodePath::Fast);
            }
            other => panic!("expected paint, got {:?}", other),
        }
        assert_eq!(r.surface().dimensions(), (16, 8));
        assert!(r.next_outcome().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_decode_does_not_touch_fps() {
        let mut r = renderer();
        r.submit(FramePayload::new(b"garbage".to_vec()));

        assert!(matches!(r.next_outcome().await, Some(RenderOutcome::Failed(_))));
        assert_eq!(r.failed(), 1);
        assert_eq!(r.painted(), 0);
        assert_eq!(r.surface().dimensions(), (0, 0));
    }

    struct SlowFirst;

    impl FrameDecoder for SlowFirst {
        fn name(&self) -> &'static str {
            "slow-first"
        }

        fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, DecodeError> {
            // Width encoded in the first byte; the first frame is slow
            let width = bytes[0] as u32;
            if width == 1 {
                std::thread::sleep(Duration::from_millis(50));
            }
            Ok(RgbaImage::new(width, 1))
        }
    }

    #[tokio::test]
    async fn test_paint_order_follows_arrival() {
        let pipeline = DecodePipeline::new(Box::new(SlowFirst), Box::new(SlowFirst));
        let mut r = FrameRenderer::with_pipeline(
            CanvasSurface::new(),
            pipeline,
            RendererConfig::default(),
        );
        r.submit(FramePayload::new(vec![1]));
        r.submit(FramePayload::new(vec![2]));

        let mut widths = Vec::new();
        while let Some(outcome) = r.next_outcome().await {
            if let RenderOutcome::Painted(report) = outcome {
                widths.push(report.width);
            }
        }
        assert_eq!(widths, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_queue_full_drops_frame() {
        let mut r = FrameRenderer::new(CanvasSurface::new(), RendererConfig { max_in_flight: 1 });
        assert!(r.submit(FramePayload::new(png_bytes(2, 2))));
        assert!(!r.submit(FramePayload::new(png_bytes(2, 2))));
        assert_eq!(r.dropped(), 1);
        assert_eq!(r.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_release_discards_pending() {
        let mut r = renderer();
        r.paint(bitmap(4, 4), Instant::now());
        r.submit(FramePayload::new(png_bytes(2, 2)));
        r.release();

        assert_eq!(r.in_flight(), 0);
        assert_eq!(r.surface().dimensions(), (0, 0));
        assert!(r.next_outcome().await.is_none());
    }
}
