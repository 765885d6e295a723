//! OCR capability and page rasterization.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::error::{Error, Result};
use crate::model::Page;
use crate::pool;

/// A page image handed to the OCR engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    /// Source page index (0-based)
    pub page: usize,
    pub width_px: u32,
    pub height_px: u32,
    /// Resolution the image was produced at
    pub dpi: u32,
    /// Stream filter of the encoded data, e.g. "DCTDecode"
    pub format: Option<String>,
    /// Encoded image bytes
    pub data: Vec<u8>,
}

/// Set when the caller stopped waiting for an OCR call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Text recognition over a raster image.
///
/// Implementations must be safe to call from several threads at once.
/// Closures of the form `Fn(&RasterImage, &str) -> Result<String>` implement
/// this trait.
///
/// Each call runs on its own worker thread. When a call outlives
/// `ocr_timeout_ms` the page is marked failed and the call's [`CancelToken`]
/// is set; the worker thread is not joined. Engines that can stop early
/// should override [`OcrEngine::recognize_cancellable`] and poll the token.
/// At most `max_page_concurrency` calls per extractor are outstanding,
/// including timed-out calls that are still running, so an engine that never
/// returns holds at most that many threads.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text of `image`, one line per text line.
    fn recognize(&self, image: &RasterImage, language_hint: &str) -> Result<String>;

    /// Like [`OcrEngine::recognize`], with a token that is set once the
    /// result is no longer wanted.
    fn recognize_cancellable(
        &self,
        image: &RasterImage,
        language_hint: &str,
        cancel: &CancelToken,
    ) -> Result<String> {
        let _ = cancel;
        self.recognize(image, language_hint)
    }
}

impl<F> OcrEngine for F
where
    F: Fn(&RasterImage, &str) -> Result<String> + Send + Sync,
{
    fn recognize(&self, image: &RasterImage, language_hint: &str) -> Result<String> {
        self(image, language_hint)
    }
}

/// Produces a raster image of a page.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, page: &Page, dpi: u32) -> Result<RasterImage>;
}

/// Uses the largest embedded raster image of the page as its raster.
///
/// Scanned pages are usually one full-page image, so no rendering is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedImageRasterizer;

impl Rasterizer for EmbeddedImageRasterizer {
    fn rasterize(&self, page: &Page, dpi: u32) -> Result<RasterImage> {
        page.ensure_readable()?;

        let bounds = page.bounds();
        let image = page
            .images
            .iter()
            .filter(|img| !img.data.is_empty())
            .max_by(|a, b| {
                let area = |img: &&crate::model::PageImage| {
                    img.bbox.intersection(&bounds).map(|r| r.area()).unwrap_or(0.0)
                };
                area(a)
                    .partial_cmp(&area(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or_else(|| {
                Error::Rasterize(format!("page {} has no embedded raster image", page.index))
            })?;

        let scale = dpi as f32 / 72.0;
        let width_px = if image.pixel_width > 0 {
            image.pixel_width
        } else {
            (image.bbox.width() * scale).round() as u32
        };
        let height_px = if image.pixel_height > 0 {
            image.pixel_height
        } else {
            (image.bbox.height() * scale).round() as u32
        };

        Ok(RasterImage {
            page: page.index,
            width_px,
            height_px,
            dpi,
            format: image.filter.clone(),
            data: image.data.clone(),
        })
    }
}

/// Permits for outstanding OCR worker threads.
///
/// A permit is taken before a worker starts and given back when the engine
/// returns, whether or not the caller is still waiting.
#[derive(Debug, Clone)]
pub(crate) struct OcrWorkers {
    acquire: Sender<()>,
    release: Receiver<()>,
}

impl OcrWorkers {
    pub(crate) fn new(limit: usize) -> Self {
        let (acquire, release) = crossbeam_channel::bounded(limit.max(1));
        Self { acquire, release }
    }

    /// Number of workers currently holding a permit.
    pub(crate) fn outstanding(&self) -> usize {
        self.release.len()
    }
}

/// Run `engine` on a worker thread, giving up after `timeout_ms`.
///
/// Waiting for a free worker permit counts against the timeout. A call that
/// times out has its token cancelled; its result is dropped when it arrives.
pub(crate) fn recognize_with_timeout(
    engine: &Arc<dyn OcrEngine>,
    image: RasterImage,
    language_hint: &str,
    timeout_ms: u64,
    workers: &OcrWorkers,
) -> Result<String> {
    let page = image.page;
    let timeout = Duration::from_millis(timeout_ms);
    let started = Instant::now();

    match workers.acquire.send_timeout((), timeout) {
        Ok(()) => {}
        Err(SendTimeoutError::Timeout(())) => {
            log::warn!(
                "page {}: {} OCR calls still running, no worker free",
                page,
                workers.outstanding()
            );
            return Err(Error::OcrTimeout { page, timeout_ms });
        }
        Err(SendTimeoutError::Disconnected(())) => {
            return Err(Error::OcrFailure {
                page,
                reason: "OCR worker permits closed".to_string(),
            });
        }
    }

    let (tx, rx) = crossbeam_channel::bounded(1);
    let engine = Arc::clone(engine);
    let language = language_hint.to_string();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let release = workers.release.clone();

    let spawned = thread::Builder::new()
        .name(format!("ocr-page-{page}"))
        .spawn(move || {
            let outcome = pool::catch_panic(|| {
                engine.recognize_cancellable(&image, &language, &worker_cancel)
            });
            let _ = release.try_recv();
            // The receiver is gone once the caller timed out
            let _ = tx.send(outcome);
        });
    if let Err(e) = spawned {
        let _ = workers.release.try_recv();
        return Err(Error::OcrFailure {
            page,
            reason: format!("failed to start OCR worker: {e}"),
        });
    }

    let remaining = timeout.saturating_sub(started.elapsed());
    match rx.recv_timeout(remaining) {
        Ok(Ok(Ok(text))) => Ok(text),
        Ok(Ok(Err(e))) => Err(Error::OcrFailure {
            page,
            reason: e.to_string(),
        }),
        Ok(Err(panic)) => Err(Error::OcrFailure {
            page,
            reason: format!("engine panicked: {panic}"),
        }),
        Err(RecvTimeoutError::Timeout) => {
            cancel.cancel();
            Err(Error::OcrTimeout { page, timeout_ms })
        }
        Err(RecvTimeoutError::Disconnected) => Err(Error::OcrFailure {
            page,
            reason: "OCR worker exited without a result".to_string(),
        }),
    }
}
