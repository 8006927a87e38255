//! Background fetches with id-keyed delivery.
//!
//! Every request runs on the worker pool and posts a [`FetchResponse`] tagged
//! with the id (or page token) it was made for. The UI thread drains
//! responses with `poll()` once per frame and hands each to the owner of the
//! matching state, which compares the tag with what is current and drops
//! stale results. Nothing is cancelled; results simply lose relevance.
//!
//! Successful details responses are memoized in an LRU cache so stepping
//! back and forth does not hit the provider again.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, trace};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::core::workers::Workers;
use crate::entities::{
    Capture, CaptureDetails, CaptureId, CapturePage, OccurrenceDetails, OccurrenceId, PageToken,
    SessionId, Timeline,
};
use crate::source::{FetchError, SessionSource};

/// Decoded RGBA8 image ready for upload
#[derive(Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Natural (actually loaded) size
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Decode encoded bytes into RGBA8
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, FetchError> {
    let img = image::load_from_memory(bytes).map_err(|e| FetchError::Image(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Result of one background request, tagged with what was requested
#[derive(Debug)]
pub enum FetchResponse {
    Page {
        token: Option<PageToken>,
        result: Result<CapturePage, FetchError>,
    },
    Details {
        id: CaptureId,
        result: Result<CaptureDetails, FetchError>,
    },
    Timeline {
        result: Result<Timeline, FetchError>,
    },
    Occurrence {
        id: OccurrenceId,
        result: Result<OccurrenceDetails, FetchError>,
    },
    Image {
        id: CaptureId,
        result: Result<DecodedImage, FetchError>,
    },
}

/// Issues provider calls on the worker pool for one session.
pub struct Fetcher {
    source: Arc<dyn SessionSource>,
    session: SessionId,
    workers: Arc<Workers>,
    tx: Sender<FetchResponse>,
    rx: Receiver<FetchResponse>,
    details_cache: LruCache<CaptureId, CaptureDetails>,
    /// Requests issued but not yet drained by `poll()`
    pending: usize,
}

impl Fetcher {
    pub fn new(
        source: Arc<dyn SessionSource>,
        session: SessionId,
        workers: Arc<Workers>,
        cache_size: usize,
    ) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let cap = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            session,
            workers,
            tx,
            rx,
            details_cache: LruCache::new(cap),
            pending: 0,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Requests still waiting for delivery
    pub fn pending(&self) -> usize {
        self.pending
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce(&dyn SessionSource) -> FetchResponse + Send + 'static,
    {
        self.pending += 1;
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.workers.execute(move || {
            let response = job(source.as_ref());
            // Receiver gone means the session was closed
            let _ = tx.send(response);
        });
    }

    pub fn request_page(&mut self, token: Option<PageToken>) {
        trace!("Fetch page {:?}", token);
        let session = self.session.clone();
        self.spawn(move |src| FetchResponse::Page {
            token,
            result: src.fetch_captures(&session, token),
        });
    }

    /// Details for `id`; served from cache when possible, still through the
    /// channel so callers see one delivery path.
    pub fn request_details(&mut self, id: &CaptureId) {
        if let Some(hit) = self.details_cache.get(id) {
            trace!("Details cache hit for {}", id);
            self.pending += 1;
            let _ = self.tx.send(FetchResponse::Details {
                id: id.clone(),
                result: Ok(hit.clone()),
            });
            return;
        }
        trace!("Fetch details {}", id);
        let id = id.clone();
        self.spawn(move |src| {
            let result = src.fetch_capture_details(&id);
            FetchResponse::Details { id, result }
        });
    }

    pub fn request_timeline(&mut self) {
        let session = self.session.clone();
        self.spawn(move |src| FetchResponse::Timeline {
            result: src.fetch_timeline(&session),
        });
    }

    pub fn request_occurrence(&mut self, id: &OccurrenceId) {
        let id = id.clone();
        self.spawn(move |src| {
            let result = src.fetch_occurrence(&id);
            FetchResponse::Occurrence { id, result }
        });
    }

    /// Read and decode the capture's image off the UI thread.
    pub fn request_image(&mut self, capture: &Capture) {
        let capture = capture.clone();
        self.spawn(move |src| {
            let result = src.image_bytes(&capture).and_then(|b| decode_image(&b));
            FetchResponse::Image {
                id: capture.id,
                result,
            }
        });
    }

    /// Drain delivered responses. Successful details are cached on the way.
    pub fn poll(&mut self) -> Vec<FetchResponse> {
        let responses: Vec<FetchResponse> = self.rx.try_iter().collect();
        self.pending = self.pending.saturating_sub(responses.len());
        for resp in &responses {
            match resp {
                FetchResponse::Details { id, result: Ok(details) } => {
                    self.details_cache.put(id.clone(), details.clone());
                }
                FetchResponse::Details { id, result: Err(e) } => {
                    error!("Details fetch for {} failed: {}", id, e);
                }
                FetchResponse::Page { token, result: Err(e) } => {
                    error!("Page fetch {:?} failed: {}", token, e);
                }
                FetchResponse::Timeline { result: Err(e) } => {
                    error!("Timeline fetch failed: {}", e);
                }
                FetchResponse::Occurrence { id, result: Err(e) } => {
                    error!("Occurrence fetch for {} failed: {}", id, e);
                }
                FetchResponse::Image { id, result: Err(e) } => {
                    error!("Image load for {} failed: {}", id, e);
                }
                _ => {}
            }
        }
        if !responses.is_empty() {
            debug!("Fetcher delivered {} responses", responses.len());
        }
        responses
    }

    /// Block until at least one response arrives or `timeout` elapses.
    pub fn wait(&mut self, timeout: std::time::Duration) -> Vec<FetchResponse> {
        match self.rx.recv_timeout(timeout) {
            Ok(first) => {
                // Route through the same bookkeeping as poll()
                let _ = self.tx.send(first);
                self.poll()
            }
            Err(_) => Vec::new(),
        }
    }
}
